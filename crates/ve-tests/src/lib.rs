//! Cross-crate test suite for the vote-escrow ledger.
//!
//! Integration tests under `tests/` drive a [`VoteEscrow`](ve_escrow::VoteEscrow)
//! backed by an in-memory token ledger through full lock lifecycles, check
//! aggregate invariants under randomized operation sequences, and probe the
//! authorization surface from an attacker's perspective.

pub mod helpers;
