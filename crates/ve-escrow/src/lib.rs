//! # ve-escrow
//!
//! Vote-escrow ledger: locks a fungible balance for up to
//! [`MAX_LOCK_DURATION`](ve_core::constants::MAX_LOCK_DURATION) in exchange
//! for a non-fungible position whose voting power decays linearly to zero at
//! expiry.
//!
//! Every lock mutation appends a checkpoint to the lock's own log and to the
//! global log. The global log carries a slope-change schedule keyed by expiry,
//! so aggregate power at any past timestamp is recovered by walking week
//! strides from the nearest checkpoint instead of summing every lock.
//!
//! ## Modules
//!
//! - [`escrow`]: [`VoteEscrow`], the lock registry and its operations
//! - [`checkpoint`]: per-lock and global checkpoint logs
//! - [`query`]: binary-search historical queries
//! - [`registry`]: ownership, operators and attachments
//! - [`inflation`]: inflation book-keeping
//! - [`ledger`]: in-memory [`TokenLedger`](ve_core::traits::TokenLedger)
//! - [`shared`]: [`SharedEscrow`] read/write handle
//! - [`snapshot`]: bincode persistence of [`EscrowState`]

pub mod checkpoint;
pub mod config;
pub mod escrow;
pub mod inflation;
pub mod ledger;
pub mod query;
pub mod registry;
pub mod shared;
pub mod snapshot;
pub mod state;

pub use config::EscrowConfig;
pub use escrow::VoteEscrow;
pub use ledger::MemoryTokenLedger;
pub use registry::{BalanceRequest, OperatorKey, OperatorUpdate, TransferBatch, TransferTx};
pub use shared::SharedEscrow;
pub use state::EscrowState;
