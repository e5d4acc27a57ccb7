//! # ve-core
//! Foundation types, constants and traits for the vote-escrow ledger.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
