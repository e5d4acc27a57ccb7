//! Error types for the vote-escrow ledger.
use thiserror::Error;

use crate::types::{Amount, Epoch, LockId, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecayError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("zero duration")] ZeroDuration,
    #[error("division by zero")] DivisionByZero,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid length: {0} hex chars, expected 64")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("transfer rejected: {0}")] Rejected(String),
}

/// Failures of the non-fungible ownership surface (transfer, balance, operators).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("caller is not an operator of the sender")] NotOperator,
    #[error("caller is not the owner")] NotOwner,
    #[error("insufficient balance")] InsufficientBalance,
    #[error("invalid amount: locks are indivisible")] InvalidAmount,
    #[error("token undefined: {0}")] TokenUndefined(LockId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("invalid lock time")] InvalidLockTime,
    #[error("invalid increase value")] InvalidIncreaseValue,
    #[error("invalid increase end timestamp")] InvalidIncreaseEndTimestamp,
    #[error("timestamp precedes the first checkpoint")] TooEarlyTimestamp,
    #[error("timestamp {now} precedes the last recorded checkpoint at {last}")] NonMonotonicTimestamp { last: Timestamp, now: Timestamp },
    #[error("lock does not exist: {0}")] LockDoesNotExist(LockId),
    #[error("lock has expired: {0}")] LockHasExpired(LockId),
    #[error("lock yet to expire: {0}")] LockYetToExpire(LockId),
    #[error("lock is attached: {0}")] LockIsAttached(LockId),
    #[error("not authorised")] NotAuthorised,
    #[error("inflation not added for epoch {0}")] InflationNotAdded(Epoch),
    #[error("inflation already claimed: lock {lock_id}, epoch {epoch}")] AlreadyClaimedInflation { lock_id: LockId, epoch: Epoch },
    #[error("invalid config: {0}")] InvalidConfig(String),
    #[error(transparent)] Decay(#[from] DecayError),
    #[error(transparent)] Transfer(#[from] TransferError),
    #[error(transparent)] Ownership(#[from] OwnershipError),
    #[error("snapshot: {0}")] Snapshot(String),
}
