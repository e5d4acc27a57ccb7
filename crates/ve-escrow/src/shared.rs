//! Shared handle for serving reads while a single writer mutates.
//!
//! Collaborators hold a [`SharedEscrow`] and read through the
//! [`VotingPowerSource`] trait; the operator that applies mutations takes
//! the write lock, so every mutation is observed whole or not at all.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ve_core::error::EscrowError;
use ve_core::traits::{TokenLedger, VotingPowerSource};
use ve_core::types::{Address, Amount, LockId, Rounding, Timestamp};

use crate::escrow::VoteEscrow;

pub struct SharedEscrow<L> {
    inner: Arc<RwLock<VoteEscrow<L>>>,
}

impl<L> Clone for SharedEscrow<L> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<L: TokenLedger> SharedEscrow<L> {
    pub fn new(escrow: VoteEscrow<L>) -> Self {
        Self { inner: Arc::new(RwLock::new(escrow)) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, VoteEscrow<L>> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, VoteEscrow<L>> {
        self.inner.write()
    }

    /// Run `f` under the write lock.
    pub fn with_write<T>(&self, f: impl FnOnce(&mut VoteEscrow<L>) -> T) -> T {
        f(&mut self.inner.write())
    }
}

impl<L: TokenLedger> VotingPowerSource for SharedEscrow<L> {
    fn token_voting_power(
        &self,
        lock_id: LockId,
        ts: Timestamp,
        rounding: Rounding,
    ) -> Result<Amount, EscrowError> {
        self.inner.read().token_voting_power(lock_id, ts, rounding)
    }

    fn total_voting_power(&self, ts: Timestamp, rounding: Rounding) -> Result<Amount, EscrowError> {
        self.inner.read().total_voting_power(ts, rounding)
    }

    fn is_owner(&self, address: &Address, lock_id: LockId) -> bool {
        self.inner.read().is_owner(address, lock_id)
    }

    fn locked_supply(&self) -> Amount {
        self.inner.read().locked_supply()
    }
}
