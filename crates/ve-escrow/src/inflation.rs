//! Inflation credited by the emission coordinator and claimed per lock.

use std::collections::{BTreeMap, BTreeSet};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use ve_core::constants::WEEK;
use ve_core::error::{DecayError, EscrowError};
use ve_core::types::{week_floor, Amount, Epoch, LockId, Timestamp};

/// Inflation added for one epoch.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InflationRecord {
    /// Total value credited for the epoch.
    pub value: Amount,
    /// Start of the epoch; shares are weighted by voting power at this time.
    pub snapshot: Timestamp,
}

/// Start of the week preceding the one containing `now`.
///
/// The coordinator credits an epoch right after it closes, so the epoch being
/// credited began one week before the current week.
pub fn epoch_start(now: Timestamp) -> Timestamp {
    week_floor(now).saturating_sub(WEEK)
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct InflationBook {
    epochs: BTreeMap<Epoch, InflationRecord>,
    claimed: BTreeSet<(LockId, Epoch)>,
}

impl InflationBook {
    pub fn get(&self, epoch: Epoch) -> Option<&InflationRecord> {
        self.epochs.get(&epoch)
    }

    pub fn is_claimed(&self, lock_id: LockId, epoch: Epoch) -> bool {
        self.claimed.contains(&(lock_id, epoch))
    }

    pub fn epochs(&self) -> impl Iterator<Item = (&Epoch, &InflationRecord)> {
        self.epochs.iter()
    }

    /// Record for `epoch` after adding `value`. Does not modify the book.
    ///
    /// The snapshot time is fixed by the first addition for an epoch.
    pub(crate) fn plan_add(
        &self,
        epoch: Epoch,
        value: Amount,
        now: Timestamp,
    ) -> Result<InflationRecord, EscrowError> {
        match self.epochs.get(&epoch) {
            Some(r) => Ok(InflationRecord {
                value: r.value.checked_add(value).ok_or(DecayError::ArithmeticOverflow)?,
                snapshot: r.snapshot,
            }),
            None => Ok(InflationRecord { value, snapshot: epoch_start(now) }),
        }
    }

    pub(crate) fn set(&mut self, epoch: Epoch, record: InflationRecord) {
        self.epochs.insert(epoch, record);
    }

    /// Records for `epochs`, rejecting missing, claimed and repeated epochs.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::InflationNotAdded`] if an epoch has no inflation
    /// - [`EscrowError::AlreadyClaimedInflation`] if the lock claimed it before or it repeats
    pub(crate) fn claimable(
        &self,
        lock_id: LockId,
        epochs: &[Epoch],
    ) -> Result<Vec<InflationRecord>, EscrowError> {
        let mut seen = BTreeSet::new();
        epochs
            .iter()
            .map(|&epoch| {
                let record = self.epochs.get(&epoch).ok_or(EscrowError::InflationNotAdded(epoch))?;
                if self.is_claimed(lock_id, epoch) || !seen.insert(epoch) {
                    return Err(EscrowError::AlreadyClaimedInflation { lock_id, epoch });
                }
                Ok(*record)
            })
            .collect()
    }

    pub(crate) fn mark_claimed(&mut self, lock_id: LockId, epochs: &[Epoch]) {
        self.claimed.extend(epochs.iter().map(|&e| (lock_id, e)));
    }
}
