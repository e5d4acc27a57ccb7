//! Lock ownership, operators and attachments.
//!
//! Every live lock has exactly one owner. An owner may approve operators per
//! lock; operators can move the lock and pledge it to a collaborator. A
//! pledged (attached) lock cannot be transferred or withdrawn until the
//! attaching party releases it.

use std::collections::{BTreeMap, BTreeSet};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ve_core::error::{EscrowError, OwnershipError};
use ve_core::types::{Address, Amount, LockId};

/// Approval for `operator` to act on `owner`'s lock `lock_id`.
#[derive(
    Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct OperatorKey {
    pub owner: Address,
    pub operator: Address,
    pub lock_id: LockId,
}

/// Add or remove an operator approval.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperatorUpdate {
    Add(OperatorKey),
    Remove(OperatorKey),
}

/// A single lock movement inside a [`TransferBatch`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferTx {
    pub to: Address,
    pub lock_id: LockId,
    /// Must be exactly 1: locks are indivisible.
    pub amount: Amount,
}

/// Lock movements out of one sender.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransferBatch {
    pub from: Address,
    pub txs: Vec<TransferTx>,
}

/// Ownership query for one `(owner, lock)` pair.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceRequest {
    pub owner: Address,
    pub lock_id: LockId,
}

/// A validated ownership move: `lock_id` goes from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub lock_id: LockId,
    pub from: Address,
    pub to: Address,
}

/// Ownership, operator and attachment tables.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ownership {
    owners: BTreeMap<LockId, Address>,
    operators: BTreeSet<OperatorKey>,
    attachments: BTreeMap<LockId, Address>,
}

impl Ownership {
    /// Current owner of a live lock.
    pub fn owner_of(&self, lock_id: LockId) -> Option<Address> {
        self.owners.get(&lock_id).copied()
    }

    pub fn is_owner(&self, address: &Address, lock_id: LockId) -> bool {
        self.owners.get(&lock_id) == Some(address)
    }

    pub fn is_operator(&self, owner: &Address, operator: &Address, lock_id: LockId) -> bool {
        self.operators.contains(&OperatorKey { owner: *owner, operator: *operator, lock_id })
    }

    /// Whether `caller` owns `lock_id` or is an operator of its current owner.
    pub fn is_approved(&self, caller: &Address, lock_id: LockId) -> bool {
        match self.owners.get(&lock_id) {
            Some(owner) => owner == caller || self.is_operator(owner, caller, lock_id),
            None => false,
        }
    }

    /// The collaborator `lock_id` is pledged to, if any.
    pub fn attacher(&self, lock_id: LockId) -> Option<Address> {
        self.attachments.get(&lock_id).copied()
    }

    pub fn is_attached(&self, lock_id: LockId) -> bool {
        self.attachments.contains_key(&lock_id)
    }

    /// Number of live locks.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Live lock ids owned by `owner`, ascending.
    pub fn locks_of(&self, owner: &Address) -> Vec<LockId> {
        self.owners.iter().filter(|(_, o)| *o == owner).map(|(id, _)| *id).collect()
    }

    pub(crate) fn mint(&mut self, lock_id: LockId, owner: Address) {
        self.owners.insert(lock_id, owner);
    }

    /// Drop every trace of a withdrawn lock.
    pub(crate) fn burn(&mut self, lock_id: LockId) {
        self.owners.remove(&lock_id);
        self.attachments.remove(&lock_id);
        self.operators.retain(|k| k.lock_id != lock_id);
    }

    /// `1` if `request.owner` owns the lock, `0` otherwise.
    ///
    /// # Errors
    ///
    /// - [`OwnershipError::TokenUndefined`] for a lock that is not live
    pub fn balance_of(
        &self,
        requests: &[BalanceRequest],
    ) -> Result<Vec<(BalanceRequest, Amount)>, OwnershipError> {
        requests
            .iter()
            .map(|r| match self.owners.get(&r.lock_id) {
                None => Err(OwnershipError::TokenUndefined(r.lock_id)),
                Some(owner) => Ok((*r, Amount::from(*owner == r.owner))),
            })
            .collect()
    }

    /// Validate a batched transfer without applying it.
    ///
    /// Transactions are checked in order against the ownership the earlier
    /// ones would produce, so a lock may be passed along within one call.
    ///
    /// # Errors
    ///
    /// - [`OwnershipError::NotOperator`] if `caller` is neither `from` nor its operator for the lock
    /// - [`EscrowError::LockIsAttached`] if the lock is pledged
    /// - [`OwnershipError::TokenUndefined`] if the lock is not live
    /// - [`OwnershipError::InvalidAmount`] unless `amount == 1`
    /// - [`OwnershipError::InsufficientBalance`] if `from` does not own the lock
    pub fn plan_transfer(
        &self,
        caller: &Address,
        batches: &[TransferBatch],
    ) -> Result<Vec<Move>, EscrowError> {
        let mut staged: BTreeMap<LockId, Address> = BTreeMap::new();
        let mut moves = Vec::new();

        for batch in batches {
            for tx in &batch.txs {
                let id = tx.lock_id;
                if *caller != batch.from && !self.is_operator(&batch.from, caller, id) {
                    return Err(OwnershipError::NotOperator.into());
                }
                if self.is_attached(id) {
                    return Err(EscrowError::LockIsAttached(id));
                }
                let owner = staged
                    .get(&id)
                    .or_else(|| self.owners.get(&id))
                    .copied()
                    .ok_or(OwnershipError::TokenUndefined(id))?;
                if tx.amount != 1 {
                    return Err(OwnershipError::InvalidAmount.into());
                }
                if owner != batch.from {
                    return Err(OwnershipError::InsufficientBalance.into());
                }
                staged.insert(id, tx.to);
                moves.push(Move { lock_id: id, from: batch.from, to: tx.to });
            }
        }
        Ok(moves)
    }

    pub(crate) fn apply_transfer(&mut self, moves: &[Move]) {
        for m in moves {
            self.operators.retain(|k| !(k.lock_id == m.lock_id && k.owner == m.from));
            self.owners.insert(m.lock_id, m.to);
            debug!(lock_id = m.lock_id, from = %m.from, to = %m.to, "lock transferred");
        }
    }

    /// Apply operator additions and removals. All or nothing.
    ///
    /// # Errors
    ///
    /// - [`OwnershipError::NotOwner`] if any update names an owner other than `caller`
    pub(crate) fn update_operators(
        &mut self,
        caller: &Address,
        updates: &[OperatorUpdate],
    ) -> Result<(), OwnershipError> {
        let key = |u: &OperatorUpdate| match *u {
            OperatorUpdate::Add(k) | OperatorUpdate::Remove(k) => k,
        };
        if updates.iter().any(|u| key(u).owner != *caller) {
            return Err(OwnershipError::NotOwner);
        }
        for update in updates {
            match *update {
                OperatorUpdate::Add(k) => {
                    self.operators.insert(k);
                }
                OperatorUpdate::Remove(k) => {
                    self.operators.remove(&k);
                }
            }
        }
        debug!(count = updates.len(), owner = %caller, "operators updated");
        Ok(())
    }

    /// Pledge `lock_id` to `caller`.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::LockDoesNotExist`] if the lock is not live
    /// - [`EscrowError::LockIsAttached`] if it is already pledged
    /// - [`EscrowError::NotAuthorised`] if `owner` does not own it or `caller` is not approved
    pub(crate) fn attach(
        &mut self,
        caller: &Address,
        owner: &Address,
        lock_id: LockId,
    ) -> Result<(), EscrowError> {
        if !self.owners.contains_key(&lock_id) {
            return Err(EscrowError::LockDoesNotExist(lock_id));
        }
        if self.is_attached(lock_id) {
            return Err(EscrowError::LockIsAttached(lock_id));
        }
        if !self.is_owner(owner, lock_id)
            || (caller != owner && !self.is_operator(owner, caller, lock_id))
        {
            return Err(EscrowError::NotAuthorised);
        }
        self.attachments.insert(lock_id, *caller);
        debug!(lock_id, attacher = %caller, "lock attached");
        Ok(())
    }

    /// Release the pledge on `lock_id`. Returns whether a pledge was removed.
    ///
    /// Only the attaching party may release an existing pledge. Detaching a
    /// lock that is not pledged is a no-op for its owner or operators.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::LockDoesNotExist`] if the lock is not live
    /// - [`EscrowError::NotAuthorised`] if `owner` does not own it, or `caller` is not the attacher
    pub(crate) fn detach(
        &mut self,
        caller: &Address,
        owner: &Address,
        lock_id: LockId,
    ) -> Result<bool, EscrowError> {
        if !self.owners.contains_key(&lock_id) {
            return Err(EscrowError::LockDoesNotExist(lock_id));
        }
        if !self.is_owner(owner, lock_id) {
            return Err(EscrowError::NotAuthorised);
        }
        match self.attachments.get(&lock_id) {
            Some(attacher) if attacher == caller => {
                self.attachments.remove(&lock_id);
                debug!(lock_id, attacher = %caller, "lock detached");
                Ok(true)
            }
            Some(_) => Err(EscrowError::NotAuthorised),
            None if self.is_approved(caller, lock_id) => Ok(false),
            None => Err(EscrowError::NotAuthorised),
        }
    }
}
