//! The vote-escrow ledger.
//!
//! [`VoteEscrow`] owns the lock table, both checkpoint logs, the ownership
//! tables and the inflation book. Every mutating call validates its input and
//! computes the new state into locals, settles the external token transfer,
//! and only then commits. A failure at any step leaves the escrow unchanged.

use tracing::{debug, info, warn};

use ve_core::constants::MIN_LOCK_DURATION;
use ve_core::error::{DecayError, EscrowError};
use ve_core::traits::{DecayCurve, TokenLedger, VotingPowerSource};
use ve_core::types::{
    week_floor, Address, Amount, Epoch, Lock, LockId, Point, Rounding, Timestamp,
};
use ve_decay::{mul_div, LinearDecay};

use crate::checkpoint::{GlobalUpdate, LockChange, TokenLog};
use crate::config::EscrowConfig;
use crate::inflation::InflationRecord;
use crate::query;
use crate::registry::{BalanceRequest, OperatorUpdate, TransferBatch};
use crate::state::EscrowState;

/// A vote-escrow instance settling tokens through `L`.
#[derive(Debug, Clone)]
pub struct VoteEscrow<L> {
    config: EscrowConfig,
    state: EscrowState,
    ledger: L,
    curve: LinearDecay,
}

impl<L: TokenLedger> VoteEscrow<L> {
    /// Create an empty escrow.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: EscrowConfig, ledger: L) -> Result<Self, EscrowError> {
        Self::from_state(config, EscrowState::default(), ledger)
    }

    /// Resume an escrow from previously saved state.
    pub fn from_state(
        config: EscrowConfig,
        state: EscrowState,
        ledger: L,
    ) -> Result<Self, EscrowError> {
        config.validate()?;
        Ok(Self { config, state, ledger, curve: LinearDecay::new() })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn state(&self) -> &EscrowState {
        &self.state
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_parts(self) -> (EscrowConfig, EscrowState, L) {
        (self.config, self.state, self.ledger)
    }

    /// Live lock record. `None` once withdrawn.
    pub fn lock(&self, lock_id: LockId) -> Option<&Lock> {
        self.state.locks.get(&lock_id)
    }

    pub fn owner_of(&self, lock_id: LockId) -> Option<Address> {
        self.state.ownership.owner_of(lock_id)
    }

    pub fn attacher(&self, lock_id: LockId) -> Option<Address> {
        self.state.ownership.attacher(lock_id)
    }

    pub fn is_operator(&self, owner: &Address, operator: &Address, lock_id: LockId) -> bool {
        self.state.ownership.is_operator(owner, operator, lock_id)
    }

    /// Checkpoints recorded for a lock, including withdrawn ones.
    pub fn token_checkpoints(&self, lock_id: LockId) -> Option<&[Point]> {
        self.state.token_logs.get(&lock_id).map(TokenLog::points)
    }

    pub fn global_checkpoints(&self) -> &[Point] {
        self.state.global.points()
    }

    pub fn slope_change_at(&self, ts: Timestamp) -> Amount {
        self.state.global.slope_change_at(ts)
    }

    /// Id the next created lock will receive.
    pub fn next_lock_id(&self) -> LockId {
        self.state.next_lock_id
    }

    // ------------------------------------------------------------------
    // Lock lifecycle
    // ------------------------------------------------------------------

    /// Lock `base_value` from `caller` until `requested_end`, rounded down to
    /// a week boundary, and give the position to `owner`.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::InvalidLockTime`] if the rounded duration is under a week or over the maximum
    /// - [`EscrowError::NonMonotonicTimestamp`] if `now` precedes the last global checkpoint
    /// - [`EscrowError::Transfer`] if the ledger rejects the deposit
    pub fn create_lock(
        &mut self,
        caller: &Address,
        owner: &Address,
        base_value: Amount,
        requested_end: Timestamp,
        now: Timestamp,
    ) -> Result<LockId, EscrowError> {
        let end = week_floor(requested_end);
        let duration = end.saturating_sub(now);
        if duration < MIN_LOCK_DURATION || duration > self.config.max_lock_duration {
            return Err(EscrowError::InvalidLockTime);
        }

        let point = self.curve.fresh_point(base_value, duration, self.config.max_lock_duration, now)?;
        let change = LockChange { old: Point::ZERO, new: point, prev_end: 0, new_end: end };
        let update = self.state.global.plan(&self.curve, &change, now)?;

        let lock_id = self.state.next_lock_id;
        let next_lock_id = lock_id.checked_add(1).ok_or(DecayError::ArithmeticOverflow)?;
        let locked_supply = self
            .state
            .locked_supply
            .checked_add(base_value)
            .ok_or(DecayError::ArithmeticOverflow)?;

        self.ledger.transfer(
            caller,
            &self.config.escrow_address,
            base_value,
            &self.config.base_asset,
        )?;

        self.state.next_lock_id = next_lock_id;
        self.state.locks.insert(lock_id, Lock { base_value, end });
        self.state.token_logs.insert(lock_id, TokenLog::new(point, end));
        self.state.ownership.mint(lock_id, *owner);
        self.state.locked_supply = locked_supply;
        self.commit_global(update);

        info!(lock_id, %owner, base_value = %base_value, end, "lock created");
        Ok(lock_id)
    }

    /// Add `delta` from `caller` to a live lock without moving its expiry.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::LockDoesNotExist`] if the lock is not live
    /// - [`EscrowError::NotAuthorised`] unless `caller` owns it
    /// - [`EscrowError::LockHasExpired`] if its expiry has been reached
    /// - [`EscrowError::InvalidIncreaseValue`] if `delta` is zero
    /// - [`EscrowError::Transfer`] if the ledger rejects the deposit
    pub fn increase_lock_value(
        &mut self,
        caller: &Address,
        lock_id: LockId,
        delta: Amount,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        let lock = self.owned_lock(caller, lock_id)?;
        if lock.is_expired(now) {
            return Err(EscrowError::LockHasExpired(lock_id));
        }
        if delta == 0 {
            return Err(EscrowError::InvalidIncreaseValue);
        }

        let (old, new) = self.topped_up_point(lock_id, &lock, delta, now)?;
        let change = LockChange { old, new, prev_end: lock.end, new_end: lock.end };
        let update = self.state.global.plan(&self.curve, &change, now)?;
        let base_value = lock.base_value.checked_add(delta).ok_or(DecayError::ArithmeticOverflow)?;
        let locked_supply = self
            .state
            .locked_supply
            .checked_add(delta)
            .ok_or(DecayError::ArithmeticOverflow)?;

        self.ledger.transfer(caller, &self.config.escrow_address, delta, &self.config.base_asset)?;

        self.commit_lock(lock_id, Lock { base_value, ..lock }, new, update);
        self.state.locked_supply = locked_supply;
        debug!(lock_id, delta = %delta, base_value = %base_value, "lock value increased");
        Ok(())
    }

    /// Move a live lock's expiry later, restarting its curve from the full
    /// base value over the new remaining duration.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::LockDoesNotExist`] if the lock is not live
    /// - [`EscrowError::NotAuthorised`] unless `caller` owns it
    /// - [`EscrowError::LockHasExpired`] if its expiry has been reached
    /// - [`EscrowError::InvalidIncreaseEndTimestamp`] unless the rounded expiry is later
    ///   than the current one and within the maximum duration from `now`
    pub fn increase_lock_end(
        &mut self,
        caller: &Address,
        lock_id: LockId,
        requested_end: Timestamp,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        let lock = self.owned_lock(caller, lock_id)?;
        if lock.is_expired(now) {
            return Err(EscrowError::LockHasExpired(lock_id));
        }
        let end = week_floor(requested_end);
        if end <= lock.end || end - now > self.config.max_lock_duration {
            return Err(EscrowError::InvalidIncreaseEndTimestamp);
        }

        let old = self.last_point(lock_id)?;
        let new =
            self.curve.fresh_point(lock.base_value, end - now, self.config.max_lock_duration, now)?;
        let change = LockChange { old, new, prev_end: lock.end, new_end: end };
        let update = self.state.global.plan(&self.curve, &change, now)?;

        self.commit_lock(lock_id, Lock { end, ..lock }, new, update);
        debug!(lock_id, from = lock.end, to = end, "lock end increased");
        Ok(())
    }

    /// Return an expired lock's base value to `caller` and retire the lock.
    ///
    /// The lock's checkpoint log stays queryable.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::LockDoesNotExist`] if the lock is not live
    /// - [`EscrowError::NotAuthorised`] unless `caller` owns it
    /// - [`EscrowError::LockYetToExpire`] unless `now` is strictly past expiry
    /// - [`EscrowError::LockIsAttached`] while pledged
    /// - [`EscrowError::Transfer`] if the ledger rejects the payout
    pub fn withdraw(
        &mut self,
        caller: &Address,
        lock_id: LockId,
        now: Timestamp,
    ) -> Result<Amount, EscrowError> {
        let lock = self.owned_lock(caller, lock_id)?;
        if !lock.is_withdrawable(now) {
            return Err(EscrowError::LockYetToExpire(lock_id));
        }
        if self.state.ownership.is_attached(lock_id) {
            return Err(EscrowError::LockIsAttached(lock_id));
        }

        self.ledger.transfer(
            &self.config.escrow_address,
            caller,
            lock.base_value,
            &self.config.base_asset,
        )?;

        self.state.locks.remove(&lock_id);
        self.state.ownership.burn(lock_id);
        self.state.locked_supply = self.state.locked_supply.saturating_sub(lock.base_value);

        info!(lock_id, owner = %caller, base_value = %lock.base_value, "lock withdrawn");
        Ok(lock.base_value)
    }

    // ------------------------------------------------------------------
    // Ownership surface
    // ------------------------------------------------------------------

    /// Pledge `owner`'s lock to `caller`.
    pub fn attach(
        &mut self,
        caller: &Address,
        owner: &Address,
        lock_id: LockId,
    ) -> Result<(), EscrowError> {
        self.state.ownership.attach(caller, owner, lock_id)
    }

    /// Release a pledge. Returns whether one was removed.
    pub fn detach(
        &mut self,
        caller: &Address,
        owner: &Address,
        lock_id: LockId,
    ) -> Result<bool, EscrowError> {
        self.state.ownership.detach(caller, owner, lock_id)
    }

    /// Move locks between owners. All transactions succeed or none do.
    pub fn transfer(
        &mut self,
        caller: &Address,
        batches: &[TransferBatch],
    ) -> Result<(), EscrowError> {
        let moves = self.state.ownership.plan_transfer(caller, batches)?;
        self.state.ownership.apply_transfer(&moves);
        Ok(())
    }

    pub fn update_operators(
        &mut self,
        caller: &Address,
        updates: &[OperatorUpdate],
    ) -> Result<(), EscrowError> {
        Ok(self.state.ownership.update_operators(caller, updates)?)
    }

    pub fn balance_of(
        &self,
        requests: &[BalanceRequest],
    ) -> Result<Vec<(BalanceRequest, Amount)>, EscrowError> {
        Ok(self.state.ownership.balance_of(requests)?)
    }

    // ------------------------------------------------------------------
    // Inflation
    // ------------------------------------------------------------------

    /// Take `value` of inflation for `epoch` from the coordinator into escrow.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::NotAuthorised`] unless `caller` is the configured inflation source
    /// - [`EscrowError::InvalidIncreaseValue`] if `value` is zero
    /// - [`EscrowError::Transfer`] if the ledger rejects the deposit
    pub fn add_inflation(
        &mut self,
        caller: &Address,
        epoch: Epoch,
        value: Amount,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        if *caller != self.config.inflation_source {
            return Err(EscrowError::NotAuthorised);
        }
        if value == 0 {
            return Err(EscrowError::InvalidIncreaseValue);
        }
        let record = self.state.inflation.plan_add(epoch, value, now)?;
        let locked_supply = self
            .state
            .locked_supply
            .checked_add(value)
            .ok_or(DecayError::ArithmeticOverflow)?;

        self.ledger.transfer(caller, &self.config.escrow_address, value, &self.config.base_asset)?;

        self.state.inflation.set(epoch, record);
        self.state.locked_supply = locked_supply;
        info!(epoch, value = %value, snapshot = record.snapshot, "inflation added");
        Ok(())
    }

    /// Credit `lock_id` with its share of inflation for each of `epochs`.
    ///
    /// The share for an epoch is the lock's fraction of total voting power at
    /// the epoch's start. Returns the total credited.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::LockDoesNotExist`] if the lock is not live
    /// - [`EscrowError::NotAuthorised`] unless `caller` owns it
    /// - [`EscrowError::InflationNotAdded`] for an epoch without inflation
    /// - [`EscrowError::AlreadyClaimedInflation`] for an epoch claimed before or listed twice
    pub fn claim_inflation(
        &mut self,
        caller: &Address,
        lock_id: LockId,
        epochs: &[Epoch],
        now: Timestamp,
    ) -> Result<Amount, EscrowError> {
        self.owned_lock(caller, lock_id)?;
        let records = self.state.inflation.claimable(lock_id, epochs)?;

        let mut share: Amount = 0;
        for record in &records {
            share = share
                .checked_add(self.inflation_share(lock_id, record)?)
                .ok_or(DecayError::ArithmeticOverflow)?;
        }

        self.credit_inflation(lock_id, share, now)?;
        self.state.inflation.mark_claimed(lock_id, epochs);
        info!(lock_id, epochs = epochs.len(), share = %share, "inflation claimed");
        Ok(share)
    }

    /// Grow a lock's base value by inflation already held in escrow.
    ///
    /// Skips ownership and expiry checks and leaves locked supply alone, since
    /// [`add_inflation`](Self::add_inflation) counted it. A live lock gets a
    /// fresh checkpoint; an expired lock only grows its base value.
    fn credit_inflation(
        &mut self,
        lock_id: LockId,
        value: Amount,
        now: Timestamp,
    ) -> Result<(), EscrowError> {
        let lock = *self.state.locks.get(&lock_id).ok_or(EscrowError::LockDoesNotExist(lock_id))?;
        if value == 0 {
            return Ok(());
        }
        let base_value = lock.base_value.checked_add(value).ok_or(DecayError::ArithmeticOverflow)?;

        if lock.is_expired(now) {
            self.state.locks.insert(lock_id, Lock { base_value, ..lock });
            debug!(lock_id, value = %value, "inflation credited to expired lock");
            return Ok(());
        }

        let (old, new) = self.topped_up_point(lock_id, &lock, value, now)?;
        let change = LockChange { old, new, prev_end: lock.end, new_end: lock.end };
        let update = self.state.global.plan(&self.curve, &change, now)?;

        self.commit_lock(lock_id, Lock { base_value, ..lock }, new, update);
        info!(lock_id, value = %value, "inflation credited");
        Ok(())
    }

    /// `value * token_power / total_power` at the record's snapshot, week-rounded.
    ///
    /// Zero when either log has no checkpoint at the snapshot or total power is zero.
    fn inflation_share(
        &self,
        lock_id: LockId,
        record: &InflationRecord,
    ) -> Result<Amount, EscrowError> {
        let token = match self.token_voting_power(lock_id, record.snapshot, Rounding::WholeWeek) {
            Err(EscrowError::TooEarlyTimestamp) => return Ok(0),
            other => other?,
        };
        let total = match self.total_voting_power(record.snapshot, Rounding::WholeWeek) {
            Err(EscrowError::TooEarlyTimestamp) => return Ok(0),
            other => other?,
        };
        if total == 0 {
            return Ok(0);
        }
        Ok(mul_div(record.value, token.min(total), total)?)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Voting power of `lock_id` at `ts`, including withdrawn locks.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::LockDoesNotExist`] if the lock was never created
    /// - [`EscrowError::TooEarlyTimestamp`] if `ts` precedes its first checkpoint
    pub fn token_voting_power(
        &self,
        lock_id: LockId,
        ts: Timestamp,
        rounding: Rounding,
    ) -> Result<Amount, EscrowError> {
        let log =
            self.state.token_logs.get(&lock_id).ok_or(EscrowError::LockDoesNotExist(lock_id))?;
        query::token_power(&self.curve, log, rounding.apply(ts))
    }

    /// Aggregate voting power at `ts`.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::TooEarlyTimestamp`] if `ts` precedes the first global checkpoint
    pub fn total_voting_power(&self, ts: Timestamp, rounding: Rounding) -> Result<Amount, EscrowError> {
        query::total_power(&self.curve, &self.state.global, rounding.apply(ts))
    }

    pub fn is_owner(&self, address: &Address, lock_id: LockId) -> bool {
        self.state.ownership.is_owner(address, lock_id)
    }

    pub fn locked_supply(&self) -> Amount {
        self.state.locked_supply
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn owned_lock(&self, caller: &Address, lock_id: LockId) -> Result<Lock, EscrowError> {
        let lock = *self.state.locks.get(&lock_id).ok_or(EscrowError::LockDoesNotExist(lock_id))?;
        if !self.state.ownership.is_owner(caller, lock_id) {
            return Err(EscrowError::NotAuthorised);
        }
        Ok(lock)
    }

    fn last_point(&self, lock_id: LockId) -> Result<Point, EscrowError> {
        self.state
            .token_logs
            .get(&lock_id)
            .and_then(TokenLog::last)
            .copied()
            .ok_or(EscrowError::LockDoesNotExist(lock_id))
    }

    /// Last checkpoint of a live lock and the checkpoint after adding `delta`
    /// over its remaining duration.
    fn topped_up_point(
        &self,
        lock_id: LockId,
        lock: &Lock,
        delta: Amount,
        now: Timestamp,
    ) -> Result<(Point, Point), EscrowError> {
        let old = self.last_point(lock_id)?;
        let remaining = lock.end - now;
        let current = self.curve.project(&old, now)?;
        let added = self.curve.bias(delta, remaining, self.config.max_lock_duration)?;
        let bias = current.checked_add(added).ok_or(DecayError::ArithmeticOverflow)?;
        let slope = self.curve.slope(bias, remaining)?;
        Ok((old, Point::new(bias, slope, now)))
    }

    fn commit_lock(&mut self, lock_id: LockId, lock: Lock, point: Point, update: GlobalUpdate) {
        self.state.locks.insert(lock_id, lock);
        self.state.token_logs.entry(lock_id).or_default().append(point, lock.end);
        debug!(lock_id, ts = point.ts, bias = %point.bias, "lock checkpoint appended");
        self.commit_global(update);
    }

    fn commit_global(&mut self, update: GlobalUpdate) {
        if update.clipped {
            warn!(ts = update.point.ts, "global aggregate clipped at zero");
        }
        self.state.global.apply(update);
    }
}

impl<L: TokenLedger> VotingPowerSource for VoteEscrow<L> {
    fn token_voting_power(
        &self,
        lock_id: LockId,
        ts: Timestamp,
        rounding: Rounding,
    ) -> Result<Amount, EscrowError> {
        VoteEscrow::token_voting_power(self, lock_id, ts, rounding)
    }

    fn total_voting_power(&self, ts: Timestamp, rounding: Rounding) -> Result<Amount, EscrowError> {
        VoteEscrow::total_voting_power(self, ts, rounding)
    }

    fn is_owner(&self, address: &Address, lock_id: LockId) -> bool {
        VoteEscrow::is_owner(self, address, lock_id)
    }

    fn locked_supply(&self) -> Amount {
        VoteEscrow::locked_supply(self)
    }
}
