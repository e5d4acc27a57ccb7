//! Per-lock and global checkpoint logs.
//!
//! Both logs are append-only sequences of [`Point`]s with non-decreasing
//! timestamps. The global log additionally owns the slope-change schedule:
//! a sparse map from expiry timestamp to the aggregate slope that stops
//! decaying there.
//!
//! Recording is split into [`GlobalLog::plan`], which computes the next
//! global point and the schedule edits without touching the log, and
//! [`GlobalLog::apply`], which commits them. Escrow operations plan first,
//! settle external transfers, and only then apply, so a rejected transfer
//! leaves the log untouched.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ve_core::error::{DecayError, EscrowError};
use ve_core::traits::DecayCurve;
use ve_core::types::{Amount, Point, Timestamp};
use ve_decay::walk;

/// Checkpoint history of a single lock.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLog {
    points: Vec<Point>,
    /// Latest expiry of the lock. Power is zero from here on.
    end: Timestamp,
}

impl TokenLog {
    /// Start a log with the lock's first checkpoint.
    pub fn new(first: Point, end: Timestamp) -> Self {
        Self { points: vec![first], end }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(crate) fn append(&mut self, point: Point, end: Timestamp) {
        self.points.push(point);
        self.end = end;
    }
}

/// One lock's contribution before and after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockChange {
    /// Last stored checkpoint of the lock, or [`Point::ZERO`] on creation.
    pub old: Point,
    /// Checkpoint being appended for the lock.
    pub new: Point,
    /// Expiry before the mutation, `0` on creation.
    pub prev_end: Timestamp,
    /// Expiry after the mutation.
    pub new_end: Timestamp,
}

/// A computed but uncommitted global checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalUpdate {
    /// Aggregate point to append.
    pub point: Point,
    /// Slope-change buckets to overwrite, with their new totals.
    pub buckets: Vec<(Timestamp, Amount)>,
    /// Whether a saturating subtraction discarded a non-zero remainder.
    pub clipped: bool,
}

/// Aggregate checkpoint history of all locks plus the slope-change schedule.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalLog {
    points: Vec<Point>,
    slope_changes: BTreeMap<Timestamp, Amount>,
}

impl GlobalLog {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Aggregate slope scheduled to stop at `ts`. Zero when nothing expires there.
    pub fn slope_change_at(&self, ts: Timestamp) -> Amount {
        self.slope_changes.get(&ts).copied().unwrap_or(0)
    }

    pub fn slope_changes(&self) -> &BTreeMap<Timestamp, Amount> {
        &self.slope_changes
    }

    /// Compute the global checkpoint that records `change` at `now`.
    ///
    /// The latest global point is walked forward to `now` through the
    /// schedule. The lock's old contribution, projected to `now` with the
    /// same week-stride walk, is removed together with its raw slope, and the
    /// new contribution is added. The old expiry bucket loses the old slope
    /// and the new expiry bucket gains the new slope; when both expiries
    /// coincide the bucket is adjusted in place.
    ///
    /// With an empty log the walk starts from a zero point at `now`, which
    /// seeds the log with exactly the new contribution.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::NonMonotonicTimestamp`] if `now` precedes the latest global point
    /// - [`EscrowError::Decay`] on arithmetic overflow
    pub fn plan<C>(
        &self,
        curve: &C,
        change: &LockChange,
        now: Timestamp,
    ) -> Result<GlobalUpdate, EscrowError>
    where
        C: DecayCurve + ?Sized,
    {
        let mut clipped = false;

        let current = match self.points.last() {
            None => Point::new(0, 0, now),
            Some(last) if now < last.ts => {
                return Err(EscrowError::NonMonotonicTimestamp { last: last.ts, now });
            }
            Some(last) => {
                let projection = walk(curve, last, now, |b| self.slope_change_at(b))?;
                clipped |= projection.clipped;
                projection.point
            }
        };
        let mut bias = current.bias;
        let mut slope = current.slope;

        let old = change.old;
        if old.bias != 0 || old.slope != 0 {
            let old_bias = walk(curve, &old, now, |_| 0)?.point.bias;
            clipped |= old_bias > bias || old.slope > slope;
            bias = bias.saturating_sub(old_bias);
            slope = slope.saturating_sub(old.slope);
            if slope == 0 {
                bias = 0;
            }
        }

        let mut buckets = BTreeMap::new();
        if change.prev_end != 0 {
            let scheduled = self.slope_change_at(change.prev_end);
            clipped |= old.slope > scheduled;
            buckets.insert(change.prev_end, scheduled.saturating_sub(old.slope));
        }
        let scheduled = buckets
            .get(&change.new_end)
            .copied()
            .unwrap_or_else(|| self.slope_change_at(change.new_end));
        let scheduled = scheduled
            .checked_add(change.new.slope)
            .ok_or(DecayError::ArithmeticOverflow)?;
        buckets.insert(change.new_end, scheduled);

        let bias = bias.checked_add(change.new.bias).ok_or(DecayError::ArithmeticOverflow)?;
        let slope = slope.checked_add(change.new.slope).ok_or(DecayError::ArithmeticOverflow)?;

        Ok(GlobalUpdate {
            point: Point::new(bias, slope, now),
            buckets: buckets.into_iter().collect(),
            clipped,
        })
    }

    /// Commit a planned update: overwrite its buckets and append its point.
    pub fn apply(&mut self, update: GlobalUpdate) {
        for (ts, total) in update.buckets {
            if total == 0 {
                self.slope_changes.remove(&ts);
            } else {
                self.slope_changes.insert(ts, total);
            }
            debug!(ts, slope = %total, "slope-change bucket updated");
        }
        debug!(
            index = self.points.len(),
            ts = update.point.ts,
            bias = %update.point.bias,
            slope = %update.point.slope,
            "global checkpoint appended"
        );
        self.points.push(update.point);
    }
}
