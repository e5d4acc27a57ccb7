//! Historical voting-power queries over the checkpoint logs.
//!
//! A query first locates the checkpoint governing the target timestamp by
//! binary search, then projects it forward. Per-lock projection is a single
//! linear step; global projection walks the slope-change schedule so locks
//! that expired in between stop contributing.

use ve_core::error::EscrowError;
use ve_core::traits::DecayCurve;
use ve_core::types::{Amount, Point, Timestamp};
use ve_decay::walk;

use crate::checkpoint::{GlobalLog, TokenLog};

/// Index of the checkpoint governing `ts`.
///
/// This is the latest checkpoint stamped at or before `ts`. When several
/// checkpoints share a timestamp the last of them is in force, so a query
/// sees the state after every mutation made at that instant. `None` when
/// `ts` precedes the first checkpoint or the log is empty.
pub fn locate(points: &[Point], ts: Timestamp) -> Option<usize> {
    let first = points.first()?;
    if ts < first.ts {
        return None;
    }
    let last = points.len() - 1;
    if ts >= points[last].ts {
        return Some(last);
    }
    Some(points.partition_point(|p| p.ts <= ts) - 1)
}

/// Voting power recorded in `log` at `ts`.
///
/// # Errors
///
/// - [`EscrowError::TooEarlyTimestamp`] if `ts` precedes the lock's first checkpoint
pub fn token_power<C>(curve: &C, log: &TokenLog, ts: Timestamp) -> Result<Amount, EscrowError>
where
    C: DecayCurve + ?Sized,
{
    let index = locate(log.points(), ts).ok_or(EscrowError::TooEarlyTimestamp)?;
    if ts >= log.end() {
        return Ok(0);
    }
    Ok(curve.project(&log.points()[index], ts)?)
}

/// Aggregate voting power recorded in `log` at `ts`.
///
/// An empty log reports zero.
///
/// # Errors
///
/// - [`EscrowError::TooEarlyTimestamp`] if `ts` precedes the first global checkpoint
pub fn total_power<C>(curve: &C, log: &GlobalLog, ts: Timestamp) -> Result<Amount, EscrowError>
where
    C: DecayCurve + ?Sized,
{
    if log.is_empty() {
        return Ok(0);
    }
    let index = locate(log.points(), ts).ok_or(EscrowError::TooEarlyTimestamp)?;
    let projection = walk(curve, &log.points()[index], ts, |b| log.slope_change_at(b))?;
    Ok(projection.point.bias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::LockChange;
    use ve_core::constants::WEEK;
    use ve_decay::LinearDecay;

    fn pts(stamps: &[Timestamp]) -> Vec<Point> {
        stamps.iter().enumerate().map(|(i, &ts)| Point::new(i as Amount, 0, ts)).collect()
    }

    // ------------------------------------------------------------------
    // locate
    // ------------------------------------------------------------------

    #[test]
    fn locate_empty_is_none() {
        assert_eq!(locate(&[], 5), None);
    }

    #[test]
    fn locate_before_first_is_none() {
        assert_eq!(locate(&pts(&[10, 20]), 9), None);
    }

    #[test]
    fn locate_at_or_after_last_is_last() {
        let p = pts(&[10, 20, 30]);
        assert_eq!(locate(&p, 30), Some(2));
        assert_eq!(locate(&p, 1_000), Some(2));
    }

    #[test]
    fn locate_between_is_preceding() {
        let p = pts(&[10, 20, 30]);
        assert_eq!(locate(&p, 10), Some(0));
        assert_eq!(locate(&p, 15), Some(0));
        assert_eq!(locate(&p, 20), Some(1));
        assert_eq!(locate(&p, 29), Some(1));
    }

    #[test]
    fn locate_ties_resolve_to_latest() {
        let p = pts(&[10, 20, 20, 20, 30]);
        assert_eq!(locate(&p, 20), Some(3));
        assert_eq!(locate(&p, 25), Some(3));
    }

    #[test]
    fn locate_ties_on_last_use_last() {
        let p = pts(&[10, 20, 20]);
        assert_eq!(locate(&p, 20), Some(2));
    }

    // ------------------------------------------------------------------
    // token_power
    // ------------------------------------------------------------------

    #[test]
    fn token_power_decays_then_stops_at_end() {
        let p = LinearDecay.fresh_point(1_000, 2 * WEEK, 2 * WEEK, 0).unwrap();
        let log = TokenLog::new(p, 2 * WEEK);
        assert_eq!(token_power(&LinearDecay, &log, 0).unwrap(), 1_000);
        let half = token_power(&LinearDecay, &log, WEEK).unwrap();
        assert!((500..=501).contains(&half));
        assert_eq!(token_power(&LinearDecay, &log, 2 * WEEK).unwrap(), 0);
        assert_eq!(token_power(&LinearDecay, &log, 10 * WEEK).unwrap(), 0);
    }

    #[test]
    fn token_power_before_creation_is_too_early() {
        let p = LinearDecay.fresh_point(1_000, WEEK, WEEK, 50).unwrap();
        let log = TokenLog::new(p, WEEK + 50);
        assert_eq!(token_power(&LinearDecay, &log, 49), Err(EscrowError::TooEarlyTimestamp));
    }

    #[test]
    fn token_power_uses_checkpoint_in_force() {
        let first = LinearDecay.fresh_point(1_000, 4 * WEEK, 4 * WEEK, 0).unwrap();
        let mut log = TokenLog::new(first, 4 * WEEK);
        let second = LinearDecay.fresh_point(4_000, 3 * WEEK, 4 * WEEK, WEEK).unwrap();
        log.append(second, 4 * WEEK);

        let before = token_power(&LinearDecay, &log, WEEK - 1).unwrap();
        assert_eq!(before, LinearDecay.project(&first, WEEK - 1).unwrap());
        assert_eq!(token_power(&LinearDecay, &log, WEEK).unwrap(), 3_000);
    }

    // ------------------------------------------------------------------
    // total_power
    // ------------------------------------------------------------------

    #[test]
    fn total_power_of_empty_log_is_zero() {
        assert_eq!(total_power(&LinearDecay, &GlobalLog::default(), 42).unwrap(), 0);
    }

    #[test]
    fn total_power_drops_expired_lock_between_checkpoints() {
        let mut log = GlobalLog::default();
        let a = LinearDecay.fresh_point(400, WEEK, 4 * WEEK, 0).unwrap();
        let b = LinearDecay.fresh_point(400, 4 * WEEK, 4 * WEEK, 0).unwrap();
        for (new, end) in [(a, WEEK), (b, 4 * WEEK)] {
            let change = LockChange { old: Point::ZERO, new, prev_end: 0, new_end: end };
            let update = log.plan(&LinearDecay, &change, 0).unwrap();
            log.apply(update);
        }

        let at = 2 * WEEK;
        let total = total_power(&LinearDecay, &log, at).unwrap();
        let b_alone = LinearDecay.project(&b, at).unwrap();
        assert!(total.abs_diff(b_alone) <= 2, "{total} vs {b_alone}");
        assert!(total_power(&LinearDecay, &log, 4 * WEEK).unwrap() <= 2);
    }
}
