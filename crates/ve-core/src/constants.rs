//! Protocol constants. All durations are in seconds.

/// One day.
pub const DAY: u64 = 86_400;

/// One week. Lock expiries and epoch boundaries are multiples of this.
///
/// # Examples
///
/// ```
/// use ve_core::constants::{DAY, WEEK};
/// assert_eq!(WEEK, 7 * DAY);
/// assert_eq!(WEEK, 604_800);
/// ```
pub const WEEK: u64 = 7 * DAY;

/// One protocol year (52 whole weeks, not a calendar year).
pub const YEAR: u64 = 52 * WEEK;

/// Longest lockable period. A lock of exactly this length carries a bias
/// equal to its base value.
pub const MAX_LOCK_DURATION: u64 = 4 * YEAR;

/// Shortest lockable period after week rounding.
pub const MIN_LOCK_DURATION: u64 = WEEK;

/// Fixed-point scale applied to slopes so that per-second decay of small
/// biases does not truncate to zero.
pub const SLOPE_MULTIPLIER: u128 = 1_000_000_000_000_000_000;

/// One whole token in base units.
pub const TOKEN: u128 = 1_000_000_000_000_000_000;

/// Snapshot file format version. Bumped whenever the persisted state changes shape.
pub const SNAPSHOT_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_lock_is_whole_weeks() {
        assert_eq!(MAX_LOCK_DURATION % WEEK, 0);
        assert_eq!(MAX_LOCK_DURATION / WEEK, 208);
    }

    #[test]
    fn min_lock_not_above_max() {
        assert!(MIN_LOCK_DURATION <= MAX_LOCK_DURATION);
    }

    #[test]
    fn slope_of_a_whole_token_over_max_lock_is_nonzero() {
        let slope = TOKEN * SLOPE_MULTIPLIER / MAX_LOCK_DURATION as u128;
        assert!(slope > 0);
    }
}
