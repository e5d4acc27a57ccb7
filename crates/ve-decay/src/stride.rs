//! Week-stride projection of an aggregate decay curve.
//!
//! The aggregate of many linear curves is piecewise linear, with kinks only
//! where some lock expires. Expiries are whole weeks, so walking forward one
//! week at a time and subtracting the slope scheduled to end at each boundary
//! reproduces the aggregate exactly (up to per-stride flooring) in
//! O(weeks elapsed), independent of the number of locks.
//!
//! Both the checkpoint writer and the historical query reader use [`walk`], so
//! a value recorded at `t` and a value re-derived for `t` later agree.

use ve_core::constants::WEEK;
use ve_core::error::DecayError;
use ve_core::traits::DecayCurve;
use ve_core::types::{week_floor, Amount, Point, Timestamp};

/// Outcome of a [`walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    /// The point re-anchored at the walk's target timestamp.
    pub point: Point,
    /// Number of week boundaries crossed.
    pub strides: u64,
    /// Whether a saturating floor discarded a non-zero remainder on the way.
    pub clipped: bool,
}

/// Project `start` forward to `target`, applying scheduled slope reductions.
///
/// At every week boundary `b` with `start.ts < b <= target`, the bias first
/// decays by `slope * (b - cursor)`, then the slope drops by
/// `slope_change_at(b)`. The remainder `target - cursor` decays at the final
/// slope. Bias and slope saturate at zero.
///
/// A curve with non-zero bias always has non-zero slope, so once the slope
/// reaches zero at a boundary nothing is live and the leftover bias is
/// flooring residue. It is dropped.
///
/// A boundary equal to `target` is applied, so a point recorded exactly on an
/// expiry already excludes the expired slope. If `target <= start.ts` the
/// start point is returned unchanged.
pub fn walk<C, F>(
    curve: &C,
    start: &Point,
    target: Timestamp,
    mut slope_change_at: F,
) -> Result<Projection, DecayError>
where
    C: DecayCurve + ?Sized,
    F: FnMut(Timestamp) -> Amount,
{
    if target <= start.ts {
        return Ok(Projection { point: *start, strides: 0, clipped: false });
    }

    let mut bias = start.bias;
    let mut slope = start.slope;
    let mut cursor = start.ts;
    let mut strides = 0u64;
    let mut clipped = false;

    let mut boundary = week_floor(cursor) + WEEK;
    while boundary <= target {
        let lost = curve.decay(slope, boundary - cursor)?;
        clipped |= lost > bias.saturating_add(1);
        bias = bias.saturating_sub(lost);

        let drop = slope_change_at(boundary);
        clipped |= drop > slope;
        slope = slope.saturating_sub(drop);
        if slope == 0 {
            bias = 0;
        }

        cursor = boundary;
        boundary += WEEK;
        strides += 1;
    }

    let lost = curve.decay(slope, target - cursor)?;
    bias = bias.saturating_sub(lost);

    Ok(Projection {
        point: Point::new(bias, slope, target),
        strides,
        clipped,
    })
}
