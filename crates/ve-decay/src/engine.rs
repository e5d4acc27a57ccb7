//! Linear decay engine implementing the [`DecayCurve`] trait.
//!
//! A lock's magnitude starts at `base_value * remaining / max_duration` and
//! falls in a straight line to zero at its expiry. This is the only place
//! magnitudes and decay rates are derived from a duration.

use ve_core::constants::SLOPE_MULTIPLIER;
use ve_core::error::DecayError;
use ve_core::traits::DecayCurve;
use ve_core::types::{Amount, Timestamp};

use crate::fixed::mul_div;

/// The production decay calculator: linear decay with fixed-point slopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDecay;

impl LinearDecay {
    /// Create a new LinearDecay.
    pub fn new() -> Self {
        Self
    }
}

impl DecayCurve for LinearDecay {
    fn bias(
        &self,
        base_value: Amount,
        remaining: Timestamp,
        max_duration: Timestamp,
    ) -> Result<Amount, DecayError> {
        if max_duration == 0 {
            return Err(DecayError::ZeroDuration);
        }
        mul_div(base_value, remaining as u128, max_duration as u128)
    }

    fn slope(&self, bias: Amount, remaining: Timestamp) -> Result<Amount, DecayError> {
        if remaining == 0 {
            return Err(DecayError::ZeroDuration);
        }
        mul_div(bias, SLOPE_MULTIPLIER, remaining as u128)
    }

    fn decay(&self, slope: Amount, elapsed: Timestamp) -> Result<Amount, DecayError> {
        mul_div(slope, elapsed as u128, SLOPE_MULTIPLIER)
    }
}
