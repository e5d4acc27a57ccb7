//! Fixed-point helpers.

use primitive_types::U256;
use ve_core::error::DecayError;

/// Computes `floor(a * b / d)` exactly.
///
/// The product is formed in a 256-bit intermediate, so any pair of `u128`
/// operands is accepted. Only a quotient that does not fit back into `u128`
/// is an error.
///
/// # Examples
///
/// ```
/// use ve_decay::mul_div;
/// assert_eq!(mul_div(10, 3, 4).unwrap(), 7);
/// // 10^30 * 10^18 overflows u128, the quotient does not.
/// let big = 10u128.pow(30);
/// assert_eq!(mul_div(big, 10u128.pow(18), 10u128.pow(20)).unwrap(), 10u128.pow(28));
/// ```
pub fn mul_div(a: u128, b: u128, d: u128) -> Result<u128, DecayError> {
    if d == 0 {
        return Err(DecayError::DivisionByZero);
    }
    let wide = U256::from(a) * U256::from(b) / U256::from(d);
    u128::try_from(wide).map_err(|_| DecayError::ArithmeticOverflow)
}
