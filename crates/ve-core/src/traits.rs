//! Trait interfaces for the vote-escrow ledger.
//!
//! These traits define the contracts between crates and collaborators:
//! - [`TokenLedger`]: fungible balance debit/credit (external token contracts)
//! - [`DecayCurve`]: bias/slope math (ve-decay implements)
//! - [`VotingPowerSource`]: read-only voting power view (ve-escrow implements,
//!   gauges and the emission coordinator consume)

use crate::error::{DecayError, EscrowError, TransferError};
use crate::types::{Address, Amount, AssetRef, LockId, Point, Rounding, Timestamp};

/// Debit/credit primitive for the token that is locked in escrow.
///
/// A failed transfer aborts the whole escrow operation that issued it; the
/// escrow never commits state before the transfer has succeeded.
pub trait TokenLedger: Send + Sync {
    /// Move `amount` of `asset` from `from` to `to`.
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        asset: &AssetRef,
    ) -> Result<(), TransferError>;

    /// Current balance of `owner` in `asset`.
    fn balance(&self, owner: &Address, asset: &AssetRef) -> Amount;
}

/// Pure computation of lock magnitudes and their linear decay.
///
/// All math is integer-only with `SLOPE_MULTIPLIER` fixed-point slopes.
/// Implemented by the linear decay engine (ve-decay).
pub trait DecayCurve: Send + Sync {
    /// Magnitude of `base_value` locked for `remaining` out of `max_duration` seconds.
    fn bias(
        &self,
        base_value: Amount,
        remaining: Timestamp,
        max_duration: Timestamp,
    ) -> Result<Amount, DecayError>;

    /// Fixed-point decay rate that takes `bias` to zero over `remaining` seconds.
    fn slope(&self, bias: Amount, remaining: Timestamp) -> Result<Amount, DecayError>;

    /// Magnitude lost by a curve of `slope` over `elapsed` seconds.
    fn decay(&self, slope: Amount, elapsed: Timestamp) -> Result<Amount, DecayError>;

    /// Magnitude of `point` projected forward to `ts`, floored at zero.
    ///
    /// Default implementation: `bias - decay(slope, ts - point.ts)`. A `ts`
    /// before the point returns the point's own bias.
    fn project(&self, point: &Point, ts: Timestamp) -> Result<Amount, DecayError> {
        let lost = self.decay(point.slope, ts.saturating_sub(point.ts))?;
        Ok(point.bias.saturating_sub(lost))
    }

    /// Fresh checkpoint for `base_value` locked from `now` for `remaining` seconds.
    ///
    /// Default implementation composes [`bias`](Self::bias) and [`slope`](Self::slope).
    fn fresh_point(
        &self,
        base_value: Amount,
        remaining: Timestamp,
        max_duration: Timestamp,
        now: Timestamp,
    ) -> Result<Point, DecayError> {
        let bias = self.bias(base_value, remaining, max_duration)?;
        let slope = self.slope(bias, remaining)?;
        Ok(Point::new(bias, slope, now))
    }
}

/// Read-only voting power view consumed by gauges, the emission coordinator
/// and reward distributors.
pub trait VotingPowerSource {
    /// Voting power of a single lock at `ts`.
    fn token_voting_power(
        &self,
        lock_id: LockId,
        ts: Timestamp,
        rounding: Rounding,
    ) -> Result<Amount, EscrowError>;

    /// Aggregate voting power of all locks at `ts`.
    fn total_voting_power(&self, ts: Timestamp, rounding: Rounding) -> Result<Amount, EscrowError>;

    /// Whether `address` currently owns `lock_id`.
    fn is_owner(&self, address: &Address, lock_id: LockId) -> bool;

    /// Sum of base values across live locks plus credited inflation.
    fn locked_supply(&self) -> Amount;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SLOPE_MULTIPLIER;
    use std::collections::HashMap;

    // ------------------------------------------------------------------
    // Mock: TokenLedger
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockLedger {
        balances: HashMap<Address, Amount>,
    }

    impl TokenLedger for MockLedger {
        fn transfer(
            &mut self,
            from: &Address,
            to: &Address,
            amount: Amount,
            asset: &AssetRef,
        ) -> Result<(), TransferError> {
            let have = self.balance(from, asset);
            if have < amount {
                return Err(TransferError::InsufficientBalance { have, need: amount });
            }
            self.balances.insert(*from, have - amount);
            *self.balances.entry(*to).or_default() += amount;
            Ok(())
        }

        fn balance(&self, owner: &Address, _asset: &AssetRef) -> Amount {
            self.balances.get(owner).copied().unwrap_or(0)
        }
    }

    #[test]
    fn mock_ledger_rejects_overdraft() {
        let mut ledger = MockLedger::default();
        let a = Address([1; 32]);
        let b = Address([2; 32]);
        ledger.balances.insert(a, 5);
        let err = ledger.transfer(&a, &b, 6, &AssetRef::default()).unwrap_err();
        assert_eq!(err, TransferError::InsufficientBalance { have: 5, need: 6 });
        ledger.transfer(&a, &b, 5, &AssetRef::default()).unwrap();
        assert_eq!(ledger.balance(&b, &AssetRef::default()), 5);
    }

    #[test]
    fn ledger_is_object_safe() {
        let ledger = MockLedger::default();
        let dyn_ledger: &dyn TokenLedger = &ledger;
        assert_eq!(dyn_ledger.balance(&Address::ZERO, &AssetRef::default()), 0);
    }

    // ------------------------------------------------------------------
    // Mock: DecayCurve (plain u128 math, no overflow handling)
    // ------------------------------------------------------------------

    struct NaiveCurve;

    impl DecayCurve for NaiveCurve {
        fn bias(&self, base: Amount, remaining: Timestamp, max: Timestamp) -> Result<Amount, DecayError> {
            Ok(base * remaining as u128 / max as u128)
        }

        fn slope(&self, bias: Amount, remaining: Timestamp) -> Result<Amount, DecayError> {
            if remaining == 0 {
                return Err(DecayError::ZeroDuration);
            }
            Ok(bias * SLOPE_MULTIPLIER / remaining as u128)
        }

        fn decay(&self, slope: Amount, elapsed: Timestamp) -> Result<Amount, DecayError> {
            Ok(slope * elapsed as u128 / SLOPE_MULTIPLIER)
        }
    }

    #[test]
    fn default_project_floors_at_zero() {
        let c = NaiveCurve;
        let p = c.fresh_point(100, 100, 100, 0).unwrap();
        assert_eq!(p, Point::new(100, SLOPE_MULTIPLIER, 0));
        assert_eq!(c.project(&p, 40).unwrap(), 60);
        assert_eq!(c.project(&p, 100).unwrap(), 0);
        assert_eq!(c.project(&p, 1_000).unwrap(), 0);
    }

    #[test]
    fn default_project_before_point_is_bias() {
        let c = NaiveCurve;
        let p = Point::new(50, SLOPE_MULTIPLIER, 10);
        assert_eq!(c.project(&p, 5).unwrap(), 50);
    }

    #[test]
    fn fresh_point_propagates_zero_duration() {
        let c = NaiveCurve;
        assert_eq!(c.fresh_point(1, 0, 10, 0), Err(DecayError::ZeroDuration));
    }
}
