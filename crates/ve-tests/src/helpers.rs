//! Shared helpers for scenario and property tests.

use ve_core::constants::MAX_LOCK_DURATION;
use ve_core::traits::TokenLedger;
use ve_core::types::{Address, Amount, LockId, Rounding, Timestamp};
use ve_escrow::{EscrowConfig, MemoryTokenLedger, VoteEscrow};

/// Starting balance of every funded participant.
pub const FUNDS: Amount = 1_000_000_000_000_000_000_000_000;

pub type TestEscrow = VoteEscrow<MemoryTokenLedger>;

/// Deterministic participant address.
pub fn addr(label: &str) -> Address {
    Address::from_label(label)
}

/// Escrow with the given maximum lock duration, funding each of `funded`
/// and the default inflation source with [`FUNDS`].
pub fn escrow_with_max(max_lock_duration: Timestamp, funded: &[&str]) -> TestEscrow {
    let config = EscrowConfig::default().with_max_lock_duration(max_lock_duration);
    let mut ledger = MemoryTokenLedger::new();
    for label in funded {
        ledger.mint(&addr(label), &config.base_asset, FUNDS).expect("fresh balance");
    }
    ledger.mint(&config.inflation_source, &config.base_asset, FUNDS).expect("fresh balance");
    VoteEscrow::new(config, ledger).expect("valid test config")
}

/// Escrow with the default four-year maximum.
pub fn escrow(funded: &[&str]) -> TestEscrow {
    escrow_with_max(MAX_LOCK_DURATION, funded)
}

/// Token balance of `who` in the escrow's base asset.
pub fn balance(escrow: &TestEscrow, who: &Address) -> Amount {
    escrow.ledger().balance(who, &escrow.config().base_asset)
}

/// Every lock id ever created, live or withdrawn.
pub fn all_lock_ids(escrow: &TestEscrow) -> Vec<LockId> {
    (1..escrow.next_lock_id()).collect()
}

/// Sum of per-lock voting power at `ts`. Locks created after `ts` count zero.
pub fn sum_of_lives(escrow: &TestEscrow, ts: Timestamp) -> Amount {
    all_lock_ids(escrow)
        .into_iter()
        .map(|id| escrow.token_voting_power(id, ts, Rounding::Current).unwrap_or(0))
        .sum()
}

/// Total voting power at `ts`, treating a query before any checkpoint as zero.
pub fn total_at(escrow: &TestEscrow, ts: Timestamp) -> Amount {
    escrow.total_voting_power(ts, Rounding::Current).unwrap_or(0)
}
