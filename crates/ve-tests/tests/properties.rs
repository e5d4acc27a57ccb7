//! Property tests over randomized operation sequences.
//!
//! Each case replays a random mix of creates, top-ups, extensions,
//! withdrawals, lock transfers, inflation deposits and claims, and clock
//! advances against a fresh escrow. Operations that fail are expected; the
//! properties must hold regardless.
//!
//! Properties checked:
//! - Aggregate power equals the sum of per-lock power within rounding
//! - Historical queries are stable under later mutations
//! - Failed operations change nothing
//! - Escrowed tokens, locked supply, live base values and unclaimed inflation agree
//! - Per-lock power never rises between checkpoints

use proptest::prelude::*;

use ve_core::constants::{TOKEN, WEEK};
use ve_core::error::EscrowError;
use ve_core::types::{Address, Amount, Epoch, LockId, Rounding, Timestamp};
use ve_escrow::{TransferBatch, TransferTx};
use ve_tests::helpers::*;

// ---------------------------------------------------------------------------
// Operation model
// ---------------------------------------------------------------------------

const PEOPLE: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Debug, Clone)]
enum Op {
    Create { who: usize, value: Amount, weeks: u64 },
    IncreaseValue { pick: usize, delta: Amount },
    IncreaseEnd { pick: usize, weeks: u64 },
    Withdraw { pick: usize },
    Transfer { pick: usize, to: usize },
    AddInflation { epoch: Epoch, value: Amount },
    ClaimInflation { pick: usize, epochs: Vec<Epoch> },
    Wait(Timestamp),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..PEOPLE.len(), 1..=1_000_000 * TOKEN, 1u64..=210)
            .prop_map(|(who, value, weeks)| Op::Create { who, value, weeks }),
        2 => (any::<usize>(), 1..=10_000 * TOKEN)
            .prop_map(|(pick, delta)| Op::IncreaseValue { pick, delta }),
        2 => (any::<usize>(), 1u64..=210).prop_map(|(pick, weeks)| Op::IncreaseEnd { pick, weeks }),
        1 => any::<usize>().prop_map(|pick| Op::Withdraw { pick }),
        1 => (any::<usize>(), 0..PEOPLE.len()).prop_map(|(pick, to)| Op::Transfer { pick, to }),
        2 => (0u64..4, 1..=10_000 * TOKEN).prop_map(|(epoch, value)| Op::AddInflation { epoch, value }),
        2 => (any::<usize>(), prop::collection::vec(0u64..4, 1..3))
            .prop_map(|(pick, epochs)| Op::ClaimInflation { pick, epochs }),
        3 => (0..=3 * WEEK).prop_map(Op::Wait),
    ]
}

/// A live lock chosen by `pick`, with its owner.
fn pick_lock(e: &TestEscrow, pick: usize) -> Option<(LockId, Address)> {
    let live: Vec<LockId> = e.state().locks.keys().copied().collect();
    if live.is_empty() {
        return None;
    }
    let id = live[pick % live.len()];
    Some((id, e.owner_of(id)?))
}

/// Apply one operation. Returns the inflation credited by a claim, zero otherwise.
fn apply(e: &mut TestEscrow, op: &Op, now: &mut Timestamp) -> Result<Amount, EscrowError> {
    let t = *now;
    match op {
        Op::Create { who, value, weeks } => {
            let owner = addr(PEOPLE[*who]);
            e.create_lock(&owner, &owner, *value, t + weeks * WEEK, t).map(|_| 0)
        }
        Op::IncreaseValue { pick, delta } => match pick_lock(e, *pick) {
            Some((id, owner)) => e.increase_lock_value(&owner, id, *delta, t).map(|_| 0),
            None => Ok(0),
        },
        Op::IncreaseEnd { pick, weeks } => match pick_lock(e, *pick) {
            Some((id, owner)) => e.increase_lock_end(&owner, id, t + weeks * WEEK, t).map(|_| 0),
            None => Ok(0),
        },
        Op::Withdraw { pick } => match pick_lock(e, *pick) {
            Some((id, owner)) => e.withdraw(&owner, id, t).map(|_| 0),
            None => Ok(0),
        },
        Op::Transfer { pick, to } => match pick_lock(e, *pick) {
            Some((id, owner)) => {
                let batch = TransferBatch {
                    from: owner,
                    txs: vec![TransferTx { to: addr(PEOPLE[*to]), lock_id: id, amount: 1 }],
                };
                e.transfer(&owner, &[batch]).map(|_| 0)
            }
            None => Ok(0),
        },
        Op::AddInflation { epoch, value } => {
            let source = e.config().inflation_source;
            e.add_inflation(&source, *epoch, *value, t).map(|_| 0)
        }
        Op::ClaimInflation { pick, epochs } => match pick_lock(e, *pick) {
            Some((id, owner)) => e.claim_inflation(&owner, id, epochs, t),
            None => Ok(0),
        },
        Op::Wait(dt) => {
            *now += dt;
            Ok(0)
        }
    }
}

/// Replay `ops` on a fresh escrow. Returns the escrow, the final clock and
/// the total inflation credited to locks.
fn run(ops: &[Op]) -> (TestEscrow, Timestamp, Amount) {
    let mut e = escrow(&PEOPLE);
    let mut now = 0;
    let mut credited = 0;
    for op in ops {
        if let Ok(share) = apply(&mut e, op, &mut now) {
            credited += share;
        }
    }
    (e, now, credited)
}

/// Balances of every participant, the inflation source and the escrow.
fn balances(e: &TestEscrow) -> Vec<Amount> {
    PEOPLE
        .iter()
        .map(|p| addr(p))
        .chain([e.config().inflation_source, e.config().escrow_address])
        .map(|who| balance(e, &who))
        .collect()
}

/// Rounding slack at `ts`. Each re-anchoring of the aggregate may carry one
/// floored unit per lock and per week stride walked up to `ts`.
fn tolerance(ops: usize, ts: Timestamp) -> Amount {
    let ops = ops as Amount + 1;
    ops * (ops + (ts / WEEK) as Amount + 2)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn global_equals_sum_of_lives(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (e, now, _) = run(&ops);

        let mut samples: Vec<Timestamp> = e.global_checkpoints().iter().map(|p| p.ts).collect();
        samples.extend((0..=8).map(|i| now * i / 8));
        samples.extend([now + WEEK, now + 52 * WEEK, now + 300 * WEEK]);
        for ts in samples {
            let tol = tolerance(ops.len(), ts);
            let total = total_at(&e, ts);
            let sum = sum_of_lives(&e, ts);
            prop_assert!(
                total.abs_diff(sum) <= tol,
                "at {}: total {} vs sum {} (tol {})", ts, total, sum, tol
            );
        }
    }

    #[test]
    fn past_queries_are_stable(
        first in prop::collection::vec(op_strategy(), 1..20),
        second in prop::collection::vec(op_strategy(), 1..20),
    ) {
        let mut e = escrow(&PEOPLE);
        let mut now = 0;
        for op in &first {
            let _ = apply(&mut e, op, &mut now);
        }
        let cutoff = now;
        let points: Vec<Timestamp> = (0..8).map(|i| cutoff * i / 8).filter(|&t| t < cutoff).collect();
        let ids = all_lock_ids(&e);
        let recorded: Vec<(Timestamp, Amount, Vec<Option<Amount>>)> = points
            .iter()
            .map(|&t| {
                let per_lock = ids
                    .iter()
                    .map(|&id| e.token_voting_power(id, t, Rounding::Current).ok())
                    .collect();
                (t, total_at(&e, t), per_lock)
            })
            .collect();

        // Later mutations all happen at or after the cutoff.
        now += 1;
        for op in &second {
            let _ = apply(&mut e, op, &mut now);
        }

        for (t, total, per_lock) in recorded {
            prop_assert_eq!(total_at(&e, t), total, "total at {} moved", t);
            for (&id, before) in ids.iter().zip(per_lock) {
                prop_assert_eq!(e.token_voting_power(id, t, Rounding::Current).ok(), before);
            }
        }
    }

    #[test]
    fn failed_operations_change_nothing(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut e = escrow(&PEOPLE);
        let mut now = 0;
        for op in &ops {
            let state = e.state().clone();
            let before = balances(&e);
            if apply(&mut e, op, &mut now).is_err() {
                prop_assert_eq!(e.state(), &state);
                prop_assert_eq!(balances(&e), before);
            }
        }
    }

    #[test]
    fn escrow_balance_matches_locked_supply(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (e, _, credited) = run(&ops);
        let live: Amount = e.state().locks.values().map(|l| l.base_value).sum();
        let added: Amount = e.state().inflation.epochs().map(|(_, r)| r.value).sum();
        prop_assert_eq!(e.locked_supply(), live + added - credited);
        prop_assert_eq!(balance(&e, &e.config().escrow_address), e.locked_supply());
        prop_assert_eq!(e.state().ownership.len(), e.state().locks.len());

        let held: Amount = balances(&e).iter().sum();
        prop_assert_eq!(held, FUNDS * (PEOPLE.len() as Amount + 1));
    }

    #[test]
    fn token_power_never_rises_after_last_checkpoint(
        ops in prop::collection::vec(op_strategy(), 1..30),
        a in 0u64..=300 * WEEK,
        b in 0u64..=300 * WEEK,
    ) {
        let (e, _, _) = run(&ops);
        for id in all_lock_ids(&e) {
            let last = e.token_checkpoints(id).and_then(|p| p.last()).map(|p| p.ts).unwrap_or(0);
            let (lo, hi) = if a <= b { (last + a, last + b) } else { (last + b, last + a) };
            let p_lo = e.token_voting_power(id, lo, Rounding::Current).unwrap();
            let p_hi = e.token_voting_power(id, hi, Rounding::Current).unwrap();
            prop_assert!(p_hi <= p_lo, "lock {} rose from {} to {}", id, p_lo, p_hi);
        }
    }
}
