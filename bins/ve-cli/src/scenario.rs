//! JSON scenario files replayed by `ve-cli replay`.
//!
//! A scenario funds participants on an in-memory ledger and then applies a
//! list of timestamped escrow operations in order. Participants are named by
//! label (hashed into an address) or given as a 64-digit hex address.
//! Amounts are JSON integers or decimal strings for values past `u64`;
//! timestamps are Unix seconds or RFC 3339 strings.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, warn};

use ve_core::types::{Address, Amount, Epoch, LockId, Timestamp};
use ve_escrow::{
    EscrowConfig, MemoryTokenLedger, OperatorKey, OperatorUpdate, TransferBatch, TransferTx,
    VoteEscrow,
};

pub type CliEscrow = VoteEscrow<MemoryTokenLedger>;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: EscrowConfig,
    /// Opening balances in the base asset, by participant.
    #[serde(default)]
    pub funds: BTreeMap<String, Quantity>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Units(u64),
    Decimal(String),
}

impl Quantity {
    pub fn amount(&self) -> Result<Amount> {
        match self {
            Self::Units(v) => Ok(Amount::from(*v)),
            Self::Decimal(s) => s.parse().with_context(|| format!("invalid amount: {s}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum When {
    Seconds(u64),
    Rfc3339(String),
}

impl When {
    pub fn timestamp(&self) -> Result<Timestamp> {
        match self {
            Self::Seconds(s) => Ok(*s),
            Self::Rfc3339(s) => parse_time(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub at: When,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    CreateLock { caller: String, owner: Option<String>, value: Quantity, end: When },
    IncreaseValue { caller: String, lock_id: LockId, value: Quantity },
    IncreaseEnd { caller: String, lock_id: LockId, end: When },
    Withdraw { caller: String, lock_id: LockId },
    AddOperator { owner: String, operator: String, lock_id: LockId },
    RemoveOperator { owner: String, operator: String, lock_id: LockId },
    Attach { caller: String, owner: String, lock_id: LockId },
    Detach { caller: String, owner: String, lock_id: LockId },
    Transfer { caller: String, from: String, to: String, lock_id: LockId },
    AddInflation { caller: String, epoch: Epoch, value: Quantity },
    ClaimInflation { caller: String, lock_id: LockId, epochs: Vec<Epoch> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateLock { .. } => "create_lock",
            Self::IncreaseValue { .. } => "increase_value",
            Self::IncreaseEnd { .. } => "increase_end",
            Self::Withdraw { .. } => "withdraw",
            Self::AddOperator { .. } => "add_operator",
            Self::RemoveOperator { .. } => "remove_operator",
            Self::Attach { .. } => "attach",
            Self::Detach { .. } => "detach",
            Self::Transfer { .. } => "transfer",
            Self::AddInflation { .. } => "add_inflation",
            Self::ClaimInflation { .. } => "claim_inflation",
        }
    }
}

/// Counts of steps that took effect and steps the escrow rejected.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub applied: usize,
    pub rejected: usize,
}

/// Resolve a participant: a hex address if it parses as one, else a label.
pub fn participant(name: &str) -> Address {
    name.parse().unwrap_or_else(|_| Address::from_label(name))
}

/// Parse Unix seconds or an RFC 3339 date-time.
pub fn parse_time(s: &str) -> Result<Timestamp> {
    if let Ok(secs) = s.parse::<Timestamp>() {
        return Ok(secs);
    }
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("invalid timestamp: {s}"))?;
    Timestamp::try_from(dt.timestamp()).with_context(|| format!("timestamp before 1970: {s}"))
}

/// An empty escrow over a ledger holding the scenario's opening balances.
pub fn build(scenario: &Scenario) -> Result<CliEscrow> {
    let mut ledger = MemoryTokenLedger::new();
    for (name, quantity) in &scenario.funds {
        ledger
            .mint(&participant(name), &scenario.config.base_asset, quantity.amount()?)
            .with_context(|| format!("cannot fund {name}"))?;
    }
    VoteEscrow::new(scenario.config.clone(), ledger).context("invalid escrow config")
}

/// Apply `steps` in order.
///
/// Stops at the first rejected step unless `keep_going`, in which case the
/// rejection is logged and counted.
pub fn replay(escrow: &mut CliEscrow, steps: &[Step], keep_going: bool) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    for (index, step) in steps.iter().enumerate() {
        let op = step.action.name();
        let result = step.at.timestamp().and_then(|now| apply(escrow, &step.action, now));
        match result {
            Ok(()) => outcome.applied += 1,
            Err(e) if keep_going => {
                warn!(step = index, op, error = %format!("{e:#}"), "step rejected");
                outcome.rejected += 1;
            }
            Err(e) => return Err(e.context(format!("step {index} ({op}) failed"))),
        }
    }
    info!(applied = outcome.applied, rejected = outcome.rejected, "scenario replayed");
    Ok(outcome)
}

fn apply(escrow: &mut CliEscrow, action: &Action, now: Timestamp) -> Result<()> {
    match action {
        Action::CreateLock { caller, owner, value, end } => {
            let caller = participant(caller);
            let owner = owner.as_deref().map(participant).unwrap_or(caller);
            let id = escrow.create_lock(&caller, &owner, value.amount()?, end.timestamp()?, now)?;
            info!(lock_id = id, "created");
        }
        Action::IncreaseValue { caller, lock_id, value } => {
            escrow.increase_lock_value(&participant(caller), *lock_id, value.amount()?, now)?;
        }
        Action::IncreaseEnd { caller, lock_id, end } => {
            escrow.increase_lock_end(&participant(caller), *lock_id, end.timestamp()?, now)?;
        }
        Action::Withdraw { caller, lock_id } => {
            escrow.withdraw(&participant(caller), *lock_id, now)?;
        }
        Action::AddOperator { owner, operator, lock_id } => {
            let key = operator_key(owner, operator, *lock_id);
            let owner = key.owner;
            escrow.update_operators(&owner, &[OperatorUpdate::Add(key)])?;
        }
        Action::RemoveOperator { owner, operator, lock_id } => {
            let key = operator_key(owner, operator, *lock_id);
            let owner = key.owner;
            escrow.update_operators(&owner, &[OperatorUpdate::Remove(key)])?;
        }
        Action::Attach { caller, owner, lock_id } => {
            escrow.attach(&participant(caller), &participant(owner), *lock_id)?;
        }
        Action::Detach { caller, owner, lock_id } => {
            escrow.detach(&participant(caller), &participant(owner), *lock_id)?;
        }
        Action::Transfer { caller, from, to, lock_id } => {
            let batch = TransferBatch {
                from: participant(from),
                txs: vec![TransferTx { to: participant(to), lock_id: *lock_id, amount: 1 }],
            };
            escrow.transfer(&participant(caller), &[batch])?;
        }
        Action::AddInflation { caller, epoch, value } => {
            escrow.add_inflation(&participant(caller), *epoch, value.amount()?, now)?;
        }
        Action::ClaimInflation { caller, lock_id, epochs } => {
            let share = escrow.claim_inflation(&participant(caller), *lock_id, epochs, now)?;
            info!(lock_id, share = %share, "claimed");
        }
    }
    Ok(())
}

fn operator_key(owner: &str, operator: &str, lock_id: LockId) -> OperatorKey {
    OperatorKey { owner: participant(owner), operator: participant(operator), lock_id }
}
