//! Complete persisted state of an escrow.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use ve_core::types::{Amount, Lock, LockId};

use crate::checkpoint::{GlobalLog, TokenLog};
use crate::inflation::InflationBook;
use crate::registry::Ownership;

/// Everything an escrow owns apart from its config and token ledger.
///
/// Per-lock logs outlive their locks: a withdrawn lock disappears from
/// `locks` and from `ownership` but keeps its entry in `token_logs`.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct EscrowState {
    pub next_lock_id: LockId,
    pub locks: BTreeMap<LockId, Lock>,
    pub token_logs: BTreeMap<LockId, TokenLog>,
    pub global: GlobalLog,
    pub ownership: Ownership,
    pub inflation: InflationBook,
    pub locked_supply: Amount,
}

impl Default for EscrowState {
    fn default() -> Self {
        Self {
            next_lock_id: 1,
            locks: BTreeMap::new(),
            token_logs: BTreeMap::new(),
            global: GlobalLog::default(),
            ownership: Ownership::default(),
            inflation: InflationBook::default(),
            locked_supply: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let state = EscrowState::default();
        assert_eq!(state.next_lock_id, 1);
        assert!(state.locks.is_empty());
        assert!(state.global.is_empty());
    }
}
