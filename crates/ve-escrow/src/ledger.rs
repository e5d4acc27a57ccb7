//! In-memory token ledger.
//!
//! Holds fungible balances per `(asset, owner)` with no persistence. Used by
//! tests and the CLI in place of an external token contract.

use std::collections::{HashMap, HashSet};

use ve_core::error::TransferError;
use ve_core::traits::TokenLedger;
use ve_core::types::{Address, Amount, AssetRef};

#[derive(Debug, Clone, Default)]
pub struct MemoryTokenLedger {
    balances: HashMap<(AssetRef, Address), Amount>,
    /// Accounts whose outgoing transfers are rejected.
    frozen: HashSet<Address>,
}

impl MemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to `owner` out of thin air.
    ///
    /// # Errors
    ///
    /// [`TransferError::Rejected`] if the balance would overflow.
    pub fn mint(&mut self, owner: &Address, asset: &AssetRef, amount: Amount) -> Result<(), TransferError> {
        let balance = self.balance(owner, asset);
        let credited = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("balance of {owner} would overflow")))?;
        self.balances.insert((*asset, *owner), credited);
        Ok(())
    }

    /// Reject every later transfer out of `owner`.
    pub fn freeze(&mut self, owner: &Address) {
        self.frozen.insert(*owner);
    }

    pub fn unfreeze(&mut self, owner: &Address) {
        self.frozen.remove(owner);
    }

    /// Sum of all balances of `asset`.
    pub fn total(&self, asset: &AssetRef) -> Amount {
        self.balances.iter().filter(|((a, _), _)| a == asset).map(|(_, v)| *v).sum()
    }
}

impl TokenLedger for MemoryTokenLedger {
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        asset: &AssetRef,
    ) -> Result<(), TransferError> {
        if self.frozen.contains(from) {
            return Err(TransferError::Rejected(format!("account {from} is frozen")));
        }
        let have = self.balance(from, asset);
        if have < amount {
            return Err(TransferError::InsufficientBalance { have, need: amount });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to, asset)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("balance of {to} would overflow")))?;
        self.balances.insert((*asset, *from), have - amount);
        self.balances.insert((*asset, *to), credited);
        Ok(())
    }

    fn balance(&self, owner: &Address, asset: &AssetRef) -> Amount {
        self.balances.get(&(*asset, *owner)).copied().unwrap_or(0)
    }
}
