//! Escrow configuration.
//!
//! Provides [`EscrowConfig`] with defaults for the escrow identity, the locked
//! asset and the inflation coordinator. The configuration is built
//! programmatically or deserialized from JSON by the CLI.

use serde::{Deserialize, Serialize};

use ve_core::constants::{MAX_LOCK_DURATION, WEEK};
use ve_core::error::EscrowError;
use ve_core::types::{Address, AssetRef, Timestamp};

/// Configuration for a vote-escrow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Identity holding escrowed tokens on the external ledger.
    pub escrow_address: Address,
    /// The token that is locked.
    pub base_asset: AssetRef,
    /// The only caller allowed to add inflation.
    pub inflation_source: Address,
    /// Longest lockable period in seconds. A lock of this length has no discount.
    pub max_lock_duration: Timestamp,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            escrow_address: Address::from_label("vote-escrow"),
            base_asset: AssetRef::default(),
            inflation_source: Address::from_label("voter"),
            max_lock_duration: MAX_LOCK_DURATION,
        }
    }
}

impl EscrowConfig {
    /// Check the configuration for values the escrow cannot operate with.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidConfig`] if the maximum duration is zero or not a
    /// whole number of weeks, or if the escrow address is zero.
    pub fn validate(&self) -> Result<(), EscrowError> {
        if self.max_lock_duration == 0 || self.max_lock_duration % WEEK != 0 {
            return Err(EscrowError::InvalidConfig(format!(
                "max_lock_duration must be a positive multiple of {WEEK}, got {}",
                self.max_lock_duration
            )));
        }
        if self.escrow_address.is_zero() {
            return Err(EscrowError::InvalidConfig("escrow_address is zero".into()));
        }
        Ok(())
    }

    /// Same configuration with a different maximum lock duration.
    pub fn with_max_lock_duration(mut self, max_lock_duration: Timestamp) -> Self {
        self.max_lock_duration = max_lock_duration;
        self
    }
}
