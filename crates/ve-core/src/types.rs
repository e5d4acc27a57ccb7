//! Core ledger types: identities, locks, checkpoints, assets.
//!
//! Token values, biases and slopes are `u128` base units; timestamps are
//! `u64` seconds since the Unix epoch.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::WEEK;
use crate::error::AddressError;

/// Token amount, bias or slope in base units.
pub type Amount = u128;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Identifier of a lock. Assigned sequentially from 1 and never reused.
pub type LockId = u64;

/// Inflation accounting period number, as issued by the emission coordinator.
pub type Epoch = u64;

/// Round a timestamp down to the start of its week.
///
/// # Examples
///
/// ```
/// use ve_core::constants::WEEK;
/// use ve_core::types::week_floor;
/// assert_eq!(week_floor(0), 0);
/// assert_eq!(week_floor(WEEK - 1), 0);
/// assert_eq!(week_floor(WEEK), WEEK);
/// assert_eq!(week_floor(3 * WEEK + 17), 3 * WEEK);
/// ```
pub const fn week_floor(ts: Timestamp) -> Timestamp {
    ts / WEEK * WEEK
}

/// A 32-byte caller identity (account, contract or collaborator).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Deterministic address derived from a human-readable label.
    ///
    /// Used by the CLI and tests to name participants (`"alice"`, `"gauge"`).
    pub fn from_label(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 64 {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let bytes = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A recorded `(bias, slope, ts)` snapshot of a decaying magnitude.
///
/// At any `t >= ts` the magnitude is
/// `bias - slope * (t - ts) / SLOPE_MULTIPLIER`, floored at zero.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Point {
    /// Magnitude at `ts`.
    pub bias: Amount,
    /// Decay per second, scaled by `SLOPE_MULTIPLIER`.
    pub slope: Amount,
    /// Timestamp the point was recorded at.
    pub ts: Timestamp,
}

impl Point {
    /// The empty point used as the "old" side of a lock's first checkpoint.
    pub const ZERO: Self = Self { bias: 0, slope: 0, ts: 0 };

    pub fn new(bias: Amount, slope: Amount, ts: Timestamp) -> Self {
        Self { bias, slope, ts }
    }
}

/// A live lock record.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Lock {
    /// Locked amount. Only ever grows while the lock is live.
    pub base_value: Amount,
    /// Expiry, always a multiple of [`WEEK`]. Only ever moves forward.
    pub end: Timestamp,
}

impl Lock {
    /// Whether the lock can no longer be extended or topped up at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.end <= now
    }

    /// Whether the lock can be withdrawn at `now` (strictly past expiry).
    pub fn is_withdrawable(&self, now: Timestamp) -> bool {
        now > self.end
    }
}

/// Time-axis rounding applied to a query timestamp.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Rounding {
    /// Use the timestamp as given.
    #[default]
    Current,
    /// Floor the timestamp to the start of its week.
    WholeWeek,
}

impl Rounding {
    /// Apply the rounding to `ts`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ve_core::constants::WEEK;
    /// use ve_core::types::Rounding;
    /// assert_eq!(Rounding::Current.apply(WEEK + 5), WEEK + 5);
    /// assert_eq!(Rounding::WholeWeek.apply(WEEK + 5), WEEK);
    /// ```
    pub fn apply(self, ts: Timestamp) -> Timestamp {
        match self {
            Self::Current => ts,
            Self::WholeWeek => week_floor(ts),
        }
    }
}

impl FromStr for Rounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" => Ok(Self::Current),
            "whole-week" | "week" => Ok(Self::WholeWeek),
            other => Err(format!("unknown rounding: {other}")),
        }
    }
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::WholeWeek => f.write_str("whole-week"),
        }
    }
}

/// Reference to a fungible asset moved through a [`TokenLedger`].
///
/// [`TokenLedger`]: crate::traits::TokenLedger
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AssetRef {
    /// Single-asset token contract with allowance-style transfers.
    Allowance { contract: Address },
    /// Multi-asset token contract with batched transfers, addressed by token id.
    MultiAsset { contract: Address, token_id: u64 },
}

impl AssetRef {
    /// Contract address holding the asset's balances.
    pub fn contract(&self) -> Address {
        match self {
            Self::Allowance { contract } | Self::MultiAsset { contract, .. } => *contract,
        }
    }
}

impl Default for AssetRef {
    fn default() -> Self {
        Self::Allowance { contract: Address::from_label("base-token") }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowance { contract } => write!(f, "{contract}"),
            Self::MultiAsset { contract, token_id } => write!(f, "{contract}#{token_id}"),
        }
    }
}
