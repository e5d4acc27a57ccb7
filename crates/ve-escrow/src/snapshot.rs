//! Snapshot persistence for [`EscrowState`].
//!
//! A snapshot is a bincode-encoded format version followed by the state.
//! Files are written to a sibling temp file and renamed into place, so a
//! crash mid-write never leaves a truncated snapshot behind.

use std::fs;
use std::path::Path;

use tracing::debug;

use ve_core::constants::SNAPSHOT_VERSION;
use ve_core::error::EscrowError;

use crate::state::EscrowState;

/// Encode `state` with its format version.
pub fn encode(state: &EscrowState) -> Result<Vec<u8>, EscrowError> {
    let config = bincode::config::standard();
    let mut bytes = bincode::encode_to_vec(SNAPSHOT_VERSION, config)
        .map_err(|e| EscrowError::Snapshot(e.to_string()))?;
    let body =
        bincode::encode_to_vec(state, config).map_err(|e| EscrowError::Snapshot(e.to_string()))?;
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode a snapshot produced by [`encode`].
///
/// # Errors
///
/// [`EscrowError::Snapshot`] on a version mismatch, malformed bytes or
/// trailing data.
pub fn decode(bytes: &[u8]) -> Result<EscrowState, EscrowError> {
    let config = bincode::config::standard();
    let (version, read): (u32, usize) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| EscrowError::Snapshot(e.to_string()))?;
    if version != SNAPSHOT_VERSION {
        return Err(EscrowError::Snapshot(format!(
            "unsupported snapshot version {version}, expected {SNAPSHOT_VERSION}"
        )));
    }
    let (state, body_len): (EscrowState, usize) = bincode::decode_from_slice(&bytes[read..], config)
        .map_err(|e| EscrowError::Snapshot(e.to_string()))?;
    if read + body_len != bytes.len() {
        return Err(EscrowError::Snapshot(format!(
            "{} trailing bytes",
            bytes.len() - read - body_len
        )));
    }
    Ok(state)
}

/// Write `state` to `path`, replacing any existing snapshot.
pub fn save(path: &Path, state: &EscrowState) -> Result<(), EscrowError> {
    let bytes = encode(state)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes).map_err(|e| EscrowError::Snapshot(format!("{}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| EscrowError::Snapshot(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}

/// Read a snapshot written by [`save`].
pub fn load(path: &Path) -> Result<EscrowState, EscrowError> {
    let bytes =
        fs::read(path).map_err(|e| EscrowError::Snapshot(format!("{}: {e}", path.display())))?;
    let state = decode(&bytes)?;
    debug!(path = %path.display(), locks = state.locks.len(), "snapshot loaded");
    Ok(state)
}
