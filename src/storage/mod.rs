//! Instrument record persistence
//!
//! The engine never touches the filesystem; this module is the boundary
//! layer that loads a record from its JSON file before engine calls and
//! writes it back afterwards. Saves go through a temp file in the same
//! directory followed by a rename, so a crash mid-write never truncates the
//! record.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::types::{Campaign, InstrumentRecord};

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Load an instrument record from a JSON file.
pub fn load_record(path: &Path) -> Result<InstrumentRecord, StorageError> {
    let contents = fs::read_to_string(path)?;
    let record = serde_json::from_str(&contents)?;
    Ok(record)
}

/// Write a record back to its JSON file (pretty-printed, temp file +
/// rename).
pub fn save_record(path: &Path, record: &InstrumentRecord) -> Result<(), StorageError> {
    let serialized = serde_json::to_string_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serialized)?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), campaigns = record.campaigns.len(), "record saved");
    Ok(())
}

/// Merge a corrected campaign into a record, replacing any campaign already
/// stored under that date.
pub fn merge_campaign(record: &mut InstrumentRecord, date: &str, campaign: Campaign) {
    record.campaigns.insert(date.to_string(), campaign);
}
