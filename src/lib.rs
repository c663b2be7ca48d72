//! Tiltcore: borehole inclinometer campaign processing
//!
//! Processes raw inclinometer readings (4-channel tilt measurements taken at
//! fixed depth increments along a vertical tube) into physical displacement
//! series, and lets an analyst correct two systematic error families:
//!
//! - **Spikes**: single-depth reading errors, replaced with a statistic over
//!   a window of prior campaigns
//! - **Bias/sag**: depth-progressive drift, removed via a piecewise-linear
//!   abatement curve that is back-solved into raw-equivalent channel values
//!
//! ## Architecture
//!
//! - `types`: the instrument record data model (campaigns keyed by date)
//! - `engine`: conversion, reference resolution, increment/displacement
//!   propagation, spike and bias correction
//! - `storage`: JSON load/save boundary around the in-memory record
//!
//! The engine is synchronous and I/O-free: it receives an in-memory
//! [`InstrumentRecord`], mutates the targeted campaign's `calc` block, and
//! returns audit data. One loaded record is owned by one analyst session at
//! a time; no internal locking exists.

pub mod engine;
pub mod storage;
pub mod types;

// Re-export the record model
pub use types::{
    BiasAudit, BiasRow, BiasSegment, BiasTable, CalcPoint, Campaign, CampaignInfo, Channel,
    CorrectionAudit, InstrumentInfo, InstrumentRecord, Reading, SpikeAudit, SpikeMark,
    SpikeReplacement,
};

// Re-export engine entry points
pub use engine::{
    active_dates, apply_bias, apply_spike, build_bias_table, convert, convert_reading,
    find_prior_active, find_reference, propagate, recompute_campaign, recompute_chain,
    validate_bias_table, window_statistic, BiasOutcome, EngineError, Statistic,
};

// Re-export storage
pub use storage::{load_record, merge_campaign, save_record, StorageError};
