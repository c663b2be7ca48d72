//! Computation engine: conversion, reference resolution, propagation and the
//! spike/bias correction models
//!
//! The engine is an in-process library over in-memory [`InstrumentRecord`]s:
//! it never performs I/O and runs each action synchronously to completion.
//! Two failure classes are kept deliberately distinct (see [`EngineError`]):
//! genuinely-optional data gaps (a depth index missing from the reference, a
//! malformed campaign key) are skipped with a no-op so partial imports stay
//! usable, while broken preconditions (no reference campaign at all) surface
//! as typed errors.
//!
//! [`InstrumentRecord`]: crate::types::InstrumentRecord

pub mod bias;
pub mod convert;
pub mod propagation;
pub mod reference;
pub mod spike;
pub mod stats;

pub use bias::{apply_bias, build_bias_table, validate_bias_table, BiasOutcome};
pub use convert::{convert, convert_reading, round2, round4};
pub use propagation::{propagate, recompute_campaign, recompute_chain};
pub use reference::{active_dates, find_prior_active, find_reference};
pub use spike::apply_spike;
pub use stats::{window_statistic, ChannelSuggestion, Statistic};

use thiserror::Error;

/// Engine precondition and validation failures.
///
/// Defensive data gaps never reach this enum — they are handled in place as
/// skip-and-continue. Anything that does reach it must halt the current
/// action and be reported to the analyst unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("campaign not found in record: {0}")]
    CampaignNotFound(String),

    #[error("no reference campaign found at or before {0}")]
    MissingReference(String),

    #[error("campaign {0} has no calc block")]
    MissingCalc(String),

    #[error("bias table validation failed: {0}")]
    BiasValidation(String),
}
