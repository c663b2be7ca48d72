//! Shared data structures for inclinometer campaign processing
//!
//! This module defines the core types of the correction pipeline:
//! - `InstrumentRecord`: the per-instrument document (campaigns keyed by date)
//! - `Reading` / `CalcPoint`: one depth step, raw and calibrated
//! - Correction parameter and audit types (spike replacements, bias tables)

mod calc;
mod correction;
mod record;

pub use calc::*;
pub use correction::*;
pub use record::*;
