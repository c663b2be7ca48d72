//! Correction parameter and audit types
//!
//! Spike correction replaces individual depth-step readings with analyst
//! supplied values; bias correction subtracts a piecewise-linear abatement
//! curve from the displacement profile. Both leave an audit block on the
//! campaign recording exactly what was touched.

use serde::{Deserialize, Serialize};

use super::calc::Channel;

// ============================================================================
// Spike correction
// ============================================================================

/// One analyst-requested replacement at one depth step.
///
/// `new_*` values are raw sensor counts; the engine re-applies the campaign's
/// calibration constant when rebuilding the calc point. Only the channels
/// flagged `replace_*` are touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeReplacement {
    pub depth: f64,
    #[serde(default)]
    pub replace_a: bool,
    #[serde(default)]
    pub replace_b: bool,
    #[serde(default)]
    pub new_a0: f64,
    #[serde(default)]
    pub new_a180: f64,
    #[serde(default)]
    pub new_b0: f64,
    #[serde(default)]
    pub new_b180: f64,
}

/// Position of one spike-corrected step, recorded per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeMark {
    pub index: i64,
    pub cota_abs: f64,
    pub depth: f64,
}

/// Audit block for a spike correction: which depths were replaced, per
/// channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpikeAudit {
    #[serde(rename = "A")]
    pub a: Vec<SpikeMark>,
    #[serde(rename = "B")]
    pub b: Vec<SpikeMark>,
}

impl SpikeAudit {
    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.b.is_empty()
    }
}

// ============================================================================
// Bias correction
// ============================================================================

/// One correction segment: distribute `delta` linearly over the depth
/// interval `[prof_sup, prof_inf]` (`prof_sup` shallower, `prof_inf` deeper).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiasSegment {
    #[serde(default)]
    pub selec: bool,
    /// Deeper bound of the interval (m from collar).
    #[serde(default)]
    pub prof_inf: f64,
    /// Shallower bound of the interval (m from collar).
    #[serde(default)]
    pub prof_sup: f64,
    /// Total correction distributed over the interval (mm).
    #[serde(default)]
    pub delta: f64,
}

/// The four-row bias parameter table: up to two segments per channel.
///
/// Segment 2, when selected, continues shallower than segment 1 and its
/// offset carries on from segment 1's final value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiasTable {
    #[serde(default)]
    pub bias_1_a: BiasSegment,
    #[serde(default)]
    pub bias_2_a: BiasSegment,
    #[serde(default)]
    pub bias_1_b: BiasSegment,
    #[serde(default)]
    pub bias_2_b: BiasSegment,
}

impl BiasTable {
    /// The (segment 1, segment 2) pair for a channel.
    pub fn segments(&self, channel: Channel) -> (&BiasSegment, &BiasSegment) {
        match channel {
            Channel::A => (&self.bias_1_a, &self.bias_2_a),
            Channel::B => (&self.bias_1_b, &self.bias_2_b),
        }
    }

    /// True if any segment on the given channel is selected.
    pub fn channel_selected(&self, channel: Channel) -> bool {
        let (s1, s2) = self.segments(channel);
        s1.selec || s2.selec
    }
}

/// One row of the per-depth bias working table: the join of reference and
/// corrected campaign at one depth step, plus the abatement columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiasRow {
    pub index: i64,
    pub cota_abs: f64,
    pub depth: f64,

    /// Reference-campaign deviation at this index.
    pub dev_ref_a: f64,
    pub dev_ref_b: f64,
    /// Corrected-campaign deviation (post spike correction).
    pub dev_a: f64,
    pub dev_b: f64,
    pub checksum_a: f64,
    pub checksum_b: f64,

    /// `dev - dev_ref`.
    pub incr_dev_a: f64,
    pub incr_dev_b: f64,
    /// Tail sum of `incr_dev` to the bottom (no reference offset).
    pub desp_a: f64,
    pub desp_b: f64,
    /// Tail mean of `incr_dev` to the bottom — default-slope suggestion.
    pub avg_incr_a: f64,
    pub avg_incr_b: f64,

    /// Piecewise-linear abatement curve value at this depth.
    #[serde(default)]
    pub recta_a: f64,
    #[serde(default)]
    pub recta_b: f64,
    /// `desp - recta`: displacement with the sag removed.
    #[serde(default)]
    pub corr_a: f64,
    #[serde(default)]
    pub corr_b: f64,
    /// `corr` plus the reference campaign's own displacement at this index —
    /// the final plottable absolute-displacement curve.
    #[serde(default)]
    pub desp_a_corr: f64,
    #[serde(default)]
    pub desp_b_corr: f64,
}

/// Audit block for a bias correction: the validated parameter table and the
/// reference it was computed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasAudit {
    pub reference_date: String,
    pub table: BiasTable,
}

// ============================================================================
// Tagged audit wrapper
// ============================================================================

/// What a correction action did, as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectionAudit {
    Spike(SpikeAudit),
    Bias(BiasAudit),
}
