//! Per-depth-step reading types
//!
//! A campaign stores two parallel lists, one entry per depth step:
//! - `raw`: the readings exactly as imported, never mutated afterwards
//! - `calc`: calibrated values plus every propagation-derived series
//!
//! Both lists are ordered by `index` ascending; a larger `index` (and a
//! smaller `cota_abs`) means deeper in the tube.

use serde::{Deserialize, Serialize};

/// Guided sensor channel of an inclinometer probe.
///
/// Channel A runs along the main groove pair of the casing, channel B along
/// the perpendicular pair. Each channel is read twice (0° and 180° probe
/// orientations) so systematic probe offset cancels in the half-difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    A,
    B,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::A => write!(f, "A"),
            Channel::B => write!(f, "B"),
        }
    }
}

/// One raw reading at one depth step: four channel counts as measured.
///
/// `index` is an absolute tube position counter shared across campaigns of
/// the same physical tube (it survives tube extensions); `depth` is
/// depth-from-collar in metres, positive downward, and is only meaningful
/// within one physical-tube epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub index: i64,
    /// Absolute elevation of this step (m).
    pub cota_abs: f64,
    /// Depth from collar (m), positive downward.
    pub depth: f64,
    pub a0: f64,
    pub a180: f64,
    pub b0: f64,
    pub b180: f64,
}

/// One calibrated depth step plus every derived series.
///
/// The base fields (`a0`..`b180`, `checksum_*`, `dev_*`) are produced by the
/// reading converter at import and replaced wholesale by spike/bias
/// correction. The propagation fields (`incr_dev_*`, `abs_dev_*`, `desp_*`)
/// are pure functions of `dev_*` plus the reference chain and are always
/// recomputed, never hand-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcPoint {
    pub index: i64,
    pub cota_abs: f64,
    pub depth: f64,

    /// Calibrated channel values (mm).
    pub a0: f64,
    pub a180: f64,
    pub b0: f64,
    pub b180: f64,

    /// `a0 + a180` — near-constant per instrument; drift flags spikes.
    pub checksum_a: f64,
    /// `b0 + b180`.
    pub checksum_b: f64,

    /// `(a0 - a180) / 2` — per-step deviation.
    pub dev_a: f64,
    /// `(b0 - b180) / 2`.
    pub dev_b: f64,

    /// Deviation minus the reference campaign's deviation at this index.
    #[serde(default)]
    pub incr_dev_a: f64,
    #[serde(default)]
    pub incr_dev_b: f64,

    /// Cumulative incremental deviation carried from the first active
    /// campaign — total angular drift since tube origin.
    #[serde(default)]
    pub incr_dev_abs_a: f64,
    #[serde(default)]
    pub incr_dev_abs_b: f64,

    /// Tail sum of `dev_*` from this step to the tube bottom — tube shape.
    #[serde(default)]
    pub abs_dev_a: f64,
    #[serde(default)]
    pub abs_dev_b: f64,

    /// Tail sum of `incr_dev_*` to the bottom plus the carried-forward
    /// reference offset — absolute lateral displacement (mm).
    #[serde(default)]
    pub desp_a: f64,
    #[serde(default)]
    pub desp_b: f64,
}
