//! Reading converter: raw channel counts → calibrated calc point
//!
//! One raw 4-channel reading (a0, a180, b0, b180) at one depth step becomes
//! physical units through the instrument calibration constant (raw count →
//! mm of lateral displacement per sensor length). The derived quality and
//! deviation figures:
//!
//! - `checksum = ch0 + ch180` — a fixed geometric property of the probe,
//!   near-constant per instrument; drift across campaigns or between
//!   adjacent depths flags spikes
//! - `dev = (ch0 - ch180) / 2` — per-step deviation, the probe offset
//!   cancelled by the two-pass reading

use crate::types::{CalcPoint, Reading};

/// Round to 2 decimal places (deviation / displacement figures, mm).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimal places (checksum figures).
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Convert one raw reading into a calibrated calc point.
///
/// Pure and deterministic; propagation-derived fields are zeroed and filled
/// in later by the propagation engine.
#[allow(clippy::too_many_arguments)]
pub fn convert(
    index: i64,
    cota_abs: f64,
    depth: f64,
    a0_raw: f64,
    a180_raw: f64,
    b0_raw: f64,
    b180_raw: f64,
    calibration_constant: f64,
) -> CalcPoint {
    let a0 = round2(a0_raw * calibration_constant);
    let a180 = round2(a180_raw * calibration_constant);
    let b0 = round2(b0_raw * calibration_constant);
    let b180 = round2(b180_raw * calibration_constant);

    CalcPoint {
        index,
        cota_abs,
        depth,
        a0,
        a180,
        b0,
        b180,
        checksum_a: round4(a0 + a180),
        checksum_b: round4(b0 + b180),
        dev_a: round2((a0 - a180) / 2.0),
        dev_b: round2((b0 - b180) / 2.0),
        incr_dev_a: 0.0,
        incr_dev_b: 0.0,
        incr_dev_abs_a: 0.0,
        incr_dev_abs_b: 0.0,
        abs_dev_a: 0.0,
        abs_dev_b: 0.0,
        desp_a: 0.0,
        desp_b: 0.0,
    }
}

/// Convert an imported [`Reading`].
pub fn convert_reading(reading: &Reading, calibration_constant: f64) -> CalcPoint {
    convert(
        reading.index,
        reading.cota_abs,
        reading.depth,
        reading.a0,
        reading.a180,
        reading.b0,
        reading.b180,
        calibration_constant,
    )
}
