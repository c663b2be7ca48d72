//! Bias/sag correction model
//!
//! A bias is a smooth, depth-progressive systematic drift (sensor cable
//! stretch, temperature sag) visible as a spurious slope in the displacement
//! profile. The analyst picks up to two depth intervals per channel and a
//! total correction `delta` for each; the engine distributes each delta
//! linearly over its interval's depth steps, producing a piecewise-linear
//! abatement curve (`recta`) that is subtracted from the measured
//! displacement.
//!
//! The correction is then pushed back into raw-equivalent channel values:
//! per depth step, the local correction increment `d` is removed from `ch0`
//! and added to `ch180`, which shifts `dev = (ch0 - ch180) / 2` by `-d`
//! while leaving `checksum = ch0 + ch180` untouched. The checksum quality
//! signal survives the correction by construction.
//!
//! Validation is transactional: the parameter table is checked in full
//! before anything is mutated, and a rejected table leaves the record
//! exactly as it was.

use tracing::info;

use super::convert::{round2, round4};
use super::propagation::propagate;
use super::reference::find_reference;
use super::stats::std_dev;
use super::EngineError;
use crate::types::{
    BiasAudit, BiasRow, BiasSegment, BiasTable, Channel, InstrumentRecord,
};

/// Result of a bias correction: the audit stored on the campaign, the full
/// working table (for plotting), and the incremental-deviation dispersion
/// per channel (suggestion aid).
#[derive(Debug, Clone)]
pub struct BiasOutcome {
    pub audit: BiasAudit,
    pub rows: Vec<BiasRow>,
    pub std_incr_a: f64,
    pub std_incr_b: f64,
}

/// Check the parameter table before any computation.
///
/// Per selected segment the interval must not be inverted
/// (`prof_inf >= prof_sup`), and a selected segment 2 must sit entirely
/// shallower than segment 1 on the same channel
/// (`prof_inf₂ <= prof_sup₁`).
pub fn validate_bias_table(table: &BiasTable) -> Result<(), EngineError> {
    for channel in [Channel::A, Channel::B] {
        let (seg1, seg2) = table.segments(channel);
        for (label, seg) in [(1, seg1), (2, seg2)] {
            if seg.selec && seg.prof_inf < seg.prof_sup {
                return Err(EngineError::BiasValidation(format!(
                    "segment {label} on channel {channel}: interval inverted \
                     (prof_inf {} < prof_sup {})",
                    seg.prof_inf, seg.prof_sup
                )));
            }
        }
        if seg1.selec && seg2.selec && seg2.prof_inf > seg1.prof_sup {
            return Err(EngineError::BiasValidation(format!(
                "segments on channel {channel} overlap: segment 2 reaches down to \
                 {} but segment 1 starts at {}",
                seg2.prof_inf, seg1.prof_sup
            )));
        }
    }
    Ok(())
}

/// Build the per-depth working table: the join of reference and corrected
/// campaign by tube index, with incremental deviation, tail-sum displacement
/// and the tail-mean slope suggestion.
///
/// Indices absent from the reference are skipped defensively.
pub fn build_bias_table(
    record: &InstrumentRecord,
    target_date: &str,
    reference_date: &str,
) -> Result<Vec<BiasRow>, EngineError> {
    let target = record
        .campaign(target_date)
        .ok_or_else(|| EngineError::CampaignNotFound(target_date.to_string()))?;
    let reference = record
        .campaign(reference_date)
        .ok_or_else(|| EngineError::CampaignNotFound(reference_date.to_string()))?;
    if target.calc.is_empty() {
        return Err(EngineError::MissingCalc(target_date.to_string()));
    }
    if reference.calc.is_empty() {
        return Err(EngineError::MissingCalc(reference_date.to_string()));
    }

    let mut rows: Vec<BiasRow> = target
        .calc
        .iter()
        .filter_map(|point| {
            let anchor = reference.calc_at(point.index)?;
            Some(BiasRow {
                index: point.index,
                cota_abs: point.cota_abs,
                depth: point.depth,
                dev_ref_a: anchor.dev_a,
                dev_ref_b: anchor.dev_b,
                dev_a: point.dev_a,
                dev_b: point.dev_b,
                checksum_a: point.checksum_a,
                checksum_b: point.checksum_b,
                incr_dev_a: round2(point.dev_a - anchor.dev_a),
                incr_dev_b: round2(point.dev_b - anchor.dev_b),
                ..BiasRow::default()
            })
        })
        .collect();

    // Tail sums and tail means, deepest step first
    let mut tail_a = 0.0;
    let mut tail_b = 0.0;
    let mut steps = 0usize;
    for row in rows.iter_mut().rev() {
        tail_a += row.incr_dev_a;
        tail_b += row.incr_dev_b;
        steps += 1;
        row.desp_a = round2(tail_a);
        row.desp_b = round2(tail_b);
        row.avg_incr_a = round2(tail_a / steps as f64);
        row.avg_incr_b = round2(tail_b / steps as f64);
    }

    Ok(rows)
}

fn in_interval(depth: f64, seg: &BiasSegment) -> bool {
    depth >= seg.prof_sup && depth <= seg.prof_inf
}

/// Linear increment per in-interval step: `delta` spread over the interval's
/// inter-row gaps. An interval covering fewer than two steps contributes no
/// correction (division-by-zero guard).
fn segment_slope(depths: &[f64], seg: &BiasSegment) -> f64 {
    if !seg.selec {
        return 0.0;
    }
    let count = depths.iter().filter(|d| in_interval(**d, seg)).count();
    if count < 2 {
        return 0.0;
    }
    seg.delta / (count - 1) as f64
}

/// Abatement curve for one channel over `depths` (ordered shallow → deep).
///
/// Walks deepest-first accumulating an offset: held constant outside the
/// intervals, incremented by the segment slope at every in-interval step
/// after the first. Segment 2 continues from segment 1's final offset, so
/// the two pieces concatenate into one curve.
fn abatement_curve(depths: &[f64], seg1: &BiasSegment, seg2: &BiasSegment) -> Vec<f64> {
    let slope1 = segment_slope(depths, seg1);
    let slope2 = segment_slope(depths, seg2);

    let mut recta = vec![0.0; depths.len()];
    let mut offset = 0.0;
    let mut entered1 = false;
    let mut entered2 = false;
    for i in (0..depths.len()).rev() {
        let in1 = seg1.selec && in_interval(depths[i], seg1);
        let in2 = seg2.selec && in_interval(depths[i], seg2);
        if in1 && entered1 {
            offset += slope1;
        } else if in2 && entered2 {
            offset += slope2;
        }
        entered1 |= in1;
        entered2 |= in2;
        recta[i] = round2(offset);
    }
    recta
}

/// Validate, compute and apply a bias correction to `target_date`'s
/// campaign, then re-propagate. Nothing is mutated on a validation failure.
pub fn apply_bias(
    record: &mut InstrumentRecord,
    target_date: &str,
    table: &BiasTable,
) -> Result<BiasOutcome, EngineError> {
    validate_bias_table(table)?;

    let reference_date = find_reference(record, target_date)
        .ok_or_else(|| EngineError::MissingReference(target_date.to_string()))?;
    let mut rows = build_bias_table(record, target_date, &reference_date)?;

    let depths: Vec<f64> = rows.iter().map(|r| r.depth).collect();
    let (seg1_a, seg2_a) = table.segments(Channel::A);
    let (seg1_b, seg2_b) = table.segments(Channel::B);
    let recta_a = abatement_curve(&depths, seg1_a, seg2_a);
    let recta_b = abatement_curve(&depths, seg1_b, seg2_b);

    // Reference displacement per index, restored onto the corrected curve
    let reference = record
        .campaign(&reference_date)
        .ok_or_else(|| EngineError::CampaignNotFound(reference_date.clone()))?;
    let ref_desp: Vec<(f64, f64)> = rows
        .iter()
        .map(|row| {
            reference
                .calc_at(row.index)
                .map_or((0.0, 0.0), |p| (p.desp_a, p.desp_b))
        })
        .collect();

    for (i, row) in rows.iter_mut().enumerate() {
        row.recta_a = recta_a[i];
        row.recta_b = recta_b[i];
        row.corr_a = round2(row.desp_a - row.recta_a);
        row.corr_b = round2(row.desp_b - row.recta_b);
        row.desp_a_corr = round2(row.corr_a + ref_desp[i].0);
        row.desp_b_corr = round2(row.corr_b + ref_desp[i].1);
    }

    // Back-solve the per-step correction increment: reverse-order difference
    // of the abatement curve, deepest row zero. The tail sum of these
    // increments reproduces `recta` exactly.
    let n = rows.len();
    let delta = |recta: &[f64], i: usize| {
        if i + 1 < n {
            round2(recta[i] - recta[i + 1])
        } else {
            0.0
        }
    };

    let correct_a = table.channel_selected(Channel::A);
    let correct_b = table.channel_selected(Channel::B);
    let campaign = record
        .campaign_mut(target_date)
        .ok_or_else(|| EngineError::CampaignNotFound(target_date.to_string()))?;
    for (i, row) in rows.iter().enumerate() {
        let Some(point) = campaign.calc.iter_mut().find(|p| p.index == row.index) else {
            continue;
        };
        if correct_a {
            let d_a = delta(&recta_a, i);
            point.a0 = round2(point.a0 - d_a);
            point.a180 = round2(point.a180 + d_a);
            point.dev_a = round2((point.a0 - point.a180) / 2.0);
            point.checksum_a = round4(point.a0 + point.a180);
        }
        if correct_b {
            let d_b = delta(&recta_b, i);
            point.b0 = round2(point.b0 - d_b);
            point.b180 = round2(point.b180 + d_b);
            point.dev_b = round2((point.b0 - point.b180) / 2.0);
            point.checksum_b = round4(point.b0 + point.b180);
        }
    }

    let audit = BiasAudit {
        reference_date: reference_date.clone(),
        table: table.clone(),
    };
    campaign.bias = Some(audit.clone());

    propagate(record, target_date, &reference_date)?;

    let incr_a: Vec<f64> = rows.iter().map(|r| r.incr_dev_a).collect();
    let incr_b: Vec<f64> = rows.iter().map(|r| r.incr_dev_b).collect();
    info!(target_date, reference = reference_date.as_str(), "bias correction applied");

    Ok(BiasOutcome {
        audit,
        rows,
        std_incr_a: std_dev(&incr_a),
        std_incr_b: std_dev(&incr_b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::convert::convert;
    use crate::engine::propagation::recompute_chain;
    use crate::types::{Campaign, CampaignInfo, InstrumentInfo};

    fn segment(prof_inf: f64, prof_sup: f64, delta: f64) -> BiasSegment {
        BiasSegment {
            selec: true,
            prof_inf,
            prof_sup,
            delta,
        }
    }

    fn campaign(reference: bool, devs: &[f64]) -> Campaign {
        // One 1 m step per dev value, shallow to deep, symmetric channels
        let calc = devs
            .iter()
            .enumerate()
            .map(|(i, &dev)| {
                convert(i as i64, 100.0 - i as f64, i as f64, dev, -dev, 0.0, 0.0, 1.0)
            })
            .collect();
        Campaign {
            campaign_info: CampaignInfo {
                index_0: 0,
                importador: String::new(),
                instrument_constant: 1.0,
                reference,
                active: true,
                quarentine: false,
                alarm: None,
            },
            raw: Vec::new(),
            calc,
            spike: None,
            bias: None,
        }
    }

    fn record_21_steps() -> InstrumentRecord {
        let mut record = InstrumentRecord::new(InstrumentInfo::default());
        record
            .campaigns
            .insert("2024-01-01T00:00:00".into(), campaign(true, &[0.0; 21]));
        record
            .campaigns
            .insert("2024-02-01T00:00:00".into(), campaign(false, &[1.0; 21]));
        recompute_chain(&mut record).unwrap();
        record
    }

    #[test]
    fn test_validation_rejects_inverted_interval() {
        let table = BiasTable {
            bias_1_a: segment(5.0, 10.0, 1.0),
            ..BiasTable::default()
        };
        let err = validate_bias_table(&table).unwrap_err();
        assert!(matches!(err, EngineError::BiasValidation(_)));
    }

    #[test]
    fn test_validation_rejects_overlap() {
        // Segments overlap at depths 5–7
        let table = BiasTable {
            bias_1_a: segment(10.0, 5.0, 1.0),
            bias_2_a: segment(7.0, 2.0, 1.0),
            ..BiasTable::default()
        };
        let err = validate_bias_table(&table).unwrap_err();
        assert!(matches!(err, EngineError::BiasValidation(_)));
    }

    #[test]
    fn test_validation_accepts_adjacent_segments() {
        let table = BiasTable {
            bias_1_a: segment(10.0, 5.0, 1.0),
            bias_2_a: segment(5.0, 2.0, 1.0),
            ..BiasTable::default()
        };
        assert!(validate_bias_table(&table).is_ok());
    }

    #[test]
    fn test_rejected_table_leaves_record_unchanged() {
        let mut record = record_21_steps();
        let before = record.campaign("2024-02-01T00:00:00").unwrap().clone();
        let table = BiasTable {
            bias_1_a: segment(5.0, 10.0, 1.0),
            ..BiasTable::default()
        };
        assert!(apply_bias(&mut record, "2024-02-01T00:00:00", &table).is_err());
        let after = record.campaign("2024-02-01T00:00:00").unwrap();
        assert_eq!(after.calc, before.calc);
        assert!(after.bias.is_none());
    }

    #[test]
    fn test_abatement_full_interval_scenario() {
        // 21 steps at 1 m, delta 10 over [0, 20]: straight line from 0 at
        // depth 20 to 10 at depth 0 in steps of 10/20 = 0.5
        let depths: Vec<f64> = (0..21).map(|i| i as f64).collect();
        let recta = abatement_curve(&depths, &segment(20.0, 0.0, 10.0), &BiasSegment::default());
        assert_eq!(recta[20], 0.0);
        assert_eq!(recta[19], 0.5);
        assert_eq!(recta[10], 5.0);
        assert_eq!(recta[0], 10.0);
    }

    #[test]
    fn test_abatement_holds_outside_interval() {
        let depths: Vec<f64> = (0..21).map(|i| i as f64).collect();
        // Correction confined to [10, 20]; shallower steps hold the final offset
        let recta = abatement_curve(&depths, &segment(20.0, 10.0, 5.0), &BiasSegment::default());
        assert_eq!(recta[20], 0.0);
        assert_eq!(recta[10], 5.0);
        assert_eq!(recta[5], 5.0);
        assert_eq!(recta[0], 5.0);
    }

    #[test]
    fn test_abatement_segments_concatenate() {
        let depths: Vec<f64> = (0..21).map(|i| i as f64).collect();
        // Segment 1 deep [12, 20], segment 2 shallow [0, 8], gap between
        let recta = abatement_curve(
            &depths,
            &segment(20.0, 12.0, 4.0),
            &segment(8.0, 0.0, 2.0),
        );
        assert_eq!(recta[20], 0.0);
        assert_eq!(recta[12], 4.0);
        // Held across the gap
        assert_eq!(recta[10], 4.0);
        // Segment 2 continues from 4.0, not from zero
        assert_eq!(recta[8], 4.0);
        assert_eq!(recta[4], 5.0);
        assert_eq!(recta[0], 6.0);
    }

    #[test]
    fn test_abatement_degenerate_interval_is_zero() {
        let depths: Vec<f64> = (0..5).map(|i| i as f64).collect();
        // Interval covers a single step: no gap to distribute over
        let recta = abatement_curve(&depths, &segment(2.0, 2.0, 10.0), &BiasSegment::default());
        assert!(recta.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_apply_bias_scenario_full_tube() {
        let mut record = record_21_steps();
        let table = BiasTable {
            bias_1_a: segment(20.0, 0.0, 10.0),
            ..BiasTable::default()
        };
        let outcome = apply_bias(&mut record, "2024-02-01T00:00:00", &table).unwrap();

        // recta is the 0.5-per-step line; corr = desp - recta
        let shallow = &outcome.rows[0];
        assert_eq!(shallow.recta_a, 10.0);
        assert_eq!(shallow.desp_a, 21.0);
        assert_eq!(shallow.corr_a, 11.0);
        let deepest = &outcome.rows[20];
        assert_eq!(deepest.recta_a, 0.0);
        assert_eq!(deepest.corr_a, 1.0);

        // After back-solve and re-propagation the campaign's own desp matches
        // the corrected curve (reference displacement is zero here)
        let feb = record.campaign("2024-02-01T00:00:00").unwrap();
        assert_eq!(feb.calc[0].desp_a, 11.0);
        assert_eq!(feb.calc[20].desp_a, 1.0);
        assert!(feb.bias.is_some());
    }

    #[test]
    fn test_bias_preserves_checksum() {
        let mut record = record_21_steps();
        let before: Vec<f64> = record
            .campaign("2024-02-01T00:00:00")
            .unwrap()
            .calc
            .iter()
            .map(|p| p.checksum_a)
            .collect();
        let table = BiasTable {
            bias_1_a: segment(20.0, 0.0, 10.0),
            ..BiasTable::default()
        };
        apply_bias(&mut record, "2024-02-01T00:00:00", &table).unwrap();
        let after = record.campaign("2024-02-01T00:00:00").unwrap();
        for (p, b) in after.calc.iter().zip(&before) {
            assert_eq!(p.checksum_a, *b, "checksum must survive bias correction");
        }
    }

    #[test]
    fn test_bias_untouched_channel_is_stable() {
        let mut record = record_21_steps();
        let before: Vec<(f64, f64)> = record
            .campaign("2024-02-01T00:00:00")
            .unwrap()
            .calc
            .iter()
            .map(|p| (p.b0, p.dev_b))
            .collect();
        let table = BiasTable {
            bias_1_a: segment(20.0, 0.0, 10.0),
            ..BiasTable::default()
        };
        apply_bias(&mut record, "2024-02-01T00:00:00", &table).unwrap();
        let after = record.campaign("2024-02-01T00:00:00").unwrap();
        for (p, (b0, dev_b)) in after.calc.iter().zip(&before) {
            // Unselected channel is not even rewritten, bit for bit
            assert_eq!(p.b0, *b0);
            assert_eq!(p.dev_b, *dev_b);
        }
    }
}
