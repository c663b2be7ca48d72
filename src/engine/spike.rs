//! Spike correction: replace individual depth-step readings
//!
//! A spike is a single-depth reading error, visible as a jump in the
//! checksum column. The analyst replaces the flagged channel pair with a
//! statistic over a window of prior campaigns (see [`super::stats`]), the
//! calc point is rebuilt with the campaign's calibration constant, and the
//! propagation engine re-runs against the unchanged reference. Depths not
//! flagged pass through untouched.

use tracing::{info, warn};

use super::convert::{round2, round4};
use super::propagation::propagate;
use super::reference::find_reference;
use super::EngineError;
use crate::types::{InstrumentRecord, SpikeAudit, SpikeMark, SpikeReplacement};

/// Matching tolerance for analyst-supplied depths against stored steps.
const DEPTH_EPS: f64 = 1e-6;

/// Apply spike replacements to `target_date`'s campaign and re-propagate.
///
/// Returns the audit block listing exactly which depths were touched on
/// which channel; the same block is stored on the campaign.
pub fn apply_spike(
    record: &mut InstrumentRecord,
    target_date: &str,
    corrections: &[SpikeReplacement],
) -> Result<SpikeAudit, EngineError> {
    let reference_date = find_reference(record, target_date)
        .ok_or_else(|| EngineError::MissingReference(target_date.to_string()))?;

    let campaign = record
        .campaign_mut(target_date)
        .ok_or_else(|| EngineError::CampaignNotFound(target_date.to_string()))?;
    let constant = campaign.campaign_info.instrument_constant;

    let mut audit = SpikeAudit::default();
    for point in &mut campaign.calc {
        let Some(correction) = corrections
            .iter()
            .find(|c| (c.depth - point.depth).abs() < DEPTH_EPS)
        else {
            continue;
        };

        let mark = SpikeMark {
            index: point.index,
            cota_abs: point.cota_abs,
            depth: point.depth,
        };

        if correction.replace_a {
            point.a0 = round2(correction.new_a0 * constant);
            point.a180 = round2(correction.new_a180 * constant);
            point.checksum_a = round4(point.a0 + point.a180);
            point.dev_a = round2((point.a0 - point.a180) / 2.0);
            audit.a.push(mark.clone());
        }
        if correction.replace_b {
            point.b0 = round2(correction.new_b0 * constant);
            point.b180 = round2(correction.new_b180 * constant);
            point.checksum_b = round4(point.b0 + point.b180);
            point.dev_b = round2((point.b0 - point.b180) / 2.0);
            audit.b.push(mark);
        }
    }

    if audit.is_empty() {
        warn!(target_date, "no depth matched the requested corrections");
    } else {
        campaign.spike = Some(audit.clone());
    }
    propagate(record, target_date, &reference_date)?;

    info!(
        target_date,
        a = audit.a.len(),
        b = audit.b.len(),
        "spike correction applied"
    );
    Ok(audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::convert::convert;
    use crate::engine::propagation::recompute_chain;
    use crate::types::{Campaign, CampaignInfo, InstrumentInfo};

    fn campaign(reference: bool, rows: &[(i64, f64, f64, f64)]) -> Campaign {
        // rows: (index, depth, a0_raw, a180_raw); channel B held at zero
        let calc = rows
            .iter()
            .map(|&(index, depth, a0, a180)| {
                convert(index, 100.0 - depth, depth, a0, a180, 0.0, 0.0, 0.01)
            })
            .collect();
        Campaign {
            campaign_info: CampaignInfo {
                index_0: 0,
                importador: String::new(),
                instrument_constant: 0.01,
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

    fn record() -> InstrumentRecord {
        let mut record = InstrumentRecord::new(InstrumentInfo::default());
        record.campaigns.insert(
            "2024-01-01T00:00:00".into(),
            // Zero-deviation reference (symmetric channel pair)
            campaign(true, &[(0, 1.0, 100.0, 100.0), (1, 2.0, 100.0, 100.0)]),
        );
        record.campaigns.insert(
            "2024-02-01T00:00:00".into(),
            // Spike at depth 2.0: a0 reads 180 instead of ~120
            campaign(false, &[(0, 1.0, 120.0, -80.0), (1, 2.0, 180.0, -80.0)]),
        );
        record
    }

    #[test]
    fn test_spike_replaces_only_flagged_depth() {
        let mut record = record();
        recompute_chain(&mut record).unwrap();
        let before = record.campaign("2024-02-01T00:00:00").unwrap().calc.clone();

        let audit = apply_spike(
            &mut record,
            "2024-02-01T00:00:00",
            &[SpikeReplacement {
                depth: 2.0,
                replace_a: true,
                replace_b: false,
                new_a0: 120.0,
                new_a180: -80.0,
                new_b0: 0.0,
                new_b180: 0.0,
            }],
        )
        .unwrap();

        assert_eq!(audit.a.len(), 1);
        assert!(audit.b.is_empty());
        assert_eq!(audit.a[0].depth, 2.0);

        let after = record.campaign("2024-02-01T00:00:00").unwrap();
        // Corrected depth: raw 180 -> 120 at k = 0.01
        assert_eq!(after.calc[1].a0, 1.2);
        assert_eq!(after.calc[1].dev_a, 1.0);
        // Untouched depth keeps its base fields bit-for-bit
        assert_eq!(after.calc[0].a0, before[0].a0);
        assert_eq!(after.calc[0].dev_a, before[0].dev_a);
        assert_eq!(after.calc[0].checksum_a, before[0].checksum_a);
        // Channel B untouched everywhere
        assert_eq!(after.calc[1].dev_b, before[1].dev_b);
        // Audit stored on the campaign
        assert!(after.spike.is_some());
    }

    #[test]
    fn test_spike_retriggers_propagation() {
        let mut record = record();
        recompute_chain(&mut record).unwrap();
        apply_spike(
            &mut record,
            "2024-02-01T00:00:00",
            &[SpikeReplacement {
                depth: 2.0,
                replace_a: true,
                replace_b: false,
                new_a0: 120.0,
                new_a180: -80.0,
                new_b0: 0.0,
                new_b180: 0.0,
            }],
        )
        .unwrap();
        let feb = record.campaign("2024-02-01T00:00:00").unwrap();
        // Both depths now read dev 1.0 against a zero-dev reference
        assert_eq!(feb.calc[1].incr_dev_a, 1.0);
        assert_eq!(feb.calc[0].desp_a, 2.0);
        assert_eq!(feb.calc[1].desp_a, 1.0);
    }

    #[test]
    fn test_spike_with_no_matching_depth_stores_no_audit() {
        let mut record = record();
        recompute_chain(&mut record).unwrap();
        let audit = apply_spike(
            &mut record,
            "2024-02-01T00:00:00",
            &[SpikeReplacement {
                depth: 9.0,
                replace_a: true,
                replace_b: false,
                new_a0: 120.0,
                new_a180: -80.0,
                new_b0: 0.0,
                new_b180: 0.0,
            }],
        )
        .unwrap();

        assert!(audit.is_empty());
        let feb = record.campaign("2024-02-01T00:00:00").unwrap();
        assert!(feb.spike.is_none());
        // Readings untouched by the no-op
        assert_eq!(feb.calc[1].a0, 1.8);
    }

    #[test]
    fn test_spike_without_reference_fails() {
        let mut record = record();
        record
            .campaign_mut("2024-01-01T00:00:00")
            .unwrap()
            .campaign_info
            .reference = false;
        let err = apply_spike(&mut record, "2024-02-01T00:00:00", &[]).unwrap_err();
        assert!(matches!(err, EngineError::MissingReference(_)));
    }
}
