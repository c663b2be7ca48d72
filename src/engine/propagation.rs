//! Increment/displacement propagation engine
//!
//! The chained computation at the centre of the system. For one target
//! campaign, per depth step:
//!
//! 1. `incr_dev = dev - dev[reference]` at the matching tube index
//! 2. `incr_dev_abs = incr_dev + incr_dev_abs[reference]` — drift chained
//!    forward through the reference link
//! 3. `abs_dev[i] = Σ dev[i..]` — tail sum to the tube bottom (tube shape)
//! 4. `desp[i] = Σ incr_dev[i..]` plus the carried-forward offset — absolute
//!    lateral displacement since tube origin
//!
//! A campaign that is itself a reference does not reset drift to zero: its
//! `incr_dev_abs` and its displacement offset are inherited from the nearest
//! prior *active* campaign, so displacement stays continuous across
//! re-referencing. The chronologically first active campaign (necessarily a
//! reference) has no prior active campaign and starts the chain at its own
//! self-relative values, i.e. zero.
//!
//! Depth steps whose index is absent from the reference are left untouched —
//! a defensive no-op, the record must stay usable with partial imports.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::convert::round2;
use super::reference::{active_dates, find_prior_active, find_reference};
use super::EngineError;
use crate::types::{Campaign, InstrumentRecord};

/// The fields of an anchor campaign (reference or prior active) consumed per
/// depth index during propagation.
struct AnchorPoint {
    dev_a: f64,
    dev_b: f64,
    incr_dev_abs_a: f64,
    incr_dev_abs_b: f64,
    desp_a: f64,
    desp_b: f64,
}

fn anchor_map(campaign: &Campaign) -> HashMap<i64, AnchorPoint> {
    campaign
        .calc
        .iter()
        .map(|p| {
            (
                p.index,
                AnchorPoint {
                    dev_a: p.dev_a,
                    dev_b: p.dev_b,
                    incr_dev_abs_a: p.incr_dev_abs_a,
                    incr_dev_abs_b: p.incr_dev_abs_b,
                    desp_a: p.desp_a,
                    desp_b: p.desp_b,
                },
            )
        })
        .collect()
}

/// Recompute the derived series of `target_date`'s calc block against
/// `reference_date`. All other campaigns are read-only inputs.
pub fn propagate(
    record: &mut InstrumentRecord,
    target_date: &str,
    reference_date: &str,
) -> Result<(), EngineError> {
    let reference = record
        .campaign(reference_date)
        .ok_or_else(|| EngineError::CampaignNotFound(reference_date.to_string()))?;
    let ref_points = anchor_map(reference);

    let prior_points = find_prior_active(record, target_date)
        .and_then(|date| record.campaign(&date).map(anchor_map))
        .unwrap_or_default();

    let is_self_reference = target_date == reference_date;
    let is_first_active = active_dates(record).first().map(String::as_str) == Some(target_date);
    let inherits_chain = is_self_reference || is_first_active;

    let campaign = record
        .campaign_mut(target_date)
        .ok_or_else(|| EngineError::CampaignNotFound(target_date.to_string()))?;
    if campaign.calc.is_empty() {
        warn!(target_date, "calc block empty, nothing to propagate");
        return Ok(());
    }

    // Pass 1: incremental deviation and chained drift, per depth index
    for point in &mut campaign.calc {
        let Some(anchor) = ref_points.get(&point.index) else {
            debug!(target_date, index = point.index, "index absent from reference, skipped");
            continue;
        };
        point.incr_dev_a = round2(point.dev_a - anchor.dev_a);
        point.incr_dev_b = round2(point.dev_b - anchor.dev_b);
        point.incr_dev_abs_a = round2(point.incr_dev_a + anchor.incr_dev_abs_a);
        point.incr_dev_abs_b = round2(point.incr_dev_b + anchor.incr_dev_abs_b);

        if inherits_chain {
            match prior_points.get(&point.index) {
                Some(prior) => {
                    point.incr_dev_abs_a = prior.incr_dev_abs_a;
                    point.incr_dev_abs_b = prior.incr_dev_abs_b;
                }
                // First active campaign, or a step the prior campaign never
                // reached: the chain starts here
                None => {
                    point.incr_dev_abs_a = point.incr_dev_a;
                    point.incr_dev_abs_b = point.incr_dev_b;
                }
            }
        }
    }

    // Pass 2: tail sums, deepest step first
    let mut tail_dev_a = 0.0;
    let mut tail_dev_b = 0.0;
    let mut tail_incr_a = 0.0;
    let mut tail_incr_b = 0.0;
    for point in campaign.calc.iter_mut().rev() {
        tail_dev_a += point.dev_a;
        tail_dev_b += point.dev_b;
        tail_incr_a += point.incr_dev_a;
        tail_incr_b += point.incr_dev_b;
        point.abs_dev_a = round2(tail_dev_a);
        point.abs_dev_b = round2(tail_dev_b);
        // Unrounded tail held here until the offset is applied below
        point.desp_a = tail_incr_a;
        point.desp_b = tail_incr_b;
    }

    // Pass 3: anchor the displacement series. A reference campaign anchors on
    // its prior active campaign, everything else on its reference.
    let offsets = if is_self_reference {
        &prior_points
    } else {
        &ref_points
    };
    for point in &mut campaign.calc {
        let (off_a, off_b) = offsets
            .get(&point.index)
            .map_or((0.0, 0.0), |p| (p.desp_a, p.desp_b));
        point.desp_a = round2(point.desp_a + off_a);
        point.desp_b = round2(point.desp_b + off_b);
    }

    Ok(())
}

/// Resolve a campaign's reference and propagate it.
pub fn recompute_campaign(record: &mut InstrumentRecord, target_date: &str) -> Result<(), EngineError> {
    let reference_date = find_reference(record, target_date)
        .ok_or_else(|| EngineError::MissingReference(target_date.to_string()))?;
    propagate(record, target_date, &reference_date)
}

/// Walk the whole active chain oldest → newest and propagate every campaign.
///
/// This is the full-record recompute triggered after import or correction.
pub fn recompute_chain(record: &mut InstrumentRecord) -> Result<(), EngineError> {
    let dates = active_dates(record);
    for date in &dates {
        recompute_campaign(record, date)?;
    }
    info!(campaigns = dates.len(), "active chain recomputed");
    Ok(())
}
