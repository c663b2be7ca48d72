//! Reference resolution: which earlier campaign anchors a target campaign
//!
//! Every computed campaign measures its displacement against the nearest
//! reference campaign at or before it, and reference campaigns themselves
//! carry their drift forward from the nearest prior *active* campaign.
//! Campaign keys that do not parse as ISO datetimes are filtered out here,
//! silently — the record must stay usable with stray keys in it.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::types::{parse_campaign_date, InstrumentRecord};

/// All campaign keys that parse as dates, paired with their parsed value,
/// in ascending chronological order.
fn dated_campaigns(record: &InstrumentRecord) -> Vec<(NaiveDateTime, &str)> {
    let mut dated: Vec<(NaiveDateTime, &str)> = record
        .campaigns
        .keys()
        .filter_map(|key| parse_campaign_date(key).map(|dt| (dt, key.as_str())))
        .collect();
    dated.sort_by_key(|(dt, _)| *dt);
    dated
}

/// Dates of all active campaigns, oldest → newest.
///
/// This is the authoritative chain the propagation engine walks.
pub fn active_dates(record: &InstrumentRecord) -> Vec<String> {
    dated_campaigns(record)
        .into_iter()
        .filter(|(_, key)| {
            record
                .campaign(key)
                .is_some_and(|c| c.campaign_info.active)
        })
        .map(|(_, key)| key.to_string())
        .collect()
}

/// Nearest reference campaign at or before `target_date` (inclusive).
///
/// Returns `None` when no reference exists at or before the target — the
/// caller must treat that as a broken precondition, since the first active
/// campaign of a well-formed record is always a reference.
pub fn find_reference(record: &InstrumentRecord, target_date: &str) -> Option<String> {
    let target = parse_campaign_date(target_date)?;
    dated_campaigns(record)
        .into_iter()
        .rev()
        .filter(|(dt, _)| *dt <= target)
        .find(|(_, key)| {
            record
                .campaign(key)
                .is_some_and(|c| c.campaign_info.reference)
        })
        .map(|(_, key)| key.to_string())
}

/// Latest *active* campaign strictly before `target_date`.
///
/// `None` when the target is the earliest active campaign.
pub fn find_prior_active(record: &InstrumentRecord, target_date: &str) -> Option<String> {
    let target = parse_campaign_date(target_date)?;
    let prior = dated_campaigns(record)
        .into_iter()
        .rev()
        .filter(|(dt, _)| *dt < target)
        .find(|(_, key)| {
            record
                .campaign(key)
                .is_some_and(|c| c.campaign_info.active)
        })
        .map(|(_, key)| key.to_string());
    if prior.is_none() {
        debug!(target_date, "no active campaign precedes target");
    }
    prior
}
