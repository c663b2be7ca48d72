//! Window statistics for spike replacement suggestions
//!
//! The spike table offers the analyst a replacement value per flagged depth:
//! a measure of central tendency over the raw readings of the N prior
//! campaigns at the same tube index, excluding the campaign under
//! correction. Mean and median come from statrs; mode counts raw values
//! rounded to 4 decimals (logger quantization makes exact repeats common).

use statrs::statistics::{Data, Median, Statistics};
use tracing::debug;

use super::reference::active_dates;
use crate::types::{parse_campaign_date, Channel, InstrumentRecord};

/// Central-tendency statistic selectable in the spike table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
    Mode,
}

/// Suggested raw replacement pair for one channel at one depth index:
/// the statistic applied to ch0 and ch180 independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSuggestion {
    pub ch0: f64,
    pub ch180: f64,
}

/// Compute the suggestion for `channel` at `index` over the `window` active
/// campaigns preceding `target_date` (exclusive).
///
/// Returns `None` when the target date does not parse or no prior campaign
/// carries a raw reading at that index — a defensive skip, not an error.
pub fn window_statistic(
    record: &InstrumentRecord,
    target_date: &str,
    index: i64,
    channel: Channel,
    window: usize,
    statistic: Statistic,
) -> Option<ChannelSuggestion> {
    let mut ch0 = Vec::new();
    let mut ch180 = Vec::new();

    let target = parse_campaign_date(target_date)?;
    let dates = active_dates(record);
    let prior = dates
        .iter()
        .filter(|d| parse_campaign_date(d).is_some_and(|dt| dt < target))
        .collect::<Vec<_>>();
    for date in prior.into_iter().rev().take(window) {
        let Some(campaign) = record.campaign(date) else {
            continue;
        };
        let Some(reading) = campaign.raw.iter().find(|r| r.index == index) else {
            debug!(date = date.as_str(), index, "no raw reading at index, skipped");
            continue;
        };
        match channel {
            Channel::A => {
                ch0.push(reading.a0);
                ch180.push(reading.a180);
            }
            Channel::B => {
                ch0.push(reading.b0);
                ch180.push(reading.b180);
            }
        }
    }

    if ch0.is_empty() {
        return None;
    }

    Some(ChannelSuggestion {
        ch0: apply_statistic(&ch0, statistic)?,
        ch180: apply_statistic(&ch180, statistic)?,
    })
}

fn apply_statistic(values: &[f64], statistic: Statistic) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match statistic {
        Statistic::Mean => Some(Statistics::mean(values.iter())),
        Statistic::Median => Some(Data::new(values.to_vec()).median()),
        Statistic::Mode => mode(values),
    }
}

/// Most frequent value after 4-decimal quantization; ties break toward the
/// smaller value. `None` on empty input.
fn mode(values: &[f64]) -> Option<f64> {
    let mut quantized: Vec<i64> = values
        .iter()
        .map(|v| (v * 10_000.0).round() as i64)
        .collect();
    quantized.sort_unstable();

    let mut best: Option<(i64, usize)> = None;
    let mut i = 0;
    while i < quantized.len() {
        let mut j = i;
        while j < quantized.len() && quantized[j] == quantized[i] {
            j += 1;
        }
        let count = j - i;
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((quantized[i], count));
        }
        i = j;
    }
    best.map(|(q, _)| q as f64 / 10_000.0)
}

/// Sample standard deviation; 0.0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    Statistics::std_dev(values.iter())
}
