//! Instrument record: the per-instrument document
//!
//! On disk this is a single JSON object mapping ISO-8601 campaign dates to
//! campaigns, plus two reserved non-date keys: `info` (instrument metadata)
//! and `umbrales` (alarm-threshold curves, opaque to the engine).

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::calc::{CalcPoint, Reading};
use super::correction::{BiasAudit, SpikeAudit};

/// Instrument metadata stored under the reserved `info` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// Instrument name / borehole identifier.
    #[serde(default)]
    pub name: String,
    /// Collar elevation used at calibration (m).
    #[serde(default)]
    pub cota: f64,
    /// Acquisition mode of the logger (e.g. "manual", "datalogger").
    #[serde(default)]
    pub modo: String,
    /// Sensor orientation sign convention.
    #[serde(default)]
    pub criterio: String,
}

/// Per-campaign flags and import metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignInfo {
    /// Absolute tube index of the first (shallowest) step in this campaign.
    #[serde(default)]
    pub index_0: i64,
    /// Importer that produced this campaign (file format / operator tag).
    #[serde(default)]
    pub importador: String,
    /// Calibration constant: raw count → mm of lateral displacement.
    pub instrument_constant: f64,
    /// Marks this campaign as the displacement baseline for subsequent
    /// campaigns up to the next reference.
    #[serde(default)]
    pub reference: bool,
    /// Eligible to participate in the reference/propagation chain.
    /// Inactive campaigns are skipped entirely.
    #[serde(default)]
    pub active: bool,
    /// Held back from plots and exports pending review.
    #[serde(default)]
    pub quarentine: bool,
    /// Alarm state assigned by threshold evaluation (opaque to the engine).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm: Option<serde_json::Value>,
}

/// One full set of inclinometer readings taken on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub campaign_info: CampaignInfo,
    /// Readings as imported, one per depth step. Never mutated.
    #[serde(default)]
    pub raw: Vec<Reading>,
    /// Calibrated values plus derived series, one per depth step.
    #[serde(default)]
    pub calc: Vec<CalcPoint>,
    /// Audit of the spike correction applied to this campaign, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spike: Option<SpikeAudit>,
    /// Audit of the bias correction applied to this campaign, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<BiasAudit>,
}

impl Campaign {
    /// Look up a calc point by absolute tube index.
    pub fn calc_at(&self, index: i64) -> Option<&CalcPoint> {
        self.calc.iter().find(|p| p.index == index)
    }
}

/// The full per-instrument document.
///
/// Campaign keys are ISO-8601 datetimes (`"2024-03-15T10:30:00"`); the
/// `BTreeMap` keeps them lexicographically — and therefore chronologically —
/// ordered. Keys that do not parse as datetimes are tolerated on load and
/// simply ignored by the engine (see [`parse_campaign_date`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Instrument metadata (reserved key).
    #[serde(default)]
    pub info: InstrumentInfo,
    /// Alarm-threshold curves (reserved key). Opaque to the engine; carried
    /// through load/save untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umbrales: Option<serde_json::Value>,
    /// Campaigns keyed by ISO-8601 date string.
    #[serde(flatten)]
    pub campaigns: BTreeMap<String, Campaign>,
}

impl InstrumentRecord {
    /// Empty record with the given metadata.
    pub fn new(info: InstrumentInfo) -> Self {
        Self {
            info,
            umbrales: None,
            campaigns: BTreeMap::new(),
        }
    }

    pub fn campaign(&self, date: &str) -> Option<&Campaign> {
        self.campaigns.get(date)
    }

    pub fn campaign_mut(&mut self, date: &str) -> Option<&mut Campaign> {
        self.campaigns.get_mut(date)
    }
}

/// Parse a campaign key as an ISO-8601 datetime.
///
/// Returns `None` for malformed keys — those are filtered out defensively
/// rather than raised, so a record with a stray key remains usable.
pub fn parse_campaign_date(key: &str) -> Option<NaiveDateTime> {
    key.parse::<NaiveDateTime>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_campaign_date_iso() {
        let parsed = parse_campaign_date("2024-03-15T10:30:00");
        assert!(parsed.is_some(), "plain ISO datetime must parse");
    }

    #[test]
    fn test_parse_campaign_date_rejects_reserved_keys() {
        assert!(parse_campaign_date("info").is_none());
        assert!(parse_campaign_date("umbrales").is_none());
        assert!(parse_campaign_date("2024-03-15").is_none(), "date without time is not a campaign key");
    }

    #[test]
    fn test_record_roundtrip_preserves_reserved_keys() {
        let json = serde_json::json!({
            "info": {"name": "INC-01", "cota": 512.3, "modo": "manual", "criterio": "A+ hacia aguas abajo"},
            "umbrales": {"warning": [1.0, 2.0]},
            "2024-01-01T00:00:00": {
                "campaign_info": {"instrument_constant": 0.02, "reference": true, "active": true},
                "raw": [],
                "calc": []
            }
        });
        let record: InstrumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.info.name, "INC-01");
        assert!(record.umbrales.is_some());
        assert_eq!(record.campaigns.len(), 1);
        let back = serde_json::to_value(&record).unwrap();
        assert!(back.get("2024-01-01T00:00:00").is_some());
        assert!(back.get("umbrales").is_some());
    }
}
