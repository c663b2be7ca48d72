//! Tiltcore CLI — drive the campaign engine against a record file
//!
//! # Usage
//!
//! ```bash
//! # List campaigns and their flags
//! tiltcore inspect inc-07.json
//!
//! # Re-run the propagation chain and write the record back
//! tiltcore recompute inc-07.json
//!
//! # Apply spike replacements from a JSON file
//! tiltcore spike inc-07.json --date 2024-02-01T00:00:00 --corrections spikes.json
//!
//! # Apply a bias table from a TOML file
//! tiltcore bias inc-07.json --date 2024-02-01T00:00:00 --params bias.toml
//! ```
//!
//! `RUST_LOG` controls logging (default: info).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tiltcore::engine::{
    active_dates, apply_bias, apply_spike, recompute_campaign, recompute_chain,
};
use tiltcore::storage::{load_record, save_record};
use tiltcore::types::{BiasTable, CorrectionAudit, SpikeReplacement};

#[derive(Parser, Debug)]
#[command(name = "tiltcore")]
#[command(about = "Borehole inclinometer campaign processing and correction")]
#[command(version)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// List campaigns, flags and depth counts of a record
    Inspect {
        /// Path to the instrument record JSON
        record: PathBuf,
    },
    /// Re-run the propagation chain and save the record
    Recompute {
        record: PathBuf,
        /// Recompute only this campaign (default: whole active chain)
        #[arg(long)]
        date: Option<String>,
    },
    /// Apply spike replacements and save the record
    Spike {
        record: PathBuf,
        /// Campaign to correct (ISO-8601 date key)
        #[arg(long)]
        date: String,
        /// JSON file with a list of spike replacements
        #[arg(long)]
        corrections: PathBuf,
    },
    /// Apply a bias correction table and save the record
    Bias {
        record: PathBuf,
        /// Campaign to correct (ISO-8601 date key)
        #[arg(long)]
        date: String,
        /// TOML file with the four-segment bias table
        #[arg(long)]
        params: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match CliArgs::parse().command {
        Command::Inspect { record } => {
            let record = load_record(&record).context("failed to load record")?;
            println!("instrument: {}", record.info.name);
            for (date, campaign) in &record.campaigns {
                let ci = &campaign.campaign_info;
                println!(
                    "{date}  steps={:<4} reference={:<5} active={:<5} quarentine={:<5} spike={} bias={}",
                    campaign.calc.len(),
                    ci.reference,
                    ci.active,
                    ci.quarentine,
                    campaign.spike.is_some(),
                    campaign.bias.is_some(),
                );
            }
            println!("active chain: {} campaigns", active_dates(&record).len());
        }
        Command::Recompute { record: path, date } => {
            let mut record = load_record(&path).context("failed to load record")?;
            match date {
                Some(date) => recompute_campaign(&mut record, &date)
                    .with_context(|| format!("recompute failed for {date}"))?,
                None => recompute_chain(&mut record).context("chain recompute failed")?,
            }
            save_record(&path, &record).context("failed to save record")?;
        }
        Command::Spike {
            record: path,
            date,
            corrections,
        } => {
            let mut record = load_record(&path).context("failed to load record")?;
            let corrections: Vec<SpikeReplacement> = serde_json::from_str(
                &fs::read_to_string(&corrections).context("failed to read corrections file")?,
            )
            .context("failed to parse corrections file")?;
            let audit = apply_spike(&mut record, &date, &corrections)
                .with_context(|| format!("spike correction failed for {date}"))?;
            info!(
                a = audit.a.len(),
                b = audit.b.len(),
                "depths corrected, saving record"
            );
            save_record(&path, &record).context("failed to save record")?;
            println!("{}", serde_json::to_string_pretty(&CorrectionAudit::Spike(audit))?);
        }
        Command::Bias {
            record: path,
            date,
            params,
        } => {
            let mut record = load_record(&path).context("failed to load record")?;
            let table: BiasTable = toml::from_str(
                &fs::read_to_string(&params).context("failed to read bias params file")?,
            )
            .context("failed to parse bias params file")?;
            let outcome = apply_bias(&mut record, &date, &table)
                .with_context(|| format!("bias correction failed for {date}"))?;
            info!(
                rows = outcome.rows.len(),
                std_incr_a = outcome.std_incr_a,
                std_incr_b = outcome.std_incr_b,
                "bias applied, saving record"
            );
            save_record(&path, &record).context("failed to save record")?;
            println!("{}", serde_json::to_string_pretty(&CorrectionAudit::Bias(outcome.audit))?);
        }
    }

    Ok(())
}
