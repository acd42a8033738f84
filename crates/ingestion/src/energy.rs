//! Energy generation normalization.
//!
//! Concatenates the per-period CSV archive, parses settlement timestamps and
//! derives the credit columns. Energy data is already at the 30-minute
//! cadence, so no resampling happens here.

use chrono::{DateTime, NaiveDateTime, Utc};
use gridcast_core::{EnergyRecord, Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Columns every energy CSV must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["dtm", "Wind_MW", "Solar_MW", "boa_MWh"];

#[derive(Debug, Deserialize)]
struct RawEnergyRow {
    dtm: String,
    // Empty cells deserialize as None; a period can miss one metered series
    // while the other is present.
    #[serde(rename = "Wind_MW")]
    wind_mw: Option<f64>,
    #[serde(rename = "Solar_MW")]
    solar_mw: Option<f64>,
    #[serde(rename = "boa_MWh")]
    boa_mwh: Option<f64>,
}

/// Read every `*.csv` file in a directory and build the cleaned energy table,
/// sorted by settlement timestamp.
pub fn load_energy_dir(dir: &Path) -> Result<Vec<EnergyRecord>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::data_format(format!(
            "no energy CSV files found in {}",
            dir.display()
        )));
    }

    let mut records = Vec::new();
    for path in &paths {
        records.extend(read_energy_csv(path)?);
    }
    records.sort_by_key(|r| r.dtm);

    info!(files = paths.len(), rows = records.len(), "cleaned energy data");
    Ok(records)
}

/// Parse one CSV file, failing with `DataFormat` when required columns are
/// absent.
pub fn read_energy_csv(path: &Path) -> Result<Vec<EnergyRecord>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(Error::data_format(format!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<RawEnergyRow>() {
        let raw = row?;
        let dtm = parse_dtm(&raw.dtm)?;
        records.push(EnergyRecord::from_raw(
            dtm,
            raw.wind_mw,
            raw.solar_mw,
            raw.boa_mwh,
        ));
    }
    Ok(records)
}

/// Settlement timestamps appear either as RFC 3339 or as naive UTC.
fn parse_dtm(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(Error::data_format(format!(
        "unparseable settlement timestamp {s:?}"
    )))
}
