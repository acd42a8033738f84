//! End-to-end pipeline runs.
//!
//! Two entry points: `run_training` rebuilds the transform and model
//! artifacts from the local archives, and `run_day_ahead` produces the next
//! market day's bid document from the latest provider forecast using those
//! artifacts read-only.

use chrono::{DateTime, NaiveDate, Utc};
use gridcast_core::{
    config::PipelineConfig, Error, MergedRecord, Quantiles, Result, SubmissionRecord,
};
use gridcast_features::{
    build_inference_matrix, build_training_matrix, engineer_features, join_weather,
    merge_with_energy, split_by_time, wind_speed_pairs, FeatureMatrix, TargetKind,
    TransformArtifacts,
};
use gridcast_ingestion::{
    load_energy_dir, load_hornsea_dir, load_solar_dir, normalize_hornsea, normalize_solar,
    RebaseClient,
};
use std::collections::BTreeMap;
use tracing::info;

use crate::ensemble::{combine_marginals, QuantileEnsemble};
use crate::metrics::pinball_score;
use crate::submission::{build_submission, day_ahead_market_times, format_submission, SubmissionFile};
use crate::train::train_ensemble;

/// Held-out pinball scores from a training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainingReport {
    pub wind_score: f64,
    pub solar_score: f64,
}

/// Fit transforms and both quantile ensembles from the local archives, save
/// every artifact, and score both ensembles on the held-out window.
pub fn run_training(config: &PipelineConfig) -> Result<TrainingReport> {
    let hornsea = load_hornsea_dir(&config.paths.weather_dir)?;
    let solar = load_solar_dir(&config.paths.weather_dir)?;
    let energy = load_energy_dir(&config.paths.energy_dir)?;

    let weather = join_weather(&hornsea, &solar)?;
    let merged = merge_with_energy(&weather, &energy, config.horizon.max_hours_after)?;
    let rows = engineer_features(&merged);
    let (train, test) = split_by_time(rows, config.split.test_start, config.split.test_end);
    info!(train = train.len(), test = test.len(), "split modeling table");

    let artifacts = TransformArtifacts::fit(&wind_speed_pairs(&train))?;
    artifacts.save_dir(&config.paths.transforms_dir)?;

    let mut scores = [0.0f64; 2];
    for (target, models_dir, slot) in [
        (TargetKind::Wind, &config.paths.wind_models_dir, 0),
        (TargetKind::Solar, &config.paths.solar_models_dir, 1),
    ] {
        let train_matrix = build_training_matrix(&train, target, &artifacts)?;
        let ensemble = train_ensemble(&train_matrix, &config.training)?;
        ensemble.save_dir(models_dir)?;

        let test_matrix = build_training_matrix(&test, target, &artifacts)?;
        let predictions = ensemble.predict(&test_matrix)?;
        let score = pinball_score(&predictions, &test_matrix.labels)?;
        info!(?target, score, "held-out pinball score");
        scores[slot] = score;
    }

    Ok(TrainingReport {
        wind_score: scores[0],
        solar_score: scores[1],
    })
}

/// Build the bid document for one market day from the latest provider
/// forecast. Artifacts are loaded read-only; nothing is refit here.
pub fn run_day_ahead(
    client: &RebaseClient,
    config: &PipelineConfig,
    market_day: NaiveDate,
) -> Result<SubmissionFile> {
    let hornsea = normalize_hornsea(&client.latest_hornsea_grid()?)?;
    let solar = normalize_solar(&client.latest_solar_points()?)?;
    let weather = join_weather(&hornsea, &solar)?;

    let market_times = day_ahead_market_times(market_day)?;
    let merged: Vec<MergedRecord> = weather
        .iter()
        .filter(|row| market_times.contains(&row.valid_time))
        .map(|row| MergedRecord {
            weather: row.clone(),
            wind_mwh_credit: None,
            solar_mwh_credit: None,
        })
        .collect();
    if merged.is_empty() {
        return Err(Error::alignment(format!(
            "latest forecast covers none of the {} market periods for {market_day}",
            market_times.len()
        )));
    }
    let rows = engineer_features(&merged);

    let artifacts = TransformArtifacts::load_dir(&config.paths.transforms_dir)?;
    let wind_ensemble = QuantileEnsemble::load_dir(&config.paths.wind_models_dir)?;
    let solar_ensemble = QuantileEnsemble::load_dir(&config.paths.solar_models_dir)?;

    let wind_matrix = build_inference_matrix(&rows, TargetKind::Wind, &artifacts)?;
    let solar_matrix = build_inference_matrix(&rows, TargetKind::Solar, &artifacts)?;
    let wind_by_time = index_by_time(&wind_matrix, wind_ensemble.predict(&wind_matrix)?);
    let solar_by_time = index_by_time(&solar_matrix, solar_ensemble.predict(&solar_matrix)?);

    let records = assemble_periods(&market_times, &wind_by_time, &solar_by_time)?;
    Ok(format_submission(market_day, &records, &config.submission))
}

fn index_by_time(
    matrix: &FeatureMatrix,
    predictions: Vec<Quantiles>,
) -> BTreeMap<DateTime<Utc>, Quantiles> {
    // Later entries win, and rows arrive sorted by reference_time, so a
    // period forecast twice keeps the most recent issue.
    matrix
        .timestamps
        .iter()
        .copied()
        .zip(predictions)
        .collect()
}

/// Pair both marginals for every market period; a period either side cannot
/// forecast is fatal, since the market expects a complete day.
fn assemble_periods(
    market_times: &[DateTime<Utc>],
    wind: &BTreeMap<DateTime<Utc>, Quantiles>,
    solar: &BTreeMap<DateTime<Utc>, Quantiles>,
) -> Result<Vec<SubmissionRecord>> {
    let mut wind_rows = Vec::with_capacity(market_times.len());
    let mut solar_rows = Vec::with_capacity(market_times.len());
    for t in market_times {
        match (wind.get(t), solar.get(t)) {
            (Some(&w), Some(&s)) => {
                wind_rows.push(w);
                solar_rows.push(s);
            }
            _ => {
                return Err(Error::alignment(format!(
                    "no complete forecast for market period {t}"
                )))
            }
        }
    }
    let totals = combine_marginals(&wind_rows, &solar_rows)?;
    build_submission(market_times, &totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn quantiles(base: f64) -> Quantiles {
        let mut v = [0.0; 9];
        for (k, x) in v.iter_mut().enumerate() {
            *x = base + k as f64;
        }
        Quantiles(v)
    }

    #[test]
    fn test_assemble_sums_marginals_per_period() {
        let times = vec![ts(0, 0), ts(0, 30)];
        let wind: BTreeMap<_, _> = times.iter().map(|&t| (t, quantiles(100.0))).collect();
        let solar: BTreeMap<_, _> = times.iter().map(|&t| (t, quantiles(10.0))).collect();
        let records = assemble_periods(&times, &wind, &solar).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantiles.at_level(10).unwrap(), 110.0);
        assert_eq!(records[0].market_bid, records[0].quantiles.median());
    }

    #[test]
    fn test_missing_period_is_alignment_error() {
        let times = vec![ts(0, 0), ts(0, 30)];
        let wind: BTreeMap<_, _> = times.iter().map(|&t| (t, quantiles(100.0))).collect();
        // Solar misses the second period.
        let solar: BTreeMap<_, _> = [(ts(0, 0), quantiles(10.0))].into_iter().collect();
        assert!(matches!(
            assemble_periods(&times, &wind, &solar),
            Err(Error::Alignment(_))
        ));
    }

    #[test]
    fn test_index_keeps_latest_duplicate() {
        let matrix = FeatureMatrix {
            names: vec![],
            timestamps: vec![ts(0, 0), ts(0, 0)],
            rows: vec![vec![], vec![]],
            labels: vec![],
        };
        let indexed = index_by_time(&matrix, vec![quantiles(1.0), quantiles(2.0)]);
        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed[&ts(0, 0)].at_level(10).unwrap(), 2.0);
    }
}
