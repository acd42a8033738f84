//! Feature-matrix assembly and the train/test split.
//!
//! Turns engineered rows into dense numeric matrices for one target at a
//! time. Wind and solar models see different columns, and each target drops
//! rows missing its own label independently of the other.

use chrono::{DateTime, Utc};
use gridcast_core::{Error, FeatureRow, Result};
use tracing::warn;

use crate::transform::TransformArtifacts;

/// Which generation series a matrix is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Wind,
    Solar,
}

impl TargetKind {
    pub fn label(self, row: &FeatureRow) -> Option<f64> {
        match self {
            TargetKind::Wind => row.wind_mwh_credit,
            TargetKind::Solar => row.solar_mwh_credit,
        }
    }

    /// Column names of the design matrix, in emission order.
    pub fn feature_names(self, artifacts: &TransformArtifacts) -> Vec<String> {
        match self {
            TargetKind::Wind => {
                let mut names = vec!["WindSpeedPCA".to_string(), "hours_after".to_string()];
                names.extend(artifacts.season_encoder.feature_names());
                names.extend(artifacts.wind_dir_encoder.feature_names());
                names
            }
            TargetKind::Solar => [
                "temp_solar",
                "CloudCover",
                "SolarDownwardRadiation",
                "RelativeHumidity",
                "hours_after",
                "month",
                "day",
                "hour",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Dense design matrix for one target.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub timestamps: Vec<DateTime<Utc>>,
    pub rows: Vec<Vec<f64>>,
    /// Empty for inference matrices.
    pub labels: Vec<f64>,
}

impl FeatureMatrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Split engineered rows into train and held-out test by `valid_time`.
///
/// The test window is `[test_start, test_end)`; everything outside it is
/// training data. A pure time split, so rerunning on the same table always
/// yields the same partition.
pub fn split_by_time(
    rows: Vec<FeatureRow>,
    test_start: DateTime<Utc>,
    test_end: DateTime<Utc>,
) -> (Vec<FeatureRow>, Vec<FeatureRow>) {
    let mut train = Vec::new();
    let mut test = Vec::new();
    for row in rows {
        if row.valid_time >= test_start && row.valid_time < test_end {
            test.push(row);
        } else {
            train.push(row);
        }
    }
    (train, test)
}

/// Wind-speed pairs for fitting the PCA pipeline, taken from rows where both
/// heights are present.
pub fn wind_speed_pairs(rows: &[FeatureRow]) -> Vec<[f64; 2]> {
    rows.iter()
        .filter_map(|r| r.wind_speed_10m.zip(r.wind_speed_100m).map(|(a, b)| [a, b]))
        .collect()
}

/// Build the labeled design matrix for one target.
///
/// Rows missing the target's label, or any feature the target needs, are
/// dropped with a count logged; an empty result is fatal.
pub fn build_training_matrix(
    rows: &[FeatureRow],
    target: TargetKind,
    artifacts: &TransformArtifacts,
) -> Result<FeatureMatrix> {
    let names = target.feature_names(artifacts);
    let mut matrix = FeatureMatrix {
        names,
        timestamps: Vec::new(),
        rows: Vec::new(),
        labels: Vec::new(),
    };

    let mut dropped = 0usize;
    for row in rows {
        let label = match target.label(row) {
            Some(l) => l,
            None => {
                dropped += 1;
                continue;
            }
        };
        match feature_vector(target, row, artifacts)? {
            Some(features) => {
                matrix.timestamps.push(row.valid_time);
                matrix.rows.push(features);
                matrix.labels.push(label);
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(
            target = ?target,
            dropped,
            kept = matrix.rows.len(),
            "dropped incomplete rows from design matrix"
        );
    }
    if matrix.is_empty() {
        return Err(Error::alignment(format!(
            "no complete rows remain for {target:?} design matrix"
        )));
    }
    Ok(matrix)
}

/// Build the unlabeled matrix for inference, keeping the timestamps so
/// predictions can be mapped back to settlement periods.
pub fn build_inference_matrix(
    rows: &[FeatureRow],
    target: TargetKind,
    artifacts: &TransformArtifacts,
) -> Result<FeatureMatrix> {
    let names = target.feature_names(artifacts);
    let mut matrix = FeatureMatrix {
        names,
        timestamps: Vec::new(),
        rows: Vec::new(),
        labels: Vec::new(),
    };

    let mut dropped = 0usize;
    for row in rows {
        match feature_vector(target, row, artifacts)? {
            Some(features) => {
                matrix.timestamps.push(row.valid_time);
                matrix.rows.push(features);
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(target = ?target, dropped, "dropped incomplete inference rows");
    }
    if matrix.is_empty() {
        return Err(Error::alignment(format!(
            "no complete rows remain for {target:?} inference"
        )));
    }
    Ok(matrix)
}

/// One dense feature vector, or `None` when the row is missing an input the
/// target requires.
fn feature_vector(
    target: TargetKind,
    row: &FeatureRow,
    artifacts: &TransformArtifacts,
) -> Result<Option<Vec<f64>>> {
    match target {
        TargetKind::Wind => {
            let (speeds, dir_cat) = match (
                row.wind_speed_10m.zip(row.wind_speed_100m),
                row.wind_dir_cat,
            ) {
                (Some(s), Some(d)) => (s, d),
                _ => return Ok(None),
            };
            let pca = artifacts.windspeed_pca.transform([speeds.0, speeds.1]);
            let mut features = vec![pca, row.hours_after];
            features.extend(artifacts.season_encoder.encode(row.season.label())?);
            features.extend(artifacts.wind_dir_encoder.encode(dir_cat.label())?);
            Ok(Some(features))
        }
        TargetKind::Solar => {
            let (temp, cloud, radiation, humidity) = match (
                row.temp_solar,
                row.cloud_cover,
                row.radiation,
                row.relative_humidity,
            ) {
                (Some(t), Some(c), Some(r), Some(h)) => (t, c, r, h),
                _ => return Ok(None),
            };
            Ok(Some(vec![
                temp,
                cloud,
                radiation,
                humidity,
                row.hours_after,
                f64::from(row.month),
                f64::from(row.day),
                f64::from(row.hour),
            ]))
        }
    }
}
