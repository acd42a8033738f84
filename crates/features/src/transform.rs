//! Fitted transform artifacts.
//!
//! The wind-speed PCA pipeline and the categorical encoders are fit exactly
//! once, on training data, then persisted and reused read-only for test and
//! inference rows. Keeping a single fitted object is what prevents
//! train/inference transformation skew by construction.

use gridcast_core::{Error, Result, Season, WindDirCat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Standardize-then-project pipeline compressing the two correlated
/// wind-speed columns (10 m, 100 m) into one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalePcaPipeline {
    mean: [f64; 2],
    std: [f64; 2],
    /// First principal axis in standardized space, unit length, first
    /// non-zero component positive so refits on identical data are
    /// bit-identical.
    axis: [f64; 2],
}

impl ScalePcaPipeline {
    /// Fit on training pairs only. Needs at least two observations and
    /// non-degenerate variance in both columns.
    pub fn fit(pairs: &[[f64; 2]]) -> Result<Self> {
        if pairs.len() < 2 {
            return Err(Error::model(format!(
                "cannot fit wind-speed PCA on {} observation(s)",
                pairs.len()
            )));
        }
        let n = pairs.len() as f64;

        let mut mean = [0.0; 2];
        for p in pairs {
            mean[0] += p[0];
            mean[1] += p[1];
        }
        mean[0] /= n;
        mean[1] /= n;

        let mut var = [0.0; 2];
        let mut cov = 0.0;
        for p in pairs {
            let d0 = p[0] - mean[0];
            let d1 = p[1] - mean[1];
            var[0] += d0 * d0;
            var[1] += d1 * d1;
            cov += d0 * d1;
        }
        var[0] /= n;
        var[1] /= n;
        cov /= n;

        if var[0] <= 0.0 || var[1] <= 0.0 {
            return Err(Error::model(
                "wind-speed PCA input has a zero-variance column",
            ));
        }
        let std = [var[0].sqrt(), var[1].sqrt()];

        // Covariance of the standardized columns; both variances become 1.
        let c = cov / (std[0] * std[1]);

        // Principal eigenvector of [[1, c], [c, 1]].
        let axis = if c.abs() < f64::EPSILON {
            [1.0, 0.0]
        } else {
            let inv_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
            [inv_sqrt2, c.signum() * inv_sqrt2]
        };

        Ok(Self { mean, std, axis })
    }

    /// Project one (10 m, 100 m) wind-speed pair onto the fitted axis.
    pub fn transform(&self, pair: [f64; 2]) -> f64 {
        let z0 = (pair[0] - self.mean[0]) / self.std[0];
        let z1 = (pair[1] - self.mean[1]) / self.std[1];
        z0 * self.axis[0] + z1 * self.axis[1]
    }
}

/// One-hot encoder with a frozen category list.
///
/// Categories are fixed when the encoder is built and persisted with it;
/// they are never re-derived from inference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEncoder {
    prefix: String,
    categories: Vec<String>,
}

impl CategoryEncoder {
    pub fn new(prefix: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            categories,
        }
    }

    /// The frozen season encoder.
    pub fn season() -> Self {
        Self::new(
            "season",
            Season::ALL.iter().map(|s| s.label().to_string()).collect(),
        )
    }

    /// The frozen wind-direction bucket encoder.
    pub fn wind_dir() -> Self {
        Self::new(
            "wind_dir_cat",
            WindDirCat::ALL.iter().map(|c| c.label().to_string()).collect(),
        )
    }

    /// Output column names, e.g. `season_autumn`.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.prefix, c))
            .collect()
    }

    /// Encode one label. Unknown labels are a schema fault, not a new
    /// category.
    pub fn encode(&self, label: &str) -> Result<Vec<f64>> {
        let idx = self
            .categories
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| {
                Error::data_format(format!(
                    "unknown category {label:?} for encoder {:?}",
                    self.prefix
                ))
            })?;
        let mut out = vec![0.0; self.categories.len()];
        out[idx] = 1.0;
        Ok(out)
    }
}

/// The complete set of fitted transforms persisted between training and
/// inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformArtifacts {
    pub windspeed_pca: ScalePcaPipeline,
    pub season_encoder: CategoryEncoder,
    pub wind_dir_encoder: CategoryEncoder,
}

const ARTIFACT_FILE: &str = "transforms.json";

impl TransformArtifacts {
    /// Fit the PCA pipeline on training wind speeds and freeze the
    /// categorical encoders.
    pub fn fit(train_wind_speeds: &[[f64; 2]]) -> Result<Self> {
        Ok(Self {
            windspeed_pca: ScalePcaPipeline::fit(train_wind_speeds)?,
            season_encoder: CategoryEncoder::season(),
            wind_dir_encoder: CategoryEncoder::wind_dir(),
        })
    }

    /// Persist to `<dir>/transforms.json`.
    pub fn save_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join(ARTIFACT_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "saved fitted transforms");
        Ok(())
    }

    /// Load previously fitted transforms.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(ARTIFACT_FILE);
        let text = fs::read_to_string(&path).map_err(|e| {
            Error::model(format!(
                "missing fitted transforms at {}: {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}
