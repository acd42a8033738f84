//! Single linear quantile model.
//!
//! A model is a flat weight vector plus intercept, tied to the exact feature
//! columns it was trained on. The column names travel with the persisted
//! model so a matrix built against a different schema is rejected instead of
//! silently mis-scored.

use gridcast_core::{Error, Result};
use gridcast_features::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Linear model for one decile of one generation series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileModel {
    /// Decile level this model predicts (10, 20, ..., 90).
    pub quantile: u8,
    /// Feature columns, in the order the weights apply.
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl QuantileModel {
    /// Predict one value per matrix row.
    ///
    /// The matrix column schema must match the model's exactly, names and
    /// order both.
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        if matrix.names != self.feature_names {
            return Err(Error::model(format!(
                "feature schema mismatch for q{} model: expected {:?}, got {:?}",
                self.quantile, self.feature_names, matrix.names
            )));
        }
        Ok(matrix.rows.iter().map(|row| self.predict_row(row)).collect())
    }

    #[inline]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::model(format!("cannot read model {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&text)?)
    }
}
