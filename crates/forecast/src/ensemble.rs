//! Nine-model quantile ensemble for one generation series, and the
//! marginal-combination step that turns two series into total-generation
//! quantiles.

use gridcast_core::{Error, Quantiles, Result, QUANTILE_LEVELS};
use gridcast_features::FeatureMatrix;
use ordered_float::OrderedFloat;
use std::path::Path;
use tracing::info;

use crate::model::QuantileModel;

/// One trained model per decile, q10 through q90.
#[derive(Debug, Clone)]
pub struct QuantileEnsemble {
    models: Vec<QuantileModel>,
}

fn model_file_name(level: u8) -> String {
    format!("model_q{level}.json")
}

impl QuantileEnsemble {
    /// Assemble from nine models, one per decile in ascending order.
    pub fn new(models: Vec<QuantileModel>) -> Result<Self> {
        let levels: Vec<u8> = models.iter().map(|m| m.quantile).collect();
        if levels != QUANTILE_LEVELS {
            return Err(Error::model(format!(
                "ensemble requires one model per decile q10..q90, got {levels:?}"
            )));
        }
        Ok(Self { models })
    }

    pub fn models(&self) -> &[QuantileModel] {
        &self.models
    }

    /// Load `model_q10.json` .. `model_q90.json` from a directory.
    ///
    /// A partial set is refused outright; predicting from fewer than nine
    /// deciles would silently skew every downstream quantile.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut models = Vec::with_capacity(QUANTILE_LEVELS.len());
        let mut found = 0usize;
        let mut missing = Vec::new();
        for level in QUANTILE_LEVELS {
            let path = dir.join(model_file_name(level));
            if path.is_file() {
                models.push(QuantileModel::load(&path)?);
                found += 1;
            } else {
                missing.push(model_file_name(level));
            }
        }
        if found != QUANTILE_LEVELS.len() {
            info!(dir = %dir.display(), ?missing, "ensemble directory incomplete");
            return Err(Error::IncompleteEnsemble { found });
        }
        Self::new(models)
    }

    /// Persist all nine models into a directory.
    pub fn save_dir(&self, dir: &Path) -> Result<()> {
        for model in &self.models {
            model.save(&dir.join(model_file_name(model.quantile)))?;
        }
        info!(dir = %dir.display(), "saved quantile ensemble");
        Ok(())
    }

    /// Predict all nine deciles for every matrix row.
    ///
    /// Generation cannot be negative, so raw model output is clipped at
    /// zero per value.
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Quantiles>> {
        let per_model: Vec<Vec<f64>> = self
            .models
            .iter()
            .map(|m| m.predict(matrix))
            .collect::<Result<_>>()?;

        let mut out = Vec::with_capacity(matrix.rows.len());
        for row in 0..matrix.rows.len() {
            let mut values = [0.0f64; 9];
            for (k, preds) in per_model.iter().enumerate() {
                values[k] = preds[row].max(0.0);
            }
            out.push(Quantiles(values));
        }
        Ok(out)
    }
}

/// Combine per-series marginal quantiles into total-generation quantiles.
///
/// Deciles are summed level-by-level across the two series, then re-sorted
/// ascending within each period. The sum of two marginal decile curves is
/// not itself guaranteed monotone, and the market submission requires
/// non-crossing quantiles; sorting restores that without changing the set
/// of values.
pub fn combine_marginals(wind: &[Quantiles], solar: &[Quantiles]) -> Result<Vec<Quantiles>> {
    if wind.len() != solar.len() {
        return Err(Error::alignment(format!(
            "marginal quantile tables differ in length: {} wind vs {} solar",
            wind.len(),
            solar.len()
        )));
    }
    Ok(wind
        .iter()
        .zip(solar)
        .map(|(w, s)| {
            let mut total = [0.0f64; 9];
            for k in 0..9 {
                total[k] = w.0[k] + s.0[k];
            }
            total.sort_by_key(|&v| OrderedFloat(v));
            Quantiles(total)
        })
        .collect())
}
