//! Quantile regression training.
//!
//! Full-batch subgradient descent on the pinball loss. Features are
//! standardized internally so one learning rate works across columns with
//! very different scales; the learned weights are folded back to the
//! original scale before the model is returned, so prediction needs no
//! scaler.

use gridcast_core::{config::TrainingConfig, Error, Result, QUANTILE_LEVELS};
use gridcast_features::FeatureMatrix;
use tracing::{debug, info};

use crate::ensemble::QuantileEnsemble;
use crate::model::QuantileModel;

/// Train one linear model for one decile.
pub fn train_quantile_model(
    matrix: &FeatureMatrix,
    quantile: u8,
    config: &TrainingConfig,
) -> Result<QuantileModel> {
    if matrix.rows.is_empty() || matrix.labels.len() != matrix.rows.len() {
        return Err(Error::model(format!(
            "cannot train q{quantile} model on {} rows with {} labels",
            matrix.rows.len(),
            matrix.labels.len()
        )));
    }
    let tau = f64::from(quantile) / 100.0;
    let n = matrix.rows.len();
    let d = matrix.names.len();

    let (means, stds) = column_stats(matrix);
    let standardized: Vec<Vec<f64>> = matrix
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, &x)| (x - means[j]) / stds[j])
                .collect()
        })
        .collect();

    let mut weights = vec![0.0f64; d];
    // Start the intercept at the label mean; the subgradient walks it to the
    // decile from there far faster than from zero.
    let mut intercept = matrix.labels.iter().sum::<f64>() / n as f64;

    for epoch in 0..config.epochs {
        // 1/sqrt decay keeps early progress fast without late oscillation.
        let lr = config.learning_rate / (1.0 + f64::from(epoch)).sqrt();

        let mut grad_w = vec![0.0f64; d];
        let mut grad_b = 0.0f64;
        for (row, &label) in standardized.iter().zip(&matrix.labels) {
            let pred = intercept
                + weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>();
            // Subgradient of the pinball loss w.r.t. the prediction.
            let g = if label > pred { -tau } else { 1.0 - tau };
            for (gw, &x) in grad_w.iter_mut().zip(row) {
                *gw += g * x;
            }
            grad_b += g;
        }
        let scale = lr / n as f64;
        for (w, gw) in weights.iter_mut().zip(&grad_w) {
            *w -= scale * gw;
        }
        intercept -= scale * grad_b;
    }
    debug!(quantile, rows = n, "trained quantile model");

    // Fold the standardization into the weights: w/std applies to raw
    // features, and the means move into the intercept.
    let raw_weights: Vec<f64> = weights
        .iter()
        .zip(&stds)
        .map(|(w, s)| w / s)
        .collect();
    let raw_intercept = intercept
        - raw_weights
            .iter()
            .zip(&means)
            .map(|(w, m)| w * m)
            .sum::<f64>();

    Ok(QuantileModel {
        quantile,
        feature_names: matrix.names.clone(),
        weights: raw_weights,
        intercept: raw_intercept,
    })
}

/// Train the full nine-decile ensemble on one design matrix.
pub fn train_ensemble(
    matrix: &FeatureMatrix,
    config: &TrainingConfig,
) -> Result<QuantileEnsemble> {
    let models = QUANTILE_LEVELS
        .iter()
        .map(|&level| train_quantile_model(matrix, level, config))
        .collect::<Result<Vec<_>>>()?;
    info!(rows = matrix.rows.len(), "trained 9-model quantile ensemble");
    QuantileEnsemble::new(models)
}

/// Per-column mean and standard deviation. Constant columns get a unit
/// deviation so they contribute nothing rather than dividing by zero; the
/// one-hot columns of a single-season training slice are exactly that.
fn column_stats(matrix: &FeatureMatrix) -> (Vec<f64>, Vec<f64>) {
    let n = matrix.rows.len() as f64;
    let d = matrix.names.len();

    let mut means = vec![0.0f64; d];
    for row in &matrix.rows {
        for (m, &x) in means.iter_mut().zip(row) {
            *m += x;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut stds = vec![0.0f64; d];
    for row in &matrix.rows {
        for (j, &x) in row.iter().enumerate() {
            let dlt = x - means[j];
            stds[j] += dlt * dlt;
        }
    }
    for s in &mut stds {
        *s = (*s / n).sqrt();
        if *s == 0.0 {
            *s = 1.0;
        }
    }
    (means, stds)
}
