//! Forecast evaluation.

use gridcast_core::{Error, Quantiles, Result, QUANTILE_LEVELS};

/// Pinball loss for one observation against one quantile prediction.
///
/// Asymmetric absolute error: under-prediction is weighted by `tau`,
/// over-prediction by `1 - tau`.
pub fn pinball(observed: f64, predicted: f64, tau: f64) -> f64 {
    let diff = observed - predicted;
    if diff >= 0.0 {
        tau * diff
    } else {
        (tau - 1.0) * diff
    }
}

/// Mean pinball loss over all rows and all nine deciles. Lower is better;
/// this is the score the submission is ranked on.
pub fn pinball_score(predictions: &[Quantiles], observed: &[f64]) -> Result<f64> {
    if predictions.len() != observed.len() {
        return Err(Error::alignment(format!(
            "{} predictions against {} observations",
            predictions.len(),
            observed.len()
        )));
    }
    if predictions.is_empty() {
        return Err(Error::alignment("cannot score an empty forecast"));
    }

    let mut total = 0.0;
    for (q, &y) in predictions.iter().zip(observed) {
        for (k, &level) in QUANTILE_LEVELS.iter().enumerate() {
            total += pinball(y, q.0[k], f64::from(level) / 100.0);
        }
    }
    Ok(total / (predictions.len() * QUANTILE_LEVELS.len()) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pinball_asymmetry() {
        // Under-prediction at a high decile costs more than over-prediction.
        assert_relative_eq!(pinball(10.0, 0.0, 0.9), 9.0);
        assert_relative_eq!(pinball(0.0, 10.0, 0.9), 1.0);
        // And symmetric at the median.
        assert_relative_eq!(pinball(5.0, 0.0, 0.5), pinball(0.0, 5.0, 0.5));
    }

    #[test]
    fn test_exact_forecast_scores_zero() {
        let preds = vec![Quantiles([42.0; 9])];
        assert_relative_eq!(pinball_score(&preds, &[42.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_score_averages_rows_and_levels() {
        // Every decile off by exactly 1 above the observation.
        let preds = vec![Quantiles([1.0; 9]); 2];
        let score = pinball_score(&preds, &[0.0, 0.0]).unwrap();
        // Mean over tau of (1 - tau) for tau in 0.1..0.9 is 0.5.
        assert_relative_eq!(score, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let preds = vec![Quantiles([0.0; 9])];
        assert!(pinball_score(&preds, &[1.0, 2.0]).is_err());
        assert!(pinball_score(&[], &[]).is_err());
    }
}
