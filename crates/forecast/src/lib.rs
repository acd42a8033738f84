//! Quantile ensemble forecasting and day-ahead bid assembly.
//!
//! Training fits nine linear pinball-loss models per generation series and
//! persists them beside the fitted transforms; inference loads everything
//! read-only, predicts both marginals, combines them into total-generation
//! quantiles and formats the market submission.

pub mod ensemble;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod submission;
pub mod train;

pub use ensemble::{combine_marginals, QuantileEnsemble};
pub use inference::{run_day_ahead, run_training, TrainingReport};
pub use metrics::{pinball, pinball_score};
pub use model::QuantileModel;
pub use submission::{
    build_submission, day_ahead_market_times, format_submission, SubmissionEntry, SubmissionFile,
};
pub use train::{train_ensemble, train_quantile_model};
