//! Configuration structures for the gridcast forecasting pipeline.
//!
//! Plain serde structs with explicit defaults. One `PipelineConfig` is built
//! per run and passed by reference; nothing here is a process-wide singleton.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input/output locations.
    pub paths: PathsConfig,
    /// Forecast-provider API configuration.
    pub api: ApiConfig,
    /// Train/test split boundaries.
    pub split: SplitConfig,
    /// Forecast-horizon cutoff.
    pub horizon: HorizonConfig,
    /// Submission bounds.
    pub submission: SubmissionConfig,
    /// Quantile model training parameters.
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            api: ApiConfig::default(),
            split: SplitConfig::default(),
            horizon: HorizonConfig::default(),
            submission: SubmissionConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

/// Input and artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory of raw per-period energy CSV files.
    pub energy_dir: PathBuf,
    /// Directory of raw weather archive files.
    pub weather_dir: PathBuf,
    /// Directory for trained wind quantile models.
    pub wind_models_dir: PathBuf,
    /// Directory for trained solar quantile models.
    pub solar_models_dir: PathBuf,
    /// Directory for fitted transform artifacts (PCA pipeline, encoders).
    pub transforms_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            energy_dir: PathBuf::from("data/energy"),
            weather_dir: PathBuf::from("data/weather"),
            wind_models_dir: PathBuf::from("artifacts/models/wind"),
            solar_models_dir: PathBuf::from("artifacts/models/solar"),
            transforms_dir: PathBuf::from("artifacts/transforms"),
        }
    }
}

/// Forecast-provider API configuration.
///
/// The site coordinate lists are part of the query contract and are treated
/// as frozen configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the provider.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Challenge identifier used in the submission endpoint.
    pub challenge_id: String,
    /// Weather model to query.
    pub weather_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Wind-farm grid latitudes.
    pub hornsea_lats: Vec<f64>,
    /// Wind-farm grid longitudes.
    pub hornsea_lons: Vec<f64>,
    /// Solar-site point latitudes.
    pub solar_lats: Vec<f64>,
    /// Solar-site point longitudes.
    pub solar_lons: Vec<f64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rebase.energy".to_string(),
            api_key: String::new(),
            challenge_id: "heftcom2024".to_string(),
            weather_model: "DWD_ICON-EU".to_string(),
            timeout_secs: 180,
            hornsea_lats: vec![53.77, 53.84, 53.9, 53.97, 54.03, 54.1],
            hornsea_lons: vec![1.702, 1.767, 1.832, 1.897, 1.962, 2.027],
            solar_lats: vec![
                52.4872562, 52.8776682, 52.1354277, 52.4880497, 51.9563696, 52.2499177,
                52.6416477, 52.2700912, 52.1960768, 52.7082618, 52.4043468, 52.0679429,
                52.024023, 52.7681276, 51.8750506, 52.5582373, 52.4478922, 52.5214863,
                52.8776682, 52.0780721,
            ],
            solar_lons: vec![
                0.4012455, 0.7906532, -0.2640343, -0.1267052, 0.6588173, 1.3894081,
                1.3509559, 0.7082557, 0.1534462, 0.7302284, 1.0762977, 1.1751747,
                0.2962684, 0.1699257, 0.9115028, 0.7137489, 0.1204872, 1.5706825,
                1.1916542, -0.0113488,
            ],
        }
    }
}

/// Deterministic train/test split boundaries.
///
/// The held-out window is `[test_start, test_end)` on `valid_time`; re-running
/// the split on the same input always yields the same partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_start: Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap(),
            test_end: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}

/// Forecast-horizon cutoff for training rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonConfig {
    /// Rows with `hours_after` at or beyond this value are excluded from the
    /// modeling table; forecasts that far ahead are not usable signal.
    pub max_hours_after: f64,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            max_hours_after: 50.0,
        }
    }
}

/// Physical bounds enforced by the submission formatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Lowest accepted market bid (MWh).
    pub bid_min: f64,
    /// Highest accepted market bid (MWh).
    pub bid_max: f64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            bid_min: 0.0,
            bid_max: 1800.0,
        }
    }
}

/// Quantile model training parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Initial learning rate for the pinball subgradient descent.
    pub learning_rate: f64,
    /// Number of full-batch epochs.
    pub epochs: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            epochs: 500,
        }
    }
}
