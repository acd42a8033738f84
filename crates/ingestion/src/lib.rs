//! Data ingestion and normalization for the gridcast forecasting pipeline.
//!
//! This crate handles:
//! - Weather normalization (spatial reduction, time reconciliation,
//!   30-minute resampling) for archived files and API responses
//! - Energy generation cleaning and credit derivation
//! - The forecast-provider API client

pub mod energy;
pub mod rebase;
pub mod weather;

pub use energy::load_energy_dir;
pub use rebase::{ChallengeVariable, RebaseClient, WeatherQueryType};
pub use weather::{
    load_hornsea_dir, load_solar_dir, normalize_hornsea, normalize_solar, RawWeatherSample,
    WeatherNormalizer,
};
