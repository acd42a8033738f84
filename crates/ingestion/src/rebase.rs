//! Forecast-provider API client.
//!
//! Synchronous, unary request/response; retries and backoff belong to the
//! caller, not here. The client is an explicit configuration object built
//! once per run and passed by reference.

use gridcast_core::{config::ApiConfig, Error, Result, WeatherSource};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::weather::{samples_from_columnar, RawWeatherSample};

/// Challenge data series available from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeVariable {
    MarketIndex,
    DayAheadPrice,
    ImbalancePrice,
    WindTotalProduction,
    SolarTotalProduction,
    SolarAndWindForecast,
}

impl ChallengeVariable {
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeVariable::MarketIndex => "market_index",
            ChallengeVariable::DayAheadPrice => "day_ahead_price",
            ChallengeVariable::ImbalancePrice => "imbalance_price",
            ChallengeVariable::WindTotalProduction => "wind_total_production",
            ChallengeVariable::SolarTotalProduction => "solar_total_production",
            ChallengeVariable::SolarAndWindForecast => "solar_and_wind_forecast",
        }
    }
}

/// Grid vs point weather query shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherQueryType {
    Grid,
    Points,
}

impl WeatherQueryType {
    fn as_str(self) -> &'static str {
        match self {
            WeatherQueryType::Grid => "grid",
            WeatherQueryType::Points => "points",
        }
    }
}

/// Client for the forecast-provider API.
pub struct RebaseClient {
    config: ApiConfig,
    http: reqwest::blocking::Client,
}

impl RebaseClient {
    /// Build a client from configuration.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::api(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config: config.clone(),
            http,
        })
    }

    /// GET one challenge data series for a day (`YYYY-MM-DD`).
    pub fn get_variable(&self, day: &str, variable: ChallengeVariable) -> Result<Value> {
        let url = format!(
            "{}/challenges/data/{}",
            self.config.base_url,
            variable.as_str()
        );
        debug!(%url, day, "GET challenge data");
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .query(&[("day", day)])
            .send()
            .map_err(|e| Error::api(format!("GET {url} failed: {e}")))?;
        decode_json(resp)
    }

    /// POST a latest-horizon weather query.
    pub fn query_weather_latest(
        &self,
        lats: &[f64],
        lons: &[f64],
        variables: &str,
        query_type: WeatherQueryType,
    ) -> Result<Value> {
        let url = format!("{}/weather/v2/query", self.config.base_url);
        let body = json!({
            "model": self.config.weather_model,
            "latitude": lats,
            "longitude": lons,
            "variables": variables,
            "type": query_type.as_str(),
            "output-format": "json",
            "forecast-horizon": "latest",
        });
        debug!(%url, model = %self.config.weather_model, ?query_type, "POST weather query");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::api(format!("POST {url} failed: {e}")))?;
        decode_json(resp)
    }

    /// Latest wind-site forecast over the configured grid, as raw samples
    /// ready for the weather normalizer.
    pub fn latest_hornsea_grid(&self) -> Result<Vec<RawWeatherSample>> {
        let value = self.query_weather_latest(
            &self.config.hornsea_lats,
            &self.config.hornsea_lons,
            &WeatherSource::Hornsea.variable_query(),
            WeatherQueryType::Grid,
        )?;
        samples_from_columnar(&value, WeatherSource::Hornsea, None)
    }

    /// Latest solar-site forecast over the configured points, as raw samples
    /// ready for the weather normalizer.
    pub fn latest_solar_points(&self) -> Result<Vec<RawWeatherSample>> {
        let value = self.query_weather_latest(
            &self.config.solar_lats,
            &self.config.solar_lons,
            &WeatherSource::Solar.variable_query(),
            WeatherQueryType::Points,
        )?;
        let frames = value.as_array().ok_or_else(|| {
            Error::data_format("points weather response is not a JSON array")
        })?;
        if frames.len() != self.config.solar_lats.len() {
            return Err(Error::data_format(format!(
                "points weather response has {} frames (expected {})",
                frames.len(),
                self.config.solar_lats.len()
            )));
        }

        let mut samples = Vec::new();
        for (i, frame) in frames.iter().enumerate() {
            let point = (
                i as u32,
                self.config.solar_lats[i],
                self.config.solar_lons[i],
            );
            samples.extend(samples_from_columnar(
                frame,
                WeatherSource::Solar,
                Some(point),
            )?);
        }
        Ok(samples)
    }

    /// POST the day-ahead bid document.
    pub fn submit<T: Serialize>(&self, body: &T) -> Result<()> {
        let url = format!(
            "{}/challenges/{}/submit",
            self.config.base_url, self.config.challenge_id
        );
        debug!(%url, "POST submission");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .map_err(|e| Error::api(format!("POST {url} failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(Error::api(format!(
                "submission rejected with status {status}: {text}"
            )));
        }
        Ok(())
    }
}

fn decode_json(resp: reqwest::blocking::Response) -> Result<Value> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().unwrap_or_default();
        return Err(Error::api(format!("request failed with status {status}: {text}")));
    }
    resp.json()
        .map_err(|e| Error::api(format!("invalid JSON response: {e}")))
}
