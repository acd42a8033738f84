//! Core data types for the gridcast forecasting pipeline.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// The nine decile levels every quantile ensemble covers.
pub const QUANTILE_LEVELS: [u8; 9] = [10, 20, 30, 40, 50, 60, 70, 80, 90];

/// Half-hour settlement period length in minutes.
pub const SETTLEMENT_PERIOD_MINUTES: i64 = 30;

/// Which raw weather source a dataset comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherSource {
    /// Wind-farm site, gridded forecast (latitude x longitude).
    Hornsea,
    /// Solar-site point collection (indexed points).
    Solar,
}

impl WeatherSource {
    /// Variables expected from this source, in column order.
    pub fn variables(self) -> &'static [WeatherVariable] {
        match self {
            WeatherSource::Hornsea => &[
                WeatherVariable::WindSpeed10m,
                WeatherVariable::WindSpeed100m,
                WeatherVariable::WindDirection10m,
                WeatherVariable::WindDirection100m,
                WeatherVariable::Temperature,
                WeatherVariable::RelativeHumidity,
            ],
            WeatherSource::Solar => &[
                WeatherVariable::SolarDownwardRadiation,
                WeatherVariable::CloudCover,
                WeatherVariable::Temperature,
            ],
        }
    }

    /// Filename prefix used for archived files of this source.
    pub fn file_prefix(self) -> &'static str {
        match self {
            WeatherSource::Hornsea => "hornsea",
            WeatherSource::Solar => "solar",
        }
    }

    /// Comma-separated variable list in provider naming, for API queries.
    pub fn variable_query(self) -> String {
        self.variables()
            .iter()
            .map(|v| v.provider_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A weather variable as named by the forecast provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherVariable {
    WindSpeed10m,
    WindSpeed100m,
    WindDirection10m,
    WindDirection100m,
    Temperature,
    RelativeHumidity,
    SolarDownwardRadiation,
    CloudCover,
}

impl WeatherVariable {
    /// Column name used by the provider (API responses and archive files).
    pub fn provider_name(self) -> &'static str {
        match self {
            WeatherVariable::WindSpeed10m => "WindSpeed",
            WeatherVariable::WindSpeed100m => "WindSpeed:100",
            WeatherVariable::WindDirection10m => "WindDirection",
            WeatherVariable::WindDirection100m => "WindDirection:100",
            WeatherVariable::Temperature => "Temperature",
            WeatherVariable::RelativeHumidity => "RelativeHumidity",
            WeatherVariable::SolarDownwardRadiation => "SolarDownwardRadiation",
            WeatherVariable::CloudCover => "CloudCover",
        }
    }
}

/// Forecast horizon in fractional hours between reference and valid time.
#[inline]
pub fn hours_between(reference_time: DateTime<Utc>, valid_time: DateTime<Utc>) -> f64 {
    (valid_time - reference_time).num_minutes() as f64 / 60.0
}

/// One normalized wind-site forecast row, spatially averaged and resampled
/// to the 30-minute grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HornseaRecord {
    /// Forecast issuance time (UTC).
    pub reference_time: DateTime<Utc>,
    /// Time the forecast applies to (UTC).
    pub valid_time: DateTime<Utc>,
    /// Horizon in hours; always equals `valid_time - reference_time`.
    pub hours_after: f64,
    /// Wind speed at 10 m (m/s).
    pub wind_speed_10m: f64,
    /// Wind speed at 100 m (m/s).
    pub wind_speed_100m: f64,
    /// Wind direction at 10 m (degrees).
    pub wind_direction_10m: f64,
    /// Wind direction at 100 m (degrees).
    pub wind_direction_100m: f64,
    /// Air temperature (deg C).
    pub temperature: f64,
    /// Relative humidity (%).
    pub relative_humidity: f64,
}

/// One normalized solar-site forecast row, averaged across points and
/// resampled to the 30-minute grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarSiteRecord {
    /// Forecast issuance time (UTC).
    pub reference_time: DateTime<Utc>,
    /// Time the forecast applies to (UTC).
    pub valid_time: DateTime<Utc>,
    /// Horizon in hours; always equals `valid_time - reference_time`.
    pub hours_after: f64,
    /// Solar downward radiation (W/m^2).
    pub radiation: f64,
    /// Cloud cover (%).
    pub cloud_cover: f64,
    /// Air temperature (deg C).
    pub temperature: f64,
}

/// One half-hourly settlement record from the energy archive.
///
/// Raw metered values are optional because either generation series can be
/// missing for a period while the other is present; the credit columns are
/// present exactly when their inputs are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyRecord {
    /// Settlement period start (UTC).
    pub dtm: DateTime<Utc>,
    /// Metered wind generation (MW).
    pub wind_mw: Option<f64>,
    /// Metered solar generation (MW).
    pub solar_mw: Option<f64>,
    /// Bid-offer-acceptance volume (MWh).
    pub boa_mwh: Option<f64>,
    /// Settlement credit: 0.5 * wind_mw - boa_mwh.
    pub wind_mwh_credit: Option<f64>,
    /// Settlement credit: 0.5 * solar_mw.
    pub solar_mwh_credit: Option<f64>,
}

impl EnergyRecord {
    /// Build a record from raw metered values; the credit columns are always
    /// derived here and never set independently.
    pub fn from_raw(
        dtm: DateTime<Utc>,
        wind_mw: Option<f64>,
        solar_mw: Option<f64>,
        boa_mwh: Option<f64>,
    ) -> Self {
        Self {
            dtm,
            wind_mw,
            solar_mw,
            boa_mwh,
            wind_mwh_credit: wind_mw.zip(boa_mwh).map(|(w, b)| 0.5 * w - b),
            solar_mwh_credit: solar_mw.map(|s| 0.5 * s),
        }
    }

    /// Combined generation credit, present only when both sides are.
    pub fn total_generation_mwh(&self) -> Option<f64> {
        match (self.wind_mwh_credit, self.solar_mwh_credit) {
            (Some(w), Some(s)) => Some(w + s),
            _ => None,
        }
    }
}

/// Outer join of the two weather sources on (reference_time, valid_time).
///
/// Sparsity is expected: either side of the join may be absent for a given
/// key, so all variable fields are optional. The shared temperature column is
/// renamed per source to survive the collision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherJoinRow {
    pub reference_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    pub hours_after: f64,
    pub wind_speed_10m: Option<f64>,
    pub wind_speed_100m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub wind_direction_100m: Option<f64>,
    pub temp_hornsea: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub radiation: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub temp_solar: Option<f64>,
}

/// A joined weather row matched to an energy settlement period
/// (`valid_time == dtm`). Labels are optional because either generation
/// series can be missing for a period while the other is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedRecord {
    pub weather: WeatherJoinRow,
    pub wind_mwh_credit: Option<f64>,
    pub solar_mwh_credit: Option<f64>,
}

impl MergedRecord {
    /// Combined generation credit, present only when both labels are.
    pub fn total_generation_mwh(&self) -> Option<f64> {
        match (self.wind_mwh_credit, self.solar_mwh_credit) {
            (Some(w), Some(s)) => Some(w + s),
            _ => None,
        }
    }
}

impl From<WeatherJoinRow> for MergedRecord {
    /// A weather-only row (inference path, no settlement data yet).
    fn from(weather: WeatherJoinRow) -> Self {
        Self {
            weather,
            wind_mwh_credit: None,
            solar_mwh_credit: None,
        }
    }
}

/// Meteorological season, derived from the month of `valid_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// All seasons in encoder order.
    pub const ALL: [Season; 4] = [Season::Autumn, Season::Spring, Season::Summer, Season::Winter];

    /// Meteorological mapping: Dec-Feb winter, Mar-May spring, Jun-Aug
    /// summer, Sep-Nov autumn.
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

/// Eight-sector compass bucket for wind direction. Sector boundaries are
/// frozen: 45-degree sectors centered on the compass points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WindDirCat {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl WindDirCat {
    /// All buckets in encoder order.
    pub const ALL: [WindDirCat; 8] = [
        WindDirCat::E,
        WindDirCat::N,
        WindDirCat::NE,
        WindDirCat::NW,
        WindDirCat::S,
        WindDirCat::SE,
        WindDirCat::SW,
        WindDirCat::W,
    ];

    /// Bucket a direction in degrees (any real value; normalized mod 360).
    pub fn from_degrees(degrees: f64) -> WindDirCat {
        let deg = degrees.rem_euclid(360.0);
        // Sector index with N centered on 0: [337.5, 22.5) -> N, etc.
        let sector = (((deg + 22.5) / 45.0).floor() as usize) % 8;
        match sector {
            0 => WindDirCat::N,
            1 => WindDirCat::NE,
            2 => WindDirCat::E,
            3 => WindDirCat::SE,
            4 => WindDirCat::S,
            5 => WindDirCat::SW,
            6 => WindDirCat::W,
            _ => WindDirCat::NW,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WindDirCat::N => "N",
            WindDirCat::NE => "NE",
            WindDirCat::E => "E",
            WindDirCat::SE => "SE",
            WindDirCat::S => "S",
            WindDirCat::SW => "SW",
            WindDirCat::W => "W",
            WindDirCat::NW => "NW",
        }
    }
}

/// Fully engineered row: merged weather/energy plus every derived feature.
///
/// Interaction and lag fields are pure functions of the merged columns; they
/// are `None` whenever an input column is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub reference_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    pub hours_after: f64,
    // Pass-through weather columns.
    pub wind_speed_10m: Option<f64>,
    pub wind_speed_100m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub wind_direction_100m: Option<f64>,
    pub temp_hornsea: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub radiation: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub temp_solar: Option<f64>,
    // Calendar fields of valid_time.
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub season: Season,
    pub wind_dir_cat: Option<WindDirCat>,
    // Derived interactions.
    pub adjusted_radiation: Option<f64>,
    pub temp_radiation_hornsea: Option<f64>,
    pub temp_radiation_solar: Option<f64>,
    pub wind_cos_dir_10m: Option<f64>,
    pub wind_cos_dir_100m: Option<f64>,
    pub humidity_wind: Option<f64>,
    pub wind_shear: Option<f64>,
    // Lag features over time-sorted rows within a reference_time group.
    pub cloud_cover_prev: Option<f64>,
    pub cloud_cover_diff: Option<f64>,
    // Labels.
    pub wind_mwh_credit: Option<f64>,
    pub solar_mwh_credit: Option<f64>,
}

impl FeatureRow {
    /// Calendar and category fields from a merged record; interaction and lag
    /// fields start empty and are filled by the feature engine.
    pub fn from_merged(m: &MergedRecord) -> Self {
        let w = &m.weather;
        Self {
            reference_time: w.reference_time,
            valid_time: w.valid_time,
            hours_after: w.hours_after,
            wind_speed_10m: w.wind_speed_10m,
            wind_speed_100m: w.wind_speed_100m,
            wind_direction_10m: w.wind_direction_10m,
            wind_direction_100m: w.wind_direction_100m,
            temp_hornsea: w.temp_hornsea,
            relative_humidity: w.relative_humidity,
            radiation: w.radiation,
            cloud_cover: w.cloud_cover,
            temp_solar: w.temp_solar,
            year: w.valid_time.year(),
            month: w.valid_time.month(),
            day: w.valid_time.day(),
            hour: w.valid_time.hour(),
            season: Season::from_month(w.valid_time.month()),
            wind_dir_cat: w.wind_direction_100m.map(WindDirCat::from_degrees),
            adjusted_radiation: None,
            temp_radiation_hornsea: None,
            temp_radiation_solar: None,
            wind_cos_dir_10m: None,
            wind_cos_dir_100m: None,
            humidity_wind: None,
            wind_shear: None,
            cloud_cover_prev: None,
            cloud_cover_diff: None,
            wind_mwh_credit: m.wind_mwh_credit,
            solar_mwh_credit: m.solar_mwh_credit,
        }
    }
}

/// The nine decile values for one settlement period, ordered q10..q90.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantiles(pub [f64; 9]);

impl Quantiles {
    /// Value at a decile level (10, 20, ..., 90).
    pub fn at_level(&self, level: u8) -> Option<f64> {
        QUANTILE_LEVELS
            .iter()
            .position(|&l| l == level)
            .map(|i| self.0[i])
    }

    /// The median (q50).
    #[inline]
    pub fn median(&self) -> f64 {
        self.0[4]
    }

    /// True when values are non-decreasing by level.
    pub fn is_monotone(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }
}

/// One half-hour slot of the outgoing bid, created fresh per prediction
/// cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Settlement period start (UTC).
    pub timestamp: DateTime<Utc>,
    /// Point bid for the period; always the median quantile, clamped to
    /// the market's accepted range by the formatter.
    pub market_bid: f64,
    /// Probabilistic forecast, q10..q90.
    pub quantiles: Quantiles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_energy_credits_derived() {
        let dtm = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let rec = EnergyRecord::from_raw(dtm, Some(800.0), Some(200.0), Some(15.0));
        assert!((rec.wind_mwh_credit.unwrap() - (0.5 * 800.0 - 15.0)).abs() < 1e-12);
        assert!((rec.solar_mwh_credit.unwrap() - 100.0).abs() < 1e-12);
        assert!((rec.total_generation_mwh().unwrap() - 485.0).abs() < 1e-12);
    }

    #[test]
    fn test_energy_credits_missing_inputs() {
        let dtm = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let rec = EnergyRecord::from_raw(dtm, None, Some(200.0), Some(0.0));
        assert!(rec.wind_mwh_credit.is_none());
        assert_eq!(rec.solar_mwh_credit, Some(100.0));
        assert!(rec.total_generation_mwh().is_none());
    }

    #[test]
    fn test_hours_between() {
        let r = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let v = Utc.with_ymd_and_hms(2023, 1, 2, 1, 30, 0).unwrap();
        assert!((hours_between(r, v) - 25.5).abs() < 1e-12);
    }

    #[test]
    fn test_season_from_month() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(4), Season::Spring);
        assert_eq!(Season::from_month(7), Season::Summer);
        assert_eq!(Season::from_month(10), Season::Autumn);
    }

    #[test]
    fn test_wind_dir_buckets() {
        assert_eq!(WindDirCat::from_degrees(0.0), WindDirCat::N);
        assert_eq!(WindDirCat::from_degrees(350.0), WindDirCat::N);
        assert_eq!(WindDirCat::from_degrees(45.0), WindDirCat::NE);
        assert_eq!(WindDirCat::from_degrees(90.0), WindDirCat::E);
        assert_eq!(WindDirCat::from_degrees(180.0), WindDirCat::S);
        assert_eq!(WindDirCat::from_degrees(270.0), WindDirCat::W);
        assert_eq!(WindDirCat::from_degrees(337.4), WindDirCat::NW);
        assert_eq!(WindDirCat::from_degrees(337.5), WindDirCat::N);
        assert_eq!(WindDirCat::from_degrees(-45.0), WindDirCat::NW);
        assert_eq!(WindDirCat::from_degrees(720.0), WindDirCat::N);
    }

    #[test]
    fn test_quantiles_accessors() {
        let q = Quantiles([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(q.at_level(10), Some(1.0));
        assert_eq!(q.at_level(90), Some(9.0));
        assert_eq!(q.at_level(55), None);
        assert!((q.median() - 5.0).abs() < 1e-12);
        assert!(q.is_monotone());
        assert!(!Quantiles([1.0, 0.5, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).is_monotone());
    }

    #[test]
    fn test_variable_query_strings() {
        assert_eq!(
            WeatherSource::Hornsea.variable_query(),
            "WindSpeed, WindSpeed:100, WindDirection, WindDirection:100, Temperature, RelativeHumidity"
        );
        assert_eq!(
            WeatherSource::Solar.variable_query(),
            "SolarDownwardRadiation, CloudCover, Temperature"
        );
    }
}
