//! Weather normalization.
//!
//! Converts raw weather datasets into flat per-timestamp tables: spatial
//! dimensions are averaged away, valid times are reconciled against the
//! reference time, and the native (typically hourly) cadence is resampled
//! onto the 30-minute settlement grid by linear interpolation.
//!
//! Two input shapes feed the same machinery: archived files express the
//! valid time as an hour offset from the reference time, while API responses
//! carry absolute valid timestamps. This module is the single seam hiding
//! that difference.

use chrono::{DateTime, Duration, Utc};
use gridcast_core::{
    hours_between, Error, HornseaRecord, Result, SolarSiteRecord, WeatherSource,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One raw spatial sample: a single (reference time, horizon, location)
/// observation with its variable values.
///
/// Exactly one of `hours_after` (file mode) or `valid_time` (API mode) must
/// be present; the normalizer derives the other.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWeatherSample {
    pub reference_time: DateTime<Utc>,
    #[serde(default)]
    pub hours_after: Option<f64>,
    #[serde(default)]
    pub valid_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub point: Option<u32>,
    /// Variable values keyed by provider column name.
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// A spatially-averaged, time-normalized row; `values` is aligned with
/// `WeatherSource::variables()`.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub reference_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    pub hours_after: f64,
    pub values: Vec<f64>,
}

/// Normalizer for one weather source.
pub struct WeatherNormalizer {
    source: WeatherSource,
}

impl WeatherNormalizer {
    pub fn new(source: WeatherSource) -> Self {
        Self { source }
    }

    /// Normalize raw samples: validate columns, reduce the spatial
    /// dimensions by averaging, and resample each reference-time group onto
    /// the 30-minute grid.
    pub fn normalize(&self, samples: &[RawWeatherSample]) -> Result<Vec<NormalizedRow>> {
        let variables = self.source.variables();

        // (reference_time, valid_time) -> per-variable running sums.
        let mut groups: BTreeMap<(DateTime<Utc>, DateTime<Utc>), (Vec<f64>, u32)> =
            BTreeMap::new();

        for sample in samples {
            let valid_time = resolve_valid_time(sample)?;
            let mut row = Vec::with_capacity(variables.len());
            for var in variables {
                let name = var.provider_name();
                let value = sample.values.get(name).copied().ok_or_else(|| {
                    Error::data_format(format!(
                        "weather sample at reference_time {} is missing column {name:?}",
                        sample.reference_time
                    ))
                })?;
                row.push(value);
            }

            let entry = groups
                .entry((sample.reference_time, valid_time))
                .or_insert_with(|| (vec![0.0; variables.len()], 0));
            for (acc, v) in entry.0.iter_mut().zip(&row) {
                *acc += v;
            }
            entry.1 += 1;
        }

        // Spatial mean per (reference_time, valid_time).
        let mut by_reference: BTreeMap<DateTime<Utc>, Vec<(DateTime<Utc>, Vec<f64>)>> =
            BTreeMap::new();
        for ((reference_time, valid_time), (sums, count)) in groups {
            let mean: Vec<f64> = sums.iter().map(|s| s / count as f64).collect();
            by_reference
                .entry(reference_time)
                .or_default()
                .push((valid_time, mean));
        }

        // Resample within each reference-time group only; a forecast issued
        // at T must never be blended with one issued at T'.
        let mut out = Vec::new();
        for (reference_time, rows) in by_reference {
            resample_group(reference_time, &rows, &mut out);
        }

        info!(
            source = ?self.source,
            rows = out.len(),
            "normalized weather samples"
        );
        Ok(out)
    }
}

/// Derive the absolute valid time from whichever field the sample carries.
fn resolve_valid_time(sample: &RawWeatherSample) -> Result<DateTime<Utc>> {
    match (sample.valid_time, sample.hours_after) {
        (Some(valid_time), _) => Ok(valid_time),
        (None, Some(hours)) => {
            let minutes = (hours * 60.0).round() as i64;
            Ok(sample.reference_time + Duration::minutes(minutes))
        }
        (None, None) => Err(Error::data_format(format!(
            "weather sample at reference_time {} has neither valid_time nor hours_after",
            sample.reference_time
        ))),
    }
}

/// Linearly interpolate one reference-time group onto the 30-minute grid.
///
/// Input rows are sorted by valid time (BTreeMap grouping guarantees it) and
/// unique per valid time. Native points are passed through exactly.
fn resample_group(
    reference_time: DateTime<Utc>,
    rows: &[(DateTime<Utc>, Vec<f64>)],
    out: &mut Vec<NormalizedRow>,
) {
    let step = Duration::minutes(gridcast_core::SETTLEMENT_PERIOD_MINUTES);
    let Some(&(first, _)) = rows.first() else {
        return;
    };
    let last = rows[rows.len() - 1].0;

    let mut seg = 0usize;
    let mut t = first;
    while t <= last {
        while seg + 1 < rows.len() && rows[seg + 1].0 <= t {
            seg += 1;
        }
        let values = if rows[seg].0 == t || seg + 1 >= rows.len() {
            rows[seg].1.clone()
        } else {
            let (t0, ref v0) = rows[seg];
            let (t1, ref v1) = rows[seg + 1];
            let frac = (t - t0).num_seconds() as f64 / (t1 - t0).num_seconds() as f64;
            v0.iter()
                .zip(v1)
                .map(|(a, b)| a + (b - a) * frac)
                .collect()
        };
        out.push(NormalizedRow {
            reference_time,
            valid_time: t,
            hours_after: hours_between(reference_time, t),
            values,
        });
        t += step;
    }
}

/// Normalize raw samples into wind-site records.
pub fn normalize_hornsea(samples: &[RawWeatherSample]) -> Result<Vec<HornseaRecord>> {
    let rows = WeatherNormalizer::new(WeatherSource::Hornsea).normalize(samples)?;
    Ok(rows
        .into_iter()
        .map(|r| HornseaRecord {
            reference_time: r.reference_time,
            valid_time: r.valid_time,
            hours_after: r.hours_after,
            wind_speed_10m: r.values[0],
            wind_speed_100m: r.values[1],
            wind_direction_10m: r.values[2],
            wind_direction_100m: r.values[3],
            temperature: r.values[4],
            relative_humidity: r.values[5],
        })
        .collect())
}

/// Normalize raw samples into solar-site records.
pub fn normalize_solar(samples: &[RawWeatherSample]) -> Result<Vec<SolarSiteRecord>> {
    let rows = WeatherNormalizer::new(WeatherSource::Solar).normalize(samples)?;
    Ok(rows
        .into_iter()
        .map(|r| SolarSiteRecord {
            reference_time: r.reference_time,
            valid_time: r.valid_time,
            hours_after: r.hours_after,
            radiation: r.values[0],
            cloud_cover: r.values[1],
            temperature: r.values[2],
        })
        .collect())
}

/// Read every archived JSON file for a source from a directory.
///
/// Files are matched by the source's filename prefix and read in name order;
/// each file holds a JSON array of raw samples.
pub fn load_archive_dir(dir: &Path, source: WeatherSource) -> Result<Vec<RawWeatherSample>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "json")
                && p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.starts_with(source.file_prefix()))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(Error::data_format(format!(
            "no {:?} weather archive files found in {}",
            source,
            dir.display()
        )));
    }

    let mut samples = Vec::new();
    for path in &paths {
        let text = fs::read_to_string(path)?;
        let mut file_samples: Vec<RawWeatherSample> = serde_json::from_str(&text)?;
        samples.append(&mut file_samples);
    }
    info!(source = ?source, files = paths.len(), samples = samples.len(), "loaded weather archive");
    Ok(samples)
}

/// Load and normalize the wind-site archive.
pub fn load_hornsea_dir(dir: &Path) -> Result<Vec<HornseaRecord>> {
    normalize_hornsea(&load_archive_dir(dir, WeatherSource::Hornsea)?)
}

/// Load and normalize the solar-site archive.
pub fn load_solar_dir(dir: &Path) -> Result<Vec<SolarSiteRecord>> {
    normalize_solar(&load_archive_dir(dir, WeatherSource::Solar)?)
}

/// Convert one columnar API response into raw samples.
///
/// The provider returns parallel arrays keyed `ref_datetime`, `valid_datetime`
/// and one array per variable. Shape problems (missing columns, unequal
/// lengths) are reported as `DataFormat` before any normalization runs; rows
/// with null values are dropped with a warning.
pub fn samples_from_columnar(
    value: &Value,
    source: WeatherSource,
    point: Option<(u32, f64, f64)>,
) -> Result<Vec<RawWeatherSample>> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::data_format("weather API response is not a JSON object"))?;

    let ref_times = string_column(obj, "ref_datetime")?;
    let valid_times = string_column(obj, "valid_datetime")?;
    if ref_times.len() != valid_times.len() {
        return Err(Error::data_format(format!(
            "weather API response columns disagree in length: ref_datetime={}, valid_datetime={}",
            ref_times.len(),
            valid_times.len()
        )));
    }

    let mut columns = Vec::new();
    for var in source.variables() {
        let name = var.provider_name();
        let col = obj
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::data_format(format!("weather API response is missing column {name:?}"))
            })?;
        if col.len() != ref_times.len() {
            return Err(Error::data_format(format!(
                "weather API response column {name:?} has length {} (expected {})",
                col.len(),
                ref_times.len()
            )));
        }
        columns.push((name, col));
    }

    let mut samples = Vec::with_capacity(ref_times.len());
    let mut dropped = 0usize;
    for i in 0..ref_times.len() {
        let reference_time = parse_api_datetime(ref_times[i])?;
        let valid_time = parse_api_datetime(valid_times[i])?;

        let mut values = BTreeMap::new();
        let mut complete = true;
        for (name, col) in &columns {
            match col[i].as_f64() {
                Some(v) => {
                    values.insert((*name).to_string(), v);
                }
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            dropped += 1;
            continue;
        }

        samples.push(RawWeatherSample {
            reference_time,
            hours_after: None,
            valid_time: Some(valid_time),
            latitude: point.map(|(_, lat, _)| lat),
            longitude: point.map(|(_, _, lon)| lon),
            point: point.map(|(i, _, _)| i),
            values,
        });
    }

    if dropped > 0 {
        warn!(dropped, "dropped weather API rows with null values");
    }
    Ok(samples)
}

fn string_column<'a>(
    obj: &'a serde_json::Map<String, Value>,
    name: &str,
) -> Result<Vec<&'a str>> {
    let arr = obj.get(name).and_then(Value::as_array).ok_or_else(|| {
        Error::data_format(format!("weather API response is missing column {name:?}"))
    })?;
    arr.iter()
        .map(|v| {
            v.as_str().ok_or_else(|| {
                Error::data_format(format!("non-string entry in API column {name:?}"))
            })
        })
        .collect()
}

/// Provider timestamps come with or without an explicit offset.
fn parse_api_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::data_format(format!("unparseable timestamp {s:?} in API response")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, h, m, 0).unwrap()
    }

    fn hornsea_sample(hours_after: f64, lat: f64, wind10: f64) -> RawWeatherSample {
        let mut values = BTreeMap::new();
        values.insert("WindSpeed".to_string(), wind10);
        values.insert("WindSpeed:100".to_string(), wind10 + 2.0);
        values.insert("WindDirection".to_string(), 180.0);
        values.insert("WindDirection:100".to_string(), 185.0);
        values.insert("Temperature".to_string(), 10.0);
        values.insert("RelativeHumidity".to_string(), 80.0);
        RawWeatherSample {
            reference_time: ts(0, 0),
            hours_after: Some(hours_after),
            valid_time: None,
            latitude: Some(lat),
            longitude: Some(1.7),
            point: None,
            values,
        }
    }

    #[test]
    fn test_valid_time_from_hours_after() {
        let records = normalize_hornsea(&[hornsea_sample(1.0, 53.77, 8.0)]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].valid_time, ts(1, 0));
        assert!((records[0].hours_after - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hours_after_matches_time_difference() {
        let samples: Vec<_> = (0..4).map(|h| hornsea_sample(h as f64, 53.77, 8.0)).collect();
        let records = normalize_hornsea(&samples).unwrap();
        for r in &records {
            assert!((hours_between(r.reference_time, r.valid_time) - r.hours_after).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spatial_average() {
        let records = normalize_hornsea(&[
            hornsea_sample(0.0, 53.77, 6.0),
            hornsea_sample(0.0, 53.84, 10.0),
        ])
        .unwrap();
        assert_eq!(records.len(), 1);
        assert!((records[0].wind_speed_10m - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_upsampling_to_half_hours() {
        let records = normalize_hornsea(&[
            hornsea_sample(0.0, 53.77, 6.0),
            hornsea_sample(1.0, 53.77, 10.0),
        ])
        .unwrap();
        // 00:00, 00:30, 01:00
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].valid_time, ts(0, 30));
        assert!((records[1].wind_speed_10m - 8.0).abs() < 1e-12);
        assert!((records[1].hours_after - 0.5).abs() < 1e-12);
        assert!((records[2].wind_speed_10m - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_interpolation_across_reference_times() {
        let mut early = hornsea_sample(0.0, 53.77, 6.0);
        early.reference_time = ts(0, 0);
        let mut late = hornsea_sample(0.0, 53.77, 100.0);
        late.reference_time = ts(6, 0);

        let records = normalize_hornsea(&[early, late]).unwrap();
        // Each group has a single native point, so each yields exactly one
        // row and no value is blended across groups.
        assert_eq!(records.len(), 2);
        assert!((records[0].wind_speed_10m - 6.0).abs() < 1e-12);
        assert!((records[1].wind_speed_10m - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_hours_after_monotone_within_group() {
        let samples: Vec<_> = (0..6).map(|h| hornsea_sample(h as f64, 53.77, 8.0)).collect();
        let records = normalize_hornsea(&samples).unwrap();
        for pair in records.windows(2) {
            if pair[0].reference_time == pair[1].reference_time {
                assert!(pair[0].hours_after <= pair[1].hours_after);
            }
        }
    }

    #[test]
    fn test_missing_column_is_data_format_error() {
        let mut sample = hornsea_sample(0.0, 53.77, 8.0);
        sample.values.remove("RelativeHumidity");
        let err = normalize_hornsea(&[sample]).unwrap_err();
        assert!(matches!(err, Error::DataFormat(_)));
    }

    #[test]
    fn test_sample_without_time_info_rejected() {
        let mut sample = hornsea_sample(0.0, 53.77, 8.0);
        sample.hours_after = None;
        sample.valid_time = None;
        let err = normalize_hornsea(&[sample]).unwrap_err();
        assert!(matches!(err, Error::DataFormat(_)));
    }

    #[test]
    fn test_samples_from_columnar_grid() {
        let value = json!({
            "ref_datetime": ["2023-01-01T00:00:00Z", "2023-01-01T00:00:00Z"],
            "valid_datetime": ["2023-01-01T00:00:00Z", "2023-01-01T01:00:00Z"],
            "WindSpeed": [5.0, 6.0],
            "WindSpeed:100": [7.0, 8.0],
            "WindDirection": [100.0, 110.0],
            "WindDirection:100": [105.0, 115.0],
            "Temperature": [10.0, 11.0],
            "RelativeHumidity": [70.0, 75.0],
        });
        let samples =
            samples_from_columnar(&value, WeatherSource::Hornsea, None).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].valid_time, Some(ts(1, 0)));
        assert_eq!(samples[1].values["WindSpeed"], 6.0);
    }

    #[test]
    fn test_samples_from_columnar_missing_column() {
        let value = json!({
            "ref_datetime": ["2023-01-01T00:00:00Z"],
            "valid_datetime": ["2023-01-01T00:00:00Z"],
            "SolarDownwardRadiation": [100.0],
            "CloudCover": [20.0],
            // Temperature missing
        });
        let err = samples_from_columnar(&value, WeatherSource::Solar, None).unwrap_err();
        assert!(matches!(err, Error::DataFormat(_)));
    }

    #[test]
    fn test_samples_from_columnar_null_rows_dropped() {
        let value = json!({
            "ref_datetime": ["2023-01-01T00:00:00Z", "2023-01-01T00:00:00Z"],
            "valid_datetime": ["2023-01-01T00:00:00Z", "2023-01-01T01:00:00Z"],
            "SolarDownwardRadiation": [100.0, null],
            "CloudCover": [20.0, 30.0],
            "Temperature": [10.0, 11.0],
        });
        let samples = samples_from_columnar(&value, WeatherSource::Solar, None).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_archive_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![hornsea_sample(0.0, 53.77, 6.0), hornsea_sample(1.0, 53.77, 10.0)];
        let json_samples: Vec<Value> = samples
            .iter()
            .map(|s| {
                let mut obj = serde_json::Map::new();
                obj.insert(
                    "reference_time".into(),
                    json!(s.reference_time.to_rfc3339()),
                );
                obj.insert("hours_after".into(), json!(s.hours_after));
                obj.insert("latitude".into(), json!(s.latitude));
                obj.insert("longitude".into(), json!(s.longitude));
                for (k, v) in &s.values {
                    obj.insert(k.clone(), json!(v));
                }
                Value::Object(obj)
            })
            .collect();
        std::fs::write(
            dir.path().join("hornsea_2023_01.json"),
            serde_json::to_string(&json_samples).unwrap(),
        )
        .unwrap();

        let records = load_hornsea_dir(dir.path()).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_empty_archive_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_hornsea_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::DataFormat(_)));
    }
}
