//! Joining normalized weather and energy tables.
//!
//! Stage one of the feature engine: outer-join the two weather sources on
//! (reference_time, valid_time), then inner-join the combined table to the
//! energy series on `valid_time == dtm`.

use chrono::{DateTime, Utc};
use gridcast_core::{
    EnergyRecord, Error, HornseaRecord, MergedRecord, Result, SolarSiteRecord, WeatherJoinRow,
};
use std::collections::BTreeMap;
use tracing::info;

/// Tolerance for the duplicated `hours_after` column after the weather join.
/// The two values are identical by construction; divergence is a
/// data-integrity fault to surface, never to average away.
const HOURS_AFTER_TOLERANCE: f64 = 1e-9;

/// Outer-join the wind-site and solar-site tables on
/// (`reference_time`, `valid_time`).
///
/// Sparsity is expected: not every solar point-sample aligns with every grid
/// forecast cadence, so either side of a row may be empty. The temperature
/// collision is resolved by source-qualified fields on [`WeatherJoinRow`].
pub fn join_weather(
    hornsea: &[HornseaRecord],
    solar: &[SolarSiteRecord],
) -> Result<Vec<WeatherJoinRow>> {
    let mut joined: BTreeMap<(DateTime<Utc>, DateTime<Utc>), WeatherJoinRow> = BTreeMap::new();

    for h in hornsea {
        joined.insert(
            (h.reference_time, h.valid_time),
            WeatherJoinRow {
                reference_time: h.reference_time,
                valid_time: h.valid_time,
                hours_after: h.hours_after,
                wind_speed_10m: Some(h.wind_speed_10m),
                wind_speed_100m: Some(h.wind_speed_100m),
                wind_direction_10m: Some(h.wind_direction_10m),
                wind_direction_100m: Some(h.wind_direction_100m),
                temp_hornsea: Some(h.temperature),
                relative_humidity: Some(h.relative_humidity),
                radiation: None,
                cloud_cover: None,
                temp_solar: None,
            },
        );
    }

    for s in solar {
        match joined.entry((s.reference_time, s.valid_time)) {
            std::collections::btree_map::Entry::Occupied(mut e) => {
                let row = e.get_mut();
                if (row.hours_after - s.hours_after).abs() > HOURS_AFTER_TOLERANCE {
                    return Err(Error::data_format(format!(
                        "hours_after diverges between weather sources at \
                         reference_time={}, valid_time={}: {} vs {}",
                        s.reference_time, s.valid_time, row.hours_after, s.hours_after
                    )));
                }
                row.radiation = Some(s.radiation);
                row.cloud_cover = Some(s.cloud_cover);
                row.temp_solar = Some(s.temperature);
            }
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(WeatherJoinRow {
                    reference_time: s.reference_time,
                    valid_time: s.valid_time,
                    hours_after: s.hours_after,
                    wind_speed_10m: None,
                    wind_speed_100m: None,
                    wind_direction_10m: None,
                    wind_direction_100m: None,
                    temp_hornsea: None,
                    relative_humidity: None,
                    radiation: Some(s.radiation),
                    cloud_cover: Some(s.cloud_cover),
                    temp_solar: Some(s.temperature),
                });
            }
        }
    }

    Ok(joined.into_values().collect())
}

/// Inner-join the combined weather table to the energy series on
/// `valid_time == dtm`, excluding horizons at or beyond the cutoff.
///
/// Zero overlapping rows means the time ranges (or timezones) of the inputs
/// disagree; that is fatal, not an empty success.
pub fn merge_with_energy(
    weather: &[WeatherJoinRow],
    energy: &[EnergyRecord],
    max_hours_after: f64,
) -> Result<Vec<MergedRecord>> {
    let by_dtm: BTreeMap<DateTime<Utc>, &EnergyRecord> =
        energy.iter().map(|e| (e.dtm, e)).collect();

    let mut merged = Vec::new();
    let mut beyond_horizon = 0usize;
    for row in weather {
        if row.hours_after >= max_hours_after {
            beyond_horizon += 1;
            continue;
        }
        if let Some(e) = by_dtm.get(&row.valid_time) {
            merged.push(MergedRecord {
                weather: row.clone(),
                wind_mwh_credit: e.wind_mwh_credit,
                solar_mwh_credit: e.solar_mwh_credit,
            });
        }
    }

    if merged.is_empty() {
        return Err(Error::alignment(format!(
            "weather and energy tables share no timestamps \
             ({} weather rows, {} energy rows)",
            weather.len(),
            energy.len()
        )));
    }

    info!(
        rows = merged.len(),
        beyond_horizon, "merged weather and energy tables"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, h, m, 0).unwrap()
    }

    fn hornsea(reference: DateTime<Utc>, hours_after: f64) -> HornseaRecord {
        HornseaRecord {
            reference_time: reference,
            valid_time: reference + chrono::Duration::minutes((hours_after * 60.0) as i64),
            hours_after,
            wind_speed_10m: 8.0,
            wind_speed_100m: 10.0,
            wind_direction_10m: 180.0,
            wind_direction_100m: 185.0,
            temperature: 9.0,
            relative_humidity: 80.0,
        }
    }

    fn solar(reference: DateTime<Utc>, hours_after: f64) -> SolarSiteRecord {
        SolarSiteRecord {
            reference_time: reference,
            valid_time: reference + chrono::Duration::minutes((hours_after * 60.0) as i64),
            hours_after,
            radiation: 250.0,
            cloud_cover: 40.0,
            temperature: 12.0,
        }
    }

    fn energy(dtm: DateTime<Utc>) -> EnergyRecord {
        EnergyRecord::from_raw(dtm, Some(600.0), Some(100.0), Some(5.0))
    }

    #[test]
    fn test_outer_join_keeps_unmatched_rows() {
        let r = ts(1, 0, 0);
        let rows = join_weather(&[hornsea(r, 0.0), hornsea(r, 0.5)], &[solar(r, 0.5)]).unwrap();
        assert_eq!(rows.len(), 2);
        // Unmatched hornsea row has no solar fields.
        assert!(rows[0].radiation.is_none());
        assert!(rows[0].wind_speed_10m.is_some());
        // Matched row carries both, with source-qualified temperatures.
        assert_eq!(rows[1].temp_hornsea, Some(9.0));
        assert_eq!(rows[1].temp_solar, Some(12.0));
    }

    #[test]
    fn test_solar_only_rows_survive() {
        let r = ts(1, 0, 0);
        let rows = join_weather(&[], &[solar(r, 1.0)]).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].wind_speed_10m.is_none());
        assert_eq!(rows[0].radiation, Some(250.0));
    }

    #[test]
    fn test_diverging_hours_after_is_fault() {
        let r = ts(1, 0, 0);
        let h = hornsea(r, 1.0);
        let mut s = solar(r, 1.0);
        s.hours_after = 2.0; // same valid_time key, inconsistent horizon
        s.valid_time = h.valid_time;
        let err = join_weather(&[h], &[s]).unwrap_err();
        assert!(matches!(err, Error::DataFormat(_)));
    }

    #[test]
    fn test_inner_join_on_settlement_time() {
        let r = ts(1, 0, 0);
        let weather = join_weather(&[hornsea(r, 1.0), hornsea(r, 1.5)], &[]).unwrap();
        // Energy exists only for the 01:00 period.
        let merged = merge_with_energy(&weather, &[energy(ts(1, 1, 0))], 50.0).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].weather.valid_time, ts(1, 1, 0));
        assert_eq!(merged[0].wind_mwh_credit, Some(0.5 * 600.0 - 5.0));
    }

    #[test]
    fn test_horizon_cutoff_excludes_far_forecasts() {
        let r = ts(1, 0, 0);
        let weather = join_weather(&[hornsea(r, 1.0), hornsea(r, 50.0)], &[]).unwrap();
        let merged = merge_with_energy(
            &weather,
            &[energy(ts(1, 1, 0)), energy(ts(3, 2, 0))],
            50.0,
        )
        .unwrap();
        // The 50-hour row is excluded even though its settlement row exists.
        assert_eq!(merged.len(), 1);
        assert!((merged[0].weather.hours_after - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_overlap_is_alignment_error() {
        let r = ts(1, 0, 0);
        let weather = join_weather(&[hornsea(r, 1.0)], &[]).unwrap();
        let err = merge_with_energy(&weather, &[energy(ts(10, 0, 0))], 50.0).unwrap_err();
        assert!(matches!(err, Error::Alignment(_)));
    }
}
