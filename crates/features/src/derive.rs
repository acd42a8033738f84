//! Derived feature computation.
//!
//! Stage two of the feature engine: every field here is a pure function of
//! columns already present on the merged row; no external state is consulted.

use gridcast_core::{FeatureRow, MergedRecord};

/// Engineer the full feature table from merged records.
///
/// Rows are sorted by (reference_time, valid_time) before the lag features
/// are computed; a lag over unsorted rows would be meaningless. The cloud
/// cover lag never crosses a reference-time boundary, for the same reason
/// interpolation never does: forecasts issued at different times must not
/// blend.
pub fn engineer_features(merged: &[MergedRecord]) -> Vec<FeatureRow> {
    let mut rows: Vec<FeatureRow> = merged.iter().map(FeatureRow::from_merged).collect();
    rows.sort_by_key(|r| (r.reference_time, r.valid_time));

    for row in &mut rows {
        fill_interactions(row);
    }

    for i in 1..rows.len() {
        if rows[i - 1].reference_time == rows[i].reference_time {
            rows[i].cloud_cover_prev = rows[i - 1].cloud_cover;
            rows[i].cloud_cover_diff = rows[i]
                .cloud_cover
                .zip(rows[i].cloud_cover_prev)
                .map(|(curr, prev)| curr - prev);
        }
    }

    rows
}

fn fill_interactions(r: &mut FeatureRow) {
    // Radiation reaching the panel after cloud attenuation.
    r.adjusted_radiation = r
        .radiation
        .zip(r.cloud_cover)
        .map(|(rad, cc)| rad * (1.0 - cc / 100.0));

    r.temp_radiation_hornsea = r.temp_hornsea.zip(r.radiation).map(|(t, rad)| t * rad);
    r.temp_radiation_solar = r.temp_solar.zip(r.radiation).map(|(t, rad)| t * rad);

    r.wind_cos_dir_10m = r
        .wind_speed_10m
        .zip(r.wind_direction_10m)
        .map(|(speed, dir)| speed * dir.to_radians().cos());
    r.wind_cos_dir_100m = r
        .wind_speed_100m
        .zip(r.wind_direction_100m)
        .map(|(speed, dir)| speed * dir.to_radians().cos());

    r.humidity_wind = r
        .relative_humidity
        .zip(r.wind_speed_10m)
        .map(|(h, s)| h * s);

    // Product of the two height levels' speeds, a shear proxy.
    r.wind_shear = r.wind_speed_10m.zip(r.wind_speed_100m).map(|(a, b)| a * b);
}
