//! Day-ahead bid assembly and formatting.
//!
//! The market day runs on London local time: delivery starts at 23:00 the
//! evening before the labeled day and ends at 22:30 on the day itself, in
//! half-hour settlement periods. Working in `Europe/London` and converting
//! to UTC makes clock-change days come out with 46 or 50 periods on their
//! own.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use chrono_tz::Europe::London;
use gridcast_core::{
    config::SubmissionConfig, Error, Quantiles, Result, SubmissionRecord, QUANTILE_LEVELS,
    SETTLEMENT_PERIOD_MINUTES,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// The document POSTed to the challenge submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionFile {
    pub market_day: String,
    pub submission: Vec<SubmissionEntry>,
}

/// One settlement period in wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEntry {
    /// Period start, RFC 3339 UTC.
    pub timestamp: String,
    pub market_bid: f64,
    /// Decile level ("10".."90") to forecast value.
    pub probabilistic_forecast: BTreeMap<String, f64>,
}

/// Settlement-period start times (UTC) for one market day.
///
/// From 23:00 London on the prior evening through 22:30 London on
/// `market_day`, stepping 30 minutes.
pub fn day_ahead_market_times(market_day: NaiveDate) -> Result<Vec<DateTime<Utc>>> {
    let prior = market_day
        .pred_opt()
        .ok_or_else(|| Error::data_format("market day has no prior calendar day"))?;
    let start = local_instant(prior, 23, 0)?;
    let end = local_instant(market_day, 22, 30)?;

    let mut times = Vec::new();
    let mut t = start;
    while t <= end {
        times.push(t);
        t += Duration::minutes(SETTLEMENT_PERIOD_MINUTES);
    }
    Ok(times)
}

fn local_instant(date: NaiveDate, hour: u32, minute: u32) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| Error::data_format(format!("invalid wall time {hour:02}:{minute:02}")))?;
    London
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            Error::data_format(format!(
                "local time {naive} is ambiguous or skipped in Europe/London"
            ))
        })
}

/// Pair predicted quantiles with their settlement periods; the point bid is
/// always the median.
pub fn build_submission(
    timestamps: &[DateTime<Utc>],
    quantiles: &[Quantiles],
) -> Result<Vec<SubmissionRecord>> {
    if timestamps.len() != quantiles.len() {
        return Err(Error::alignment(format!(
            "{} timestamps against {} quantile rows",
            timestamps.len(),
            quantiles.len()
        )));
    }
    Ok(timestamps
        .iter()
        .zip(quantiles)
        .map(|(&timestamp, &q)| SubmissionRecord {
            timestamp,
            market_bid: q.median(),
            quantiles: q,
        })
        .collect())
}

/// Render the wire document, enforcing physical bounds.
///
/// Bids are clamped into the market's accepted range and quantiles floored
/// at zero; both are logged, since an out-of-range value reaching this point
/// means a model misbehaved upstream.
pub fn format_submission(
    market_day: NaiveDate,
    records: &[SubmissionRecord],
    config: &SubmissionConfig,
) -> SubmissionFile {
    let mut clamped_bids = 0usize;
    let mut floored_quantiles = 0usize;
    let submission = records
        .iter()
        .map(|r| {
            let market_bid = r.market_bid.clamp(config.bid_min, config.bid_max);
            if market_bid != r.market_bid {
                clamped_bids += 1;
                warn!(
                    timestamp = %r.timestamp,
                    raw = r.market_bid,
                    clamped = market_bid,
                    "market bid outside accepted range"
                );
            }

            let mut probabilistic_forecast = BTreeMap::new();
            for (k, &level) in QUANTILE_LEVELS.iter().enumerate() {
                let raw = r.quantiles.0[k];
                let value = raw.max(0.0);
                if value != raw {
                    floored_quantiles += 1;
                    warn!(timestamp = %r.timestamp, level, raw, "negative quantile floored");
                }
                probabilistic_forecast.insert(level.to_string(), value);
            }

            SubmissionEntry {
                timestamp: r.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                market_bid,
                probabilistic_forecast,
            }
        })
        .collect();

    info!(
        periods = records.len(),
        clamped_bids, floored_quantiles, "formatted day-ahead submission"
    );
    SubmissionFile {
        market_day: market_day.format("%Y-%m-%d").to_string(),
        submission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quantiles(median: f64) -> Quantiles {
        let mut values = [0.0; 9];
        for (k, v) in values.iter_mut().enumerate() {
            *v = median + (k as f64 - 4.0) * 10.0;
        }
        Quantiles(values)
    }

    #[test]
    fn test_market_times_normal_day() {
        // Mid-winter: London is on UTC.
        let times = day_ahead_market_times(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()).unwrap();
        assert_eq!(times.len(), 48);
        assert_eq!(times[0], Utc.with_ymd_and_hms(2024, 1, 14, 23, 0, 0).unwrap());
        assert_eq!(
            *times.last().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 22, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_market_times_summer_offset() {
        // Mid-summer: London is UTC+1, so 23:00 local is 22:00 UTC.
        let times = day_ahead_market_times(NaiveDate::from_ymd_opt(2024, 7, 10).unwrap()).unwrap();
        assert_eq!(times.len(), 48);
        assert_eq!(times[0], Utc.with_ymd_and_hms(2024, 7, 9, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_market_times_clock_change_days() {
        // Spring forward (2024-03-31): the delivery day loses an hour.
        let short = day_ahead_market_times(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()).unwrap();
        assert_eq!(short.len(), 46);
        // Fall back (2024-10-27): the delivery day gains one.
        let long = day_ahead_market_times(NaiveDate::from_ymd_opt(2024, 10, 27).unwrap()).unwrap();
        assert_eq!(long.len(), 50);
    }

    #[test]
    fn test_bid_is_median() {
        let ts = vec![Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()];
        let records = build_submission(&ts, &[quantiles(500.0)]).unwrap();
        assert_relative_eq!(records[0].market_bid, 500.0);
    }

    #[test]
    fn test_timestamp_quantile_length_mismatch() {
        let ts = vec![Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()];
        assert!(matches!(
            build_submission(&ts, &[]),
            Err(Error::Alignment(_))
        ));
    }

    #[test]
    fn test_format_clamps_bid_and_floors_quantiles() {
        let config = SubmissionConfig::default();
        let record = SubmissionRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            market_bid: 2000.0,
            quantiles: Quantiles([-5.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]),
        };
        let low = SubmissionRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 30, 0).unwrap(),
            market_bid: -5.0,
            quantiles: Quantiles([0.0; 9]),
        };
        let file = format_submission(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &[record, low],
            &config,
        );
        let entry = &file.submission[0];
        assert_relative_eq!(entry.market_bid, 1800.0);
        assert_relative_eq!(entry.probabilistic_forecast["10"], 0.0);
        assert_relative_eq!(entry.probabilistic_forecast["20"], 0.0);
        assert_relative_eq!(entry.probabilistic_forecast["90"], 7.0);
        assert_relative_eq!(file.submission[1].market_bid, 0.0);
    }

    #[test]
    fn test_wire_format_shape() {
        let config = SubmissionConfig::default();
        let record = SubmissionRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 14, 23, 0, 0).unwrap(),
            market_bid: 400.0,
            quantiles: quantiles(400.0),
        };
        let file = format_submission(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &[record],
            &config,
        );
        assert_eq!(file.market_day, "2024-01-15");
        let entry = &file.submission[0];
        assert_eq!(entry.timestamp, "2024-01-14T23:00:00Z");
        assert_eq!(entry.probabilistic_forecast.len(), 9);
        assert!(entry.probabilistic_forecast.contains_key("50"));

        // Round-trips through serde_json unchanged.
        let text = serde_json::to_string(&file).unwrap();
        let back: SubmissionFile = serde_json::from_str(&text).unwrap();
        assert_eq!(back.submission.len(), 1);
    }
}
