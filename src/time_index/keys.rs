//! Object-store key / CDN URL synthesis and band filtering (spec §4.A, §6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use regex::Regex;

use super::pattern::SatellitePattern;
use super::product::{nearest_scan_minute, ProductType};
use super::timestamp::date_to_doy;
use crate::error::{PipelineError, Result};

const DEFAULT_CDN_RESOLUTION: &str = "5424x5424";
pub const RECENT_WINDOW_DAYS: i64 = 7;

fn validate_band(band: u8) -> Result<()> {
    if band < 1 || band > 16 {
        return Err(PipelineError::InvalidInput(format!(
            "band {band} out of range [1,16]"
        )));
    }
    Ok(())
}

/// Synthesize the canonical object-store key for `(timestamp, satellite,
/// product, band)`. Bit-exact with spec §4.A's format contract.
///
/// `exact_match = true` synthesizes plausible end/creation timestamps so
/// the result is fully concrete (deterministic test fixtures, per spec);
/// otherwise `{SS}`/end/creation are wildcarded for S3 prefix discovery.
pub fn to_s3_key(
    ts: DateTime<Utc>,
    satellite: SatellitePattern,
    product: ProductType,
    band: u8,
    exact_match: bool,
) -> Result<String> {
    satellite.require_known()?;
    validate_band(band)?;

    let code = satellite.s3_code().expect("checked by require_known");
    let year = ts.year();
    let doy = date_to_doy(ts.date_naive());
    let hour = ts.hour();
    let valid_minute = nearest_scan_minute(product.schedule_minutes(), ts.minute());
    let start_sec = product.start_second();

    let base_key = format!("ABI-L1b-{}/{year}/{doy:03}/{hour:02}/", product.key_name());

    let filename = if exact_match {
        let creation = format!("{year}{doy:03}{hour:02}{valid_minute:02}59");
        format!(
            "OR_ABI-L1b-{}-M6C{band:02}_{code}_s{year}{doy:03}{hour:02}{valid_minute:02}{start_sec:02}_e{creation}_c{creation}.nc",
            product.key_name()
        )
    } else {
        format!(
            "OR_ABI-L1b-{}-M6C{band:02}_{code}_s{year}{doy:03}{hour:02}{valid_minute:02}*_e*_c*.nc",
            product.key_name()
        )
    };

    Ok(base_key + &filename)
}

/// Synthesize a CDN URL for `(timestamp, satellite)` (spec §4.A, §6 CDN
/// protocol grammar).
pub fn to_cdn_url(ts: DateTime<Utc>, satellite: SatellitePattern, resolution: Option<&str>) -> Result<String> {
    satellite.require_known()?;
    let short = satellite.short_name().expect("checked by require_known");
    let res = resolution.unwrap_or(DEFAULT_CDN_RESOLUTION);
    let year = ts.year();
    let doy = date_to_doy(ts.date_naive());
    let hour = ts.hour();
    let minute = ts.minute();

    let filename = format!("{year}{doy:03}{hour:02}{minute:02}_{short}-ABI-FD-13-{res}.jpg");
    Ok(format!("https://cdn.star.nesdis.noaa.gov/{short}/ABI/FD/13/{filename}"))
}

fn band_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ABI-L1b-(?:RadF|RadC|RadM)-M\d+C(\d{2})_").unwrap())
}

/// Extract a band number from an arbitrary object-store key, if present
/// (spec §11 supplement 5; shared regex backing [`filter_s3_keys_by_band`]).
pub fn extract_band(key: &str) -> Option<u8> {
    band_regex()
        .captures(key)
        .and_then(|c| c[1].parse::<u8>().ok())
}

/// Filter object keys to those matching `target_band` (spec §4.A, §8
/// property 3). Invalid band numbers return an empty list rather than
/// erroring, matching the original's "filter is best-effort" semantics.
pub fn filter_s3_keys_by_band(keys: &[String], target_band: u8) -> Vec<String> {
    if target_band < 1 || target_band > 16 {
        log::warn!("invalid target band {target_band}, returning empty filter result");
        return Vec::new();
    }
    keys.iter()
        .filter(|key| {
            extract_band(key)
                .map(|b| b == target_band)
                .unwrap_or_else(|| key.contains(&format!("C{target_band:02}_")))
        })
        .cloned()
        .collect()
}

/// Local on-disk destination for a downloaded object, matching the
/// original's `SatDump`-style layout: `{root}/{satellite}/FD/13/{YYYY}/{DDD}/`
/// (spec §11 supplement 4).
pub fn local_path_for(ts: DateTime<Utc>, satellite: SatellitePattern, base_dir: &Path) -> Result<PathBuf> {
    satellite.require_known()?;
    let short = satellite.short_name().expect("checked by require_known");
    let year = ts.year();
    let doy = date_to_doy(ts.date_naive());
    let hour = ts.hour();
    let minute = ts.minute();

    let dir = base_dir
        .join(short)
        .join("FD")
        .join("13")
        .join(year.to_string())
        .join(format!("{doy:03}"));
    let filename = format!("{year}{doy:03}{hour:02}{minute:02}_{short}-ABI-FD-13-5424x5424.png");
    Ok(dir.join(filename))
}

/// Nearest adjacent schedule points surrounding `minute`, handling hour
/// rollover (spec §4.A "Nearest-intervals query"). Continuous products
/// (RadM) return `[ts]` with seconds zeroed.
pub fn nearest_intervals(ts: DateTime<Utc>, product: ProductType) -> Vec<DateTime<Utc>> {
    let zeroed = ts.with_second(0).unwrap().with_nanosecond(0).unwrap();
    if product.is_continuous() {
        return vec![zeroed];
    }

    let schedule = product.schedule_minutes();
    if schedule.len() == 1 {
        return vec![ts.with_minute(schedule[0]).unwrap().with_second(0).unwrap()];
    }

    let minute = ts.minute();
    let mut prev = None;
    let mut next = None;
    for &m in schedule {
        if m <= minute {
            prev = Some(m);
        } else if next.is_none() {
            next = Some(m);
        }
    }

    let (before, after) = match (prev, next) {
        (Some(p), Some(n)) => (
            ts.with_minute(p).unwrap(),
            ts.with_minute(n).unwrap(),
        ),
        (None, Some(n)) => (
            (ts - Duration::hours(1)).with_minute(*schedule.last().unwrap()).unwrap(),
            ts.with_minute(n).unwrap(),
        ),
        (Some(p), None) => (
            ts.with_minute(p).unwrap(),
            (ts + Duration::hours(1)).with_minute(schedule[0]).unwrap(),
        ),
        (None, None) => unreachable!("schedule is non-empty"),
    };

    vec![
        before.with_second(0).unwrap().with_nanosecond(0).unwrap(),
        after.with_second(0).unwrap().with_nanosecond(0).unwrap(),
    ]
}

/// Whether `ts` falls within the CDN's recent-availability window relative
/// to `now` (spec §6, §11 supplement 3).
pub fn is_recent(ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - ts).num_days() < RECENT_WINDOW_DAYS
}

/// Infer the most common interval (in minutes, rounded to the nearest 5)
/// between consecutive timestamps (spec §11 supplement 2). Falls back to
/// 30 minutes when fewer than two timestamps or no interval in `1..=60`
/// minutes is found, matching the original's defaulting behavior.
pub fn detect_interval(timestamps: &[DateTime<Utc>]) -> u32 {
    if timestamps.len() < 2 {
        return 30;
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort();

    let mut counts: HashMap<i64, u32> = HashMap::new();
    for pair in sorted.windows(2) {
        let minutes = (pair[1] - pair[0]).num_seconds() as f64 / 60.0;
        if (1.0..=60.0).contains(&minutes) {
            *counts.entry(minutes.round() as i64).or_insert(0) += 1;
        }
    }

    match counts.into_iter().max_by_key(|&(_, count)| count) {
        Some((minutes, _)) => {
            let rounded = ((minutes as f64 / 5.0).round() * 5.0) as i64;
            rounded.max(1) as u32
        }
        None => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn s1_radc_key_uses_nearest_minute_at_or_before() {
        // The nearest-at-or-before minute for :30 in the RadC schedule
        // {..,26,31,..} is 26, not 31 (31 > 30 would violate the universal
        // property in spec §8: "minute <= ts.minute"). See DESIGN.md for
        // the note on this vs. the spec's own worked example.
        let key = to_s3_key(
            ts(2023, 6, 15, 12, 30, 0),
            SatellitePattern::Goes16,
            ProductType::RadC,
            13,
            true,
        )
        .unwrap();
        assert!(key.contains("ABI-L1b-RadC/2023/166/12/"));
        assert!(key.contains("M6C13_G16_s20231661226"));
    }

    #[test]
    fn s5_cdn_url_for_goes18() {
        let url = to_cdn_url(ts(2023, 6, 15, 12, 30, 0), SatellitePattern::Goes18, None).unwrap();
        assert!(url.starts_with("https://cdn.star.nesdis.noaa.gov/GOES18/ABI/"));
        assert!(url.contains("20231661230"));
        assert!(url.contains("5424x5424"));
    }

    #[test]
    fn band_filter_matches_exactly_one() {
        let key = to_s3_key(ts(2023, 6, 15, 12, 0, 0), SatellitePattern::Goes16, ProductType::RadC, 7, true).unwrap();
        let keys = vec![key];
        assert_eq!(filter_s3_keys_by_band(&keys, 7).len(), 1);
        assert_eq!(filter_s3_keys_by_band(&keys, 9).len(), 0);
    }

    #[test]
    fn invalid_band_is_invalid_input() {
        assert!(to_s3_key(ts(2023, 1, 1, 0, 0, 0), SatellitePattern::Goes16, ProductType::RadF, 99, true).is_err());
    }

    #[test]
    fn unknown_product_is_invalid_input() {
        assert!(ProductType::parse("RadX").is_err());
    }

    #[test]
    fn leap_day_key_uses_doy_060() {
        let key = to_s3_key(ts(2024, 2, 29, 0, 0, 0), SatellitePattern::Goes16, ProductType::RadF, 13, true).unwrap();
        assert!(key.contains("/2024/060/"));
    }

    #[test]
    fn radm_nearest_intervals_is_just_the_input_minute() {
        let t = ts(2023, 1, 1, 5, 37, 42);
        let intervals = nearest_intervals(t, ProductType::RadM1);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].second(), 0);
    }

    #[test]
    fn nearest_intervals_rolls_over_hour_boundary() {
        let t = ts(2023, 1, 1, 5, 58, 0);
        let intervals = nearest_intervals(t, ProductType::RadF);
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].minute(), 50);
        assert_eq!(intervals[1].hour(), 6);
        assert_eq!(intervals[1].minute(), 0);
    }

    #[test]
    fn detect_interval_finds_15_minutes() {
        let stamps = vec![
            ts(2023, 1, 1, 0, 0, 0),
            ts(2023, 1, 1, 0, 15, 0),
            ts(2023, 1, 1, 0, 30, 0),
            ts(2023, 1, 1, 0, 45, 0),
        ];
        assert_eq!(detect_interval(&stamps), 15);
    }

    #[test]
    fn is_recent_within_window() {
        let now = ts(2023, 6, 20, 0, 0, 0);
        assert!(is_recent(ts(2023, 6, 15, 0, 0, 0), now));
        assert!(!is_recent(ts(2023, 5, 1, 0, 0, 0), now));
    }
}
