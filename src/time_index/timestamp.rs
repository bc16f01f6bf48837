//! Timestamp extraction from satellite filenames and directory names
//! (spec §4.A patterns 1–7, §8 property 4).

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::pattern::SatellitePattern;
use crate::error::{PipelineError, Result};

/// Convert `(year, day_of_year)` to a calendar date. `doy` must be in
/// `1..=366`, and `366` requires `year` to be a leap year (spec §8 boundary
/// behavior: "Day of year 366 in non-leap year ... fails with InvalidInput").
pub fn doy_to_date(year: i32, doy: u32) -> Result<NaiveDate> {
    if doy < 1 || doy > 366 {
        return Err(PipelineError::InvalidInput(format!(
            "day of year must be between 1 and 366, got {doy}"
        )));
    }
    let is_leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    if doy == 366 && !is_leap {
        return Err(PipelineError::InvalidInput(format!(
            "day of year 366 is invalid for non-leap year {year}"
        )));
    }
    NaiveDate::from_yo_opt(year, doy).ok_or_else(|| {
        PipelineError::InvalidInput(format!("invalid year/day-of-year: {year}/{doy}"))
    })
}

/// Inverse of [`doy_to_date`]: day-of-year (1-366) for a calendar date.
pub fn date_to_doy(date: NaiveDate) -> u32 {
    date.ordinal()
}

fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(y, mo, d)?;
    let time = chrono::NaiveTime::from_hms_opt(h, mi, s)?;
    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

/// Pattern 1: `goes{NN}_YYYYMMDD_HHMMSS_band{BB}.png`, the preferred
/// internal convention (spec §4.A pattern 1).
fn internal_filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"goes(\d+)_(\d{8})_(\d{6})_band(\d+)\.png$").unwrap()
    })
}

/// Extract `(timestamp, satellite)` from a filename using the specified
/// satellite's legacy pattern (spec §4.A, pattern 6 primarily, falling
/// back to the preferred internal convention). Raises on genuine parse
/// failure (bad regex capture group); a filename that simply doesn't
/// match returns `None` per §4.A error semantics.
pub fn extract_timestamp(filename: &str, satellite: SatellitePattern) -> Result<Option<DateTime<Utc>>> {
    if let Some(caps) = internal_filename_regex().captures(filename) {
        let date_str = &caps[2];
        let time_str = &caps[3];
        let combined = format!("{date_str}_{time_str}");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&combined, "%Y%m%d_%H%M%S") {
            return Ok(Some(Utc.from_utc_datetime(&naive)));
        }
    }

    let caps = match satellite.legacy_match(filename) {
        Some(c) => c,
        None => return Ok(None),
    };
    let stamp = &caps[1];
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S").map_err(|e| {
        PipelineError::InvalidInput(format!("failed to parse timestamp {stamp:?}: {e}"))
    })?;
    Ok(Some(Utc.from_utc_datetime(&naive)))
}

/// Extract `(timestamp, satellite)` from a GOES ABI CDN-style filename,
/// e.g. `2025115042_GOES18-ABI-FD-13-5424x5424.jpg` (spec §4.A pattern 7).
pub fn extract_timestamp_and_satellite(filename: &str) -> Result<Option<(DateTime<Utc>, SatellitePattern)>> {
    for sat in SatellitePattern::all_known() {
        if let Some(caps) = sat.cdn_match(filename) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            let doy: u32 = caps[2].parse().unwrap_or(0);
            let hour: u32 = caps[3].parse().unwrap_or(0);
            let minute: u32 = caps[4].parse().unwrap_or(0);
            let date = doy_to_date(year, doy)?;
            let ts = ymd_hms(date.year(), date.month(), date.day(), hour, minute, 0)
                .ok_or_else(|| PipelineError::InvalidInput(format!("invalid date/time in {filename:?}")))?;
            return Ok(Some((ts, sat)));
        }
    }
    Ok(None)
}

/// Extract a timestamp from a directory (or bare path-component) name,
/// trying each of patterns 2–5 in order, first match wins (spec §4.A).
/// Returns `None` rather than erroring when nothing matches.
pub fn extract_timestamp_from_directory_name(dirname: &str) -> Option<DateTime<Utc>> {
    static DASHED: OnceLock<Regex> = OnceLock::new();
    static COMPACT: OnceLock<Regex> = OnceLock::new();
    static ISO_T: OnceLock<Regex> = OnceLock::new();
    static GOES_FD_DOY: OnceLock<Regex> = OnceLock::new();
    static YEAR_SLASH_DOY: OnceLock<Regex> = OnceLock::new();
    static YEAR_DOY_COMPACT: OnceLock<Regex> = OnceLock::new();

    let dashed = DASHED.get_or_init(|| {
        Regex::new(r"(\d{4})-(\d{2})-(\d{2})_(\d{2})-(\d{2})-(\d{2})").unwrap()
    });
    if let Some(c) = dashed.captures(dirname) {
        return ymd_hms(
            c[1].parse().ok()?,
            c[2].parse().ok()?,
            c[3].parse().ok()?,
            c[4].parse().ok()?,
            c[5].parse().ok()?,
            c[6].parse().ok()?,
        );
    }

    let compact = COMPACT.get_or_init(|| {
        Regex::new(r"(\d{4})(\d{2})(\d{2})_(\d{2})(\d{2})(\d{2})").unwrap()
    });
    if let Some(c) = compact.captures(dirname) {
        return ymd_hms(
            c[1].parse().ok()?,
            c[2].parse().ok()?,
            c[3].parse().ok()?,
            c[4].parse().ok()?,
            c[5].parse().ok()?,
            c[6].parse().ok()?,
        );
    }

    let iso_t = ISO_T.get_or_init(|| {
        Regex::new(r"(\d{4})(\d{2})(\d{2})T(\d{2})(\d{2})(\d{2})").unwrap()
    });
    if let Some(c) = iso_t.captures(dirname) {
        return ymd_hms(
            c[1].parse().ok()?,
            c[2].parse().ok()?,
            c[3].parse().ok()?,
            c[4].parse().ok()?,
            c[5].parse().ok()?,
            c[6].parse().ok()?,
        );
    }

    let goes_fd = GOES_FD_DOY.get_or_init(|| {
        Regex::new(r"GOES\d+/FD/\d+/(\d{4})/(\d{3})").unwrap()
    });
    if let Some(c) = goes_fd.captures(dirname) {
        let year: i32 = c[1].parse().ok()?;
        let doy: u32 = c[2].parse().ok()?;
        let date = doy_to_date(year, doy).ok()?;
        return ymd_hms(date.year(), date.month(), date.day(), 0, 0, 0);
    }

    let year_slash_doy = YEAR_SLASH_DOY.get_or_init(|| Regex::new(r"(\d{4})/(\d{3})(?:/|$)").unwrap());
    if let Some(c) = year_slash_doy.captures(dirname) {
        let year: i32 = c[1].parse().ok()?;
        let doy: u32 = c[2].parse().ok()?;
        let date = doy_to_date(year, doy).ok()?;
        return ymd_hms(date.year(), date.month(), date.day(), 0, 0, 0);
    }

    let year_doy_compact = YEAR_DOY_COMPACT.get_or_init(|| Regex::new(r"^(\d{4})(\d{3})$").unwrap());
    if let Some(c) = year_doy_compact.captures(dirname) {
        let year: i32 = c[1].parse().ok()?;
        let doy: u32 = c[2].parse().ok()?;
        let date = doy_to_date(year, doy).ok()?;
        return ymd_hms(date.year(), date.month(), date.day(), 0, 0, 0);
    }

    None
}

/// Format a timestamp as `YYYYMMDDTHHMMSS`, the inverse of the legacy
/// filename pattern's stamp (spec §8 round-trip property).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%S").to_string()
}

/// Build the filename this crate would itself produce for `(ts, satellite)`,
/// used by the round-trip property test (spec §8 property 4).
pub fn expected_filename(ts: DateTime<Utc>, satellite: SatellitePattern) -> String {
    let code = satellite.s3_code().unwrap_or("GXX");
    format!("image_{code}_{}Z.png", format_timestamp(ts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doy_366_rejected_in_non_leap_year() {
        assert!(doy_to_date(2023, 366).is_err());
    }

    #[test]
    fn doy_366_accepted_in_leap_year() {
        let d = doy_to_date(2024, 366).unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2024, 12, 31));
    }

    #[test]
    fn leap_day_doy_is_60() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(date_to_doy(d), 60);
    }

    #[test]
    fn directory_name_dashed_form() {
        let ts = extract_timestamp_from_directory_name("2024-12-21_18-00-22").unwrap();
        assert_eq!(ts, ymd_hms(2024, 12, 21, 18, 0, 22).unwrap());
    }

    #[test]
    fn directory_name_goes_fd_doy_form_defaults_midnight() {
        let ts = extract_timestamp_from_directory_name("GOES18/FD/13/2023/123").unwrap();
        assert_eq!(ts, ymd_hms(2023, 5, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn unmatched_name_returns_none() {
        assert!(extract_timestamp_from_directory_name("not_a_timestamp").is_none());
    }

    #[test]
    fn round_trip_filename_extraction() {
        for sat in SatellitePattern::all_known() {
            let ts = ymd_hms(2023, 6, 15, 12, 30, 0).unwrap();
            let filename = expected_filename(ts, sat);
            let extracted = extract_timestamp(&filename, sat).unwrap();
            assert_eq!(extracted, Some(ts));
        }
    }

    #[test]
    fn internal_convention_filename_parses() {
        let ts = extract_timestamp("goes16_20231027_120000_band13.png", SatellitePattern::Goes16)
            .unwrap()
            .unwrap();
        assert_eq!(ts, ymd_hms(2023, 10, 27, 12, 0, 0).unwrap());
    }

    #[test]
    fn non_matching_filename_is_none_not_error() {
        assert!(extract_timestamp("random.png", SatellitePattern::Goes16)
            .unwrap()
            .is_none());
    }
}
