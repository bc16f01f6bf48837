//! Scan-sector product types and their cadence schedules (spec §3 `ProductType`).

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    RadF,
    RadC,
    RadM1,
    RadM2,
}

impl ProductType {
    /// Canonical scan-schedule minutes-of-hour, per spec §3.
    pub fn schedule_minutes(self) -> &'static [u32] {
        match self {
            ProductType::RadF => &[0, 10, 20, 30, 40, 50],
            ProductType::RadC => &[1, 6, 11, 16, 21, 26, 31, 36, 41, 46, 51, 56],
            ProductType::RadM1 | ProductType::RadM2 => RADM_MINUTES,
        }
    }

    /// Nominal start-second within a scan minute, per spec §3 and §9 open
    /// question 2 (the more specific `{RadF:0, RadC:19, RadM:24}` table is
    /// normative).
    pub fn start_second(self) -> u32 {
        match self {
            ProductType::RadF => 0,
            ProductType::RadC => 19,
            ProductType::RadM1 | ProductType::RadM2 => 24,
        }
    }

    /// S3 key infix (`ABI-L1b-{product}`), e.g. `RadF`, `RadC`, `RadM`.
    pub fn key_name(self) -> &'static str {
        match self {
            ProductType::RadF => "RadF",
            ProductType::RadC => "RadC",
            ProductType::RadM1 | ProductType::RadM2 => "RadM",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "RadF" => Ok(ProductType::RadF),
            "RadC" => Ok(ProductType::RadC),
            "RadM1" => Ok(ProductType::RadM1),
            "RadM2" => Ok(ProductType::RadM2),
            other => Err(PipelineError::InvalidInput(format!(
                "unknown product type: {other}"
            ))),
        }
    }

    /// Whether this product scans continuously (every minute), i.e. the
    /// mesoscale sectors.
    pub fn is_continuous(self) -> bool {
        matches!(self, ProductType::RadM1 | ProductType::RadM2)
    }
}

static RADM_MINUTES: &[u32] = &[
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48,
    49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59,
];

/// Select `max { s in schedule : s <= minute }`, falling back to
/// `max(schedule)` when `minute` precedes every scheduled minute of the
/// hour (spec §4.A "Nearest-scan selection"; hour rollover is the caller's
/// concern, not materialized here).
pub fn nearest_scan_minute(schedule: &[u32], minute: u32) -> u32 {
    schedule
        .iter()
        .copied()
        .filter(|&s| s <= minute)
        .max()
        .unwrap_or_else(|| *schedule.iter().max().expect("schedule is non-empty"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_scan_minute_picks_at_or_before() {
        assert_eq!(nearest_scan_minute(ProductType::RadC.schedule_minutes(), 30), 26);
        assert_eq!(nearest_scan_minute(ProductType::RadC.schedule_minutes(), 31), 31);
    }

    #[test]
    fn nearest_scan_minute_wraps_to_last_slot_when_before_all() {
        // minute 0 precedes RadC's first slot (1), so the previous hour's
        // last slot (56) is conceptually implied, per spec §4.A.
        assert_eq!(nearest_scan_minute(ProductType::RadC.schedule_minutes(), 0), 56);
    }

    #[test]
    fn radm_is_continuous_every_minute() {
        assert!(ProductType::RadM1.is_continuous());
        assert_eq!(ProductType::RadM1.schedule_minutes().len(), 60);
    }
}
