//! Satellite identification (spec §3 `SatellitePattern`, §4.A).

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SatellitePattern {
    Goes16,
    Goes18,
    /// Permissive fallback used only for filename parsing (spec §3).
    Generic,
}

impl SatellitePattern {
    pub fn short_name(self) -> Option<&'static str> {
        match self {
            SatellitePattern::Goes16 => Some("GOES16"),
            SatellitePattern::Goes18 => Some("GOES18"),
            SatellitePattern::Generic => None,
        }
    }

    pub fn s3_code(self) -> Option<&'static str> {
        match self {
            SatellitePattern::Goes16 => Some("G16"),
            SatellitePattern::Goes18 => Some("G18"),
            SatellitePattern::Generic => None,
        }
    }

    pub fn s3_bucket(self) -> Option<&'static str> {
        match self {
            SatellitePattern::Goes16 => Some("noaa-goes16"),
            SatellitePattern::Goes18 => Some("noaa-goes18"),
            SatellitePattern::Generic => None,
        }
    }

    /// Require that this pattern carries the per-satellite metadata that
    /// key/URL synthesis needs; `Generic` is rejected (spec §4.A error
    /// semantics: "unknown satellite -> InvalidInput").
    pub fn require_known(self) -> Result<Self> {
        if self.s3_code().is_some() {
            Ok(self)
        } else {
            Err(PipelineError::InvalidInput(format!(
                "unsupported satellite pattern: {self:?}"
            )))
        }
    }

    /// Legacy-filename extraction regex: `_G16_` / `G16_13_` style markers
    /// followed by a `YYYYMMDDTHHMMSS` stamp (pattern 6 in spec §4.A).
    fn legacy_regex(self) -> &'static Regex {
        static GOES16: OnceLock<Regex> = OnceLock::new();
        static GOES18: OnceLock<Regex> = OnceLock::new();
        static GENERIC: OnceLock<Regex> = OnceLock::new();
        match self {
            SatellitePattern::Goes16 => GOES16.get_or_init(|| {
                Regex::new(r"(?:_G16_|G16_13_)(\d{8}T\d{6})Z\.png$").unwrap()
            }),
            SatellitePattern::Goes18 => GOES18.get_or_init(|| {
                Regex::new(r"(?:_G18_|G18_13_)(\d{8}T\d{6})Z\.png$").unwrap()
            }),
            SatellitePattern::Generic => {
                GENERIC.get_or_init(|| Regex::new(r"_(\d{8}T\d{6})Z\.png$").unwrap())
            }
        }
    }

    pub(super) fn legacy_match<'a>(self, filename: &'a str) -> Option<regex::Captures<'a>> {
        self.legacy_regex().captures(filename)
    }

    /// CDN/S3 compact-stamp filename regex (pattern 7 in spec §4.A):
    /// `YYYYDDDHHMM_GOES{NN}-ABI-{sector}-13-{WWxHH}.jpg`.
    fn cdn_regex(self) -> Option<&'static Regex> {
        static GOES16: OnceLock<Regex> = OnceLock::new();
        static GOES18: OnceLock<Regex> = OnceLock::new();
        match self {
            SatellitePattern::Goes16 => Some(GOES16.get_or_init(|| {
                Regex::new(r"(\d{4})(\d{3})(\d{2})(\d{2})(?:\d{2})?_GOES16-ABI-\w+-13").unwrap()
            })),
            SatellitePattern::Goes18 => Some(GOES18.get_or_init(|| {
                Regex::new(r"(\d{4})(\d{3})(\d{2})(\d{2})(?:\d{2})?_GOES18-ABI-\w+-13").unwrap()
            })),
            SatellitePattern::Generic => None,
        }
    }

    pub(super) fn cdn_match<'a>(self, filename: &'a str) -> Option<regex::Captures<'a>> {
        self.cdn_regex().and_then(|re| re.captures(filename))
    }

    pub(super) fn all_known() -> [SatellitePattern; 2] {
        [SatellitePattern::Goes16, SatellitePattern::Goes18]
    }
}
