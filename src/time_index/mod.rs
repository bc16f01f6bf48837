//! Satellite Time Index (spec §4.A): parses satellite filenames/paths into
//! timestamps and synthesizes the object-store keys and CDN URLs used to
//! locate matching frames. Consulted independently by callers that need to
//! locate remote objects; not on the pipeline's hot path (spec §2).

mod keys;
mod pattern;
mod product;
mod timestamp;

pub use keys::{
    detect_interval, extract_band, filter_s3_keys_by_band, is_recent, local_path_for,
    nearest_intervals, to_cdn_url, to_s3_key, RECENT_WINDOW_DAYS,
};
pub use pattern::SatellitePattern;
pub use product::{nearest_scan_minute, ProductType};
pub use timestamp::{
    date_to_doy, doy_to_date, expected_filename, extract_timestamp,
    extract_timestamp_and_satellite, extract_timestamp_from_directory_name, format_timestamp,
};
