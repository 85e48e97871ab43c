//! Timestamped output file names

use chrono::{Local, NaiveDateTime};

use super::media::Container;

/// Stamp format: year, then zero-padded month, day, hour, minute, second
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Current local wall-clock time
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Format a time as `YYYYMMDDhhmmss`
pub fn timestamp_stem(at: NaiveDateTime) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Build the output file name, e.g. `20240305090702.webm`
pub fn output_file_name(at: NaiveDateTime, container: Container) -> String {
    format!("{}.{}", timestamp_stem(at), container.extension())
}
