//! Tracking ids: `TRK-YYYYMMDD-NNNNNN`, UTC date plus a random six digit suffix.
//!
//! Ids are not re-checked for uniqueness at generation; the unique index on
//! `parcels.tracking_id` is the backstop.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use crate::constants::{TRACKING_ID_PREFIX, TRACKING_SUFFIX_MAX, TRACKING_SUFFIX_MIN};

static TRACKING_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TRK-\d{8}-\d{6}$").expect("tracking id pattern compiles"));

/// Generate a tracking id for `now`.
pub fn generate_tracking_id(now: DateTime<Utc>) -> String {
    let suffix = rand::thread_rng().gen_range(TRACKING_SUFFIX_MIN..=TRACKING_SUFFIX_MAX);
    format!("{}-{}-{}", TRACKING_ID_PREFIX, now.format("%Y%m%d"), suffix)
}

/// Whether `candidate` has the tracking id shape.
pub fn is_valid_tracking_id(candidate: &str) -> bool {
    TRACKING_ID_PATTERN.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_ids_match_pattern() {
        for _ in 0..200 {
            let id = generate_tracking_id(Utc::now());
            assert!(is_valid_tracking_id(&id), "bad id {}", id);
        }
    }

    #[test]
    fn date_segment_is_utc_calendar_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        let id = generate_tracking_id(at);

        assert!(id.starts_with("TRK-20240309-"));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!is_valid_tracking_id("TRK-2024039-123456"));
        assert!(!is_valid_tracking_id("trk-20240309-123456"));
        assert!(!is_valid_tracking_id("TRK-20240309-12345a"));
        assert!(!is_valid_tracking_id(" TRK-20240309-123456"));
    }
}
