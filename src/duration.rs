//! Recording durations as `H:MM:SS` strings.

use serde::Serializer;

/// Substituted when a duration cannot be probed or parsed.
pub const FALLBACK: &str = "0:00:00";

/// Formats a duration in seconds as `H:MM:SS`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Normalizes a stored duration for display. Rows written by older
/// clients carry `M:SS` (minutes may exceed 59); current rows are
/// already `H:MM:SS` and pass through unchanged.
pub fn normalize(duration: &str) -> String {
    let parts: Vec<&str> = duration.split(':').collect();

    match parts.as_slice() {
        [_, _, _] => duration.to_owned(),
        [minutes, seconds] => {
            let total_minutes: u64 = minutes.parse().unwrap_or(0);
            let seconds: u64 = seconds.parse().unwrap_or(0);

            format!(
                "{}:{:02}:{:02}",
                total_minutes / 60,
                total_minutes % 60,
                seconds
            )
        }
        _ => FALLBACK.to_owned(),
    }
}

/// Serializes an optional stored duration through [`normalize`], so the
/// HTTP surface always presents `H:MM:SS`.
pub fn serialize_normalized<S>(duration: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(duration) => serializer.serialize_some(&normalize(duration)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{format_duration, normalize, FALLBACK};

    #[test]
    fn formats_seconds_as_hours() {
        assert_eq!(format_duration(4503.0), "1:15:03");
        assert_eq!(format_duration(59.9), "0:00:59");
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(3600.0), "1:00:00");
    }

    #[test]
    fn legacy_minutes_convert_to_hours() {
        assert_eq!(normalize("75:03"), "1:15:03");
        assert_eq!(normalize("5:30"), "0:05:30");
        assert_eq!(normalize("120:00"), "2:00:00");
    }

    #[test]
    fn canonical_form_passes_through() {
        assert_eq!(normalize("1:15:03"), "1:15:03");
        assert_eq!(normalize("0:00:00"), "0:00:00");
    }

    #[test]
    fn garbage_falls_back() {
        assert_eq!(normalize(""), FALLBACK);
        assert_eq!(normalize("90"), FALLBACK);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(duration in "[0-9]{1,3}:[0-5][0-9](:[0-5][0-9])?") {
            let once = normalize(&duration);
            prop_assert_eq!(&normalize(&once), &once);

            prop_assert_eq!(once.split(':').count(), 3);
        }
    }
}
