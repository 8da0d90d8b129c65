use chrono::{DateTime, Utc};

const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Source of wall-clock time for the tracking controller.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Milliseconds between `start` and `now`, clamped to zero when `now` is not after `start`.
pub fn elapsed_ms_since(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - start).num_milliseconds().max(0) as u64
}

/// Renders a duration as `HH:MM`. Hours keep growing past 24, minutes are floored.
pub fn format_hh_mm(elapsed_ms: u64) -> String {
    let hours = elapsed_ms / MS_PER_HOUR;
    let minutes = (elapsed_ms % MS_PER_HOUR) / MS_PER_MINUTE;
    format!("{hours:02}:{minutes:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn elapsed_is_clamped_when_now_precedes_start() {
        let start = Utc::now();
        assert_eq!(elapsed_ms_since(start, start), 0);
        assert_eq!(elapsed_ms_since(start, start - Duration::seconds(5)), 0);
    }

    #[test]
    fn elapsed_is_plain_difference_otherwise() {
        let start = Utc::now();
        let now = start + Duration::milliseconds(90_500);
        assert_eq!(elapsed_ms_since(start, now), 90_500);
    }

    #[test]
    fn formats_with_minute_floor() {
        assert_eq!(format_hh_mm(0), "00:00");
        assert_eq!(format_hh_mm(59_999), "00:00");
        assert_eq!(format_hh_mm(90_000), "00:01");
        assert_eq!(format_hh_mm(3 * MS_PER_HOUR + 7 * MS_PER_MINUTE + 59_000), "03:07");
    }

    #[test]
    fn hours_do_not_wrap_at_day_boundary() {
        assert_eq!(format_hh_mm(26 * MS_PER_HOUR + 5 * MS_PER_MINUTE), "26:05");
        assert_eq!(format_hh_mm(123 * MS_PER_HOUR), "123:00");
    }
}
