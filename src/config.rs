use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

#[derive(Debug, Clone)]
pub struct PoubConfig {
    pub book_at: NaiveTime,
    pub refresh_at: NaiveTime,
    pub max_wait: Duration,
    pub timetable_stale_after: Duration,
    pub book_retries: usize,
    pub receipt_dir: PathBuf,
}

impl Default for PoubConfig {
    fn default() -> Self {
        Self {
            book_at: NaiveTime::from_hms_micro_opt(0, 0, 0, 10).unwrap_or(NaiveTime::MIN),
            refresh_at: NaiveTime::from_hms_opt(23, 50, 0).unwrap_or(NaiveTime::MIN),
            max_wait: Duration::from_secs(10 * 60),
            timetable_stale_after: Duration::from_secs(5 * 60),
            book_retries: 3,
            receipt_dir: env::temp_dir(),
        }
    }
}

impl PoubConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(time) = time_var("POUB_BOOK_AT") {
            config.book_at = time;
        }

        if let Some(time) = time_var("POUB_REFRESH_AT") {
            config.refresh_at = time;
        }

        if let Some(secs) = parsed_var::<u64>("POUB_MAX_WAIT_SECS") {
            config.max_wait = Duration::from_secs(secs.max(1));
        }

        if let Some(secs) = parsed_var::<u64>("POUB_TIMETABLE_STALE_SECS") {
            config.timetable_stale_after = Duration::from_secs(secs);
        }

        if let Some(retries) = parsed_var::<usize>("POUB_BOOK_RETRIES") {
            config.book_retries = retries;
        }

        if let Ok(dir) = env::var("POUB_RECEIPT_DIR") {
            config.receipt_dir = PathBuf::from(dir);
        }

        config
    }
}

/// Accepts `HH:MM`, `HH:MM:SS` and `HH:MM:SS.ffffff`.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn time_var(name: &str) -> Option<NaiveTime> {
    let value = env::var(name).ok()?;
    let time = parse_time_of_day(&value);
    if time.is_none() {
        log::warn!("Ignoring {}={:?}: not a time of day", name, value);
    }
    time
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    let parsed = value.parse::<T>().ok();
    if parsed.is_none() {
        log::warn!("Ignoring {}={:?}: invalid value", name, value);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("00:00:00.000010"),
            NaiveTime::from_hms_micro_opt(0, 0, 0, 10)
        );
        assert_eq!(
            parse_time_of_day("23:50:00"),
            NaiveTime::from_hms_opt(23, 50, 0)
        );
        assert_eq!(parse_time_of_day("23:50"), NaiveTime::from_hms_opt(23, 50, 0));
        assert_eq!(parse_time_of_day("midnight"), None);
    }

    #[test]
    fn test_defaults() {
        let config = PoubConfig::default();
        assert_eq!(config.book_at, NaiveTime::from_hms_micro_opt(0, 0, 0, 10).unwrap());
        assert_eq!(config.max_wait, Duration::from_secs(600));
        assert_eq!(config.book_retries, 3);
    }
}
