use chrono::{DateTime, SecondsFormat, Utc};

pub trait TimeSource {
    fn current_time(&self) -> DateTime<Utc>;
}

#[derive(Clone, Default)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant, for deterministic envelopes.
#[derive(Clone)]
pub struct FixedTime {
    pub time: DateTime<Utc>,
}

impl TimeSource for FixedTime {
    fn current_time(&self) -> DateTime<Utc> {
        self.time
    }
}

/// ISO-8601 in UTC with a `Z` suffix, e.g. `2024-03-01T12:00:00.250000Z`.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}
