use std::fmt::Display;
use std::time::SystemTime;

/// A stand-in business event, as a request handler would record it.
#[derive(Debug, Clone)]
pub struct BusinessEvent {
    pub producer: usize,
    pub sequence: usize,
    pub recorded_at: SystemTime,
}

impl BusinessEvent {
    pub fn now(producer: usize, sequence: usize) -> Self {
        Self {
            producer,
            sequence,
            recorded_at: SystemTime::now(),
        }
    }
}

impl Display for BusinessEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} producer={} sequence={}",
            humantime::format_rfc3339_millis(self.recorded_at),
            self.producer,
            self.sequence
        )
    }
}
