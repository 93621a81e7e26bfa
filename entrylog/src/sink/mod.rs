use std::fmt::Display;
use std::io::Write;

use chrono::NaiveDateTime;

pub mod hourly_files;
pub mod sink_error;

pub use hourly_files::HourlyFiles;
pub use sink_error::{SinkError, StringError};

/// Opens the append-only destination for one wall-clock hour.
///
/// The worker calls `open` at most once per hour change and owns the returned
/// writer until the hour rolls over, at which point it flushes and drops it.
pub trait SinkFactory: Send + 'static {
    type Sink: Write + Send;

    fn open(&mut self, hour: &HourBucket) -> Result<Self::Sink, SinkError>;
}

/// The `yyyy-MM-dd-HH` bucket a point in time falls into.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourBucket {
    label: String,
}

impl HourBucket {
    pub const FORMAT: &'static str = "%Y-%m-%d-%H";

    pub fn containing(time: NaiveDateTime) -> Self {
        Self {
            label: time.format(Self::FORMAT).to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.label
    }

    /// `2026-10-16-09.log` for extension `log`; the bare label when the
    /// extension is empty.
    pub fn file_name(&self, extension: &str) -> String {
        if extension.is_empty() {
            self.label.clone()
        } else {
            format!("{}.{}", self.label, extension)
        }
    }
}

impl Display for HourBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
