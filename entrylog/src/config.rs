use std::path::PathBuf;
use std::time::Duration;

use crate::sink::HourlyFiles;

/// Configuration for a file-backed [`EntryLogger`](crate::EntryLogger)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Sleep between flush cycles
    pub flush_interval: Duration,

    /// Directory the hourly files are written to
    pub directory: PathBuf,

    /// Extension of the hourly files, without the dot
    pub extension: String,

    /// Capacity of the buffered writer in front of each file
    pub buffer_size: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(1),
            directory: PathBuf::from("."),
            extension: "log".to_string(),
            buffer_size: HourlyFiles::DEFAULT_BUFFER_SIZE,
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}
