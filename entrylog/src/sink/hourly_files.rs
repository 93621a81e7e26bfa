use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::PathBuf;

use super::{HourBucket, SinkError, SinkFactory};

/// One append-only file per hour under `directory`, named after the hour.
///
/// Existing files are appended to, never truncated.
#[derive(Debug, Clone)]
pub struct HourlyFiles {
    directory: PathBuf,
    extension: String,
    buffer_size: usize,
}

impl HourlyFiles {
    pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
        }
    }

    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn path_for(&self, hour: &HourBucket) -> PathBuf {
        self.directory.join(hour.file_name(&self.extension))
    }
}

impl SinkFactory for HourlyFiles {
    type Sink = BufWriter<File>;

    fn open(&mut self, hour: &HourBucket) -> Result<Self::Sink, SinkError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path_for(hour);
        log::debug!("opening {:?} for appending", path);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(BufWriter::with_capacity(self.buffer_size, file))
    }
}
