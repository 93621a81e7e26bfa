use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use entrylog::LoggerConfig;

#[derive(Debug, Clone, Parser)]
#[clap(
    author = "Kenny",
    about = "Drive an entry logger with concurrent producers and check that every event is flushed"
)]
pub struct Options {
    #[clap(long, env = "ENTRYLOG_DIRECTORY", default_value = ".")]
    pub directory: PathBuf,
    #[clap(long, env = "ENTRYLOG_EXTENSION", default_value = "log")]
    pub extension: String,
    #[clap(
        long,
        env = "ENTRYLOG_FLUSH_INTERVAL",
        default_value = "50ms",
        value_parser = humantime::parse_duration
    )]
    pub flush_interval: Duration,
    #[clap(long, env = "ENTRYLOG_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[clap(long, default_value = "32", help = "Concurrent producer threads")]
    pub producers: usize,
    #[clap(long, default_value = "1000", help = "Events appended by each producer")]
    pub events_per_producer: usize,
    #[clap(
        long,
        default_value = "2s",
        value_parser = humantime::parse_duration,
        help = "How long to wait for the worker to flush everything"
    )]
    pub run_for: Duration,
}

impl Options {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::default()
            .with_flush_interval(self.flush_interval)
            .with_directory(self.directory.clone())
            .with_extension(self.extension.clone())
    }

    pub fn expected_events(&self) -> anyhow::Result<u64> {
        u64::try_from(self.producers)
            .ok()
            .zip(u64::try_from(self.events_per_producer).ok())
            .and_then(|(producers, events)| producers.checked_mul(events))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "{} producers x {} events does not fit in a counter",
                    self.producers,
                    self.events_per_producer
                )
            })
    }
}

pub fn get_args() -> Options {
    let command_line_args = Options::parse();
    log::debug!("Args: {:?}", command_line_args);
    command_line_args
}
