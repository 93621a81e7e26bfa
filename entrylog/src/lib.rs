//! Background flushing of business events to hourly log files.
//!
//! Producers hand events to an [`EntryLogger`] from any thread. A single
//! worker thread wakes on a fixed interval, drains everything that
//! accumulated, appends one line per event to the file for the current hour
//! and records each event with the injected [`EventMetrics`].

pub mod buffer;
pub mod clock;
pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod sink;
pub mod worker;

pub use buffer::EventBuffer;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::LoggerConfig;
pub use error::{FlushError, LoggerError};
pub use logger::EntryLogger;
pub use metrics::{CountingMetrics, EventMetrics};
pub use sink::{HourBucket, HourlyFiles, SinkError, SinkFactory};
pub use worker::FlushWorker;
