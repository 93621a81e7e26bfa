use std::fmt::Display;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::watch;

use crate::buffer::EventBuffer;
use crate::clock::{Clock, SystemClock};
use crate::config::LoggerConfig;
use crate::error::LoggerError;
use crate::metrics::{CountingMetrics, EventMetrics};
use crate::sink::{HourlyFiles, SinkFactory};
use crate::worker::FlushWorker;

/// Accepts events from any number of threads and hands them to a dedicated
/// flush worker thread.
///
/// The worker starts as soon as the logger is built and runs until
/// [`shutdown`](EntryLogger::shutdown) is called or the logger is dropped.
/// Either one stops scheduling further cycles after a last flush; `shutdown`
/// additionally waits for that flush to finish.
pub struct EntryLogger<E> {
    buffer: Arc<EventBuffer<E>>,
    metrics: Arc<dyn EventMetrics<E>>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl<E> EntryLogger<E>
where
    E: Display + Send + 'static,
{
    /// Hourly files under `config.directory`, counted by [`CountingMetrics`].
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        let files = HourlyFiles::new(config.directory, config.extension)
            .with_buffer_size(config.buffer_size);
        Self::start(
            config.flush_interval,
            files,
            Arc::new(CountingMetrics::new()),
            SystemClock,
        )
    }

    pub fn start<F, C>(
        flush_interval: Duration,
        factory: F,
        metrics: Arc<dyn EventMetrics<E>>,
        clock: C,
    ) -> Result<Self, LoggerError>
    where
        F: SinkFactory,
        C: Clock,
    {
        let buffer = Arc::new(EventBuffer::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = FlushWorker::new(
            Arc::clone(&buffer),
            Arc::clone(&metrics),
            factory,
            clock,
            flush_interval,
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LoggerError::Runtime)?;
        let handle = std::thread::Builder::new()
            .name("entrylog-flush".to_string())
            .spawn(move || runtime.block_on(worker.run(shutdown_rx)))
            .map_err(LoggerError::Spawn)?;

        Ok(Self {
            buffer,
            metrics,
            shutdown,
            worker: Some(handle),
        })
    }

    /// Queue an event for the next flush cycle. Never blocks on I/O and never
    /// fails.
    pub fn add_entry(&self, event: E) {
        self.buffer.append(event);
    }
}

impl<E> EntryLogger<E> {
    /// Events written and recorded so far.
    pub fn flushed_count(&self) -> u64 {
        self.metrics.count()
    }

    /// Events appended but not yet drained by the worker.
    pub fn pending_count(&self) -> usize {
        self.buffer.len()
    }

    /// Stop the worker after one final cycle and wait for it to exit.
    pub fn shutdown(mut self) -> Result<(), LoggerError> {
        self.signal_shutdown();
        match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| LoggerError::WorkerPanicked),
            None => Ok(()),
        }
    }

    fn signal_shutdown(&self) {
        if self.shutdown.send(true).is_err() {
            log::debug!("flush worker already stopped");
        }
    }
}

impl<E> Drop for EntryLogger<E> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.signal_shutdown();
        }
    }
}
