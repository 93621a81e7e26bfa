//! The single consumer of an [`EventBuffer`].
//!
//! Each cycle runs acquire-sink, drain, write, in that order. The sink for the
//! current hour is resolved before anything is drained, so when storage is
//! unavailable the events simply stay buffered for the next cycle.
//!
//! A drained batch belongs to the worker until every event in it has been
//! written. If a write fails or formatting an event panics, the unwritten tail
//! is kept and written ahead of newer drains on the next cycle; only the event
//! that failed is dropped.

use std::collections::VecDeque;
use std::fmt::{Display, Write as FmtWrite};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::buffer::EventBuffer;
use crate::clock::Clock;
use crate::error::FlushError;
use crate::metrics::EventMetrics;
use crate::sink::{HourBucket, SinkFactory};

struct OpenSink<S> {
    hour: HourBucket,
    writer: S,
}

pub struct FlushWorker<E, F: SinkFactory, C> {
    buffer: Arc<EventBuffer<E>>,
    metrics: Arc<dyn EventMetrics<E>>,
    factory: F,
    clock: C,
    flush_interval: Duration,
    current: Option<OpenSink<F::Sink>>,
    batch: VecDeque<E>,
    line: String,
    dropped: u64,
}

impl<E, F, C> FlushWorker<E, F, C>
where
    E: Display + Send + 'static,
    F: SinkFactory,
    C: Clock,
{
    pub fn new(
        buffer: Arc<EventBuffer<E>>,
        metrics: Arc<dyn EventMetrics<E>>,
        factory: F,
        clock: C,
        flush_interval: Duration,
    ) -> Self {
        Self {
            buffer,
            metrics,
            factory,
            clock,
            flush_interval,
            current: None,
            batch: VecDeque::new(),
            line: String::new(),
            dropped: 0,
        }
    }

    /// Cycle, sleep, repeat. Returns once `shutdown` changes or its sender is
    /// dropped, after one last cycle.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "started flush worker with interval {:?}",
            self.flush_interval
        );

        loop {
            self.cycle();
            tokio::select! {
                _ = tokio::time::sleep(self.flush_interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        log::info!("flush worker stopping");
        self.cycle();
        self.close_sink();
    }

    fn cycle(&mut self) {
        match self.contained_cycle() {
            Ok(0) => {}
            Ok(written) => log::debug!("flushed {} events", written),
            Err(FlushError::Sink(e)) => log::error!(
                "could not acquire a sink, {} events stay buffered: {:?}",
                self.buffer.len(),
                e
            ),
            Err(e) => log::error!(
                "error logging events, {} drained events retained for the next cycle: {:?}",
                self.batch.len(),
                e
            ),
        }
    }

    /// Run one cycle, containing panics raised by event formatting or the
    /// metrics collaborator.
    pub fn contained_cycle(&mut self) -> Result<usize, FlushError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.dropped += 1;
                log::error!("dropping the event being written, flush cycle panicked: {message}");
                self.discard_sink();
                Err(FlushError::Panicked(message))
            }
        }
    }

    /// One acquire, drain, write pass. Returns the number of events written.
    pub fn run_cycle(&mut self) -> Result<usize, FlushError> {
        let hour = HourBucket::containing(self.clock.now());
        let writer = acquire_sink(&mut self.current, &mut self.factory, &hour)?;

        self.batch.extend(self.buffer.drain_all());
        if self.batch.is_empty() {
            return Ok(0);
        }

        let result = write_batch(
            writer,
            &mut self.batch,
            &mut self.line,
            &mut self.dropped,
            &*self.metrics,
        );
        if result.is_err() {
            self.discard_sink();
        }
        result
    }

    /// Events drained in an earlier cycle that are still waiting to be
    /// written.
    pub fn retained(&self) -> usize {
        self.batch.len()
    }

    /// Events given up on after a formatting, write or panic failure.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn current_hour(&self) -> Option<&HourBucket> {
        self.current.as_ref().map(|open| &open.hour)
    }

    fn close_sink(&mut self) {
        close_sink(&mut self.current);
    }

    // Drops the writer without the explicit flush: after a failed write its
    // state is unknown and the next cycle reopens the file.
    fn discard_sink(&mut self) {
        if let Some(open) = self.current.take() {
            log::warn!("discarding sink for hour {}", open.hour);
        }
    }
}

fn acquire_sink<'a, F: SinkFactory>(
    current: &'a mut Option<OpenSink<F::Sink>>,
    factory: &mut F,
    hour: &HourBucket,
) -> Result<&'a mut F::Sink, FlushError> {
    match *current {
        Some(ref open) if open.hour == *hour => match current {
            Some(open) => Ok(&mut open.writer),
            None => unreachable!(),
        },
        _ => {
            close_sink(current);
            let writer = factory.open(hour)?;
            log::info!("opened sink for hour {}", hour);
            let open = current.insert(OpenSink {
                hour: hour.clone(),
                writer,
            });
            Ok(&mut open.writer)
        }
    }
}

fn close_sink<S: Write>(current: &mut Option<OpenSink<S>>) {
    if let Some(mut open) = current.take() {
        if let Err(e) = open.writer.flush() {
            log::warn!("final flush of hour {} failed: {:?}", open.hour, e);
        }
        log::info!("closed sink for hour {}", open.hour);
    }
}

fn write_batch<E: Display, W: Write>(
    writer: &mut W,
    batch: &mut VecDeque<E>,
    line: &mut String,
    dropped: &mut u64,
    metrics: &dyn EventMetrics<E>,
) -> Result<usize, FlushError> {
    let mut written = 0;
    while let Some(event) = batch.pop_front() {
        line.clear();
        if let Err(e) = write!(line, "{event}") {
            *dropped += 1;
            log::error!("dropping event that failed to format: {:?}", e);
            continue;
        }
        line.push('\n');

        if let Err(source) = writer.write_all(line.as_bytes()) {
            *dropped += 1;
            let line = line.trim_end().to_string();
            log::error!("dropping event {:?} after failed write: {:?}", line, source);
            return Err(FlushError::Write { line, source });
        }
        metrics.record(&event);
        written += 1;
    }

    writer.flush().map_err(FlushError::Flush)?;
    Ok(written)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
