use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The metrics collaborator every flushed event is forwarded to.
///
/// Only the flush worker calls `record`; `count` may be read from any thread.
pub trait EventMetrics<E>: Send + Sync {
    /// Record one flushed event.
    fn record(&self, event: &E);

    /// Total events recorded since startup.
    fn count(&self) -> u64;
}

impl<E, M> EventMetrics<E> for Arc<M>
where
    M: EventMetrics<E> + ?Sized,
{
    fn record(&self, event: &E) {
        (**self).record(event)
    }

    fn count(&self) -> u64 {
        (**self).count()
    }
}

/// Counts flushed events and logs the running total every `report_every`.
#[derive(Debug)]
pub struct CountingMetrics {
    entries_logged: AtomicU64,
    report_every: u64,
}

impl CountingMetrics {
    pub const DEFAULT_REPORT_EVERY: u64 = 100;

    pub const fn new() -> Self {
        Self::reporting_every(Self::DEFAULT_REPORT_EVERY)
    }

    /// `0` disables the periodic log line.
    pub const fn reporting_every(report_every: u64) -> Self {
        Self {
            entries_logged: AtomicU64::new(0),
            report_every,
        }
    }
}

impl Default for CountingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventMetrics<E> for CountingMetrics {
    fn record(&self, _event: &E) {
        let logged = self.entries_logged.fetch_add(1, Ordering::Relaxed) + 1;
        if self.report_every != 0 && logged % self.report_every == 0 {
            log::info!("entries_logged={}", logged);
        }
    }

    fn count(&self) -> u64 {
        self.entries_logged.load(Ordering::Relaxed)
    }
}
