use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use super::FlushWorker;
use crate::buffer::EventBuffer;
use crate::clock::FakeClock;
use crate::error::FlushError;
use crate::metrics::{CountingMetrics, EventMetrics};
use crate::sink::{HourBucket, SinkError, SinkFactory, StringError};

type Journal = Arc<Mutex<Vec<String>>>;

fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 16)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .unwrap()
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Records every open, line, flush and close into a shared journal. Writes
/// are numbered across all sinks the factory hands out.
#[derive(Clone, Default)]
struct RecordingFactory {
    journal: Journal,
    unavailable: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
    fail_write_number: Option<usize>,
    fail_flush: Arc<AtomicBool>,
}

impl SinkFactory for RecordingFactory {
    type Sink = RecordingSink;

    fn open(&mut self, hour: &HourBucket) -> Result<Self::Sink, SinkError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable(StringError {
                message: "disk gone".to_string(),
            }));
        }
        self.journal.lock().unwrap().push(format!("open {hour}"));
        Ok(RecordingSink {
            hour: hour.clone(),
            journal: Arc::clone(&self.journal),
            writes: Arc::clone(&self.writes),
            fail_write_number: self.fail_write_number,
            fail_flush: Arc::clone(&self.fail_flush),
        })
    }
}

struct RecordingSink {
    hour: HourBucket,
    journal: Journal,
    writes: Arc<AtomicUsize>,
    fail_write_number: Option<usize>,
    fail_flush: Arc<AtomicBool>,
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let number = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if Some(number) == self.fail_write_number {
            return Err(io::Error::new(io::ErrorKind::Other, "device full"));
        }
        let line = String::from_utf8_lossy(buf);
        self.journal
            .lock()
            .unwrap()
            .push(format!("write {} {}", self.hour, line.trim_end()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "flush refused"));
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("flush {}", self.hour));
        Ok(())
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(format!("close {}", self.hour));
        }
    }
}

/// Formats as its label, unless told to misbehave.
#[derive(Debug)]
enum TestEvent {
    Fine(&'static str),
    FormatError,
    Panics,
}

impl fmt::Display for TestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestEvent::Fine(label) => f.write_str(label),
            TestEvent::FormatError => Err(fmt::Error),
            TestEvent::Panics => panic!("event exploded while formatting"),
        }
    }
}

struct Harness<E> {
    buffer: Arc<EventBuffer<E>>,
    metrics: Arc<CountingMetrics>,
    clock: FakeClock,
    journal: Journal,
    unavailable: Arc<AtomicBool>,
    worker: FlushWorker<E, RecordingFactory, FakeClock>,
}

fn harness<E: fmt::Display + Send + 'static>(factory: RecordingFactory) -> Harness<E> {
    let buffer = Arc::new(EventBuffer::new());
    let metrics = Arc::new(CountingMetrics::reporting_every(0));
    let clock = FakeClock::new(at(9, 15, 0));
    let journal = Arc::clone(&factory.journal);
    let unavailable = Arc::clone(&factory.unavailable);
    let worker = FlushWorker::new(
        Arc::clone(&buffer),
        metrics.clone(),
        factory,
        clock.clone(),
        Duration::from_millis(10),
    );
    Harness {
        buffer,
        metrics,
        clock,
        journal,
        unavailable,
        worker,
    }
}

fn count<E>(metrics: &CountingMetrics) -> u64 {
    EventMetrics::<E>::count(metrics)
}

#[test]
fn cycle_writes_drained_events_in_order_then_flushes_once() {
    let mut h = harness::<&str>(RecordingFactory::default());
    h.buffer.append("a");
    h.buffer.append("b");
    h.buffer.append("c");

    assert_eq!(h.worker.run_cycle().unwrap(), 3);
    assert_eq!(
        entries(&h.journal),
        vec![
            "open 2026-10-16-09",
            "write 2026-10-16-09 a",
            "write 2026-10-16-09 b",
            "write 2026-10-16-09 c",
            "flush 2026-10-16-09",
        ]
    );
    assert_eq!(count::<&str>(&h.metrics), 3);
    assert!(h.buffer.is_empty());
}

#[test]
fn empty_cycle_acquires_sink_but_writes_nothing() {
    let mut h = harness::<&str>(RecordingFactory::default());

    assert_eq!(h.worker.run_cycle().unwrap(), 0);
    assert_eq!(h.worker.run_cycle().unwrap(), 0);

    assert_eq!(entries(&h.journal), vec!["open 2026-10-16-09"]);
    assert_eq!(
        h.worker.current_hour().map(HourBucket::as_str),
        Some("2026-10-16-09")
    );
}

#[test]
fn sink_is_reused_within_an_hour() {
    let mut h = harness::<&str>(RecordingFactory::default());
    h.buffer.append("a");
    h.worker.run_cycle().unwrap();
    h.clock.advance(chrono::Duration::minutes(30));
    h.buffer.append("b");
    h.worker.run_cycle().unwrap();

    let opens = entries(&h.journal)
        .into_iter()
        .filter(|e| e.starts_with("open"))
        .count();
    assert_eq!(opens, 1);
}

#[test]
fn hour_change_closes_previous_sink_before_writing_to_new_one() {
    let mut h = harness::<&str>(RecordingFactory::default());
    h.clock.set(at(9, 59, 59));
    h.buffer.append("a");
    h.buffer.append("b");
    h.worker.run_cycle().unwrap();

    h.clock.advance(chrono::Duration::seconds(2));
    h.buffer.append("c");
    h.worker.run_cycle().unwrap();

    assert_eq!(
        entries(&h.journal),
        vec![
            "open 2026-10-16-09",
            "write 2026-10-16-09 a",
            "write 2026-10-16-09 b",
            "flush 2026-10-16-09",
            "flush 2026-10-16-09",
            "close 2026-10-16-09",
            "open 2026-10-16-10",
            "write 2026-10-16-10 c",
            "flush 2026-10-16-10",
        ]
    );
}

#[test]
fn unavailable_sink_leaves_events_buffered_until_it_recovers() {
    let mut h = harness::<&str>(RecordingFactory::default());
    h.unavailable.store(true, Ordering::SeqCst);
    h.buffer.append("a");
    h.buffer.append("b");

    assert!(matches!(h.worker.contained_cycle(), Err(FlushError::Sink(_))));
    assert_eq!(h.buffer.len(), 2);
    assert_eq!(h.worker.retained(), 0);
    assert_eq!(count::<&str>(&h.metrics), 0);

    h.buffer.append("c");
    h.unavailable.store(false, Ordering::SeqCst);
    assert_eq!(h.worker.contained_cycle().unwrap(), 3);
    assert_eq!(count::<&str>(&h.metrics), 3);
    assert!(entries(&h.journal).contains(&"write 2026-10-16-09 c".to_string()));
}

#[test]
fn failed_write_drops_only_that_event_and_keeps_the_rest_for_next_cycle() {
    let factory = RecordingFactory {
        fail_write_number: Some(2),
        ..Default::default()
    };
    let mut h = harness::<&str>(factory);
    h.buffer.append("a");
    h.buffer.append("b");
    h.buffer.append("c");

    match h.worker.contained_cycle() {
        Err(e @ FlushError::Write { .. }) => {
            let message = e.to_string();
            assert!(message.contains("dropped \"b\""), "{message}");
        }
        other => panic!("expected a failed write, got {other:?}"),
    }
    assert_eq!(h.worker.dropped(), 1);
    assert_eq!(h.worker.retained(), 1);
    assert!(h.worker.current_hour().is_none());

    // A later drain is written after the retained tail.
    h.buffer.append("d");
    assert_eq!(h.worker.contained_cycle().unwrap(), 2);
    assert_eq!(count::<&str>(&h.metrics), 3);

    let writes: Vec<_> = entries(&h.journal)
        .into_iter()
        .filter(|e| e.starts_with("write"))
        .collect();
    assert_eq!(
        writes,
        vec![
            "write 2026-10-16-09 a",
            "write 2026-10-16-09 c",
            "write 2026-10-16-09 d",
        ]
    );
}

#[test]
fn format_error_skips_the_event_and_finishes_the_batch() {
    let mut h = harness::<TestEvent>(RecordingFactory::default());
    h.buffer.append(TestEvent::Fine("a"));
    h.buffer.append(TestEvent::FormatError);
    h.buffer.append(TestEvent::Fine("b"));

    assert_eq!(h.worker.contained_cycle().unwrap(), 2);
    assert_eq!(count::<TestEvent>(&h.metrics), 2);
    assert_eq!(h.worker.retained(), 0);
    assert_eq!(h.worker.dropped(), 1);
}

#[test]
fn panicking_event_is_contained_and_the_rest_are_written_next_cycle() {
    let mut h = harness::<TestEvent>(RecordingFactory::default());
    h.buffer.append(TestEvent::Fine("a"));
    h.buffer.append(TestEvent::Panics);
    h.buffer.append(TestEvent::Fine("b"));

    match h.worker.contained_cycle() {
        Err(FlushError::Panicked(message)) => {
            assert!(message.contains("exploded"), "{message}")
        }
        other => panic!("expected a contained panic, got {other:?}"),
    }
    assert_eq!(h.worker.retained(), 1);
    assert_eq!(h.worker.dropped(), 1);

    assert_eq!(h.worker.contained_cycle().unwrap(), 1);
    assert_eq!(count::<TestEvent>(&h.metrics), 2);
}

#[test]
fn failed_flush_discards_the_sink_and_reopens_it_next_cycle() {
    let factory = RecordingFactory::default();
    let fail_flush = Arc::clone(&factory.fail_flush);
    let mut h = harness::<&str>(factory);
    h.buffer.append("a");
    fail_flush.store(true, Ordering::SeqCst);

    assert!(matches!(h.worker.contained_cycle(), Err(FlushError::Flush(_))));
    assert!(h.worker.current_hour().is_none());
    assert_eq!(h.worker.retained(), 0);

    fail_flush.store(false, Ordering::SeqCst);
    h.buffer.append("b");
    assert_eq!(h.worker.contained_cycle().unwrap(), 1);
    assert_eq!(
        h.worker.current_hour().map(HourBucket::as_str),
        Some("2026-10-16-09")
    );
    assert_eq!(
        entries(&h.journal),
        vec![
            "open 2026-10-16-09",
            "write 2026-10-16-09 a",
            "close 2026-10-16-09",
            "open 2026-10-16-09",
            "write 2026-10-16-09 b",
            "flush 2026-10-16-09",
        ]
    );
}
