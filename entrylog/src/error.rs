use thiserror::Error;

use crate::sink::SinkError;

/// Why a flush cycle stopped early. Never surfaced to producers; the worker
/// logs it and tries again on the next cycle.
#[derive(Error, Debug)]
pub enum FlushError {
    #[error("could not acquire a sink")]
    Sink(#[from] SinkError),

    #[error("write to sink failed, dropped {line:?}")]
    Write {
        line: String,
        #[source]
        source: std::io::Error,
    },

    #[error("flush of sink failed")]
    Flush(#[source] std::io::Error),

    #[error("flush cycle panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("could not build the worker runtime")]
    Runtime(#[source] std::io::Error),

    #[error("could not spawn the worker thread")]
    Spawn(#[source] std::io::Error),

    #[error("worker thread panicked")]
    WorkerPanicked,
}
