use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("unhandled io error")]
    Io(#[from] std::io::Error),

    #[error("sink is unavailable")]
    Unavailable(#[from] StringError),
}

#[derive(Debug, Error)]
pub struct StringError {
    pub message: String,
}

impl Display for StringError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("StringError")
            .field("message", &self.message)
            .finish()
    }
}
