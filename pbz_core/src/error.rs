use thiserror::Error;

/// A single-block codec failure.
///
/// Recorded per block and never fatal for the run: the compression side turns
/// it into an errored header, the decompression side into a skipped write.
#[derive(Debug, Clone, Error)]
#[error("{codec}: {message}")]
pub struct CodecError {
    pub codec: &'static str,
    pub message: String,
}

impl CodecError {
    pub fn new(codec: &'static str, message: impl Into<String>) -> Self {
        Self {
            codec,
            message: message.into(),
        }
    }
}

/// Run-level errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "truncated container: record {record} at offset {header_offset} needs \
         {needed} bytes but only {available} remain"
    )]
    TruncatedContainer {
        record: usize,
        header_offset: u64,
        needed: u64,
        available: u64,
    },
    #[error("failed to write block {index} to output: {source}")]
    SinkWrite {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
