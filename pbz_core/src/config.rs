use std::num::NonZeroUsize;
use std::thread;

use crate::format::DEFAULT_BLOCK_SIZE;

/// Number of workers used when the caller does not choose one.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Settings for one compression run.
///
/// Degenerate values are accepted here and coerced by the run itself: a block
/// size of 0 becomes 1 and a worker count of 0 becomes 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressOptions {
    /// Raw bytes per block (the last block may be smaller).
    pub block_size: usize,
    /// Requested worker count, capped at the number of blocks.
    pub workers: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers: default_workers(),
        }
    }
}

impl CompressOptions {
    pub fn new(block_size: usize, workers: usize) -> Self {
        Self {
            block_size,
            workers,
        }
    }
}

/// Settings for one decompression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressOptions {
    pub workers: usize,
    /// Treat a truncated container as a run error instead of a warning.
    pub strict: bool,
}

impl Default for DecompressOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            strict: false,
        }
    }
}

impl DecompressOptions {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
