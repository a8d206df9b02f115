use std::io::Write;
use std::time::{Duration, Instant};

use crate::codec::Codec;
use crate::compress::compress_blocks;
use crate::config::{CompressOptions, DecompressOptions};
use crate::container::{deserialize, serialize, Truncation};
use crate::decompress::decompress_blocks;
use crate::error::Result;
use crate::partition::partition;

/// Summary of a compression run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressSummary {
    pub original_size: u64,
    /// Size of the whole container, headers included.
    pub compressed_size: u64,
    pub blocks: usize,
    /// Effective block size after coercion.
    pub block_size: usize,
    /// Effective worker count after coercion.
    pub workers: usize,
    /// Blocks stored as errored records, ascending.
    pub failed_blocks: Vec<usize>,
    /// Blocks claimed by each worker.
    pub worker_claims: Vec<usize>,
    pub elapsed: Duration,
}

impl CompressSummary {
    /// Compression ratio (original / compressed).
    pub fn ratio(&self) -> f64 {
        if self.compressed_size == 0 {
            return 1.0;
        }
        self.original_size as f64 / self.compressed_size as f64
    }

    pub fn warnings(&self) -> usize {
        self.failed_blocks.len()
    }
}

/// A finished compression run.
#[derive(Debug, Clone)]
pub struct CompressedRun {
    pub container: Vec<u8>,
    pub summary: CompressSummary,
}

/// Result of [`compress`].
#[derive(Debug, Clone)]
pub enum CompressOutcome {
    /// The input was empty; there is nothing to compress.
    Empty,
    Compressed(CompressedRun),
}

impl CompressOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, CompressOutcome::Empty)
    }

    /// Container bytes, empty when there was nothing to compress.
    pub fn into_container(self) -> Vec<u8> {
        match self {
            CompressOutcome::Empty => Vec::new(),
            CompressOutcome::Compressed(run) => run.container,
        }
    }
}

/// Summary of a decompression run.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompressSummary {
    /// Records parsed from the container.
    pub blocks: usize,
    /// Bytes written to the output.
    pub written: u64,
    /// Records with `original_size == 0`; they contribute no bytes.
    pub empty_blocks: usize,
    /// Records the compressor marked as failed; their bytes are missing.
    pub errored_blocks: Vec<usize>,
    /// Records whose payload failed to decode; their bytes are missing.
    pub failed_blocks: Vec<usize>,
    /// Set when the container ended inside a record.
    pub truncation: Option<Truncation>,
    pub workers: usize,
    pub elapsed: Duration,
}

impl DecompressSummary {
    pub fn warnings(&self) -> usize {
        self.errored_blocks.len() + self.failed_blocks.len() + usize::from(self.truncation.is_some())
    }
}

/// A finished decompression run with the reconstructed bytes.
#[derive(Debug, Clone)]
pub struct DecompressedRun {
    pub output: Vec<u8>,
    pub summary: DecompressSummary,
}

/// Compress `input` into a container.
///
/// An empty input short-circuits to [`CompressOutcome::Empty`]. Blocks that
/// fail to compress are kept as errored records and listed in the summary.
pub fn compress(input: &[u8], options: &CompressOptions, codec: &dyn Codec) -> Result<CompressOutcome> {
    let started_at = Instant::now();
    let partition = partition(input.len(), options.block_size);
    if partition.is_empty() {
        tracing::info!("input is empty; nothing to compress");
        return Ok(CompressOutcome::Empty);
    }

    let compressed = compress_blocks(input, &partition, options.workers, codec)?;
    let container = serialize(&compressed.slots);
    let elapsed = started_at.elapsed();

    if !compressed.failed.is_empty() {
        tracing::warn!(
            failed = compressed.failed.len(),
            blocks = partition.len(),
            "some blocks could not be compressed"
        );
    }

    let summary = CompressSummary {
        original_size: input.len() as u64,
        compressed_size: container.len() as u64,
        blocks: partition.len(),
        block_size: partition.block_size,
        workers: compressed.workers,
        failed_blocks: compressed.failed,
        worker_claims: compressed.worker_claims,
        elapsed,
    };
    tracing::info!(
        original = summary.original_size,
        compressed = summary.compressed_size,
        blocks = summary.blocks,
        workers = summary.workers,
        elapsed_ms = elapsed.as_millis() as u64,
        "compression finished"
    );

    Ok(CompressOutcome::Compressed(CompressedRun { container, summary }))
}

/// Decompress a whole container into memory.
pub fn decompress(
    container: &[u8],
    options: &DecompressOptions,
    codec: &dyn Codec,
) -> Result<DecompressedRun> {
    let mut output = Vec::new();
    let summary = decompress_to(container, options, codec, &mut output)?;
    Ok(DecompressedRun { output, summary })
}

/// Decompress a container, streaming the original bytes into `sink`.
pub fn decompress_to<W: Write + Send>(
    container: &[u8],
    options: &DecompressOptions,
    codec: &dyn Codec,
    sink: &mut W,
) -> Result<DecompressSummary> {
    let started_at = Instant::now();
    let parsed = deserialize(container);
    let parsed = if options.strict {
        parsed.require_complete()?
    } else {
        parsed
    };

    let stats = decompress_blocks(container, &parsed.blocks, options.workers, codec, sink)?;
    let elapsed = started_at.elapsed();

    let summary = DecompressSummary {
        blocks: parsed.len(),
        written: stats.written,
        empty_blocks: stats.empty_blocks,
        errored_blocks: stats.errored_blocks,
        failed_blocks: stats.failed_blocks,
        truncation: parsed.truncation,
        workers: stats.workers,
        elapsed,
    };
    if summary.warnings() > 0 {
        tracing::warn!(
            warnings = summary.warnings(),
            errored = summary.errored_blocks.len(),
            failed = summary.failed_blocks.len(),
            truncated = summary.truncation.is_some(),
            "decompression finished with missing data"
        );
    }
    tracing::info!(
        blocks = summary.blocks,
        written = summary.written,
        workers = summary.workers,
        elapsed_ms = elapsed.as_millis() as u64,
        "decompression finished"
    );

    Ok(summary)
}
