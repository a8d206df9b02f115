use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::codec::Codec;
use crate::error::{panic_message, Error, Result};
use crate::format::{BlockKind, BlockMeta};
use crate::gate::OrderGates;
use crate::partition::effective_workers;

/// Per-run counters gathered by the decompression workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Workers actually spawned.
    pub workers: usize,
    /// Bytes appended to the sink.
    pub written: u64,
    /// Records with `original_size == 0`.
    pub empty_blocks: usize,
    /// Records marked as failed by the compressor, ascending.
    pub errored_blocks: Vec<usize>,
    /// Records whose payload could not be decoded, ascending.
    pub failed_blocks: Vec<usize>,
}

impl DecodeStats {
    /// Blocks whose original bytes are missing from the output.
    pub fn warnings(&self) -> usize {
        self.errored_blocks.len() + self.failed_blocks.len()
    }
}

enum Decoded {
    Bytes(Vec<u8>),
    Empty,
    Errored,
    Failed,
}

struct Shared<'a, W> {
    container: &'a [u8],
    blocks: &'a [BlockMeta],
    codec: &'a dyn Codec,
    gates: OrderGates,
    next_block: AtomicUsize,
    written: AtomicU64,
    sink: Mutex<&'a mut W>,
    sink_error: Mutex<Option<Error>>,
    outcomes: Mutex<Vec<(usize, BlockKind)>>,
    failed: Mutex<Vec<usize>>,
}

/// Decompress `blocks` out of `container` and append them to `sink` in order.
///
/// Decoding runs on `requested_workers` threads in whatever order blocks get
/// claimed. Writing does not: a worker holding block `i` waits until block
/// `i - 1` has been written and flushed, writes its own bytes, and hands the
/// turn to `i + 1`. Skipped blocks (empty, errored upstream, or failing to
/// decode) still take their turn so the chain never stalls.
///
/// A sink failure cancels the chain and is returned as
/// [`Error::SinkWrite`]; nothing is written after it.
pub fn decompress_blocks<W: Write + Send>(
    container: &[u8],
    blocks: &[BlockMeta],
    requested_workers: usize,
    codec: &dyn Codec,
    sink: &mut W,
) -> Result<DecodeStats> {
    let num_blocks = blocks.len();
    let workers = effective_workers(requested_workers, num_blocks);
    let shared = Shared {
        container,
        blocks,
        codec,
        gates: OrderGates::new(num_blocks),
        next_block: AtomicUsize::new(0),
        written: AtomicU64::new(0),
        sink: Mutex::new(sink),
        sink_error: Mutex::new(None),
        outcomes: Mutex::new(Vec::with_capacity(num_blocks)),
        failed: Mutex::new(Vec::new()),
    };

    tracing::debug!(
        blocks = num_blocks,
        workers,
        codec = codec.name(),
        "starting decompression"
    );

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let shared = &shared;
                scope.spawn(move || run_worker(shared, worker))
            })
            .collect();

        let mut panicked = None;
        for handle in handles {
            if let Err(payload) = handle.join() {
                panicked.get_or_insert_with(|| panic_message(payload.as_ref()));
            }
        }
        match panicked {
            Some(message) => Err(Error::WorkerPanicked(message)),
            None => Ok(()),
        }
    })?;

    let Shared {
        gates,
        written,
        sink_error,
        outcomes,
        failed,
        ..
    } = shared;

    if let Some(error) = sink_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
        return Err(error);
    }
    debug_assert!(num_blocks == 0 || gates.is_complete());

    let mut stats = DecodeStats {
        workers,
        written: written.into_inner(),
        ..DecodeStats::default()
    };
    let mut outcomes = outcomes.into_inner().unwrap_or_else(PoisonError::into_inner);
    outcomes.sort_unstable_by_key(|(index, _)| *index);
    for (index, kind) in outcomes {
        match kind {
            BlockKind::Empty => stats.empty_blocks += 1,
            BlockKind::Errored => stats.errored_blocks.push(index),
            BlockKind::Data => {}
        }
    }
    stats.failed_blocks = failed.into_inner().unwrap_or_else(PoisonError::into_inner);
    stats.failed_blocks.sort_unstable();
    Ok(stats)
}

/// Cancels the chain if its worker unwinds, so nobody waits on a dead turn.
struct CancelOnPanic<'a>(&'a OrderGates);

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.cancel();
        }
    }
}

fn run_worker<W: Write + Send>(shared: &Shared<'_, W>, worker: usize) {
    let _guard = CancelOnPanic(&shared.gates);
    loop {
        let index = shared.next_block.fetch_add(1, Ordering::Relaxed);
        let Some(meta) = shared.blocks.get(index) else {
            break;
        };

        let decoded = decode(shared, meta, worker);

        if shared.gates.wait_turn(index).is_err() {
            tracing::debug!(block = index, worker, "ordered writes cancelled");
            break;
        }

        let kind = match decoded {
            Decoded::Bytes(bytes) => {
                if let Err(source) = write_block(shared, &bytes) {
                    tracing::error!(block = index, worker, error = %source, "output write failed");
                    shared
                        .sink_error
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .get_or_insert(Error::SinkWrite { index, source });
                    shared.gates.cancel();
                    break;
                }
                shared.written.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                Some(BlockKind::Data)
            }
            Decoded::Empty => Some(BlockKind::Empty),
            Decoded::Errored => Some(BlockKind::Errored),
            Decoded::Failed => None,
        };

        shared.gates.advance_turn(index);

        match kind {
            Some(kind) => shared
                .outcomes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((index, kind)),
            None => shared
                .failed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(index),
        }
    }
}

fn decode<W>(shared: &Shared<'_, W>, meta: &BlockMeta, worker: usize) -> Decoded {
    match meta.kind() {
        BlockKind::Empty => return Decoded::Empty,
        BlockKind::Errored => {
            tracing::warn!(
                block = meta.index,
                original = meta.original_size,
                "block was not compressed; its bytes are missing from the output"
            );
            return Decoded::Errored;
        }
        BlockKind::Data => {}
    }

    let payload = usize::try_from(meta.offset)
        .ok()
        .zip(usize::try_from(meta.compressed_size).ok())
        .and_then(|(start, len)| shared.container.get(start..start.checked_add(len)?));
    let Some(payload) = payload else {
        tracing::warn!(block = meta.index, worker, "block payload lies outside the container");
        return Decoded::Failed;
    };
    let Ok(original_len) = usize::try_from(meta.original_size) else {
        tracing::warn!(block = meta.index, worker, "block original size does not fit in memory");
        return Decoded::Failed;
    };
    let bound = shared.codec.decompress_bound(payload);
    if original_len > bound {
        tracing::warn!(
            block = meta.index,
            worker,
            original = original_len,
            bound,
            "block header claims more bytes than its payload can hold"
        );
        return Decoded::Failed;
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        shared.codec.decompress_block(payload, original_len)
    }));
    let Ok(result) = result else {
        tracing::warn!(block = meta.index, worker, "codec panicked while decompressing block");
        return Decoded::Failed;
    };

    match result {
        Ok(bytes) if bytes.len() == original_len => Decoded::Bytes(bytes),
        Ok(bytes) => {
            tracing::warn!(
                block = meta.index,
                worker,
                expected = original_len,
                actual = bytes.len(),
                "block decoded to the wrong length"
            );
            Decoded::Failed
        }
        Err(error) => {
            tracing::warn!(block = meta.index, worker, %error, "block decompression failed");
            Decoded::Failed
        }
    }
}

fn write_block<W: Write>(shared: &Shared<'_, W>, bytes: &[u8]) -> std::io::Result<()> {
    let mut sink = shared.sink.lock().unwrap_or_else(PoisonError::into_inner);
    sink.write_all(bytes)?;
    sink.flush()
}
