use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread;

use crate::codec::Codec;
use crate::container::CompressedSlot;
use crate::error::{panic_message, Error, Result};
use crate::format::BlockHeader;
use crate::partition::{effective_workers, Partition};

/// Everything the compression workers produced, available after the join.
#[derive(Debug)]
pub struct CompressedBlocks {
    /// One slot per block, in block order.
    pub slots: Vec<CompressedSlot>,
    /// Indices of blocks that failed to compress, ascending.
    pub failed: Vec<usize>,
    /// Workers actually spawned.
    pub workers: usize,
    /// Blocks claimed by each worker.
    pub worker_claims: Vec<usize>,
}

/// Compress every block of `partition` on a pool of `requested_workers`.
///
/// Workers claim block indices from a shared counter until it runs past the
/// last block, so faster workers simply end up with more blocks. Each slot is
/// written once, by the worker that claimed it, and read only after every
/// worker has joined.
///
/// A codec failure does not stop the run: the block gets an errored header
/// and an empty payload, and its index is listed in `failed`.
pub fn compress_blocks(
    input: &[u8],
    partition: &Partition,
    requested_workers: usize,
    codec: &dyn Codec,
) -> Result<CompressedBlocks> {
    let num_blocks = partition.len();
    let workers = effective_workers(requested_workers, num_blocks);
    let slots: Vec<OnceLock<CompressedSlot>> = (0..num_blocks).map(|_| OnceLock::new()).collect();
    let next_block = AtomicUsize::new(0);

    tracing::debug!(
        blocks = num_blocks,
        workers,
        codec = codec.name(),
        "starting compression"
    );

    let worker_claims = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let slots = &slots;
                let next_block = &next_block;
                scope.spawn(move || {
                    let mut claimed = 0usize;
                    loop {
                        let index = next_block.fetch_add(1, Ordering::Relaxed);
                        let Some(block) = partition.blocks.get(index) else {
                            break;
                        };
                        claimed += 1;

                        let raw = &input[block.range()];
                        let slot = compress_one(codec, index, raw, worker);
                        if slots[index].set(slot).is_err() {
                            tracing::error!(block = index, worker, "block compressed twice");
                        }
                    }
                    claimed
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|payload| Error::WorkerPanicked(panic_message(payload.as_ref())))
            })
            .collect::<Result<Vec<usize>>>()
    })?;

    let mut failed = Vec::new();
    let mut out = Vec::with_capacity(num_blocks);
    for (index, cell) in slots.into_iter().enumerate() {
        let slot = cell.into_inner().ok_or_else(|| {
            Error::WorkerPanicked(format!("block {index} was never compressed"))
        })?;
        if slot.header.compressed_size == 0 && slot.header.original_size > 0 {
            failed.push(index);
        }
        out.push(slot);
    }

    Ok(CompressedBlocks {
        slots: out,
        failed,
        workers,
        worker_claims,
    })
}

fn compress_one(codec: &dyn Codec, index: usize, raw: &[u8], worker: usize) -> CompressedSlot {
    let original_size = raw.len() as u64;
    if raw.is_empty() {
        return CompressedSlot::default();
    }

    let max_len = codec.compress_bound(raw.len());
    let result = catch_unwind(AssertUnwindSafe(|| codec.compress_block(raw, max_len)));
    let Ok(result) = result else {
        tracing::warn!(
            block = index,
            worker,
            codec = codec.name(),
            "codec panicked; marking block as errored"
        );
        return CompressedSlot::errored(original_size);
    };

    match result {
        Ok(payload) if payload.is_empty() || payload.len() > max_len => {
            tracing::warn!(
                block = index,
                worker,
                produced = payload.len(),
                max_len,
                codec = codec.name(),
                "codec output outside bounds; marking block as errored"
            );
            CompressedSlot::errored(original_size)
        }
        Ok(payload) => {
            tracing::trace!(
                block = index,
                worker,
                original = raw.len(),
                compressed = payload.len(),
                "block compressed"
            );
            CompressedSlot {
                header: BlockHeader::new(payload.len() as u64, original_size),
                payload,
            }
        }
        Err(error) => {
            tracing::warn!(block = index, worker, %error, "block compression failed");
            CompressedSlot::errored(original_size)
        }
    }
}
