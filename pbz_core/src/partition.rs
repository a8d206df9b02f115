use std::ops::Range;

/// A contiguous slice of the input, identified by its position in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    pub offset: usize,
    pub len: usize,
}

impl Block {
    /// Byte range of this block within the input buffer.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Result of splitting an input buffer into blocks.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Effective block size after coercion.
    pub block_size: usize,
    pub total_len: usize,
    pub blocks: Vec<Block>,
}

impl Partition {
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Split `total_len` bytes into blocks of `requested_block_size`.
///
/// Every block is exactly `block_size` long except the last one, which takes
/// the remainder. A zero block size is coerced to 1. A zero-length input
/// yields no blocks at all.
pub fn partition(total_len: usize, requested_block_size: usize) -> Partition {
    let block_size = if requested_block_size == 0 {
        tracing::warn!("block size 0 is not valid; using 1 byte blocks");
        1
    } else {
        requested_block_size
    };

    let num_blocks = total_len.div_ceil(block_size);
    let blocks = (0..num_blocks)
        .map(|index| {
            let offset = index * block_size;
            Block {
                index,
                offset,
                len: block_size.min(total_len - offset),
            }
        })
        .collect();

    Partition {
        block_size,
        total_len,
        blocks,
    }
}

/// Clamp a requested worker count to `[1, num_blocks]`.
pub fn effective_workers(requested: usize, num_blocks: usize) -> usize {
    if requested == 0 {
        tracing::warn!("worker count 0 is not valid; using 1 worker");
    }
    requested.min(num_blocks).max(1)
}
