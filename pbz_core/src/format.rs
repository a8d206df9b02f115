/// Size of each block header in bytes.
///   compressed_size:u64 + original_size:u64
///   = 8 + 8 = 16
pub const HEADER_SIZE: usize = 16;

/// Default block size: 64 KB.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

// ── Header ─────────────────────────────────────────────────────────────────

/// Fixed-width record header written before every block payload.
///
/// There is no file-level header: a container is just these records back to
/// back, and the record count is found by scanning to end-of-stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Length of the payload that follows. Zero means no payload.
    pub compressed_size: u64,
    /// Length of the block before compression.
    pub original_size: u64,
}

/// What a header says about the record that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// A regular compressed payload follows.
    Data,
    /// `original_size == 0`: nothing to decode and nothing to write.
    Empty,
    /// `compressed_size == 0` with a nonzero original size: the block failed
    /// to compress and its bytes are not in the container.
    Errored,
}

impl BlockHeader {
    pub fn new(compressed_size: u64, original_size: u64) -> Self {
        Self {
            compressed_size,
            original_size,
        }
    }

    /// Header for a block whose compression failed.
    pub fn errored(original_size: u64) -> Self {
        Self::new(0, original_size)
    }

    pub fn kind(&self) -> BlockKind {
        if self.original_size == 0 {
            BlockKind::Empty
        } else if self.compressed_size == 0 {
            BlockKind::Errored
        } else {
            BlockKind::Data
        }
    }

    /// Number of payload bytes that follow this header on the wire.
    #[inline]
    pub fn payload_len(&self) -> u64 {
        self.compressed_size
    }

    /// Serialize to exactly `HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[8..16].copy_from_slice(&self.original_size.to_le_bytes());
        buf
    }

    /// Deserialize from `HEADER_SIZE` bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        let mut compressed_size = [0u8; 8];
        let mut original_size = [0u8; 8];
        compressed_size.copy_from_slice(&buf[0..8]);
        original_size.copy_from_slice(&buf[8..16]);
        Self {
            compressed_size: u64::from_le_bytes(compressed_size),
            original_size: u64::from_le_bytes(original_size),
        }
    }
}

// ── Parsed record ──────────────────────────────────────────────────────────

/// One record located inside a container buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    /// Position of the record in the container, starting at 0.
    pub index: usize,
    /// Byte offset of the payload (not the header) within the container.
    pub offset: u64,
    pub compressed_size: u64,
    pub original_size: u64,
}

impl BlockMeta {
    pub fn header(&self) -> BlockHeader {
        BlockHeader::new(self.compressed_size, self.original_size)
    }

    pub fn kind(&self) -> BlockKind {
        self.header().kind()
    }
}
