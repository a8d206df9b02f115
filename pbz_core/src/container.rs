use std::io::Write;

use crate::error::{Error, Result};
use crate::format::{BlockHeader, BlockKind, BlockMeta, HEADER_SIZE};

/// Output of compressing one block: its header and the payload that follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressedSlot {
    pub header: BlockHeader,
    pub payload: Vec<u8>,
}

impl CompressedSlot {
    pub fn errored(original_size: u64) -> Self {
        Self {
            header: BlockHeader::errored(original_size),
            payload: Vec::new(),
        }
    }

    /// Bytes this slot occupies in the container, header included.
    pub fn encoded_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.header.payload_len()
    }
}

/// Stream `slots` to `sink` as a container, in slice order.
///
/// The payload is omitted when the header declares `compressed_size == 0`.
/// Returns the number of bytes written.
pub fn write_container<W: Write>(slots: &[CompressedSlot], sink: &mut W) -> std::io::Result<u64> {
    let mut written = 0u64;
    for slot in slots {
        sink.write_all(&slot.header.to_bytes())?;
        written += HEADER_SIZE as u64;
        if slot.header.compressed_size > 0 {
            sink.write_all(&slot.payload)?;
            written += slot.payload.len() as u64;
        }
    }
    sink.flush()?;
    Ok(written)
}

/// Assemble `slots` into an in-memory container.
pub fn serialize(slots: &[CompressedSlot]) -> Vec<u8> {
    let capacity = slots.iter().map(|slot| slot.encoded_len() as usize).sum();
    let mut out = Vec::with_capacity(capacity);
    for slot in slots {
        out.extend_from_slice(&slot.header.to_bytes());
        if slot.header.compressed_size > 0 {
            out.extend_from_slice(&slot.payload);
        }
    }
    out
}

/// Where and why parsing stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Index the incomplete record would have had.
    pub record: usize,
    /// Offset of the incomplete record's header.
    pub header_offset: u64,
    /// Bytes the record needed past its header offset.
    pub needed: u64,
    /// Bytes that were actually left.
    pub available: u64,
}

impl From<Truncation> for Error {
    fn from(t: Truncation) -> Self {
        Error::TruncatedContainer {
            record: t.record,
            header_offset: t.header_offset,
            needed: t.needed,
            available: t.available,
        }
    }
}

/// Records recovered from a container buffer.
#[derive(Debug, Clone, Default)]
pub struct ParsedContainer {
    pub blocks: Vec<BlockMeta>,
    /// Set when the buffer ended inside a record.
    pub truncation: Option<Truncation>,
}

impl ParsedContainer {
    /// Fail if the container was cut short.
    pub fn require_complete(self) -> Result<Self> {
        match self.truncation {
            Some(t) => Err(t.into()),
            None => Ok(self),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total original bytes described by the parsed headers.
    pub fn original_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.original_size).sum()
    }

    /// Original bytes a decompression run can actually reproduce.
    pub fn recoverable_size(&self) -> u64 {
        self.blocks
            .iter()
            .filter(|b| b.kind() == BlockKind::Data)
            .map(|b| b.original_size)
            .sum()
    }

    /// Total payload bytes, headers excluded.
    pub fn payload_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.compressed_size).sum()
    }

    pub fn count_kind(&self, kind: BlockKind) -> usize {
        self.blocks.iter().filter(|b| b.kind() == kind).count()
    }
}

/// Scan `data` header by header.
///
/// Parsing stops at the first record that does not fit in the remaining
/// bytes, either because the header itself is cut or because its declared
/// payload runs past the end. Records before that point stay usable.
pub fn deserialize(data: &[u8]) -> ParsedContainer {
    let mut blocks = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let record = blocks.len();
        let remaining = (data.len() - pos) as u64;

        let Some(raw_header) = data
            .get(pos..pos + HEADER_SIZE)
            .and_then(|bytes| <&[u8; HEADER_SIZE]>::try_from(bytes).ok())
        else {
            let truncation = Truncation {
                record,
                header_offset: pos as u64,
                needed: HEADER_SIZE as u64,
                available: remaining,
            };
            tracing::warn!(
                record,
                offset = pos,
                available = remaining,
                "container ends inside a block header"
            );
            return ParsedContainer {
                blocks,
                truncation: Some(truncation),
            };
        };

        let header = BlockHeader::from_bytes(raw_header);
        let needed = (HEADER_SIZE as u64).saturating_add(header.payload_len());
        if needed > remaining {
            let truncation = Truncation {
                record,
                header_offset: pos as u64,
                needed,
                available: remaining,
            };
            tracing::warn!(
                record,
                offset = pos,
                declared = header.compressed_size,
                available = remaining - HEADER_SIZE as u64,
                "container payload runs past end of stream"
            );
            return ParsedContainer {
                blocks,
                truncation: Some(truncation),
            };
        }

        blocks.push(BlockMeta {
            index: record,
            offset: (pos + HEADER_SIZE) as u64,
            compressed_size: header.compressed_size,
            original_size: header.original_size,
        });
        // needed <= remaining, so this fits in usize
        pos += needed as usize;
    }

    ParsedContainer {
        blocks,
        truncation: None,
    }
}
