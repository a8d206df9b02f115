pub mod codec;
pub mod compress;
pub mod config;
pub mod container;
pub mod decompress;
pub mod error;
pub mod format;
pub mod gate;
pub mod partition;
pub mod pipeline;

pub use codec::Codec;
pub use config::{CompressOptions, DecompressOptions};
pub use container::{CompressedSlot, ParsedContainer, Truncation};
pub use error::{CodecError, Error, Result};
pub use format::{BlockHeader, BlockKind, BlockMeta, DEFAULT_BLOCK_SIZE, HEADER_SIZE};
pub use gate::OrderGates;
pub use partition::{partition, Block, Partition};
pub use pipeline::{
    compress, decompress, decompress_to, CompressOutcome, CompressSummary, CompressedRun,
    DecompressSummary, DecompressedRun,
};
