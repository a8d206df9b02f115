use crate::error::CodecError;

/// Byte-level compression primitive used for every block.
///
/// Each `Codec` implementation:
/// - Compresses and decompresses blocks independently. No state may be carried
///   from one block to the next, since blocks are processed on arbitrary
///   worker threads in arbitrary order.
/// - Reports a worst-case output size through [`Codec::compress_bound`]; the
///   schedulers pass that bound back in as `max_len`.
/// - Reports the most bytes a payload can legitimately expand to through
///   [`Codec::decompress_bound`]. Block headers are untrusted, so a record
///   claiming more than that is rejected before any buffer is allocated.
/// - Is never handed an empty block. Zero-length blocks are special-cased by
///   the container format.
pub trait Codec: Send + Sync {
    /// Human-readable codec name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Largest payload `compress_block` may produce for `raw_len` input bytes.
    fn compress_bound(&self, raw_len: usize) -> usize;

    /// Largest original length a `compressed` payload can decode to.
    fn decompress_bound(&self, compressed: &[u8]) -> usize;

    /// Compress a single independent block.
    ///
    /// Fails if the codec reports a non-success status or if the output would
    /// exceed `max_len`.
    fn compress_block(&self, raw: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError>;

    /// Decompress a single independent block.
    ///
    /// Must return exactly `original_len` bytes; anything else is an error.
    fn decompress_block(
        &self,
        compressed: &[u8],
        original_len: usize,
    ) -> Result<Vec<u8>, CodecError>;
}
