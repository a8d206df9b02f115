use pbz_core::{Codec, CodecError};

/// No-op codec: stores blocks verbatim, with no compression.
///
/// Useful for:
/// - Verifying the container and schedulers independently of any codec.
/// - Data that is already compressed (e.g., JPEG, MP4) where further
///   compression would expand the file.
pub struct PassThroughCodec;

impl Codec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn compress_bound(&self, raw_len: usize) -> usize {
        raw_len
    }

    fn decompress_bound(&self, compressed: &[u8]) -> usize {
        compressed.len()
    }

    fn compress_block(&self, raw: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
        if raw.len() > max_len {
            return Err(CodecError::new(
                self.name(),
                format!("{} bytes do not fit in {} bytes", raw.len(), max_len),
            ));
        }
        Ok(raw.to_vec())
    }

    fn decompress_block(&self, compressed: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
        if compressed.len() != original_len {
            return Err(CodecError::new(
                self.name(),
                format!("stored {} bytes but expected {}", compressed.len(), original_len),
            ));
        }
        Ok(compressed.to_vec())
    }
}
