use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use pbz_core::{Codec, CodecError};

/// zlib-wrapped DEFLATE block codec.
///
/// Produces the same stream as zlib's one-shot `compress()` and decodes into
/// a buffer sized from the block header, the way `uncompress()` does. Output
/// that does not fit the caller's bound is reported as an error instead of
/// being reallocated.
///
/// Best for: interoperability with existing zlib tooling. This is the default.
pub struct DeflateCodec {
    level: Compression,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl DeflateCodec {
    /// Create a codec at `level` (0 = store, 9 = best).
    pub fn new(level: u32) -> Result<Self, CodecError> {
        if level > 9 {
            return Err(CodecError::new(
                "deflate",
                format!("level must be between 0 and 9, got {}", level),
            ));
        }
        Ok(Self {
            level: Compression::new(level),
        })
    }

    pub fn level(&self) -> u32 {
        self.level.level()
    }
}

/// zlib's `compressBound()` for `raw_len` input bytes.
fn zlib_bound(raw_len: usize) -> usize {
    raw_len + (raw_len >> 12) + (raw_len >> 14) + (raw_len >> 25) + 13
}

/// DEFLATE cannot expand past 258 bytes per 2-bit match code (~1032:1).
const MAX_INFLATE_RATIO: usize = 1032;

impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress_bound(&self, raw_len: usize) -> usize {
        zlib_bound(raw_len)
    }

    fn decompress_bound(&self, compressed: &[u8]) -> usize {
        compressed.len().saturating_mul(MAX_INFLATE_RATIO)
    }

    fn compress_block(&self, raw: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(max_len);
        let mut deflater = Compress::new(self.level, true);
        let status = deflater
            .compress_vec(raw, &mut out, FlushCompress::Finish)
            .map_err(|e| CodecError::new(self.name(), format!("compress error: {}", e)))?;
        if status != Status::StreamEnd {
            return Err(CodecError::new(
                self.name(),
                format!("compressed stream did not fit in {} bytes", max_len),
            ));
        }
        Ok(out)
    }

    fn decompress_block(&self, compressed: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
        // one spare byte so an over-long stream shows up as a length mismatch
        // rather than a full buffer
        let mut out = Vec::with_capacity(original_len + 1);
        let mut inflater = Decompress::new(true);
        let status = inflater
            .decompress_vec(compressed, &mut out, FlushDecompress::Finish)
            .map_err(|e| CodecError::new(self.name(), format!("decompress error: {}", e)))?;
        if status != Status::StreamEnd || out.len() != original_len {
            return Err(CodecError::new(
                self.name(),
                format!(
                    "stream decoded to {} bytes but expected {} (complete: {})",
                    out.len(),
                    original_len,
                    status == Status::StreamEnd
                ),
            ));
        }
        Ok(out)
    }
}
