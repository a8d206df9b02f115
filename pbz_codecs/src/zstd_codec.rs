use pbz_core::{Codec, CodecError};

/// Zstandard block codec.
///
/// Each block is compressed independently with `zstd` at the configured level
/// (default: 3). Decompression is bounded by the original length carried in
/// the block header.
///
/// Best for: general text, JSON, logs, mixed structured data.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

/// An RLE block spends 4 bytes on up to 128 KiB of output.
const MAX_RLE_RATIO: usize = 32 * 1024;

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress_bound(&self, raw_len: usize) -> usize {
        zstd::zstd_safe::compress_bound(raw_len)
    }

    fn decompress_bound(&self, compressed: &[u8]) -> usize {
        let by_ratio = compressed.len().saturating_mul(MAX_RLE_RATIO);
        match zstd::zstd_safe::get_frame_content_size(compressed) {
            Ok(Some(size)) => usize::try_from(size).map_or(by_ratio, |size| size.min(by_ratio)),
            Ok(None) => by_ratio,
            // not a zstd frame, nothing can decode from it
            Err(_) => 0,
        }
    }

    fn compress_block(&self, raw: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(max_len);
        zstd::bulk::compress_to_buffer(raw, &mut out, self.level)
            .map_err(|e| CodecError::new(self.name(), format!("compress error: {}", e)))?;
        Ok(out)
    }

    fn decompress_block(&self, compressed: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
        let raw = zstd::bulk::decompress(compressed, original_len)
            .map_err(|e| CodecError::new(self.name(), format!("decompress error: {}", e)))?;
        if raw.len() != original_len {
            return Err(CodecError::new(
                self.name(),
                format!("decoded {} bytes but expected {}", raw.len(), original_len),
            ));
        }
        Ok(raw)
    }
}
