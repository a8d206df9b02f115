mod deflate_codec;
mod lz4_codec;
mod passthrough;
mod zstd_codec;

pub use deflate_codec::DeflateCodec;
pub use lz4_codec::Lz4Codec;
pub use passthrough::PassThroughCodec;
pub use zstd_codec::ZstdCodec;

use pbz_core::Codec;
use std::sync::Arc;

/// Names accepted by [`codec_by_name`], default first.
pub const CODEC_NAMES: &[&str] = &["deflate", "zstd", "lz4", "passthrough"];

/// Resolve a codec from its CLI name.
///
/// Containers carry no codec id, so the same name has to be used to compress
/// and to decompress a file. `level` is passed to codecs that have one and
/// ignored otherwise; `None` picks the codec's default.
pub fn codec_by_name(name: &str, level: Option<i32>) -> anyhow::Result<Arc<dyn Codec>> {
    match name {
        "deflate" | "zlib" | "d" => Ok(Arc::new(match level {
            Some(level) => DeflateCodec::new(u32::try_from(level).map_err(|_| {
                anyhow::anyhow!("deflate level must be between 0 and 9, got {}", level)
            })?)?,
            None => DeflateCodec::default(),
        })),
        "zstd" | "z" => Ok(Arc::new(level.map(ZstdCodec::new).unwrap_or_default())),
        "lz4" | "l" => Ok(Arc::new(Lz4Codec)),
        "passthrough" | "pass" | "none" => Ok(Arc::new(PassThroughCodec)),
        other => anyhow::bail!(
            "unknown codec '{}'. Valid options: {}",
            other,
            CODEC_NAMES.join(", ")
        ),
    }
}
