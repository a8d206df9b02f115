use pbz_codecs::{codec_by_name, DeflateCodec, Lz4Codec, PassThroughCodec, ZstdCodec, CODEC_NAMES};
use pbz_core::Codec;

fn sample(len: usize) -> Vec<u8> {
    let pattern = b"block after block after block. ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

fn all_codecs() -> Vec<Box<dyn Codec>> {
    vec![
        Box::new(DeflateCodec::default()),
        Box::new(ZstdCodec::default()),
        Box::new(Lz4Codec),
        Box::new(PassThroughCodec),
    ]
}

#[test]
fn test_output_within_bound() {
    let raw = sample(10_000);
    for codec in all_codecs() {
        let bound = codec.compress_bound(raw.len());
        assert!(bound >= raw.len(), "{} bound below input size", codec.name());
        let compressed = codec.compress_block(&raw, bound).unwrap();
        assert!(compressed.len() <= bound);
        let restored = codec.decompress_block(&compressed, raw.len()).unwrap();
        assert_eq!(restored, raw, "{}", codec.name());
    }
}

#[test]
fn test_decompress_rejects_wrong_length() {
    let raw = sample(4096);
    for codec in all_codecs() {
        let compressed = codec
            .compress_block(&raw, codec.compress_bound(raw.len()))
            .unwrap();
        assert!(
            codec.decompress_block(&compressed, raw.len() - 1).is_err(),
            "{} accepted a short target length",
            codec.name()
        );
        assert!(
            codec.decompress_block(&compressed, raw.len() + 1).is_err(),
            "{} accepted a long target length",
            codec.name()
        );
    }
}

#[test]
fn test_deflate_rejects_garbage() {
    let codec = DeflateCodec::default();
    let err = codec.decompress_block(&[0u8; 32], 100).unwrap_err();
    assert_eq!(err.codec, "deflate");
}

#[test]
fn test_deflate_bound_too_small_fails() {
    let codec = DeflateCodec::default();
    let raw: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect();
    assert!(codec.compress_block(&raw, 8).is_err());
}

#[test]
fn test_deflate_levels() {
    assert!(DeflateCodec::new(10).is_err());
    assert_eq!(DeflateCodec::new(9).unwrap().level(), 9);
    assert_eq!(DeflateCodec::default().level(), 6);
}

#[test]
fn test_codec_by_name() {
    for name in CODEC_NAMES {
        assert_eq!(codec_by_name(name, None).unwrap().name(), *name);
    }
    assert_eq!(codec_by_name("zlib", Some(1)).unwrap().name(), "deflate");
    assert!(codec_by_name("deflate", Some(-1)).is_err());

    let err = codec_by_name("brotli", None).err().unwrap().to_string();
    assert!(err.contains("unknown codec"), "got: {err}");
}

#[test]
fn test_decompress_bound_admits_highly_compressible_blocks() {
    let raw = vec![0u8; 64 * 1024];
    for codec in all_codecs() {
        let compressed = codec
            .compress_block(&raw, codec.compress_bound(raw.len()))
            .unwrap();
        assert!(
            codec.decompress_bound(&compressed) >= raw.len(),
            "{} bound rejects its own output",
            codec.name()
        );
    }
}

#[test]
fn test_decompress_bound_rejects_absurd_lengths() {
    let junk = [0xA5u8; 8];
    for codec in all_codecs() {
        assert!(codec.decompress_bound(&junk) < 1 << 32, "{}", codec.name());
    }
}
