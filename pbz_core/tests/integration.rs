/// End-to-end tests: compress an in-memory buffer into a container, decompress
/// it again on a worker pool, and check the bytes come back in order.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pbz_codecs::{DeflateCodec, Lz4Codec, PassThroughCodec, ZstdCodec};
use pbz_core::container::{deserialize, serialize};
use pbz_core::{
    compress, decompress, BlockHeader, BlockKind, Codec, CodecError, CompressOptions,
    CompressOutcome, CompressedRun, CompressedSlot, DecompressOptions, HEADER_SIZE,
};

/// Generate `len` deterministic bytes using a simple LCG.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

/// Generate `len` highly compressible bytes (repeating pattern).
fn compressible_bytes(len: usize) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog. ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

fn compressed(data: &[u8], block_size: usize, workers: usize, codec: &dyn Codec) -> CompressedRun {
    match compress(data, &CompressOptions::new(block_size, workers), codec).unwrap() {
        CompressOutcome::Compressed(run) => run,
        CompressOutcome::Empty => panic!("expected a compressed run"),
    }
}

fn round_trip(data: &[u8], block_size: usize, workers: usize, codec: &dyn Codec) -> Vec<u8> {
    let run = compressed(data, block_size, workers, codec);
    let restored = decompress(&run.container, &DecompressOptions::new(workers), codec).unwrap();
    assert_eq!(restored.summary.warnings(), 0);
    restored.output
}

// ── test codecs ────────────────────────────────────────────────────────────

/// Deflate, except any block starting with 0xFF fails to compress.
struct FaultyCodec(DeflateCodec);

impl Codec for FaultyCodec {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn compress_bound(&self, raw_len: usize) -> usize {
        self.0.compress_bound(raw_len)
    }

    fn decompress_bound(&self, compressed: &[u8]) -> usize {
        self.0.decompress_bound(compressed)
    }

    fn compress_block(&self, raw: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
        if raw.first() == Some(&0xFF) {
            return Err(CodecError::new("faulty", "injected fault"));
        }
        self.0.compress_block(raw, max_len)
    }

    fn decompress_block(&self, compressed: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
        self.0.decompress_block(compressed, original_len)
    }
}

/// Passthrough that sleeps longer for lower block numbers, so blocks finish in
/// roughly reverse order. Each block is filled with its own index.
struct SlowFirstCodec {
    blocks: u8,
    calls: AtomicUsize,
}

impl SlowFirstCodec {
    fn delay(&self, block_byte: u8) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let ms = u64::from(self.blocks.saturating_sub(block_byte)) * 3;
        thread::sleep(Duration::from_millis(ms));
    }
}

impl Codec for SlowFirstCodec {
    fn name(&self) -> &'static str {
        "slow-first"
    }

    fn compress_bound(&self, raw_len: usize) -> usize {
        PassThroughCodec.compress_bound(raw_len)
    }

    fn decompress_bound(&self, compressed: &[u8]) -> usize {
        PassThroughCodec.decompress_bound(compressed)
    }

    fn compress_block(&self, raw: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
        self.delay(raw[0]);
        PassThroughCodec.compress_block(raw, max_len)
    }

    fn decompress_block(&self, compressed: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
        self.delay(compressed[0]);
        PassThroughCodec.decompress_block(compressed, original_len)
    }
}

fn indexed_blocks(blocks: u8, block_size: usize) -> Vec<u8> {
    (0..blocks)
        .flat_map(|b| std::iter::repeat(b).take(block_size))
        .collect()
}

// ── tests ──────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_all_codecs() {
    let data = compressible_bytes(5 * 4096 + 123);
    let codecs: Vec<Box<dyn Codec>> = vec![
        Box::new(DeflateCodec::default()),
        Box::new(ZstdCodec::default()),
        Box::new(Lz4Codec),
        Box::new(PassThroughCodec),
    ];
    for codec in &codecs {
        let restored = round_trip(&data, 4096, 4, codec.as_ref());
        assert_eq!(restored, data, "{} round-trip should be byte-exact", codec.name());
    }
}

#[test]
fn test_roundtrip_block_sizes_and_workers() {
    let data = pseudo_random_bytes(10_007, 0xDEAD_BEEF);
    let codec = DeflateCodec::default();
    for block_size in [1usize, 7, 1000, 4096, 10_007, 50_000] {
        for workers in [1usize, 2, 3, 8] {
            let restored = round_trip(&data, block_size, workers, &codec);
            assert_eq!(restored, data, "block_size={block_size} workers={workers}");
        }
    }
}

#[test]
fn test_ab_pattern_scenario() {
    let data: Vec<u8> = b"AB".iter().copied().cycle().take(10_000).collect();
    let codec = DeflateCodec::default();

    let run = compressed(&data, 4096, 3, &codec);
    assert_eq!(run.summary.blocks, 3);
    assert_eq!(run.summary.workers, 3);
    assert_eq!(run.summary.original_size, 10_000);
    assert_eq!(run.summary.compressed_size, run.container.len() as u64);
    assert!(run.summary.failed_blocks.is_empty());
    assert_eq!(run.summary.worker_claims.iter().sum::<usize>(), 3);

    let parsed = deserialize(&run.container);
    assert!(parsed.truncation.is_none());
    let sizes: Vec<u64> = parsed.blocks.iter().map(|b| b.original_size).collect();
    assert_eq!(sizes, vec![4096, 4096, 1808]);
    assert!(parsed.blocks.iter().all(|b| b.kind() == BlockKind::Data));

    let restored = decompress(&run.container, &DecompressOptions::new(3), &codec).unwrap();
    assert_eq!(restored.output, data);
    assert_eq!(restored.summary.written, 10_000);
}

#[test]
fn test_empty_input_is_nothing_to_do() {
    let outcome = compress(&[], &CompressOptions::new(4096, 4), &DeflateCodec::default()).unwrap();
    assert!(outcome.is_empty());
    assert!(outcome.into_container().is_empty());

    let restored = decompress(&[], &DecompressOptions::new(4), &DeflateCodec::default()).unwrap();
    assert!(restored.output.is_empty());
    assert_eq!(restored.summary.blocks, 0);
    assert_eq!(restored.summary.warnings(), 0);
}

#[test]
fn test_degenerate_options_are_coerced() {
    let data = compressible_bytes(10);
    let run = compressed(&data, 0, 0, &PassThroughCodec);
    assert_eq!(run.summary.block_size, 1);
    assert_eq!(run.summary.blocks, 10);
    assert_eq!(run.summary.workers, 1);

    let restored = decompress(&run.container, &DecompressOptions::new(0), &PassThroughCodec).unwrap();
    assert_eq!(restored.summary.workers, 1);
    assert_eq!(restored.output, data);
}

#[test]
fn test_workers_capped_at_block_count() {
    let data = compressible_bytes(3000);
    let run = compressed(&data, 1024, 16, &DeflateCodec::default());
    assert_eq!(run.summary.blocks, 3);
    assert_eq!(run.summary.workers, 3);
    assert_eq!(run.summary.worker_claims.len(), 3);
}

#[test]
fn test_one_bad_block_degrades_gracefully() {
    let block_size = 1024;
    let mut data = compressible_bytes(4 * block_size);
    data[2 * block_size] = 0xFF;
    let codec = FaultyCodec(DeflateCodec::default());

    let run = compressed(&data, block_size, 3, &codec);
    assert_eq!(run.summary.failed_blocks, vec![2]);
    assert_eq!(run.summary.warnings(), 1);

    let parsed = deserialize(&run.container);
    assert_eq!(parsed.len(), 4);
    assert_eq!(parsed.blocks[2].kind(), BlockKind::Errored);
    assert_eq!(parsed.blocks[2].compressed_size, 0);
    assert_eq!(parsed.blocks[2].original_size, block_size as u64);

    let restored = decompress(&run.container, &DecompressOptions::new(3), &codec).unwrap();
    assert_eq!(restored.summary.errored_blocks, vec![2]);
    assert_eq!(restored.summary.warnings(), 1);

    let mut expected = data[..2 * block_size].to_vec();
    expected.extend_from_slice(&data[3 * block_size..]);
    assert_eq!(restored.output, expected);
}

#[test]
fn test_corrupt_payload_is_skipped_and_counted() {
    let block_size = 2048;
    let data = compressible_bytes(3 * block_size);
    let codec = DeflateCodec::default();
    let mut run = compressed(&data, block_size, 2, &codec);

    let parsed = deserialize(&run.container);
    let victim = parsed.blocks[1];
    let start = victim.offset as usize;
    let end = start + victim.compressed_size as usize;
    run.container[start..end].fill(0);

    let restored = decompress(&run.container, &DecompressOptions::new(2), &codec).unwrap();
    assert_eq!(restored.summary.failed_blocks, vec![1]);
    assert_eq!(restored.summary.warnings(), 1);

    let mut expected = data[..block_size].to_vec();
    expected.extend_from_slice(&data[2 * block_size..]);
    assert_eq!(restored.output, expected);
}

#[test]
fn test_output_order_independent_of_completion_order() {
    const BLOCKS: u8 = 12;
    let block_size = 256;
    let data = indexed_blocks(BLOCKS, block_size);
    let codec = SlowFirstCodec {
        blocks: BLOCKS,
        calls: AtomicUsize::new(0),
    };

    let run = compressed(&data, block_size, 4, &codec);
    let parsed = deserialize(&run.container);
    for (i, meta) in parsed.blocks.iter().enumerate() {
        assert_eq!(meta.index, i);
        let start = meta.offset as usize;
        assert_eq!(run.container[start], i as u8, "record {i} out of order");
    }

    let restored = decompress(&run.container, &DecompressOptions::new(4), &codec).unwrap();
    assert_eq!(restored.output, data);
    assert_eq!(codec.calls.load(Ordering::Relaxed), 2 * BLOCKS as usize);
}

#[test]
fn test_truncated_container_recovers_complete_records() {
    let block_size = 1024;
    let data = compressible_bytes(4 * block_size);
    let codec = DeflateCodec::default();
    let run = compressed(&data, block_size, 2, &codec);

    let cut = &run.container[..run.container.len() - 3];
    let restored = decompress(cut, &DecompressOptions::new(2), &codec).unwrap();
    assert_eq!(restored.summary.blocks, 3);
    assert_eq!(restored.summary.warnings(), 1);
    let truncation = restored.summary.truncation.expect("truncation should be reported");
    assert_eq!(truncation.record, 3);
    assert_eq!(restored.output, data[..3 * block_size]);

    let strict = decompress(cut, &DecompressOptions::new(2).strict(true), &codec);
    assert!(matches!(
        strict,
        Err(pbz_core::Error::TruncatedContainer { record: 3, .. })
    ));
}

#[test]
fn test_container_size_matches_headers_and_payloads() {
    let data = pseudo_random_bytes(9000, 7);
    let run = compressed(&data, 4000, 2, &ZstdCodec::default());
    let parsed = deserialize(&run.container);
    let expected = parsed.len() * HEADER_SIZE + parsed.payload_size() as usize;
    assert_eq!(run.container.len(), expected);
    assert_eq!(parsed.original_size(), data.len() as u64);
    assert_eq!(parsed.recoverable_size(), data.len() as u64);
}

/// Passthrough that panics on any block starting with 0xEE.
struct PanickyCodec {
    on_compress: bool,
}

impl Codec for PanickyCodec {
    fn name(&self) -> &'static str {
        "panicky"
    }

    fn compress_bound(&self, raw_len: usize) -> usize {
        raw_len
    }

    fn decompress_bound(&self, compressed: &[u8]) -> usize {
        compressed.len()
    }

    fn compress_block(&self, raw: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
        if self.on_compress && raw[0] == 0xEE {
            panic!("compress blew up");
        }
        PassThroughCodec.compress_block(raw, max_len)
    }

    fn decompress_block(&self, compressed: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
        if !self.on_compress && compressed[0] == 0xEE {
            panic!("decompress blew up");
        }
        PassThroughCodec.decompress_block(compressed, original_len)
    }
}

#[test]
fn test_codec_panic_is_contained_to_its_block() {
    let block_size = 100;
    let mut data = compressible_bytes(6 * block_size);
    data[3 * block_size] = 0xEE;

    let on_compress = PanickyCodec { on_compress: true };
    let run = compressed(&data, block_size, 3, &on_compress);
    assert_eq!(run.summary.failed_blocks, vec![3]);

    let on_decompress = PanickyCodec { on_compress: false };
    let run = compressed(&data, block_size, 3, &on_decompress);
    assert!(run.summary.failed_blocks.is_empty());
    let restored = decompress(&run.container, &DecompressOptions::new(3), &on_decompress).unwrap();
    assert_eq!(restored.summary.failed_blocks, vec![3]);

    let mut expected = data[..3 * block_size].to_vec();
    expected.extend_from_slice(&data[4 * block_size..]);
    assert_eq!(restored.output, expected);
}

#[test]
fn test_oversized_header_fails_block_without_allocating() {
    let good = compressible_bytes(500);
    let codecs: Vec<Box<dyn Codec>> = vec![
        Box::new(DeflateCodec::default()),
        Box::new(ZstdCodec::default()),
        Box::new(Lz4Codec),
        Box::new(PassThroughCodec),
    ];
    for codec in &codecs {
        let mut container = compressed(&good, 500, 1, codec.as_ref()).container;
        container.extend_from_slice(&BlockHeader::new(8, 1 << 42).to_bytes());
        container.extend_from_slice(&[0xA5; 8]);
        container.extend_from_slice(&compressed(&good, 500, 1, codec.as_ref()).container);

        let restored = decompress(&container, &DecompressOptions::new(2), codec.as_ref()).unwrap();
        assert_eq!(restored.summary.blocks, 3, "{}", codec.name());
        assert_eq!(restored.summary.failed_blocks, vec![1], "{}", codec.name());
        assert_eq!(restored.output, [good.as_slice(), good.as_slice()].concat());
    }
}

#[test]
fn test_empty_records_are_reported_in_summary() {
    let data_slot = |bytes: &[u8]| CompressedSlot {
        header: BlockHeader::new(bytes.len() as u64, bytes.len() as u64),
        payload: bytes.to_vec(),
    };
    let container = serialize(&[
        data_slot(b"head"),
        CompressedSlot::default(),
        CompressedSlot::default(),
        data_slot(b"tail"),
    ]);

    let restored = decompress(&container, &DecompressOptions::new(2), &PassThroughCodec).unwrap();
    assert_eq!(restored.output, b"headtail");
    assert_eq!(restored.summary.blocks, 4);
    assert_eq!(restored.summary.empty_blocks, 2);
    assert_eq!(restored.summary.warnings(), 0);
}
