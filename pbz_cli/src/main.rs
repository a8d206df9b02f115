use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use pbz_codecs::codec_by_name;
use pbz_core::config::default_workers;
use pbz_core::container::deserialize;
use pbz_core::{BlockKind, CompressOptions, CompressOutcome, DecompressOptions, DEFAULT_BLOCK_SIZE};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "pbz",
    about = "Parallel block compression: split a file into blocks and compress them on a worker pool",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a pbz container
    Compress {
        /// Source file to compress
        input: PathBuf,
        /// Destination container
        output: PathBuf,
        /// Worker threads
        #[arg(short = 'j', long, env = "PBZ_WORKERS", default_value_t = default_workers())]
        workers: usize,
        /// Raw bytes per block (default: 65536 = 64 KB)
        #[arg(short, long, env = "PBZ_BLOCK_SIZE", default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Codec to use: deflate | zstd | lz4 | passthrough
        #[arg(short, long, default_value = "deflate")]
        codec: String,
        /// Codec level (deflate 0–9, zstd 1–22); codec default when omitted
        #[arg(short, long)]
        level: Option<i32>,
    },
    /// Decompress a pbz container back to raw bytes
    Decompress {
        /// Source container
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
        /// Worker threads
        #[arg(short = 'j', long, env = "PBZ_WORKERS", default_value_t = default_workers())]
        workers: usize,
        /// Codec the container was written with
        #[arg(short, long, default_value = "deflate")]
        codec: String,
        /// Fail on a truncated container instead of recovering the complete records
        #[arg(long)]
        strict: bool,
    },
    /// Print record statistics for a container
    Inspect {
        /// Container to inspect
        file: PathBuf,
        /// Print per-record details
        #[arg(long)]
        blocks: bool,
    },
    /// Time a full round trip for 1..=N workers
    Bench {
        /// File to compress
        input: PathBuf,
        /// Largest worker count to try
        #[arg(short = 'j', long, env = "PBZ_WORKERS", default_value_t = default_workers())]
        workers: usize,
        /// Raw bytes per block
        #[arg(short, long, env = "PBZ_BLOCK_SIZE", default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Codec to use
        #[arg(short, long, default_value = "deflate")]
        codec: String,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn kind_label(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Data => "data",
        BlockKind::Empty => "empty",
        BlockKind::Errored => "errored",
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

/// Temporary file in `output`'s directory. Dropped (and removed) unless
/// [`commit_output`] moves it into place, so a failed run leaves no partial
/// output behind.
fn staged_output(output: &Path) -> anyhow::Result<NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).with_context(|| format!("creating output file {:?}", output))
}

fn commit_output(dst: BufWriter<NamedTempFile>, output: &Path) -> anyhow::Result<()> {
    let staged = dst.into_inner().map_err(io::IntoInnerError::into_error)?;
    staged
        .persist(output)
        .with_context(|| format!("writing output file {:?}", output))?;
    Ok(())
}

fn run_compress(
    input: PathBuf,
    output: PathBuf,
    workers: usize,
    block_size: usize,
    codec_name: &str,
    level: Option<i32>,
) -> anyhow::Result<()> {
    let codec = codec_by_name(codec_name, level)?;
    let data = fs::read(&input).with_context(|| format!("reading input file {:?}", input))?;
    eprintln!("  input       : {:?} ({})", input, human_bytes(data.len() as u64));

    let options = CompressOptions::new(block_size, workers);
    let run = match pbz_core::compress(&data, &options, codec.as_ref())? {
        CompressOutcome::Empty => {
            eprintln!("  nothing to compress: input is empty");
            return Ok(());
        }
        CompressOutcome::Compressed(run) => run,
    };

    let mut dst = BufWriter::new(staged_output(&output)?);
    dst.write_all(&run.container)?;
    commit_output(dst, &output)?;

    let summary = &run.summary;
    eprintln!("  codec       : {}", codec.name());
    eprintln!("  block size  : {}", human_bytes(summary.block_size as u64));
    eprintln!("  blocks      : {}", summary.blocks);
    eprintln!("  workers     : {} (claims {:?})", summary.workers, summary.worker_claims);
    eprintln!("  raw size    : {}", human_bytes(summary.original_size));
    eprintln!("  compressed  : {}", human_bytes(summary.compressed_size));
    eprintln!("  ratio       : {:.2}x", summary.ratio());
    eprintln!("  elapsed     : {:.4}s", summary.elapsed.as_secs_f64());
    if summary.warnings() > 0 {
        eprintln!(
            "  warning     : {} block(s) could not be compressed: {:?}",
            summary.warnings(),
            summary.failed_blocks
        );
    }
    Ok(())
}

fn run_decompress(
    input: PathBuf,
    output: PathBuf,
    workers: usize,
    codec_name: &str,
    strict: bool,
) -> anyhow::Result<()> {
    let codec = codec_by_name(codec_name, None)?;
    let container = fs::read(&input).with_context(|| format!("reading container {:?}", input))?;

    let options = DecompressOptions::new(workers).strict(strict);
    let summary = if output.to_str() == Some("-") {
        let mut dst = io::stdout();
        let summary = pbz_core::decompress_to(&container, &options, codec.as_ref(), &mut dst)
            .with_context(|| format!("decompressing {:?}", input))?;
        dst.flush()?;
        summary
    } else {
        let mut dst = BufWriter::new(staged_output(&output)?);
        let summary = pbz_core::decompress_to(&container, &options, codec.as_ref(), &mut dst)
            .with_context(|| format!("decompressing {:?}", input))?;
        commit_output(dst, &output)?;
        summary
    };

    eprintln!("  blocks      : {}", summary.blocks);
    eprintln!("  workers     : {}", summary.workers);
    eprintln!("  raw size    : {}", human_bytes(summary.written));
    if summary.empty_blocks > 0 {
        eprintln!("  empty       : {}", summary.empty_blocks);
    }
    eprintln!("  elapsed     : {:.4}s", summary.elapsed.as_secs_f64());
    if !summary.errored_blocks.is_empty() {
        eprintln!(
            "  warning     : {} block(s) were stored as errored and are missing: {:?}",
            summary.errored_blocks.len(),
            summary.errored_blocks
        );
    }
    if !summary.failed_blocks.is_empty() {
        eprintln!(
            "  warning     : {} block(s) failed to decode and are missing: {:?}",
            summary.failed_blocks.len(),
            summary.failed_blocks
        );
    }
    if let Some(t) = summary.truncation {
        eprintln!(
            "  warning     : container truncated at record {} (offset {}); later data is lost",
            t.record, t.header_offset
        );
    }
    Ok(())
}

fn run_inspect(file: PathBuf, show_blocks: bool) -> anyhow::Result<()> {
    let container = fs::read(&file).with_context(|| format!("reading container {:?}", file))?;
    let parsed = deserialize(&container);

    println!("=== pbz container: {:?} ===", file);
    println!();
    println!("  records        : {}", parsed.len());
    println!("  data           : {}", parsed.count_kind(BlockKind::Data));
    println!("  empty          : {}", parsed.count_kind(BlockKind::Empty));
    println!("  errored        : {}", parsed.count_kind(BlockKind::Errored));
    println!("  raw size       : {}", human_bytes(parsed.original_size()));
    println!("  recoverable    : {}", human_bytes(parsed.recoverable_size()));
    println!("  payload        : {}", human_bytes(parsed.payload_size()));
    println!("  file on disk   : {}", human_bytes(container.len() as u64));
    match parsed.truncation {
        Some(t) => println!(
            "  truncated      : yes, record {} at offset {} needs {} bytes, {} left",
            t.record, t.header_offset, t.needed, t.available
        ),
        None => println!("  truncated      : no"),
    }

    if show_blocks {
        println!();
        println!(
            "  {:>8}  {:>14}  {:>12}  {:>12}  {:>8}",
            "block", "payload offset", "compressed", "raw", "kind"
        );
        println!("  {}", "-".repeat(62));
        for b in &parsed.blocks {
            println!(
                "  {:>8}  {:>14}  {:>12}  {:>12}  {:>8}",
                b.index,
                b.offset,
                human_bytes(b.compressed_size),
                human_bytes(b.original_size),
                kind_label(b.kind())
            );
        }
    }

    Ok(())
}

fn run_bench(input: PathBuf, max_workers: usize, block_size: usize, codec_name: &str) -> anyhow::Result<()> {
    let codec = codec_by_name(codec_name, None)?;
    let data = fs::read(&input).with_context(|| format!("reading input file {:?}", input))?;
    if data.is_empty() {
        anyhow::bail!("input file is empty");
    }

    println!("=== Round-trip benchmark: {} ({}) ===", codec.name(), human_bytes(data.len() as u64));
    println!(
        "  {:>7}  {:>12}  {:>12}  {:>8}  {:>12}",
        "workers", "compress", "decompress", "ratio", "throughput"
    );

    for workers in 1..=max_workers.max(1) {
        let t0 = Instant::now();
        let options = CompressOptions::new(block_size, workers);
        let CompressOutcome::Compressed(run) = pbz_core::compress(&data, &options, codec.as_ref())?
        else {
            anyhow::bail!("compressor reported nothing to compress for a non-empty input");
        };
        let compress_time = t0.elapsed();

        let restored =
            pbz_core::decompress(&run.container, &DecompressOptions::new(workers), codec.as_ref())?;
        if restored.output != data {
            anyhow::bail!("round trip with {} workers did not reproduce the input", workers);
        }

        println!(
            "  {:>7}  {:>11.4}s  {:>11.4}s  {:>7.2}x  {:>10}/s",
            run.summary.workers,
            compress_time.as_secs_f64(),
            restored.summary.elapsed.as_secs_f64(),
            run.summary.ratio(),
            human_bytes((data.len() as f64 / compress_time.as_secs_f64().max(1e-9)) as u64)
        );
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Compress {
            input,
            output,
            workers,
            block_size,
            codec,
            level,
        } => run_compress(input, output, workers, block_size, &codec, level),
        Commands::Decompress {
            input,
            output,
            workers,
            codec,
            strict,
        } => run_decompress(input, output, workers, &codec, strict),
        Commands::Inspect { file, blocks } => run_inspect(file, blocks),
        Commands::Bench {
            input,
            workers,
            block_size,
            codec,
        } => run_bench(input, workers, block_size, &codec),
    }
}
