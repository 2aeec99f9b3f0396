use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pageblock::object::objects;
use pageblock::{encoding, BlockConfig, Encoding, MmapReader, Version};

#[derive(Parser)]
#[command(name = "pageblock", version, about = "Paged block tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a block page by page and report sizes and object counts
    Inspect {
        block: PathBuf,
        /// Compression codec (none, gzip, lz4, snappy, zstd)
        #[arg(long)]
        encoding: Option<Encoding>,
        /// Block format version (v1, v2)
        #[arg(long = "format")]
        version: Option<Version>,
        /// JSON block config; flags override its fields
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut out = io::BufWriter::new(io::stdout());
    match cli.command {
        Commands::Inspect {
            block,
            encoding,
            version,
            config,
        } => {
            let mut block_config = match config {
                Some(path) => BlockConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => BlockConfig::default(),
            };
            if let Some(encoding) = encoding {
                block_config.encoding = encoding;
            }
            if let Some(version) = version {
                block_config.version = version;
            }
            cmd_inspect(&block, &block_config, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn cmd_inspect(path: &Path, config: &BlockConfig, out: &mut impl Write) -> Result<()> {
    let source =
        MmapReader::open(path).with_context(|| format!("opening block {}", path.display()))?;
    log::info!(
        "inspecting {} ({} bytes, {} {})",
        path.display(),
        source.len(),
        config.version,
        config.encoding
    );
    let mut reader = encoding::new_data_reader(config.version, source, config.encoding)?;

    writeln!(out, "{:>6} {:>10} {:>12} {:>8}", "page", "on_disk", "decoded", "objects")?;
    let mut buffer = Vec::new();
    let mut pages = 0u64;
    let mut on_disk = 0u64;
    let mut decoded = 0u64;
    let mut total_objects = 0u64;
    while let Some(page) = reader
        .next_page(&mut buffer)
        .with_context(|| format!("decoding page {pages}"))?
    {
        let mut count = 0u64;
        for object in objects(page.data) {
            object.with_context(|| format!("decoding objects of page {pages}"))?;
            count += 1;
        }
        writeln!(
            out,
            "{:>6} {:>10} {:>12} {:>8}",
            pages,
            page.total_length,
            page.data.len(),
            count
        )?;
        pages += 1;
        on_disk += u64::from(page.total_length);
        decoded += page.data.len() as u64;
        total_objects += count;
    }
    writeln!(
        out,
        "total: pages={pages} on_disk={on_disk} decoded={decoded} objects={total_objects}"
    )?;
    Ok(())
}
