use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use futures::{StreamExt, TryStreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use hashstream_index::{
    FindOptions, FsIndexStore, IndexReader, IndexRecord, IndexWriter, MultipleLevelIndexWriter,
    SingleLevelIndexWriter,
};
use hashstream_pack::{PackReader, PackWriter};
use hashstream_store::FsPackStore;
use hashstream_streamer::{HashStreamer, StreamOptions};
use hashstream_types::Multihash;

use crate::cli::*;
use crate::config::{HashstreamConfig, IndexStrategy};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = HashstreamConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    match cli.command {
        Command::Write(args) => cmd_write(config, args).await,
        Command::Stream(args) => cmd_stream(config, args).await,
        Command::Find(args) => cmd_find(config, args).await,
    }
}

struct Stores {
    packs: Arc<FsPackStore>,
    index: Arc<FsIndexStore>,
}

async fn open_stores(config: &HashstreamConfig) -> anyhow::Result<Stores> {
    let packs = FsPackStore::open(config.packs_dir())
        .await
        .with_context(|| format!("opening pack store in {}", config.packs_dir().display()))?;
    let index = FsIndexStore::open(config.index_dir())
        .await
        .with_context(|| format!("opening index in {}", config.index_dir().display()))?;
    Ok(Stores {
        packs: Arc::new(packs),
        index: Arc::new(index),
    })
}

async fn cmd_write(mut config: HashstreamConfig, args: WriteArgs) -> anyhow::Result<()> {
    if let Some(format) = args.format {
        config.writer.pack_format = format;
    }
    if args.no_containing_index {
        config.writer.index_containing = false;
    }
    config.writer.validate()?;

    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("opening {}", args.file.display()))?;
    let stores = open_stores(&config).await?;

    let strategy = args.strategy.unwrap_or(config.index_strategy);
    let index_writer: Arc<dyn IndexWriter> = match strategy {
        IndexStrategy::SingleLevel => Arc::new(SingleLevelIndexWriter::new(stores.index.clone())),
        IndexStrategy::MultipleLevel => Arc::new(MultipleLevelIndexWriter::new(stores.index.clone())),
    };

    let result = PackWriter::new(stores.packs.clone(), config.writer.clone())
        .with_index_writer(index_writer)
        .write(file)
        .await?;

    println!(
        "{} Stored {} as {} pack(s)",
        "✓".green().bold(),
        args.file.display(),
        result.packs.len()
    );
    println!("  Containing: {}", result.containing.to_string().yellow());
    for pack in &result.packs {
        println!("  Pack: {}", pack.to_string().cyan());
    }
    Ok(())
}

async fn cmd_stream(config: HashstreamConfig, args: StreamArgs) -> anyhow::Result<()> {
    let stores = open_stores(&config).await?;
    let streamer = HashStreamer::with_config(
        IndexReader::new(stores.index.clone()),
        PackReader::new(stores.packs.clone()).with_hash(config.writer.hash),
        config.streamer.clone(),
    );

    let mut out: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = match &args.output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let options = StreamOptions {
        containing: args.containing,
    };
    let streamed = copy_content(&streamer, args.multihash, options, &mut out).await;
    out.flush().await?;
    let (count, bytes) = streamed?;

    if count == 0 {
        eprintln!("{} No content found for {}", "!".yellow().bold(), args.multihash);
    } else {
        eprintln!("{} Streamed {} blob(s), {} bytes", "✓".green().bold(), count, bytes);
    }
    Ok(())
}

/// Write every blob behind `target` to `out`, returning the blob and byte
/// counts. Fails when a containing target's output does not hash back to
/// the target; whatever was written before that is incomplete.
async fn copy_content<W>(
    streamer: &HashStreamer,
    target: Multihash,
    options: StreamOptions,
    out: &mut W,
) -> anyhow::Result<(usize, u64)>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut blobs = streamer.stream_content(target, options);
    let mut count = 0usize;
    let mut bytes = 0u64;
    while let Some(blob) = blobs.next().await {
        let blob = blob.with_context(|| format!("streaming {target} incomplete after {bytes} bytes"))?;
        out.write_all(&blob.bytes).await?;
        count += 1;
        bytes += blob.len() as u64;
    }
    Ok((count, bytes))
}

async fn cmd_find(config: HashstreamConfig, args: FindArgs) -> anyhow::Result<()> {
    let stores = open_stores(&config).await?;
    let reader = IndexReader::new(stores.index.clone());
    let options = FindOptions {
        containing: args.containing,
    };
    let records: Vec<IndexRecord> = reader
        .find_records(args.multihash, options)
        .try_collect()
        .await?;

    if records.is_empty() {
        eprintln!("{} No records for {}", "!".yellow().bold(), args.multihash);
        return Ok(());
    }
    let values: Vec<Value> = records.iter().map(record_json).collect();
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

fn record_json(record: &IndexRecord) -> Value {
    match record {
        IndexRecord::Blob(blob) => json!({
            "type": "blob",
            "multihash": blob.multihash,
            "location": blob.location.to_string(),
            "offset": blob.offset,
            "length": blob.length,
        }),
        IndexRecord::Pack(pack) => json!({
            "type": "pack",
            "multihash": pack.multihash,
            "blobs": pack
                .blobs
                .iter()
                .map(|b| record_json(&IndexRecord::Blob(b.clone())))
                .collect::<Vec<_>>(),
        }),
        IndexRecord::Containing(containing) => json!({
            "type": "containing",
            "multihash": containing.multihash,
            "subRecords": containing.sub_records.iter().map(record_json).collect::<Vec<_>>(),
        }),
    }
}
