use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hashstream_pack::PackFormat;
use hashstream_types::Multihash;

use crate::config::IndexStrategy;

#[derive(Parser)]
#[command(
    name = "hashstream",
    about = "Hashstream: content-addressed pack storage with verifiable streaming",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "hashstream.toml")]
    pub config: PathBuf,

    /// Override the data directory from the configuration file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pack a file, store it, and index its blobs
    Write(WriteArgs),
    /// Stream the bytes behind a multihash
    Stream(StreamArgs),
    /// Show the index records for a multihash
    Find(FindArgs),
}

#[derive(Args)]
pub struct WriteArgs {
    pub file: PathBuf,
    /// Index each pack directly instead of under the file's digest
    #[arg(long)]
    pub no_containing_index: bool,
    /// Pack container format (car, raw)
    #[arg(long)]
    pub format: Option<PackFormat>,
    #[arg(long, value_enum)]
    pub strategy: Option<IndexStrategy>,
}

#[derive(Args)]
pub struct StreamArgs {
    pub multihash: Multihash,
    /// Resolve inside this containing digest first
    #[arg(long)]
    pub containing: Option<Multihash>,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct FindArgs {
    pub multihash: Multihash,
    #[arg(long)]
    pub containing: Option<Multihash>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_write() {
        let cli = Cli::parse_from([
            "hashstream",
            "write",
            "data.bin",
            "--no-containing-index",
            "--format",
            "raw",
            "--strategy",
            "single-level",
        ]);
        let Command::Write(args) = cli.command else {
            panic!("expected write");
        };
        assert!(args.no_containing_index);
        assert_eq!(args.format, Some(PackFormat::Raw));
        assert_eq!(args.strategy, Some(IndexStrategy::SingleLevel));
    }

    #[test]
    fn rejects_malformed_multihash() {
        assert!(Cli::try_parse_from(["hashstream", "stream", "zz"]).is_err());
        assert!(Cli::try_parse_from(["hashstream", "write", "f", "--format", "zip"]).is_err());
    }
}
