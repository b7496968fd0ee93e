use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use hashstream_pack::WriterConfig;
use hashstream_streamer::StreamerConfig;

/// Which index writer `write` attaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IndexStrategy {
    SingleLevel,
    #[default]
    MultipleLevel,
}

/// Top-level configuration, read from `hashstream.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashstreamConfig {
    /// Root for `packs/` and `index/`.
    pub data_dir: PathBuf,
    pub writer: WriterConfig,
    pub streamer: StreamerConfig,
    pub index_strategy: IndexStrategy,
}

impl Default for HashstreamConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".hashstream"),
            writer: WriterConfig::default(),
            streamer: StreamerConfig::default(),
            index_strategy: IndexStrategy::default(),
        }
    }
}

impl HashstreamConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.writer.validate()?;
        Ok(config)
    }

    pub fn packs_dir(&self) -> PathBuf {
        self.data_dir.join("packs")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashstream_crypto::HashAlgorithm;
    use hashstream_pack::PackFormat;

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = HashstreamConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, HashstreamConfig::default());
        assert_eq!(config.packs_dir(), PathBuf::from(".hashstream/packs"));
    }

    #[test]
    fn partial_toml() {
        let config = HashstreamConfig::parse(
            r#"
            data_dir = "/var/lib/hashstream"
            index_strategy = "single-level"

            [writer]
            pack_format = "raw"
            hash = "sha2-256"

            [streamer]
            verify = false
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/hashstream"));
        assert_eq!(config.index_strategy, IndexStrategy::SingleLevel);
        assert_eq!(config.writer.pack_format, PackFormat::Raw);
        assert_eq!(config.writer.hash, HashAlgorithm::Sha2_256);
        assert_eq!(config.writer.blob_size, 1024 * 1024);
        assert!(!config.streamer.verify);
    }

    #[test]
    fn invalid_writer_settings_rejected() {
        let err = HashstreamConfig::parse("[writer]\nblob_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("blob_size"));
        assert!(HashstreamConfig::parse("[writer]\npack_format = \"zip\"\n").is_err());
    }

    #[test]
    fn file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashstream.toml");
        std::fs::write(&path, "data_dir = \"store\"\n").unwrap();
        let config = HashstreamConfig::load(&path).unwrap();
        assert_eq!(config.index_dir(), PathBuf::from("store/index"));
    }
}
