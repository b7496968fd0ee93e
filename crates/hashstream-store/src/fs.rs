use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use hashstream_types::{ByteRange, Location};

use crate::error::{StoreError, StoreResult};
use crate::traits::{EntryStream, PackStore, StoredEntry};

/// Filesystem pack store.
///
/// Digest locations live at `<root>/<hex multihash>`; path locations are
/// resolved relative to `<root>` and may not escape it. Range reads seek
/// into the file and read only the requested bytes.
#[derive(Clone, Debug)]
pub struct FsPackStore {
    root: PathBuf,
}

impl FsPackStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, target: &Location) -> StoreResult<PathBuf> {
        match target {
            Location::Digest(mh) => Ok(self.root.join(mh.to_hex())),
            Location::Path(path) => {
                let relative = Path::new(path);
                let escapes = relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if path.is_empty() || escapes {
                    return Err(StoreError::InvalidPath {
                        path: path.clone(),
                        reason: "must be a relative path inside the store".into(),
                    });
                }
                Ok(self.root.join(relative))
            }
        }
    }
}

#[async_trait]
impl PackStore for FsPackStore {
    async fn put(&self, target: &Location, bytes: Bytes) -> StoreResult<()> {
        let path = self.resolve(target)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write-then-rename so readers never observe a partial pack.
        let tmp = temp_path(&path);
        let written = match tokio::fs::write(&tmp, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(location = %target, size = bytes.len(), "pack written");
        Ok(())
    }

    async fn get(&self, target: &Location) -> StoreResult<Option<Bytes>> {
        let path = self.resolve(target)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn stream<'a>(
        &'a self,
        target: &'a Location,
        ranges: Option<&'a [ByteRange]>,
    ) -> EntryStream<'a> {
        Box::pin(try_stream! {
            match ranges {
                None => {
                    if let Some(bytes) = self.get(target).await? {
                        yield StoredEntry {
                            multihash: target.as_digest().copied(),
                            bytes,
                        };
                    }
                }
                Some(ranges) => {
                    let path = self.resolve(target)?;
                    if let Some(mut file) = open_if_exists(&path).await? {
                        let size = file.metadata().await?.len();
                        for range in ranges {
                            match range.end() {
                                Some(end) if end <= size => {
                                    file.seek(SeekFrom::Start(range.offset)).await?;
                                    let mut buf = vec![0u8; range.length as usize];
                                    file.read_exact(&mut buf).await?;
                                    yield StoredEntry {
                                        multihash: Some(range.multihash),
                                        bytes: Bytes::from(buf),
                                    };
                                }
                                _ => {
                                    warn!(
                                        location = %target,
                                        offset = range.offset,
                                        length = range.length,
                                        size,
                                        "range outside stored pack, skipping"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}

/// A sibling of `path` that no other entry or concurrent put maps to.
fn temp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = NEXT.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

async fn open_if_exists(path: &Path) -> StoreResult<Option<tokio::fs::File>> {
    match tokio::fs::File::open(path).await {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
