use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use regex::Regex;
use std::fs::ReadDir;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::{fs, task};
use tracing::{debug, info, warn};

use crate::models::{Entry, EntryKind, split_path};

use super::Backend;

/// CBMC build products and helper scripts that never belong in the tree.
const CBMC_INTERNALS: &str =
    r"cbmc/proofs/(?:lib|output|run-cbmc-proofs\.py)|cbmc/proofs/.+?/(?:logs|report|gotos)";

/// Serves a data directory on the local filesystem.
pub struct LocalBackend {
    root: PathBuf,
    include_hidden: bool,
    internals: Regex,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            include_hidden: false,
            internals: Regex::new(CBMC_INTERNALS).context("Invalid internals pattern")?,
        })
    }

    /// List dot-files and CBMC internals as well.
    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        split_path(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn list(&self) -> Result<Vec<Entry>> {
        info!(root = %self.root.display(), "listing data directory tree");
        let root = self.root.clone();
        let internals = (!self.include_hidden).then(|| self.internals.clone());
        task::spawn_blocking(move || {
            list_blocking(&root, internals.as_ref(), |dir| std::fs::read_dir(dir))
        })
        .await?
    }

    async fn create(&self, path: &str, kind: EntryKind) -> Result<()> {
        info!(path, kind = kind.as_str(), "creating entry");
        let target = self.resolve(path)?;

        match kind {
            EntryKind::Dir => {
                if fs::try_exists(&target).await? {
                    bail!("Path already exists");
                }
                fs::create_dir_all(&target)
                    .await
                    .with_context(|| format!("failed to create '{path}'"))?;
            }
            EntryKind::File => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("failed to create parents of '{path}'"))?;
                }
                fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&target)
                    .await
                    .map_err(|err| match err.kind() {
                        ErrorKind::AlreadyExists => anyhow!("Path already exists"),
                        _ => anyhow!(err).context(format!("failed to create '{path}'")),
                    })?;
            }
        }

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        info!(path, "deleting entry");
        let target = self.resolve(path)?;

        match fs::symlink_metadata(&target).await {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&target)
                .await
                .with_context(|| format!("failed to delete '{path}'")),
            Ok(_) => fs::remove_file(&target)
                .await
                .with_context(|| format!("failed to delete '{path}'")),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path, "entry already gone");
                Ok(())
            }
            Err(err) => Err(err).with_context(|| format!("failed to delete '{path}'")),
        }
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        match fs::metadata(&target).await {
            Ok(metadata) if metadata.is_file() => fs::read_to_string(&target)
                .await
                .with_context(|| format!("failed to read '{path}'")),
            _ => bail!("File not found"),
        }
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        info!(path, bytes = content.len(), "writing file");
        let target = self.resolve(path)?;
        match fs::metadata(&target).await {
            Ok(metadata) if metadata.is_file() => fs::write(&target, content)
                .await
                .with_context(|| format!("failed to write '{path}'")),
            _ => bail!("File not found"),
        }
    }
}

/// Walk `root` and return every entry sorted by kind, then path.
///
/// Sorting directories first by component order puts every directory before
/// anything nested under it. `internals` is `None` when hidden entries are wanted.
/// Only a failure to read `root` itself is an error; unreadable subdirectories
/// are skipped.
fn list_blocking<R>(root: &Path, internals: Option<&Regex>, read: R) -> Result<Vec<Entry>>
where
    R: Fn(&Path) -> io::Result<ReadDir>,
{
    let mut found: Vec<(EntryKind, PathBuf)> = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let read_dir = match read(&dir) {
            Ok(read_dir) => read_dir,
            Err(err) if dir == root => {
                return Err(err).with_context(|| format!("failed to read {}", dir.display()));
            }
            Err(err) => {
                warn!(dir = %dir.display(), "skipping unreadable directory: {err}");
                continue;
            }
        };

        for entry in read_dir.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_path_buf();

            if let Some(internals) = internals
                && is_excluded(&relative, internals)
            {
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            // Symlinked directories are listed as directories but never descended.
            let is_dir = std::fs::metadata(&path).is_ok_and(|m| m.is_dir());
            if file_type.is_dir() {
                pending.push(path);
            }

            let kind = if is_dir { EntryKind::Dir } else { EntryKind::File };
            found.push((kind, relative));
        }
    }

    found.sort();

    let mut entries = Vec::with_capacity(found.len());
    for (kind, relative) in found {
        match to_slash_path(&relative) {
            Some(path) => entries.push(Entry::new(path, kind)),
            None => warn!(path = %relative.display(), "skipping non UTF-8 path"),
        }
    }
    Ok(entries)
}

fn is_excluded(relative: &Path, internals: &Regex) -> bool {
    let hidden = relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
    hidden || internals.is_match(&relative.to_string_lossy())
}

fn to_slash_path(relative: &Path) -> Option<String> {
    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}
