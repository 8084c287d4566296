//! Directory-backed storage.
//!
//! Layout:
//!
//! ```text
//! <root>/*.json                          current revision of each document
//! <root>/revisions/<YYYY-MM-DD>/*.json   dated revisions
//! ```
//!
//! The directory is scanned once on [`FileSystemStorage::open`]; documents
//! are read from disk again on every fetch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use muster_schema::{CatalogueReference, DocumentInfo, RawDocument};
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::storage::CatalogueStorage;
use crate::versioning::{BooksDate, RevisionKey};

const REVISIONS_DIR: &str = "revisions";

#[derive(Debug, Default, Clone)]
struct Entry {
    info: Option<DocumentInfo>,
    current: Option<PathBuf>,
    dated: BTreeMap<BooksDate, PathBuf>,
}

impl Entry {
    fn path(&self, revision: &RevisionKey) -> Option<&PathBuf> {
        match revision {
            RevisionKey::Dated(date) => self.dated.get(date).or(self.current.as_ref()),
            RevisionKey::Default => self
                .current
                .as_ref()
                .or_else(|| self.dated.values().next_back()),
        }
    }
}

/// Storage reading and writing `*.json` documents in a directory.
#[derive(Debug)]
pub struct FileSystemStorage {
    root: PathBuf,
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl FileSystemStorage {
    /// Opens (creating if needed) a storage directory and indexes it.
    ///
    /// Files that are not valid documents are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or read.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
        for (path, document) in scan(&root).await? {
            let Some(info) = document.info() else {
                continue;
            };
            let entry = entries.entry(info.id.clone()).or_default();
            entry.info = Some(info);
            entry.current = Some(path);
        }

        let revisions = root.join(REVISIONS_DIR);
        if tokio::fs::try_exists(&revisions).await? {
            let mut dirs = tokio::fs::read_dir(&revisions).await?;
            while let Some(dir) = dirs.next_entry().await? {
                if !dir.file_type().await?.is_dir() {
                    continue;
                }
                let Some(date) = dir
                    .file_name()
                    .to_str()
                    .and_then(|name| name.parse::<BooksDate>().ok())
                else {
                    tracing::warn!(path = %dir.path().display(), "skipping revision directory without a date name");
                    continue;
                };
                for (path, document) in scan(&dir.path()).await? {
                    let Some(info) = document.info() else {
                        continue;
                    };
                    let entry = entries.entry(info.id.clone()).or_default();
                    entry.info.get_or_insert(info);
                    entry.dated.insert(date, path);
                }
            }
        }

        tracing::info!(root = %root.display(), documents = entries.len(), "opened catalogue directory");
        Ok(Self {
            root,
            entries: RwLock::new(entries),
        })
    }

    /// The storage directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, reference: &CatalogueReference, revision: &RevisionKey) -> Option<PathBuf> {
        let entries = self.entries.read();
        let entry = reference
            .target_id
            .as_deref()
            .and_then(|id| entries.get(id))
            .or_else(|| {
                let name = reference.name.as_deref()?;
                entries
                    .values()
                    .find(|entry| entry.info.as_ref().is_some_and(|info| info.name == name))
            })?;
        entry.path(revision).cloned()
    }
}

async fn scan(dir: &Path) -> Result<Vec<(PathBuf, RawDocument)>, StorageError> {
    let mut found = Vec::new();
    let mut files = tokio::fs::read_dir(dir).await?;
    while let Some(file) = files.next_entry().await? {
        let path = file.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let text = tokio::fs::read_to_string(&path).await?;
        match RawDocument::from_json_str(&text) {
            Ok(document) => found.push((path, document)),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping malformed document");
            }
        }
    }
    found.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(found)
}

fn file_name(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.json")
}

#[async_trait]
impl CatalogueStorage for FileSystemStorage {
    async fn fetch(
        &self,
        reference: &CatalogueReference,
        revision: &RevisionKey,
    ) -> Result<RawDocument, StorageError> {
        let path = self
            .locate(reference, revision)
            .ok_or_else(|| StorageError::NotFound(reference.clone()))?;
        tracing::debug!(path = %path.display(), %revision, "reading document");
        let text = tokio::fs::read_to_string(&path).await?;
        Ok(RawDocument::from_json_str(&text)?)
    }

    async fn persist(&self, id: &str, document: RawDocument) -> Result<(), StorageError> {
        let path = self
            .entries
            .read()
            .get(id)
            .and_then(|entry| entry.current.clone())
            .unwrap_or_else(|| self.root.join(file_name(id)));
        let text = document.to_json_string()?;
        tokio::fs::write(&path, text).await?;

        let info = document.info();
        let mut entries = self.entries.write();
        let entry = entries.entry(id.to_owned()).or_default();
        entry.current = Some(path);
        if info.is_some() {
            entry.info = info;
        }
        Ok(())
    }

    async fn persist_revision(
        &self,
        id: &str,
        date: BooksDate,
        document: RawDocument,
    ) -> Result<(), StorageError> {
        let path = self
            .entries
            .read()
            .get(id)
            .and_then(|entry| entry.dated.get(&date).cloned())
            .unwrap_or_else(|| {
                self.root
                    .join(REVISIONS_DIR)
                    .join(date.to_string())
                    .join(file_name(id))
            });
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let text = document.to_json_string()?;
        tokio::fs::write(&path, text).await?;

        let info = document.info();
        let mut entries = self.entries.write();
        let entry = entries.entry(id.to_owned()).or_default();
        entry.dated.insert(date, path);
        if let Some(info) = info {
            entry.info.get_or_insert(info);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentInfo>, StorageError> {
        Ok(self
            .entries
            .read()
            .values()
            .filter_map(|entry| entry.info.clone())
            .collect())
    }

    fn revisions(&self, key: &str) -> Vec<BooksDate> {
        let entries = self.entries.read();
        entries
            .get(key)
            .or_else(|| {
                entries
                    .values()
                    .find(|entry| entry.info.as_ref().is_some_and(|info| info.name == key))
            })
            .map(|entry| entry.dated.keys().copied().collect())
            .unwrap_or_default()
    }
}
