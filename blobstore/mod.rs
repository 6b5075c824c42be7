/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! File-blob storage with descriptor sidecars and refcounted view handles.
//!
//! Each upload lands as two files under the store root: `{id}.bin` (the
//! bytes) and `{id}.json` (the descriptor). I/O is async over `tokio::fs`;
//! the handle registry is synchronous and lock-guarded.
//!
//! Handles are opaque URLs of the form `blob:{id}#{serial}`. The serial
//! makes every acquisition distinct, so releasing one handle never
//! invalidates another view of the same blob. [`HandleSet`] scopes a group
//! of handles to an owner and releases them on drop.

use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::graph::{FileRef, now_ms};
use crate::persistence::types::PersistedFile;

/// Sniff a MIME type: magic bytes first, extension second.
pub fn detect_mime(name: &str, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[derive(Default)]
struct HandleRegistry {
    serial: u64,
    open: HashMap<String, Uuid>,
}

pub struct BlobStore {
    root: PathBuf,
    handles: Mutex<HandleRegistry>,
}

impl BlobStore {
    /// Open (or create) the store under `root`.
    pub fn open(root: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            handles: Mutex::new(HandleRegistry::default()),
        })
    }

    fn bin_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.bin"))
    }

    fn descriptor_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Store a blob and its descriptor; returns the descriptor.
    pub async fn save(&self, name: &str, bytes: &[u8]) -> std::io::Result<FileRef> {
        let id = Uuid::new_v4();
        let file = FileRef {
            id,
            name: name.to_string(),
            mime: detect_mime(name, bytes),
            size: bytes.len() as u64,
            created_at_ms: now_ms(),
        };

        tokio::fs::write(self.bin_path(id), bytes).await?;
        let descriptor = serde_json::to_vec(&PersistedFile {
            file_id: id.to_string(),
            name: file.name.clone(),
            mime: file.mime.clone(),
            size: file.size,
            created_at_ms: file.created_at_ms,
        })
        .map_err(std::io::Error::other)?;
        tokio::fs::write(self.descriptor_path(id), descriptor).await?;

        Ok(file)
    }

    /// Fetch a descriptor. None for unknown ids or unreadable sidecars.
    pub async fn get(&self, id: Uuid) -> Option<FileRef> {
        let bytes = tokio::fs::read(self.descriptor_path(id)).await.ok()?;
        parse_descriptor(&bytes)
    }

    /// Fetch blob bytes.
    pub async fn read(&self, id: Uuid) -> Option<Vec<u8>> {
        tokio::fs::read(self.bin_path(id)).await.ok()
    }

    /// Remove a blob and its descriptor. True when the descriptor existed.
    /// Open handles are NOT revoked; readers of an already-acquired handle
    /// simply start seeing misses.
    pub async fn delete(&self, id: Uuid) -> bool {
        let had_descriptor = match tokio::fs::remove_file(self.descriptor_path(id)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Failed to delete blob descriptor {id}: {e}");
                false
            },
        };
        if let Err(e) = tokio::fs::remove_file(self.bin_path(id)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to delete blob bytes {id}: {e}");
            }
        }
        had_descriptor
    }

    /// Every stored descriptor, ordered by creation time then name.
    /// Unreadable sidecars are skipped.
    pub async fn list_all(&self) -> Vec<FileRef> {
        let mut files = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return files;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension() != Some(std::ffi::OsStr::new("json")) {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    if let Some(file) = parse_descriptor(&bytes) {
                        files.push(file);
                    } else {
                        debug!("Skipping malformed blob descriptor {}", path.display());
                    }
                },
                Err(e) => debug!("Skipping unreadable blob descriptor: {e}"),
            }
        }
        files.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.name.cmp(&b.name))
        });
        files
    }

    /// Mint an opaque view handle for a blob. Existence is not checked:
    /// a handle to a missing blob is valid and resolves to nothing.
    pub fn create_handle(&self, id: Uuid) -> String {
        let mut registry = self.handles.lock();
        registry.serial += 1;
        let url = format!("blob:{id}#{}", registry.serial);
        registry.open.insert(url.clone(), id);
        url
    }

    /// Release a handle. False when it was not open (double release).
    pub fn release_handle(&self, url: &str) -> bool {
        self.handles.lock().open.remove(url).is_some()
    }

    /// Blob id behind an open handle.
    pub fn resolve_handle(&self, url: &str) -> Option<Uuid> {
        self.handles.lock().open.get(url).copied()
    }

    pub fn open_handle_count(&self) -> usize {
        self.handles.lock().open.len()
    }
}

fn parse_descriptor(bytes: &[u8]) -> Option<FileRef> {
    let record: PersistedFile = serde_json::from_slice(bytes).ok()?;
    let id = Uuid::parse_str(&record.file_id).ok()?;
    Some(FileRef {
        id,
        name: record.name,
        mime: record.mime,
        size: record.size,
        created_at_ms: record.created_at_ms,
    })
}

/// A group of handles with one owner. Dropping the set releases every
/// handle still in it.
pub struct HandleSet {
    store: Arc<BlobStore>,
    urls: Vec<String>,
}

impl HandleSet {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self {
            store,
            urls: Vec::new(),
        }
    }

    /// Acquire a handle for `id` into this set.
    pub fn acquire(&mut self, id: Uuid) -> String {
        let url = self.store.create_handle(id);
        self.urls.push(url.clone());
        url
    }

    /// Release every handle acquired for `id`.
    pub fn release_for(&mut self, id: Uuid) {
        let store = &self.store;
        self.urls.retain(|url| {
            if store.resolve_handle(url) == Some(id) {
                store.release_handle(url);
                false
            } else {
                true
            }
        });
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl Drop for HandleSet {
    fn drop(&mut self) {
        for url in self.urls.drain(..) {
            self.store.release_handle(&url);
        }
    }
}
