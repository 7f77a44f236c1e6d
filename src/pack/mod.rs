mod backend;
pub mod collision;
pub mod document;
pub mod lookup;

use crate::error::{Error, Result};
use backend::Storage;
use collision::{CollisionHandler, DefaultCollisionHandler};
use document::JsonDocument;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MANIFEST_PATH: &str = "pack.mcmeta";
pub const DEFAULT_PACK_FORMAT: i32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackMeta {
    pub pack_format: i32,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    pack: PackMeta,
}

/// Counts from one [`Pack::include`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncludeReport {
    pub copied: usize,
    pub collisions_resolved: usize,
    pub filtered: usize,
}

#[derive(Debug)]
pub struct Pack {
    storage: Storage,
    pack_format: i32,
}

/// Normalise a pack-relative path: forward slashes, no leading slash, no `..`.
pub fn normalize_path(raw: &str) -> Result<String> {
    let cleaned = raw.replace('\\', "/");
    let trimmed = cleaned.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidPath(raw.to_string()));
    }
    let mut parts = Vec::new();
    for part in trimmed.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(Error::InvalidPath(raw.to_string())),
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        return Err(Error::InvalidPath(raw.to_string()));
    }
    Ok(parts.join("/"))
}

impl Pack {
    /// Use `dir` as the pack root, creating it when missing.
    pub fn open_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let storage = Storage::open_directory(dir.as_ref())?;
        info!("Opened directory pack '{}'.", dir.as_ref().display());
        Ok(Self {
            storage,
            pack_format: DEFAULT_PACK_FORMAT,
        })
    }

    /// Use the root of a zip archive as the pack root. The archive is
    /// created on the first flush if it does not exist.
    pub fn open_archive(file: impl AsRef<Path>) -> Result<Self> {
        let storage = Storage::open_archive(file.as_ref())?;
        info!("Opened archive pack '{}'.", file.as_ref().display());
        Ok(Self {
            storage,
            pack_format: DEFAULT_PACK_FORMAT,
        })
    }

    /// Archive for `*.zip`, directory otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        {
            Self::open_archive(path)
        } else {
            Self::open_directory(path)
        }
    }

    /// Pack format written by [`create`](Self::create).
    pub fn with_pack_format(mut self, pack_format: i32) -> Self {
        self.pack_format = pack_format;
        self
    }

    pub fn location(&self) -> &Path {
        self.storage.location()
    }

    pub fn exists(&self, path: &str) -> bool {
        normalize_path(path).is_ok_and(|p| self.storage.exists(&p))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.storage.read(&normalize_path(path)?)
    }

    pub fn write(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let path = normalize_path(path)?;
        self.storage.write(&path, bytes)
    }

    /// Every file in the pack, sorted.
    pub fn files(&self) -> Result<Vec<String>> {
        self.storage.files()
    }

    /// Files whose path starts with `prefix/`, sorted.
    pub fn files_under(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", normalize_path(prefix)?);
        Ok(self
            .files()?
            .into_iter()
            .filter(|f| f.starts_with(&prefix))
            .collect())
    }

    pub fn read_json(&self, path: &str) -> Result<JsonDocument> {
        let path = normalize_path(path)?;
        let bytes = self.storage.read(&path)?;
        JsonDocument::parse(&path, &bytes)
    }

    pub fn write_json(&mut self, doc: &JsonDocument) -> Result<()> {
        let bytes = doc.to_bytes()?;
        self.write(doc.path(), &bytes)
    }

    /// Write `pack.mcmeta`. Fails if the pack already has one.
    pub fn create(&mut self, description: &str) -> Result<()> {
        if self.storage.exists(MANIFEST_PATH) {
            return Err(Error::IllegalState(format!(
                "tried to create a pack in '{}' but it already has a {MANIFEST_PATH}",
                self.location().display()
            )));
        }
        let manifest = ManifestFile {
            pack: PackMeta {
                pack_format: self.pack_format,
                description: description.to_string(),
            },
        };
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        self.storage.write(MANIFEST_PATH, &bytes)?;
        info!(
            "Created pack '{}' (format {}).",
            self.location().display(),
            self.pack_format
        );
        Ok(())
    }

    pub fn manifest(&self) -> Result<PackMeta> {
        let bytes = self.storage.read(MANIFEST_PATH)?;
        let manifest: ManifestFile = serde_json::from_slice(&bytes)
            .map_err(|e| Error::malformed(MANIFEST_PATH, e.to_string()))?;
        Ok(manifest.pack)
    }

    /// Copy every file of `other` into this pack using the default
    /// collision handling.
    pub fn include(&mut self, other: &Pack) -> Result<IncludeReport> {
        self.include_with(other, &DefaultCollisionHandler, None)
    }

    pub fn include_filtered(
        &mut self,
        other: &Pack,
        filter: &dyn Fn(&str) -> bool,
    ) -> Result<IncludeReport> {
        self.include_with(other, &DefaultCollisionHandler, Some(filter))
    }

    /// Copy every file of `other` accepted by `filter` into this pack.
    ///
    /// Occupied destinations go to `handler`. A handler error stops the
    /// walk; files copied before that point stay copied.
    pub fn include_with(
        &mut self,
        other: &Pack,
        handler: &dyn CollisionHandler,
        filter: Option<&dyn Fn(&str) -> bool>,
    ) -> Result<IncludeReport> {
        let mut report = IncludeReport::default();
        for path in other.files()? {
            if let Some(filter) = filter
                && !filter(&path)
            {
                report.filtered += 1;
                continue;
            }
            if self.storage.exists(&path) {
                handler.handle_collision(self, other, &path, &path)?;
                report.collisions_resolved += 1;
                debug!("Resolved collision at '{path}'.");
                continue;
            }
            let bytes = other.storage.read(&path)?;
            self.storage.write(&path, &bytes)?;
            report.copied += 1;
        }
        info!(
            "Included '{}' into '{}': {} copied, {} collisions resolved, {} filtered.",
            other.location().display(),
            self.location().display(),
            report.copied,
            report.collisions_resolved,
            report.filtered
        );
        Ok(report)
    }

    /// Write any buffered archive contents to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.storage.flush()
    }

    pub fn close(mut self) -> Result<()> {
        self.storage.flush()?;
        info!("Closed pack '{}'.", self.location().display());
        Ok(())
    }
}
