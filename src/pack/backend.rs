use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

#[derive(Debug)]
pub(crate) enum Storage {
    Directory(PathBuf),
    Archive(ArchiveStorage),
}

impl Storage {
    pub(crate) fn open_directory(dir: &Path) -> Result<Self> {
        if dir.exists() && !dir.is_dir() {
            return Err(Error::InvalidPath(format!(
                "'{}' exists but is not a directory",
                dir.display()
            )));
        }
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        Ok(Self::Directory(dir.to_path_buf()))
    }

    pub(crate) fn open_archive(file: &Path) -> Result<Self> {
        Ok(Self::Archive(ArchiveStorage::open(file)?))
    }

    pub(crate) fn location(&self) -> &Path {
        match self {
            Self::Directory(root) => root,
            Self::Archive(archive) => &archive.path,
        }
    }

    pub(crate) fn exists(&self, rel: &str) -> bool {
        match self {
            Self::Directory(root) => root.join(rel).is_file(),
            Self::Archive(archive) => archive.entries.contains_key(rel),
        }
    }

    pub(crate) fn read(&self, rel: &str) -> Result<Vec<u8>> {
        match self {
            Self::Directory(root) => {
                let path = root.join(rel);
                fs::read(&path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::not_found(format!("'{rel}' in '{}'", root.display()))
                    } else {
                        Error::io(path, e)
                    }
                })
            }
            Self::Archive(archive) => archive.entries.get(rel).cloned().ok_or_else(|| {
                Error::not_found(format!("'{rel}' in '{}'", archive.path.display()))
            }),
        }
    }

    pub(crate) fn write(&mut self, rel: &str, bytes: &[u8]) -> Result<()> {
        match self {
            Self::Directory(root) => {
                let path = root.join(rel);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                }
                fs::write(&path, bytes).map_err(|e| Error::io(path, e))
            }
            Self::Archive(archive) => {
                archive.entries.insert(rel.to_string(), bytes.to_vec());
                archive.dirty = true;
                Ok(())
            }
        }
    }

    /// Every file in the storage, relative and sorted.
    pub(crate) fn files(&self) -> Result<Vec<String>> {
        match self {
            Self::Directory(root) => list_directory_files(root),
            Self::Archive(archive) => Ok(archive.entries.keys().cloned().collect()),
        }
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        match self {
            Self::Directory(_) => Ok(()),
            Self::Archive(archive) => archive.flush(),
        }
    }
}

fn list_directory_files(root: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
                continue;
            }
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    out.sort();
    Ok(out)
}

// --- Archive ---

#[derive(Debug)]
pub(crate) struct ArchiveStorage {
    path: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
    dirty: bool,
}

impl ArchiveStorage {
    fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Creating new pack archive '{}'.", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                entries: BTreeMap::new(),
                dirty: true,
            });
        }

        let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let mut zip = zip::ZipArchive::new(file)?;
        let mut entries = BTreeMap::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_start_matches('/').to_string();
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| Error::io(path, e))?;
            entries.insert(name, bytes);
        }
        debug!(
            "Opened pack archive '{}' with {} entries.",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            dirty: false,
        })
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        // Write beside the target and swap in, so a failed write keeps the old archive.
        let tmp = self.path.with_extension("zip.tmp");
        let file = fs::File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in &self.entries {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes).map_err(|e| Error::io(&tmp, e))?;
        }
        writer.finish()?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::io(&self.path, e))?;

        self.dirty = false;
        debug!(
            "Wrote pack archive '{}' ({} entries).",
            self.path.display(),
            self.entries.len()
        );
        Ok(())
    }
}

impl Drop for ArchiveStorage {
    fn drop(&mut self) {
        if self.dirty
            && let Err(e) = self.flush()
        {
            warn!(
                "Failed to write pack archive '{}' on drop: {e}",
                self.path.display()
            );
        }
    }
}
