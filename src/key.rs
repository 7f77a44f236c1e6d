use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NAMESPACE: &str = "minecraft";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    namespace: String,
    path: String,
}

#[inline(always)]
fn valid_namespace_byte(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-')
}

#[inline(always)]
fn valid_path_byte(b: u8) -> bool {
    valid_namespace_byte(b) || b == b'/'
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let path = path.into();
        if namespace.is_empty() || !namespace.bytes().all(valid_namespace_byte) {
            return Err(Error::InvalidKey(format!("{namespace}:{path}")));
        }
        if path.is_empty() || !path.bytes().all(valid_path_byte) {
            return Err(Error::InvalidKey(format!("{namespace}:{path}")));
        }
        Ok(Self { namespace, path })
    }

    /// Shorthand for keys in the `minecraft` namespace.
    pub fn minecraft(path: impl Into<String>) -> Result<Self> {
        Self::new(DEFAULT_NAMESPACE, path)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Same namespace, path with `.{ext}` appended unless already present.
    pub fn with_extension(&self, ext: &str) -> Self {
        let dot_ext = format!(".{ext}");
        if self.path.ends_with(&dot_ext) {
            return self.clone();
        }
        Self {
            namespace: self.namespace.clone(),
            path: format!("{}{dot_ext}", self.path),
        }
    }

    /// Path with a single trailing `.{ext}` removed, if present.
    pub fn path_without_extension(&self, ext: &str) -> &str {
        self.path
            .strip_suffix(ext)
            .and_then(|p| p.strip_suffix('.'))
            .unwrap_or(&self.path)
    }

    fn asset_path(&self, folder: &str, ext: &str) -> String {
        let dot_ext = format!(".{ext}");
        let mut out = format!("assets/{}/{folder}/{}", self.namespace, self.path);
        if !self.path.ends_with(&dot_ext) {
            out.push_str(&dot_ext);
        }
        out
    }

    /// `assets/<ns>/models/<path>.json`. Folders like `item/` belong in the key path.
    pub fn model_path(&self) -> String {
        self.asset_path("models", "json")
    }

    /// `assets/<ns>/textures/<path>.png`.
    pub fn texture_path(&self) -> String {
        self.asset_path("textures", "png")
    }

    /// `assets/<ns>/font/<path>.json`.
    pub fn font_path(&self) -> String {
        self.asset_path("font", "json")
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((ns, path)) => Self::new(ns, path),
            None => Self::minecraft(s),
        }
    }
}

impl Serialize for ResourceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
