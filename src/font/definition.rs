use crate::error::{Error, Result};
use crate::key::ResourceKey;
use crate::pack::Pack;
use crate::pack::document::JsonDocument;
use serde_json::{Map, Value, json};
use std::collections::HashSet;

/// First character handed out to generated glyphs.
pub const FIRST_CHAR: u32 = 0xE001;

pub const PROVIDERS: &str = "providers";
const TYPE: &str = "type";
const BITMAP: &str = "bitmap";
const SPACE: &str = "space";
const FILE: &str = "file";
const ASCENT: &str = "ascent";
const HEIGHT: &str = "height";
const CHARS: &str = "chars";
const ADVANCES: &str = "advances";

#[inline(always)]
fn provider_type(provider: &Value) -> Option<&str> {
    provider.get(TYPE)?.as_str()
}

#[inline(always)]
fn as_i32(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|v| i32::try_from(v).ok())
}

/// The character a string holds, if it holds exactly one.
fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// A `bitmap` provider mapping one character to one texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapProvider {
    pub file: ResourceKey,
    pub height: Option<i32>,
    pub ascent: i32,
    pub character: char,
}

impl BitmapProvider {
    pub fn new(file: ResourceKey, height: Option<i32>, ascent: i32, rows: &[String]) -> Result<Self> {
        if let Some(h) = height
            && h >= 0
            && ascent > h
        {
            return Err(Error::Constraint(format!(
                "bitmap glyph {file} has ascent {ascent} above its height {h}"
            )));
        }
        Self::single(file, height, ascent, rows)
    }

    fn single(file: ResourceKey, height: Option<i32>, ascent: i32, rows: &[String]) -> Result<Self> {
        let [row] = rows else {
            return Err(Error::Constraint(format!(
                "bitmap glyph {file} needs exactly one row of characters, got {}",
                rows.len()
            )));
        };
        let Some(character) = single_char(row) else {
            return Err(Error::Constraint(format!(
                "bitmap glyph {file} needs exactly one character, got {row:?}"
            )));
        };
        Ok(Self {
            file,
            height,
            ascent,
            character,
        })
    }

    /// `None` for non-bitmap providers and for ones that do not map exactly
    /// one character. Placement is taken as written, so authored glyphs with
    /// an ascent above their height still load.
    pub fn from_json(value: &Value) -> Option<Self> {
        if provider_type(value) != Some(BITMAP) {
            return None;
        }
        let file: ResourceKey = value.get(FILE)?.as_str()?.parse().ok()?;
        let ascent = as_i32(value.get(ASCENT)?)?;
        let height = value.get(HEIGHT).and_then(as_i32);
        let rows: Vec<String> = value
            .get(CHARS)?
            .as_array()?
            .iter()
            .map(|row| row.as_str().map(str::to_owned))
            .collect::<Option<_>>()?;
        Self::single(file, height, ascent, &rows).ok()
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert(TYPE.into(), json!(BITMAP));
        out.insert(FILE.into(), json!(self.file.to_string()));
        out.insert(ASCENT.into(), json!(self.ascent));
        if let Some(h) = self.height {
            out.insert(HEIGHT.into(), json!(h));
        }
        out.insert(CHARS.into(), json!([self.character.to_string()]));
        Value::Object(out)
    }

    /// Same texture and placement; the character is not compared.
    pub fn draws_same_as(&self, file: &ResourceKey, height: Option<i32>, ascent: i32) -> bool {
        self.file == *file && self.height == height && self.ascent == ascent
    }
}

/// `(character, advance)` pairs of a `space` provider.
pub fn space_advances(provider: &Value) -> impl Iterator<Item = (char, i32)> + '_ {
    provider
        .get(ADVANCES)
        .and_then(Value::as_object)
        .filter(|_| provider_type(provider) == Some(SPACE))
        .into_iter()
        .flatten()
        .filter_map(|(c, v)| Some((single_char(c)?, as_i32(v)?)))
}

#[derive(Debug, Clone)]
pub struct FontDefinition {
    key: ResourceKey,
    doc: JsonDocument,
}

impl FontDefinition {
    /// Open the font in `pack`, or create and save an empty one.
    pub fn load_or_create(pack: &mut Pack, key: ResourceKey) -> Result<Self> {
        let path = key.font_path();
        if pack.exists(&path) {
            let mut doc = pack.read_json(&path)?;
            doc.array_mut(PROVIDERS)?;
            return Ok(Self { key, doc });
        }
        let mut doc = JsonDocument::empty(path);
        doc.array_mut(PROVIDERS)?;
        pack.write_json(&doc)?;
        Ok(Self { key, doc })
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn document(&self) -> &JsonDocument {
        &self.doc
    }

    pub fn providers(&self) -> &[Value] {
        match self.doc.array(PROVIDERS) {
            Ok(Some(items)) => items.as_slice(),
            _ => &[],
        }
    }

    fn providers_mut(&mut self) -> Result<&mut Vec<Value>> {
        self.doc.array_mut(PROVIDERS)
    }

    fn used_chars(&self) -> HashSet<char> {
        let mut used = HashSet::new();
        for provider in self.providers() {
            match provider_type(provider) {
                Some(BITMAP) => {
                    let rows = provider.get(CHARS).and_then(Value::as_array);
                    for row in rows.into_iter().flatten().filter_map(Value::as_str) {
                        used.extend(row.chars());
                    }
                }
                Some(SPACE) => used.extend(space_advances(provider).map(|(c, _)| c)),
                _ => {}
            }
        }
        used
    }

    /// Lowest character from [`FIRST_CHAR`] not mapped by any provider.
    pub fn next_char(&self) -> Result<char> {
        let used = self.used_chars();
        (FIRST_CHAR..=char::MAX as u32)
            .filter_map(char::from_u32)
            .find(|c| !used.contains(c))
            .ok_or_else(|| Error::Constraint(format!("font {} has no free characters", self.key)))
    }

    pub fn find_image_glyph(&self, file: &ResourceKey, height: Option<i32>, ascent: i32) -> Option<char> {
        self.providers()
            .iter()
            .filter_map(BitmapProvider::from_json)
            .find(|p| p.draws_same_as(file, height, ascent))
            .map(|p| p.character)
    }

    /// Character drawing `file` at this placement, allocating a provider if none does yet.
    pub fn add_image_glyph(&mut self, file: &ResourceKey, height: Option<i32>, ascent: i32) -> Result<char> {
        if let Some(c) = self.find_image_glyph(file, height, ascent) {
            return Ok(c);
        }
        let c = self.next_char()?;
        let provider = BitmapProvider::new(file.clone(), height, ascent, &[c.to_string()])?;
        self.providers_mut()?.push(provider.to_json());
        Ok(c)
    }

    pub fn find_space_glyph(&self, advance: i32) -> Option<char> {
        self.providers()
            .iter()
            .flat_map(space_advances)
            .find(|&(_, a)| a == advance)
            .map(|(c, _)| c)
    }

    /// The `advances` map of the font's first space provider, appended if absent.
    fn shared_advances(&mut self) -> Result<&mut Map<String, Value>> {
        let path = self.doc.path().to_string();
        let providers = self.providers_mut()?;
        let index = match providers.iter().position(|p| provider_type(p) == Some(SPACE)) {
            Some(i) => i,
            None => {
                providers.push(json!({ TYPE: SPACE, ADVANCES: {} }));
                providers.len() - 1
            }
        };
        let Value::Object(provider) = &mut providers[index] else {
            return Err(Error::malformed(path, "space provider is not an object"));
        };
        match provider
            .entry(ADVANCES)
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(advances) => Ok(advances),
            _ => Err(Error::malformed(path, "space advances are not an object")),
        }
    }

    /// Character advancing the cursor by `advance` pixels, allocated on first use.
    pub fn add_space_glyph(&mut self, advance: i32) -> Result<char> {
        if let Some(c) = self.find_space_glyph(advance) {
            return Ok(c);
        }
        let c = self.next_char()?;
        self.shared_advances()?.insert(c.to_string(), json!(advance));
        Ok(c)
    }

    pub fn save(&self, pack: &mut Pack) -> Result<()> {
        pack.write_json(&self.doc)
    }
}
