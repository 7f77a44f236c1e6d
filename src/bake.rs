use crate::error::Result;
use crate::font::definition::{BitmapProvider, PROVIDERS, space_advances};
use crate::font::{GlyphIdentifier, RenderableGlyph};
use crate::key::ResourceKey;
use crate::overrides::{OVERRIDES, OverrideEntry};
use crate::pack::Pack;
use log::{info, warn};
use std::collections::HashMap;
use std::time::Instant;

/// Item models whose overrides are baked.
pub const ITEM_MODELS_DIR: &str = "assets/minecraft/models/item";

/// The item model and custom model data that select a target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedOverride {
    pub base: ResourceKey,
    pub value: i32,
}

/// Lookup tables frozen from a finished pack; no I/O after [`bake`].
#[derive(Debug, Clone, Default)]
pub struct BakedIndex {
    overrides: HashMap<ResourceKey, BakedOverride>,
    glyphs: HashMap<GlyphIdentifier, RenderableGlyph>,
}

impl BakedIndex {
    pub fn override_for(&self, target: &ResourceKey) -> Option<&BakedOverride> {
        self.overrides.get(target)
    }

    pub fn glyph(&self, id: &GlyphIdentifier) -> Option<&RenderableGlyph> {
        self.glyphs.get(id)
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

/// `assets/<ns>/font/<name>.json` -> `<ns>:<name>`.
fn font_key(path: &str) -> Option<ResourceKey> {
    let rest = path.strip_prefix("assets/")?;
    let (namespace, rest) = rest.split_once('/')?;
    let name = rest.strip_prefix("font/")?.strip_suffix(".json")?;
    ResourceKey::new(namespace, name).ok()
}

fn bake_overrides(pack: &Pack, out: &mut HashMap<ResourceKey, BakedOverride>) -> Result<()> {
    for path in pack.files_under(ITEM_MODELS_DIR)? {
        let Some(name) = path
            .strip_prefix(ITEM_MODELS_DIR)
            .and_then(|p| p.strip_prefix('/'))
            .and_then(|p| p.strip_suffix(".json"))
        else {
            continue;
        };
        let Ok(base) = ResourceKey::minecraft(format!("item/{name}")) else {
            warn!("Skipping item model with an unusable name: '{path}'.");
            continue;
        };
        let doc = pack.read_json(&path)?;
        for entry in doc.array(OVERRIDES)?.into_iter().flatten().map(OverrideEntry::new) {
            let (Some(value), Some(model)) = (entry.custom_model_data(), entry.model()) else {
                continue;
            };
            let Ok(target) = model.parse::<ResourceKey>() else {
                warn!("Skipping override in '{path}' with an invalid model '{model}'.");
                continue;
            };
            out.entry(target).or_insert_with(|| BakedOverride {
                base: base.clone(),
                value,
            });
        }
    }
    Ok(())
}

fn bake_fonts(pack: &Pack, out: &mut HashMap<GlyphIdentifier, RenderableGlyph>) -> Result<()> {
    for path in pack.files_under("assets")? {
        let Some(font) = font_key(&path) else {
            continue;
        };
        let doc = pack.read_json(&path)?;
        for provider in doc.array(PROVIDERS)?.into_iter().flatten() {
            if let Some(bitmap) = BitmapProvider::from_json(provider) {
                let id = GlyphIdentifier::image(bitmap.file, bitmap.height, bitmap.ascent);
                out.entry(id).or_insert_with(|| RenderableGlyph {
                    font: font.clone(),
                    character: bitmap.character,
                });
            }
            for (character, advance) in space_advances(provider) {
                out.entry(GlyphIdentifier::space(advance))
                    .or_insert_with(|| RenderableGlyph {
                        font: font.clone(),
                        character,
                    });
            }
        }
    }
    Ok(())
}

/// Build the lookup tables for `pack`.
///
/// Files are visited in sorted order; the first definition of a target
/// or glyph wins. Bitmap providers not mapping exactly one character are
/// skipped since no single character can address them.
pub fn bake(pack: &Pack) -> Result<BakedIndex> {
    let started = Instant::now();
    let mut index = BakedIndex::default();
    bake_overrides(pack, &mut index.overrides)?;
    bake_fonts(pack, &mut index.glyphs)?;
    info!(
        "Baked '{}': {} overrides, {} glyphs in {} ms.",
        pack.location().display(),
        index.override_count(),
        index.glyph_count(),
        started.elapsed().as_millis()
    );
    Ok(index)
}
