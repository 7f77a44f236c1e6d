pub mod compiler;
pub mod definition;
pub mod origin;

use crate::bake::BakedIndex;
use crate::error::{Error, Result};
use crate::key::ResourceKey;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageGlyph {
    pub texture: ResourceKey,
    pub height: Option<i32>,
    pub ascent: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpaceGlyph {
    pub advance: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlyphIdentifier {
    Image(ImageGlyph),
    Space(SpaceGlyph),
}

impl GlyphIdentifier {
    pub fn image(texture: ResourceKey, height: Option<i32>, ascent: i32) -> Self {
        Self::Image(ImageGlyph {
            texture,
            height,
            ascent,
        })
    }

    pub const fn space(advance: i32) -> Self {
        Self::Space(SpaceGlyph { advance })
    }
}

/// Where a baked glyph lives: the font and the character inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderableGlyph {
    pub font: ResourceKey,
    pub character: char,
}

/// Consecutive characters sharing one font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub font: ResourceKey,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphSequence {
    glyphs: Arc<[GlyphIdentifier]>,
}

impl GlyphSequence {
    pub fn new(glyphs: impl Into<Arc<[GlyphIdentifier]>>) -> Self {
        Self {
            glyphs: glyphs.into(),
        }
    }

    pub fn glyphs(&self) -> &[GlyphIdentifier] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GlyphIdentifier> {
        self.glyphs.iter()
    }

    /// Every glyph as baked; a glyph missing from `index` is an error.
    pub fn render(&self, index: &BakedIndex) -> Result<Vec<RenderableGlyph>> {
        self.glyphs
            .iter()
            .map(|id| {
                index
                    .glyph(id)
                    .cloned()
                    .ok_or_else(|| Error::not_found(format!("the baked glyph {id:?}")))
            })
            .collect()
    }

    pub fn text_runs(&self, index: &BakedIndex) -> Result<Vec<TextRun>> {
        let mut runs: Vec<TextRun> = Vec::new();
        for glyph in self.render(index)? {
            match runs.last_mut() {
                Some(run) if run.font == glyph.font => run.text.push(glyph.character),
                _ => runs.push(TextRun {
                    font: glyph.font,
                    text: glyph.character.to_string(),
                }),
            }
        }
        Ok(runs)
    }
}

impl<'s> IntoIterator for &'s GlyphSequence {
    type Item = &'s GlyphIdentifier;
    type IntoIter = std::slice::Iter<'s, GlyphIdentifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
