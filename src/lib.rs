//! Building Minecraft resource packs from code.
//!
//! A setup pass opens a [`Pack`], redirects item models to custom models
//! through stable custom-model-data values ([`OverrideInjector`],
//! [`IdentifierStore`]) and compiles drawings into font glyphs
//! ([`GlyphCompiler`]). [`bake`] then freezes the pack into a
//! [`BakedIndex`] that answers lookups without further I/O.

pub mod bake;
pub mod context;
pub mod error;
pub mod font;
pub mod key;
pub mod overrides;
pub mod pack;
pub mod store;
pub mod texture;

pub use bake::{BakedIndex, BakedOverride, bake};
pub use context::ResourceContext;
pub use error::{Error, Result};
pub use font::compiler::GlyphCompiler;
pub use font::{GlyphIdentifier, GlyphSequence, RenderableGlyph, TextRun};
pub use key::ResourceKey;
pub use overrides::{OverrideInjector, OverrideOutcome};
pub use pack::Pack;
pub use store::IdentifierStore;
