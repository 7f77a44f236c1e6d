use crate::bake::{BakedIndex, bake};
use crate::error::Result;
use crate::font::compiler::{DEFAULT_GENERATED_NAMESPACE, GlyphCompiler};
use crate::key::ResourceKey;
use crate::overrides::OverrideInjector;
use crate::pack::Pack;
use crate::store::IdentifierStore;
use log::{debug, info};
use std::iter;

/// Everything one setup pass works on: the pack being built, packs kept
/// in lockstep with it, the vanilla fallback and the identifier store.
///
/// Consumed by [`finish`](Self::finish), which bakes the main pack.
pub struct ResourceContext {
    main: Pack,
    companions: Vec<Pack>,
    vanilla: Option<Pack>,
    store: Option<IdentifierStore>,
    generated_namespace: String,
}

impl ResourceContext {
    pub fn new(main: Pack) -> Self {
        Self {
            main,
            companions: Vec::new(),
            vanilla: None,
            store: None,
            generated_namespace: DEFAULT_GENERATED_NAMESPACE.to_string(),
        }
    }

    /// A pack that receives the same glyphs and textures as the main one.
    pub fn with_companion(mut self, pack: Pack) -> Self {
        self.companions.push(pack);
        self
    }

    pub fn with_vanilla(mut self, pack: Pack) -> Self {
        self.vanilla = Some(pack);
        self
    }

    pub fn with_store(mut self, store: IdentifierStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_generated_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.generated_namespace = namespace.into();
        self
    }

    pub fn main_pack(&self) -> &Pack {
        &self.main
    }

    pub fn main_pack_mut(&mut self) -> &mut Pack {
        &mut self.main
    }

    pub fn companions(&self) -> &[Pack] {
        &self.companions
    }

    pub fn vanilla(&self) -> Option<&Pack> {
        self.vanilla.as_ref()
    }

    pub fn store(&self) -> Option<&IdentifierStore> {
        self.store.as_ref()
    }

    /// Injector writing into the main pack.
    pub fn injector(&mut self) -> OverrideInjector<'_> {
        OverrideInjector::new(&mut self.main, self.vanilla.as_ref(), self.store.as_mut())
    }

    /// Compiler for `font`, writing to the main pack and every companion.
    pub fn compiler(&mut self, font: &ResourceKey) -> Result<GlyphCompiler<'_>> {
        let targets = iter::once(&mut self.main)
            .chain(self.companions.iter_mut())
            .collect();
        GlyphCompiler::new(
            targets,
            self.vanilla.as_ref(),
            font,
            &self.generated_namespace,
        )
    }

    pub fn save_store(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(),
            None => {
                debug!("No identifier store to save.");
                Ok(())
            }
        }
    }

    /// Save the store, bake the main pack and close every pack.
    pub fn finish(self) -> Result<BakedIndex> {
        self.save_store()?;
        let index = bake(&self.main)?;
        self.main.close()?;
        for pack in self.companions {
            pack.close()?;
        }
        if let Some(vanilla) = self.vanilla {
            vanilla.close()?;
        }
        info!(
            "Setup finished with {} overrides and {} glyphs.",
            index.override_count(),
            index.glyph_count()
        );
        Ok(index)
    }
}
