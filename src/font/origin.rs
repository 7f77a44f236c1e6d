use crate::error::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DrawOrigin {
    /// The text baseline at the cursor start.
    #[default]
    Baseline,
    /// A point named by the layout host.
    Anchor(String),
    /// Another origin moved by a fixed amount.
    Offset {
        base: Box<DrawOrigin>,
        dx: i32,
        dy: i32,
    },
}

impl DrawOrigin {
    pub fn anchor(name: impl Into<String>) -> Self {
        Self::Anchor(name.into())
    }

    /// This origin moved by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::Offset {
            base: Box::new(self),
            dx,
            dy,
        }
    }

    /// Pixel position of this origin. `Offset` chains are walked here; only
    /// the leaf is handed to `resolver`.
    pub fn resolve(&self, resolver: &dyn OriginResolver) -> Result<(i32, i32)> {
        match self {
            Self::Offset { base, dx, dy } => {
                let (x, y) = base.resolve(resolver)?;
                Ok((x + dx, y + dy))
            }
            leaf => Ok((resolver.resolve_x(leaf)?, resolver.resolve_y(leaf)?)),
        }
    }
}

/// Supplied by the layout host. Called with `Baseline` or `Anchor` only.
pub trait OriginResolver {
    fn resolve_x(&self, origin: &DrawOrigin) -> Result<i32>;
    fn resolve_y(&self, origin: &DrawOrigin) -> Result<i32>;
}

/// `Baseline` is (0, 0); anchors come from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct BaselineResolver {
    anchors: HashMap<String, (i32, i32)>,
}

impl BaselineResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anchor(mut self, name: impl Into<String>, x: i32, y: i32) -> Self {
        self.anchors.insert(name.into(), (x, y));
        self
    }

    fn lookup(&self, origin: &DrawOrigin) -> Result<(i32, i32)> {
        match origin {
            DrawOrigin::Baseline => Ok((0, 0)),
            DrawOrigin::Anchor(name) => self
                .anchors
                .get(name)
                .copied()
                .ok_or_else(|| Error::not_found(format!("the draw anchor '{name}'"))),
            DrawOrigin::Offset { .. } => origin.resolve(self),
        }
    }
}

impl OriginResolver for BaselineResolver {
    fn resolve_x(&self, origin: &DrawOrigin) -> Result<i32> {
        Ok(self.lookup(origin)?.0)
    }

    fn resolve_y(&self, origin: &DrawOrigin) -> Result<i32> {
        Ok(self.lookup(origin)?.1)
    }
}
