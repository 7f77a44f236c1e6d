use super::{MANIFEST_PATH, Pack};
use crate::error::{Error, Result};

/// Decides what happens when [`Pack::include`] finds a path occupied in both packs.
///
/// Returning `Ok` means the collision was dealt with (possibly by merging
/// into `dest` itself); returning an error aborts the include.
pub trait CollisionHandler {
    fn handle_collision(
        &self,
        dest: &mut Pack,
        source: &Pack,
        dest_path: &str,
        source_path: &str,
    ) -> Result<()>;
}

impl<F> CollisionHandler for F
where
    F: Fn(&mut Pack, &Pack, &str, &str) -> Result<()>,
{
    fn handle_collision(
        &self,
        dest: &mut Pack,
        source: &Pack,
        dest_path: &str,
        source_path: &str,
    ) -> Result<()> {
        self(dest, source, dest_path, source_path)
    }
}

/// Keeps the destination's own `pack.mcmeta`; any other collision is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCollisionHandler;

impl CollisionHandler for DefaultCollisionHandler {
    fn handle_collision(
        &self,
        _dest: &mut Pack,
        _source: &Pack,
        dest_path: &str,
        _source_path: &str,
    ) -> Result<()> {
        if dest_path == MANIFEST_PATH {
            return Ok(());
        }
        Err(Error::Collision {
            path: dest_path.to_string(),
        })
    }
}
