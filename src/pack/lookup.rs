use super::Pack;
use crate::error::{Error, Result};

/// Pick the pack that serves `path`.
///
/// Every primary pack has it: the last primary. Some but not all: the
/// packs drifted apart, which is an error. None: the fallback, if it has it.
pub fn locate<'p>(primary: &[&'p Pack], fallback: Option<&'p Pack>, path: &str) -> Result<&'p Pack> {
    let mut found: Option<&'p Pack> = None;
    let mut missing = false;
    for &pack in primary {
        if pack.exists(path) {
            found = Some(pack);
        } else {
            missing = true;
        }
    }
    match found {
        Some(_) if missing => Err(Error::Inconsistent {
            path: path.to_string(),
        }),
        Some(pack) => Ok(pack),
        None => match fallback {
            Some(pack) if pack.exists(path) => Ok(pack),
            _ => Err(Error::not_found(format!("the resource '{path}'"))),
        },
    }
}

/// Read `path` from whichever pack [`locate`] picks.
pub fn read_consistent(primary: &[&Pack], fallback: Option<&Pack>, path: &str) -> Result<Vec<u8>> {
    locate(primary, fallback, path)?.read(path)
}
