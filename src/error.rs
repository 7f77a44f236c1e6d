use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while building or baking a pack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced asset is missing from every searched pack, fallback included.
    #[error("{what} was not found")]
    NotFound { what: String },

    /// A resource exists in some, but not all, of the packs kept in lockstep.
    #[error("the resource '{path}' was found in one pack, but not in another")]
    Inconsistent { path: String },

    /// `include` hit an occupied path the collision handler did not resolve.
    #[error("resource collision at '{path}'")]
    Collision { path: String },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("invalid resource key '{0}'")]
    InvalidKey(String),

    #[error("invalid pack path '{0}'")]
    InvalidPath(String),

    #[error("malformed document '{path}': {reason}")]
    MalformedDocument { path: String, reason: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means "the thing does not exist" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
