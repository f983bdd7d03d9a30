//! Error type shared by every mesh operator and selection generator.

use super::buffers::ImportError;

/// Errors reported by deformation operators, selection generators and the
/// component facade.
///
/// None of these abort the host: the failing call is skipped and the mesh is
/// left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeformError {
    /// An operation was invoked before mesh data was successfully imported.
    #[error("{operation}: no mesh geometry loaded")]
    NotLoaded { operation: &'static str },

    /// A selection set or target mesh disagrees with this mesh's vertex count.
    #[error("vertex count mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A parameter is outside its valid domain.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// The source buffers could not be turned into a mesh.
    #[error("import failed: {0}")]
    ImportFailure(#[from] ImportError),
}

impl DeformError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRange(message.into())
    }
}

/// Result alias used across the crate.
pub type DeformResult<T> = Result<T, DeformError>;
