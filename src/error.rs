//! Error type shared by the mesh builder, the height-field algebra and the
//! configuration layer.

use thiserror::Error;

/// Unified error type for terrain operations.
///
/// Only structural violations end up here. Numerical edge cases (flat fields,
/// degenerate triangles) produce defined values instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TerrainError {
    /// Two height fields built over different meshes were combined.
    #[error("height fields belong to different meshes")]
    MeshMismatch,
    /// An operation that needs at least one element got none.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    /// A hand-assembled mesh violates the mesh invariants.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    /// A generator or pipeline parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TerrainError>;
