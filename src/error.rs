//! Error types.
//!
//! Every fallible operation in the crate returns [`Result<T>`], an alias for
//! `std::result::Result<T, RenderError>`. Nothing in here is retried: each
//! variant describes a condition the caller has to fix (a bad material
//! declaration, a geometry that doesn't match its material, a missing file).

use std::path::PathBuf;

use thiserror::Error;

use crate::data_structures::geometry::VertexAttribute;

#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Configuration
    // ========================================================================
    /// A material declared a uniform buffer smaller than the 64-byte MVP region.
    #[error("material `{kind}` declares a uniform buffer of {size} bytes, at least {minimum} are required")]
    InvalidUniformSize {
        kind: String,
        size: usize,
        minimum: usize,
    },

    /// A uniform buffer size that WGSL uniform layout cannot use.
    #[error("material `{kind}` declares a uniform buffer of {size} bytes, not a multiple of {alignment}")]
    MisalignedUniformSize {
        kind: String,
        size: usize,
        alignment: usize,
    },

    // ========================================================================
    // Geometry / material mismatch
    // ========================================================================
    /// The material's vertex layout needs a stream the geometry lacks (or has too few floats of).
    #[error(
        "material `{kind}` requires the {attribute:?} vertex stream with {expected} floats, geometry provides {actual}"
    )]
    MissingVertexAttribute {
        kind: String,
        attribute: VertexAttribute,
        expected: usize,
        actual: usize,
    },

    // ========================================================================
    // Uniform protocol
    // ========================================================================
    /// A material asked to write below the renderer-owned MVP region.
    #[error("material `{kind}` declares uniform data offset {offset}, which overlaps the {reserved}-byte MVP region")]
    UniformOffsetViolation {
        kind: String,
        offset: usize,
        reserved: usize,
    },

    /// The material's data offset lies past the end of its own uniform buffer.
    #[error("material `{kind}` declares uniform data offset {offset} past its uniform size {size}")]
    UniformOffsetOutOfRange {
        kind: String,
        offset: usize,
        size: usize,
    },

    /// Buffer copies must start on a 4-byte boundary.
    #[error("material `{kind}` declares uniform data offset {offset}, not a multiple of {alignment}")]
    MisalignedUniformOffset {
        kind: String,
        offset: usize,
        alignment: usize,
    },

    // ========================================================================
    // Resource acquisition
    // ========================================================================
    #[error("failed to read texture `{}`: {source}", path.display())]
    TextureIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode texture `{}`: {source}", path.display())]
    TextureDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cube map error: {0}")]
    InvalidCubeMap(String),

    #[error("texture `{label}` expects {expected} bytes of texel data, got {actual}")]
    InvalidTexelData {
        label: String,
        expected: usize,
        actual: usize,
    },

    // ========================================================================
    // Scene
    // ========================================================================
    #[error("node {0} does not exist in this scene")]
    UnknownNode(String),

    #[error("node {0} is not a camera")]
    NotACamera(String),

    // ========================================================================
    // Device
    // ========================================================================
    #[error("surface error: {0}")]
    Surface(String),

    #[error("failed to create pipeline `{label}`: {message}")]
    PipelineCreation { label: String, message: String },
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
