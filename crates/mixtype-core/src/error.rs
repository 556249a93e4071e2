//! Error types for Mixtype
//!
//! Shaping and layout never fail: missing coverage degrades to notdef glyphs and
//! narrow widths degrade to overflowing lines. The errors here belong to the
//! three places that can refuse work: font loading, font resolution and
//! rasterization.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MixtypeError>;

/// Main error type for Mixtype
#[derive(Debug, Error)]
pub enum MixtypeError {
    #[error("Font loading failed: {0}")]
    FontLoad(#[from] FontLoadError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("Rasterization failed: {0}")]
    Rasterization(#[from] RasterizationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems met while loading a font file at startup
///
/// The registry logs these and keeps going; they only surface through
/// `FontRegistry::load_errors` or when a single file is loaded on request.
#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("Font file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Font file {} is {size} bytes, limit is {limit}", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Invalid font data in {source_name}: {reason}")]
    InvalidData { source_name: String, reason: String },

    #[error("No usable faces in {0}")]
    NoFaces(String),
}

/// No registered face matches a family query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No font found for family '{family}'")]
pub struct NotFound {
    pub family: String,
}

impl NotFound {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
        }
    }
}

/// Why a set of lines could not be turned into an image
#[derive(Debug, Error)]
pub enum RasterizationError {
    #[error("Canvas {width}x{height} exceeds the configured ceiling ({reason})")]
    CanvasTooLarge {
        width: u64,
        height: u64,
        reason: String,
    },

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Format not supported: {0}")]
    FormatNotSupported(String),
}
