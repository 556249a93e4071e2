//! Mixtype Core: the shared vocabulary of the text rendering stages
//!
//! Mixed-script text (Latin next to Khmer next to emoji) travels through four
//! stages before it becomes pixels:
//!
//! 1. **Font Registry** - which face can draw which code point
//! 2. **Shaping** - code points become positioned glyphs, grouped in [`GlyphRun`]s
//! 3. **Layout** - runs are broken into [`LayoutLine`]s and reordered for bidi
//! 4. **Rasterization** - lines are painted and encoded into a [`RenderResult`]
//!
//! This crate owns the types those stages hand to each other, the traits at
//! the seams ([`FontRef`], [`Shaper`], [`Renderer`], [`Exporter`]), the error
//! types and the [`EngineConfig`]. It has no opinion on how any stage works.

pub mod config;
pub mod error;
pub mod face;
pub mod request;
pub mod script;
pub mod traits;
pub mod types;

pub use config::EngineConfig;
pub use error::{FontLoadError, MixtypeError, NotFound, RasterizationError, Result};
pub use face::{
    Coverage, FaceId, FaceSource, FontFace, FontMetrics, FontStyle, SyntheticFont, WEIGHT_NORMAL,
};
pub use request::{
    Alignment, BitmapData, CanvasSpec, Color, FontSpec, LineMetrics, OutputFormat,
    RenderMetrics, RenderRequest, RenderResult, WrapMode,
};
pub use script::{Direction, Script};
pub use traits::{Exporter, FontRef, GlyphId, Renderer, Shaper};
pub use types::{ClusterSpan, Glyph, GlyphKind, GlyphRun, LayoutLine, PositionedRun};

/// How a shaping backend should treat one piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingParams {
    /// Font size in pixels
    pub size: f32,
    pub direction: Direction,
    pub script: Option<Script>,
    /// BCP 47 language tag
    pub language: Option<String>,
    pub features: Vec<(String, u32)>,
}

impl Default for ShapingParams {
    fn default() -> Self {
        Self {
            size: 16.0,
            direction: Direction::LeftToRight,
            script: None,
            language: None,
            features: Vec::new(),
        }
    }
}

/// One glyph as a shaping backend reports it, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    pub id: GlyphId,
    /// Byte offset into the text that was shaped
    pub cluster: u32,
    pub x_advance: f32,
    pub y_advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

/// What a shaping backend returns: glyphs in visual order
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingResult {
    pub glyphs: Vec<ShapedGlyph>,
    pub advance_width: f32,
    pub direction: Direction,
}

impl ShapingResult {
    pub fn empty(direction: Direction) -> Self {
        Self {
            glyphs: Vec::new(),
            advance_width: 0.0,
            direction,
        }
    }
}
