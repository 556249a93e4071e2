//! The seams between stages
//!
//! A font source, a shaping backend, a painter and an encoder. The engine only
//! talks to these traits, so tests can swap in synthetic fonts and the
//! backends can be replaced without touching the orchestration code.

use std::sync::Arc;

use crate::error::RasterizationError;
use crate::request::{BitmapData, CanvasSpec, OutputFormat};
use crate::types::LayoutLine;
use crate::{Result, ShapingParams, ShapingResult};

/// Unique identifier for a glyph within a font
pub type GlyphId = u32;

/// Access to the bytes and basic tables of one font face
///
/// ```
/// use mixtype_core::traits::{FontRef, GlyphId};
///
/// struct Monospace;
///
/// impl FontRef for Monospace {
///     fn data(&self) -> &[u8] {
///         &[]
///     }
///
///     fn units_per_em(&self) -> u16 {
///         1000
///     }
///
///     fn glyph_id(&self, ch: char) -> Option<GlyphId> {
///         ch.is_ascii().then(|| ch as GlyphId)
///     }
///
///     fn advance_width(&self, _glyph_id: GlyphId) -> f32 {
///         600.0
///     }
/// }
///
/// assert_eq!(Monospace.glyph_id('A'), Some(65));
/// ```
pub trait FontRef: Send + Sync {
    /// Raw bytes of the whole font file
    ///
    /// Faces of a collection share the same bytes and differ by
    /// [`face_index`](FontRef::face_index). Synthetic faces return an empty slice.
    fn data(&self) -> &[u8];

    /// Index of this face inside a TTC/OTC collection
    fn face_index(&self) -> u32 {
        0
    }

    /// Design units per em, used to scale every metric to pixels
    fn units_per_em(&self) -> u16;

    /// Map a character to its nominal glyph, `None` when the cmap lacks it
    fn glyph_id(&self, ch: char) -> Option<GlyphId>;

    /// Horizontal advance in font units
    fn advance_width(&self, glyph_id: GlyphId) -> f32;

    fn glyph_count(&self) -> Option<u32> {
        None
    }
}

/// Turns a run of same-script, same-direction text into positioned glyphs
pub trait Shaper: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Shape `text` with one font
    ///
    /// Glyphs come back in visual order with clusters as byte offsets into `text`.
    fn shape(
        &self,
        text: &str,
        font: Arc<dyn FontRef>,
        params: &ShapingParams,
    ) -> Result<ShapingResult>;

    /// Drop any per-font state the backend keeps
    fn clear_cache(&self) {}
}

/// Paints laid out lines onto a pixel canvas
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Paint `lines` into straight (non-premultiplied) RGBA8 pixels
    ///
    /// Implementations check canvas ceilings before allocating anything.
    fn render(
        &self,
        lines: &[LayoutLine],
        canvas: &CanvasSpec,
    ) -> std::result::Result<BitmapData, RasterizationError>;
}

/// Encodes a painted canvas into output bytes
pub trait Exporter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Which output format this exporter produces
    fn format(&self) -> OutputFormat;

    fn export(&self, bitmap: &BitmapData) -> std::result::Result<Vec<u8>, RasterizationError>;

    fn extension(&self) -> &'static str;

    fn mime_type(&self) -> &'static str;
}
