//! Font bytes behind the `FontRef` trait

use std::sync::Arc;

use read_fonts::types::GlyphId;
use read_fonts::{FontRef as ReadFontRef, TableProvider};

use mixtype_core::{FontLoadError, FontRef};

/// One face of a font file held in memory
///
/// All faces of a collection share the same `Arc<[u8]>`; a `Font` only adds
/// the face index and a couple of cached header values. Parsing happens on
/// demand, so a `Font` is cheap to keep around.
pub struct Font {
    data: Arc<[u8]>,
    face_index: u32,
    units_per_em: u16,
    glyph_count: Option<u32>,
}

impl Font {
    /// Wrap a face of `data`, checking that it parses
    pub fn new(data: Arc<[u8]>, face_index: u32, source_name: &str) -> Result<Self, FontLoadError> {
        let font = ReadFontRef::from_index(&data, face_index).map_err(|e| {
            FontLoadError::InvalidData {
                source_name: source_name.to_string(),
                reason: format!("face {face_index}: {e}"),
            }
        })?;
        let units_per_em = font
            .head()
            .map(|head| head.units_per_em())
            .unwrap_or(1000);
        let glyph_count = font.maxp().ok().map(|maxp| u32::from(maxp.num_glyphs()));

        Ok(Self {
            data,
            face_index,
            units_per_em,
            glyph_count,
        })
    }

    fn font_ref(&self) -> Option<ReadFontRef<'_>> {
        ReadFontRef::from_index(&self.data, self.face_index).ok()
    }
}

impl FontRef for Font {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn face_index(&self) -> u32 {
        self.face_index
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn glyph_id(&self, ch: char) -> Option<u32> {
        self.font_ref()
            .and_then(|font| font.cmap().ok()?.map_codepoint(ch))
            .map(|gid| gid.to_u32())
            .filter(|&gid| gid != 0)
    }

    fn advance_width(&self, glyph_id: u32) -> f32 {
        self.font_ref()
            .and_then(|font| font.hmtx().ok()?.advance(GlyphId::new(glyph_id)))
            .map(f32::from)
            .unwrap_or(f32::from(self.units_per_em) / 2.0)
    }

    fn glyph_count(&self) -> Option<u32> {
        self.glyph_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_invalid_data() {
        let data: Arc<[u8]> = Arc::from(vec![0u8; 100]);
        let result = Font::new(data, 0, "garbage.ttf");
        assert!(matches!(result, Err(FontLoadError::InvalidData { .. })));
    }
}
