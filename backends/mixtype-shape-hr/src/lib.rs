//! OpenType shaping with harfrust
//!
//! Harfrust is a pure Rust port of HarfBuzz. It runs the full OpenType
//! pipeline (GSUB reordering for Khmer and Indic scripts, mark positioning,
//! kerning), so the glyphs it returns are already in visual order with
//! clusters pointing back at byte offsets of the input.
//!
//! Faces without font bytes (synthetic faces) cannot go through harfrust.
//! They get a plain cmap lookup with fixed advances instead.

use std::str::FromStr;
use std::sync::Arc;

use harfrust::{
    Direction as HrDirection, Feature, FontRef as HrFontRef, GlyphBuffer, Language,
    Script as HrScript, ShaperData, Tag, UnicodeBuffer,
};

use mixtype_core::{
    Direction, FontLoadError, FontRef, MixtypeError, Result, ShapedGlyph, Shaper, ShapingParams,
    ShapingResult,
};

/// Shapes text with harfrust
#[derive(Debug, Default, Clone, Copy)]
pub struct HarfrustShaper;

impl HarfrustShaper {
    pub fn new() -> Self {
        Self
    }

    fn to_hr_direction(direction: Direction) -> HrDirection {
        match direction {
            Direction::LeftToRight => HrDirection::LeftToRight,
            Direction::RightToLeft => HrDirection::RightToLeft,
        }
    }

    /// Parse a 4-character tag such as `liga` or `Khmr`
    fn parse_tag(tag: &str) -> Option<Tag> {
        let bytes: [u8; 4] = tag.as_bytes().try_into().ok()?;
        Some(Tag::new(&bytes))
    }

    /// Nominal glyphs with fixed advances for faces that carry no bytes
    fn cmap_shape(text: &str, font: &dyn FontRef, params: &ShapingParams) -> ShapingResult {
        let scale = params.size / f32::from(font.units_per_em().max(1));
        let mut glyphs: Vec<ShapedGlyph> = text
            .char_indices()
            .map(|(offset, ch)| {
                let id = font.glyph_id(ch).unwrap_or(0);
                ShapedGlyph {
                    id,
                    cluster: offset as u32,
                    x_advance: font.advance_width(id) * scale,
                    y_advance: 0.0,
                    x_offset: 0.0,
                    y_offset: 0.0,
                }
            })
            .collect();
        if params.direction.is_rtl() {
            glyphs.reverse();
        }
        let advance_width = glyphs.iter().map(|g| g.x_advance).sum();
        ShapingResult {
            glyphs,
            advance_width,
            direction: params.direction,
        }
    }

    fn extract_glyphs(buffer: &GlyphBuffer, scale: f32) -> (Vec<ShapedGlyph>, f32) {
        let mut advance_width = 0.0;
        let glyphs = buffer
            .glyph_infos()
            .iter()
            .zip(buffer.glyph_positions())
            .map(|(info, pos)| {
                let glyph = ShapedGlyph {
                    id: info.glyph_id,
                    cluster: info.cluster,
                    x_advance: pos.x_advance as f32 * scale,
                    y_advance: pos.y_advance as f32 * scale,
                    x_offset: pos.x_offset as f32 * scale,
                    y_offset: pos.y_offset as f32 * scale,
                };
                advance_width += glyph.x_advance;
                glyph
            })
            .collect();
        (glyphs, advance_width)
    }
}

impl Shaper for HarfrustShaper {
    fn name(&self) -> &'static str {
        "harfrust"
    }

    fn shape(
        &self,
        text: &str,
        font: Arc<dyn FontRef>,
        params: &ShapingParams,
    ) -> Result<ShapingResult> {
        if text.is_empty() {
            return Ok(ShapingResult::empty(params.direction));
        }

        let data = font.data();
        if data.is_empty() {
            return Ok(Self::cmap_shape(text, font.as_ref(), params));
        }

        let hr_font = HrFontRef::from_index(data, font.face_index()).map_err(|e| {
            MixtypeError::FontLoad(FontLoadError::InvalidData {
                source_name: format!("face {}", font.face_index()),
                reason: e.to_string(),
            })
        })?;

        let shaper_data = ShaperData::new(&hr_font);
        let shaper = shaper_data
            .shaper(&hr_font)
            .point_size(Some(params.size))
            .build();

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(Self::to_hr_direction(params.direction));

        if let Some(lang) = params.language.as_deref() {
            match Language::from_str(lang) {
                Ok(language) => buffer.set_language(language),
                Err(_) => log::debug!("Ignoring unparsable language tag '{lang}'"),
            }
        }

        if let Some(script) = params
            .script
            .and_then(|script| script.iso15924())
            .and_then(Self::parse_tag)
            .and_then(HrScript::from_iso15924_tag)
        {
            buffer.set_script(script);
        }

        let features: Vec<Feature> = params
            .features
            .iter()
            .filter_map(|(name, value)| {
                Self::parse_tag(name).map(|tag| Feature {
                    tag,
                    value: *value,
                    start: 0,
                    end: u32::MAX,
                })
            })
            .collect();

        let output = shaper.shape(buffer, &features);

        let scale = params.size / f32::from(font.units_per_em().max(1));
        let (glyphs, advance_width) = Self::extract_glyphs(&output, scale);
        log::trace!(
            "harfrust shaped {} bytes into {} glyphs",
            text.len(),
            glyphs.len()
        );

        Ok(ShapingResult {
            glyphs,
            advance_width,
            direction: params.direction,
        })
    }
}
