//! Single glyph sources: outlines, embedded bitmaps and the hollow box

use skrifa::bitmap::{BitmapData, BitmapStrikes, Origin};
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlineGlyphCollection, OutlinePen};
use skrifa::{GlyphId, MetadataProvider};
use tiny_skia::{IntSize, Path, PathBuilder, Pixmap, Rect};

/// Parsed glyph tables of one face, reused for every glyph of a run
pub(crate) struct FaceGlyphs<'a> {
    outlines: Option<OutlineGlyphCollection<'a>>,
    strikes: Option<BitmapStrikes<'a>>,
}

/// A decoded bitmap glyph and where it lands relative to the pen
pub(crate) struct PlacedBitmap {
    pub pixmap: Pixmap,
    pub scale: f32,
    /// Left edge, relative to the pen position
    pub left: f32,
    /// Top edge above the baseline
    pub top: f32,
}

impl<'a> FaceGlyphs<'a> {
    /// Empty tables for faces without font bytes
    pub fn new(data: &'a [u8], index: u32) -> Self {
        if data.is_empty() {
            return Self {
                outlines: None,
                strikes: None,
            };
        }
        match skrifa::FontRef::from_index(data, index) {
            Ok(font) => {
                let strikes = BitmapStrikes::new(&font);
                Self {
                    outlines: Some(font.outline_glyphs()),
                    strikes: (!strikes.is_empty()).then_some(strikes),
                }
            }
            Err(e) => {
                log::warn!("Cannot parse face {index} for drawing: {e}");
                Self {
                    outlines: None,
                    strikes: None,
                }
            }
        }
    }

    /// The glyph outline in pixels, y up, origin at the pen position
    ///
    /// `None` for glyphs without an outline and for empty outlines (spaces).
    pub fn outline(&self, glyph_id: u32, size: f32) -> Option<Path> {
        let glyph = self.outlines.as_ref()?.get(GlyphId::new(glyph_id))?;
        let mut pen = PathPen::default();
        let settings = DrawSettings::unhinted(Size::new(size), LocationRef::default());
        if let Err(e) = glyph.draw(settings, &mut pen) {
            log::debug!("Outline of glyph {glyph_id} failed: {e}");
            return None;
        }
        pen.builder.finish()
    }

    /// The best embedded bitmap for `size`, scaled to it
    pub fn bitmap(&self, glyph_id: u32, size: f32) -> Option<PlacedBitmap> {
        let glyph = self
            .strikes
            .as_ref()?
            .glyph_for_size(Size::new(size), GlyphId::new(glyph_id))?;

        let pixmap = match &glyph.data {
            BitmapData::Png(bytes) => decode_png(bytes),
            BitmapData::Bgra(bytes) => decode_bgra(bytes, glyph.width, glyph.height),
            BitmapData::Mask(_) => None,
        }?;

        let scale = size / glyph.ppem_y.max(1.0);
        let left = (glyph.bearing_x - glyph.inner_bearing_x) * scale;
        let mut top = (glyph.bearing_y - glyph.inner_bearing_y) * scale;
        if matches!(glyph.placement_origin, Origin::BottomLeft) {
            top += pixmap.height() as f32 * scale;
        }
        Some(PlacedBitmap {
            pixmap,
            scale,
            left,
            top,
        })
    }
}

/// Collects skrifa drawing commands into a tiny-skia path
#[derive(Default)]
struct PathPen {
    builder: PathBuilder,
}

impl OutlinePen for PathPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.builder.quad_to(cx0, cy0, x, y);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.builder.cubic_to(cx0, cy0, cx1, cy1, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Outline of the box drawn for missing glyphs, in canvas coordinates
pub(crate) fn hollow_box(x: f32, baseline: f32, advance: f32, size: f32) -> Option<Path> {
    let width = if advance > 0.0 {
        advance * 0.8
    } else {
        size * 0.4
    };
    let height = size * 0.7;
    let inset = if advance > 0.0 { advance * 0.1 } else { 0.0 };
    let rect = Rect::from_xywh(x + inset, baseline - height, width.max(1.0), height.max(1.0))?;
    Some(PathBuilder::from_rect(rect))
}

/// Decode a PNG strike into premultiplied RGBA
fn decode_png(bytes: &[u8]) -> Option<Pixmap> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = match decoder.read_info() {
        Ok(reader) => reader,
        Err(e) => {
            log::debug!("Bitmap glyph is not a readable PNG: {e}");
            return None;
        }
    };
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer).ok()?;
    let pixels = buffer.get(..info.buffer_size())?;

    let rgba: Vec<u8> = match info.color_type {
        png::ColorType::Rgba => pixels
            .chunks_exact(4)
            .flat_map(|px| premultiply(px[0], px[1], px[2], px[3]))
            .collect(),
        png::ColorType::Rgb => pixels
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => pixels
            .chunks_exact(2)
            .flat_map(|px| premultiply(px[0], px[0], px[0], px[1]))
            .collect(),
        png::ColorType::Grayscale => pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        png::ColorType::Indexed => return None,
    };
    Pixmap::from_vec(rgba, IntSize::from_wh(info.width, info.height)?)
}

/// sbix and CBDT BGRA data is already premultiplied
fn decode_bgra(bytes: &[u8], width: u32, height: u32) -> Option<Pixmap> {
    let rgba: Vec<u8> = bytes
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], px[3]])
        .collect();
    Pixmap::from_vec(rgba, IntSize::from_wh(width, height)?)
}

fn premultiply(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    let mul = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
    [mul(r), mul(g), mul(b), a]
}
