//! tiny-skia rasterizer for laid out lines
//!
//! Outlines come from skrifa and are filled with anti-aliasing. Color emoji
//! fonts without outlines are drawn from their embedded PNG or BGRA strikes.
//! Anything that cannot be drawn (notdef glyphs without an outline, faces
//! without font bytes) becomes a hollow box so missing text stays visible.
//!
//! The canvas size is checked against the configured ceilings before any
//! pixel memory is allocated.

use mixtype_core::config::{DEFAULT_MAX_CANVAS_DIMENSION, DEFAULT_MAX_CANVAS_PIXELS};
use mixtype_core::{
    Alignment, BitmapData, CanvasSpec, Color, GlyphKind, LayoutLine, RasterizationError, Renderer,
};
use tiny_skia::{FillRule, FilterQuality, Paint, Pixmap, PixmapPaint, Stroke, Transform};

mod glyph;

use glyph::{hollow_box, FaceGlyphs};

/// Paints lines onto an RGBA canvas
#[derive(Debug, Clone, Copy)]
pub struct SkiaRenderer {
    max_dimension: u32,
    max_pixels: u64,
}

/// Where the text block sits on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub width: u32,
    pub height: u32,
    /// Top of the first line
    pub origin_y: f32,
    pub content_width: f32,
    pub content_height: f32,
}

impl SkiaRenderer {
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_CANVAS_DIMENSION,
            max_pixels: DEFAULT_MAX_CANVAS_PIXELS,
        }
    }

    /// Refuse canvases with a side over `max_dimension` or more than
    /// `max_pixels` pixels in total
    pub fn with_limits(max_dimension: u32, max_pixels: u64) -> Self {
        Self {
            max_dimension,
            max_pixels,
        }
    }

    /// Canvas size and text placement, checked against the ceilings
    pub fn geometry(
        &self,
        lines: &[LayoutLine],
        canvas: &CanvasSpec,
    ) -> Result<CanvasGeometry, RasterizationError> {
        let content_width = lines.iter().map(|l| l.width).fold(0.0, f32::max);
        let content_height = lines.last().map_or(0.0, |l| l.top() + l.height);
        let padding = f64::from(canvas.padding);

        let width = canvas.width.map_or_else(
            || (f64::from(content_width) + 2.0 * padding).ceil().max(1.0),
            f64::from,
        );
        let height = canvas.height.map_or_else(
            || (f64::from(content_height) + 2.0 * padding).ceil().max(1.0),
            f64::from,
        );

        if !width.is_finite() || !height.is_finite() {
            return Err(RasterizationError::CanvasTooLarge {
                width: u64::MAX,
                height: u64::MAX,
                reason: "content size is not finite".into(),
            });
        }
        // Saturating casts: anything this large fails the checks below
        let (width, height) = (width as u64, height as u64);
        if width == 0 || height == 0 {
            return Err(RasterizationError::InvalidDimensions {
                width: width as u32,
                height: height as u32,
            });
        }
        let max_dimension = u64::from(self.max_dimension);
        if width > max_dimension || height > max_dimension {
            return Err(RasterizationError::CanvasTooLarge {
                width,
                height,
                reason: format!("a side is over {} px", self.max_dimension),
            });
        }
        if width * height > self.max_pixels {
            return Err(RasterizationError::CanvasTooLarge {
                width,
                height,
                reason: format!("more than {} pixels", self.max_pixels),
            });
        }

        let origin_y = match canvas.height {
            Some(_) => ((height as f32 - content_height) / 2.0).max(0.0),
            None => canvas.padding as f32,
        };

        Ok(CanvasGeometry {
            width: width as u32,
            height: height as u32,
            origin_y,
            content_width,
            content_height,
        })
    }

    /// Left edge of a line of `line_width` pixels
    fn line_x(geometry: &CanvasGeometry, canvas: &CanvasSpec, line_width: f32) -> f32 {
        let padding = canvas.padding as f32;
        let x = match canvas.width {
            Some(width) => {
                let width = width as f32;
                match canvas.alignment {
                    Alignment::Left => padding,
                    Alignment::Center => (width - line_width) / 2.0,
                    Alignment::Right => width - padding - line_width,
                    Alignment::Block => (width - geometry.content_width) / 2.0,
                }
            }
            None => {
                let slack = geometry.content_width - line_width;
                padding
                    + match canvas.alignment {
                        Alignment::Left | Alignment::Block => 0.0,
                        Alignment::Center => slack / 2.0,
                        Alignment::Right => slack,
                    }
            }
        };
        x.max(0.0)
    }

    fn paint_lines(
        &self,
        pixmap: &mut Pixmap,
        lines: &[LayoutLine],
        canvas: &CanvasSpec,
        geometry: &CanvasGeometry,
    ) {
        let mut paint = Paint::default();
        paint.set_color(skia_color(canvas.foreground));
        paint.anti_alias = true;

        for line in lines {
            let baseline = geometry.origin_y + line.baseline;
            let line_x = Self::line_x(geometry, canvas, line.width);

            for positioned in &line.runs {
                let run = &positioned.run;
                let font = run.face().font();
                let glyphs = FaceGlyphs::new(font.data(), font.face_index());
                let size = run.font_size();
                let mut pen_x = line_x + positioned.x;

                for glyph in run.glyphs() {
                    let x = pen_x + glyph.x_offset;
                    let y = baseline - glyph.y_offset;
                    pen_x += glyph.x_advance;

                    if glyph.kind == GlyphKind::Control {
                        continue;
                    }
                    let blank = run
                        .source()
                        .get(glyph.cluster..)
                        .and_then(|rest| rest.chars().next())
                        .is_some_and(char::is_whitespace);
                    if let Some(path) = glyphs.outline(glyph.id, size) {
                        let transform = Transform::from_row(1.0, 0.0, 0.0, -1.0, x, y);
                        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
                    } else if let Some(bitmap) = glyphs.bitmap(glyph.id, size) {
                        let transform = Transform::from_row(
                            bitmap.scale,
                            0.0,
                            0.0,
                            bitmap.scale,
                            x + bitmap.left,
                            y - bitmap.top,
                        );
                        let pixmap_paint = PixmapPaint {
                            quality: FilterQuality::Bilinear,
                            ..PixmapPaint::default()
                        };
                        pixmap.draw_pixmap(
                            0,
                            0,
                            bitmap.pixmap.as_ref(),
                            &pixmap_paint,
                            transform,
                            None,
                        );
                    } else if !blank
                        && (glyph.kind == GlyphKind::Notdef || run.face().is_synthetic())
                    {
                        if let Some(path) = hollow_box(x, y, glyph.x_advance, size) {
                            let stroke = Stroke {
                                width: (size / 16.0).max(1.0),
                                ..Stroke::default()
                            };
                            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                        }
                    }
                }
            }
        }
    }
}

impl Default for SkiaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for SkiaRenderer {
    fn name(&self) -> &'static str {
        "skia"
    }

    fn render(
        &self,
        lines: &[LayoutLine],
        canvas: &CanvasSpec,
    ) -> Result<BitmapData, RasterizationError> {
        let geometry = self.geometry(lines, canvas)?;
        let mut pixmap = Pixmap::new(geometry.width, geometry.height).ok_or(
            RasterizationError::InvalidDimensions {
                width: geometry.width,
                height: geometry.height,
            },
        )?;
        if let Some(background) = canvas.background {
            pixmap.fill(skia_color(background));
        }

        self.paint_lines(&mut pixmap, lines, canvas, &geometry);

        log::debug!(
            "Rasterized {} lines onto {}x{} (text block {:.1}x{:.1})",
            lines.len(),
            geometry.width,
            geometry.height,
            geometry.content_width,
            geometry.content_height
        );

        let data = pixmap
            .pixels()
            .iter()
            .flat_map(|px| {
                let c = px.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        Ok(BitmapData {
            width: geometry.width,
            height: geometry.height,
            data,
        })
    }
}

fn skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}
