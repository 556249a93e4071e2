//! Painting real outlines; skipped when DejaVu Sans is not installed

use std::path::Path;
use std::sync::Arc;

use mixtype_core::{BitmapData, CanvasSpec, Color, FontSpec, Renderer};
use mixtype_fontdb::FontRegistry;
use mixtype_layout::LayoutEngine;
use mixtype_render_skia::SkiaRenderer;
use mixtype_shape_hr::HarfrustShaper;
use mixtype_shaping::ShapingEngine;

const DEJAVU: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

fn render(text: &str, canvas: &CanvasSpec) -> Option<BitmapData> {
    if !Path::new(DEJAVU).is_file() {
        eprintln!("skipping: {DEJAVU} not installed");
        return None;
    }
    let registry = FontRegistry::builder()
        .add_file(DEJAVU)
        .default_family("DejaVu Sans")
        .build();
    let shaper = ShapingEngine::new(Arc::new(registry), Arc::new(HarfrustShaper::new()));
    let runs = shaper.shape(text, &FontSpec::new("DejaVu Sans", 22.0));
    let lines = LayoutEngine::new().layout(&runs, None);
    Some(SkiaRenderer::new().render(&lines, canvas).unwrap())
}

fn ink_columns(bitmap: &BitmapData) -> (u32, u32) {
    let mut first = u32::MAX;
    let mut last = 0;
    for (i, px) in bitmap.data.chunks_exact(4).enumerate() {
        if px[0] > 64 {
            let x = i as u32 % bitmap.width;
            first = first.min(x);
            last = last.max(x);
        }
    }
    (first, last)
}

#[test]
fn text_leaves_ink_on_a_fixed_canvas() {
    let Some(bitmap) = render("Hello", &CanvasSpec::fixed(128, 32)) else {
        return;
    };
    assert_eq!((bitmap.width, bitmap.height), (128, 32));
    assert_eq!(bitmap.data.len(), 128 * 32 * 4);
    let (first, last) = ink_columns(&bitmap);
    assert!(first < last);
    // Centered: the margins on either side differ by a few pixels at most
    let left = first as i64;
    let right = 127 - last as i64;
    assert!((left - right).abs() <= 6, "left {left}, right {right}");
}

#[test]
fn foreground_color_is_used() {
    let canvas = CanvasSpec {
        foreground: Color::rgb(255, 0, 0),
        ..CanvasSpec::fixed(64, 32)
    };
    let Some(bitmap) = render("H", &canvas) else {
        return;
    };
    assert!(bitmap
        .data
        .chunks_exact(4)
        .any(|px| px[0] == 255 && px[1] == 0 && px[2] == 0));
    assert!(bitmap.data.chunks_exact(4).all(|px| px[1] == 0));
}

#[test]
fn auto_canvas_grows_with_text() {
    let canvas = CanvasSpec {
        padding: 2,
        ..CanvasSpec::default()
    };
    let (Some(short), Some(long)) = (render("Hi", &canvas), render("Hi there", &canvas)) else {
        return;
    };
    assert!(long.width > short.width);
    assert_eq!(long.height, short.height);
}
