use std::path::Path;
use std::sync::Arc;

use mixtype_core::{Direction, FontRef, Script, Shaper, ShapingParams};
use mixtype_fontdb::load_file;
use mixtype_shape_hr::HarfrustShaper;
use mixtype_unicode::TextAnalyzer;

fn dejavu_sans() -> Option<Arc<dyn FontRef>> {
    let path = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
    if !path.is_file() {
        eprintln!("skipping: DejaVu Sans not installed");
        return None;
    }
    let faces = load_file(path, u64::MAX, &TextAnalyzer::new()).unwrap();
    Some(faces[0].font())
}

#[test]
fn latin_text_shapes_to_real_glyphs() {
    let Some(font) = dejavu_sans() else {
        return;
    };
    let params = ShapingParams {
        size: 24.0,
        script: Some(Script::Latin),
        language: Some("en".into()),
        ..Default::default()
    };
    let result = HarfrustShaper::new().shape("Hello", font, &params).unwrap();
    assert_eq!(result.glyphs.len(), 5);
    assert!(result.glyphs.iter().all(|g| g.id != 0));
    assert!(result.advance_width > 24.0);
    let clusters: Vec<u32> = result.glyphs.iter().map(|g| g.cluster).collect();
    assert_eq!(clusters, vec![0, 1, 2, 3, 4]);
}

#[test]
fn hebrew_comes_back_in_visual_order() {
    let Some(font) = dejavu_sans() else {
        return;
    };
    let params = ShapingParams {
        size: 24.0,
        direction: Direction::RightToLeft,
        script: Some(Script::Hebrew),
        ..Default::default()
    };
    let text = "\u{05E9}\u{05DC}\u{05D5}\u{05DD}";
    let result = HarfrustShaper::new().shape(text, font, &params).unwrap();
    let clusters: Vec<u32> = result.glyphs.iter().map(|g| g.cluster).collect();
    assert_eq!(clusters, vec![6, 4, 2, 0]);
}

#[test]
fn disabling_kerning_changes_nothing_structural() {
    let Some(font) = dejavu_sans() else {
        return;
    };
    let params = ShapingParams {
        size: 32.0,
        features: vec![("kern".into(), 0)],
        ..Default::default()
    };
    let result = HarfrustShaper::new().shape("AV", font, &params).unwrap();
    assert_eq!(result.glyphs.len(), 2);
}
