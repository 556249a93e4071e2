//! End-to-end behavior of the engine on synthetic fonts

use std::sync::Arc;

use mixtype::fontdb::{synthetic_face, FontRegistry};
use mixtype::prelude::*;
use mixtype::unicode::TextAnalyzer;
use mixtype_core::{FontMetrics, GlyphKind, RasterizationError};
use proptest::prelude::*;

const LATIN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz .,";
const KHMER: &str = "កខគឃងចជញដតទនបពមយរលសហអ្ាិីុូេែោំះ ";
const HEBREW: &str = "אבגדהוזחטיכךלמםנןסעפףצץקרשת ";

fn engine_with_limits(max_dimension: u32) -> Engine {
    let analyzer = TextAnalyzer::new();
    let sans = FontMetrics {
        units_per_em: 1000,
        ascent: 800.0,
        descent: -200.0,
        line_gap: 0.0,
    };
    let khmer = FontMetrics {
        units_per_em: 1000,
        ascent: 1000.0,
        descent: -300.0,
        line_gap: 0.0,
    };
    let registry = FontRegistry::builder()
        .add_face(synthetic_face("DefaultSans", LATIN, 500.0, sans, &analyzer).build())
        .add_face(synthetic_face("Khmer Stub", KHMER, 500.0, khmer, &analyzer).build())
        .add_face(synthetic_face("Hebrew Stub", HEBREW, 500.0, sans, &analyzer).build())
        .default_family("DefaultSans")
        .prefer_for_script(Script::Khmer, &["Khmer Stub"])
        .prefer_for_script(Script::Hebrew, &["Hebrew Stub"])
        .build();
    let config = EngineConfig {
        max_canvas_dimension: max_dimension,
        ..EngineConfig::without_system_fonts()
    };
    Engine::builder()
        .config(config)
        .registry(registry)
        .build()
        .unwrap()
}

fn engine() -> Engine {
    engine_with_limits(4096)
}

fn request(text: &str) -> RenderRequest {
    let mut request = RenderRequest::new(text);
    request.font = FontSpec::new("DefaultSans", 20.0);
    request
}

#[test]
fn hello_and_khmer_fit_on_one_line() {
    let engine = engine();
    let text = "Hello ខ្មែរ";
    let spec = FontSpec::new("DefaultSans", 20.0);

    let runs = engine.shape(text, &spec);
    assert!(runs.len() >= 2, "expected a run per script, got {}", runs.len());

    let lines = engine.layout(&runs, Some(200.0));
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].overflow);

    let mut request = request(text);
    request.max_width = Some(200.0);
    let result = engine.render(&request).unwrap();

    // max(0.8, 1.0) * 20 above the baseline, max(0.2, 0.3) * 20 below
    assert_eq!(result.height, 26);
    assert_eq!(result.metrics.line_count, 1);
    assert_eq!(
        result.metrics.families,
        vec!["DefaultSans".to_string(), "Khmer Stub".to_string()]
    );
}

#[test]
fn rtl_word_sits_between_its_neighbors() {
    let engine = engine();
    let text = "AשלוםB";
    let runs = engine.shape(text, &FontSpec::new("DefaultSans", 20.0));
    let lines = engine.layout(&runs, None);
    assert_eq!(lines.len(), 1);

    let line = &lines[0];
    let texts: Vec<&str> = line.runs.iter().map(|p| p.run.text()).collect();
    assert_eq!(texts, vec!["A", "שלום", "B"]);
    let xs: Vec<f32> = line.runs.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 10.0, 50.0]);

    // Visually left to right: ם ו ל ש
    let clusters: Vec<usize> = line.runs[1].run.glyphs().iter().map(|g| g.cluster).collect();
    assert_eq!(clusters, vec![7, 5, 3, 1]);
}

#[test]
fn resolving_twice_returns_the_same_face() {
    let engine = engine();
    let first = engine
        .resolve_font("DefaultSans", FontStyle::Normal, 400, Some(Script::Latin))
        .unwrap();
    let second = engine
        .resolve_font("DefaultSans", FontStyle::Normal, 400, Some(Script::Latin))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let khmer = engine
        .resolve_font("khmer stub", FontStyle::Italic, 700, Some(Script::Khmer))
        .unwrap();
    assert_eq!(khmer.family(), "Khmer Stub");
}

#[test]
fn uncovered_characters_become_notdef() {
    let engine = engine();
    let runs = engine.shape("a一b", &FontSpec::new("DefaultSans", 20.0));
    let notdefs: Vec<usize> = runs
        .iter()
        .flat_map(|r| r.glyphs())
        .filter(|g| g.kind == GlyphKind::Notdef)
        .map(|g| g.cluster)
        .collect();
    assert_eq!(notdefs, vec![1]);

    let result = engine.render(&request("a一b")).unwrap();
    assert_eq!(result.metrics.missing_glyphs, 1);
    assert!(!result.data.is_empty());
}

#[test]
fn canvas_over_the_ceiling_is_refused() {
    let engine = engine_with_limits(100);

    let mut fixed = request("abc");
    fixed.canvas = CanvasSpec::fixed(200, 50);
    let err = engine.render(&fixed).unwrap_err();
    assert!(matches!(
        err,
        MixtypeError::Rasterization(RasterizationError::CanvasTooLarge { .. })
    ));

    // 20 glyphs of 10px do not fit in 100px without wrapping
    let runs = engine.shape(&"a".repeat(20), &FontSpec::new("DefaultSans", 20.0));
    let lines = engine.layout(&runs, None);
    let err = engine.rasterize(&lines, &CanvasSpec::default()).unwrap_err();
    assert!(matches!(err, RasterizationError::CanvasTooLarge { .. }));
}

#[test]
fn fixed_canvas_wraps_at_its_inner_width() {
    let engine = engine();
    let mut request = request("aaaa bbbb cccc");
    request.canvas = CanvasSpec {
        padding: 5,
        ..CanvasSpec::fixed(100, 80)
    };
    let result = engine.render(&request).unwrap();
    assert_eq!((result.width, result.height), (100, 80));
    assert_eq!(result.metrics.line_count, 2);
    assert!(result.metrics.overflow_lines.is_empty());
    assert!(result.metrics.max_line_width <= 90.0);
}

#[test]
fn png_output_decodes_to_the_reported_size() {
    let engine = engine();
    let result = engine.render(&request("Hello")).unwrap();
    assert_eq!(result.format, OutputFormat::Png);

    let decoder = png::Decoder::new(result.data.as_slice());
    let reader = decoder.read_info().unwrap();
    let info = reader.info();
    assert_eq!((info.width, info.height), (result.width, result.height));
}

#[test]
fn rgb565_output_has_two_bytes_per_pixel() {
    let engine = engine();
    let mut request = request("ab");
    request.canvas.format = OutputFormat::Rgb565;
    let result = engine.render(&request).unwrap();
    assert_eq!(
        result.data.len(),
        (result.width * result.height * 2) as usize
    );
}

#[test]
fn metrics_serialize_to_json() {
    let engine = engine();
    let result = engine.render(&request("ab")).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["metrics"]["line_count"], 1);
    assert!(json.get("data").is_none());
}

#[test]
fn newline_after_an_overflowing_word_hangs_off_the_line() {
    let engine = engine();
    let runs = engine.shape("ខ\u{17d2}មែរ\n", &FontSpec::new("DefaultSans", 20.0));
    let lines = engine.layout(&runs, Some(5.0));

    // Every piece of the word is wider than 5px, so each line holds one run
    for line in &lines {
        assert!(line.overflow);
        assert_eq!(line.runs.len(), 1);
        assert_eq!(line.runs[0].run.face().family(), "Khmer Stub");
    }
    let last = lines.last().unwrap();
    let trailing: Vec<&str> = last.trailing.iter().map(|run| run.text()).collect();
    assert_eq!(trailing, vec!["\n"]);
}

#[test]
fn trailing_space_in_rtl_text_is_not_painted_into_the_line() {
    let engine = engine();
    let runs = engine.shape("שלום ", &FontSpec::new("DefaultSans", 20.0));
    let lines = engine.layout(&runs, None);
    assert_eq!(lines[0].width, 40.0);
    let drawn: f32 = lines[0].runs.iter().map(|p| p.x + p.run.advance()).fold(0.0, f32::max);
    assert_eq!(drawn, 40.0);

    let result = engine.render(&request("שלום ")).unwrap();
    assert_eq!(result.width, 40);
}

fn mixed_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop::sample::select(vec![
            "a", "b", "Z", " ", ".", "\n", "ក", "ខ្មែរ", "שלום", "ב", "一", "😀", "\u{200D}",
        ]),
        1..30,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn clusters_reconstruct_the_text(text in mixed_text()) {
        let engine = engine();
        let runs = engine.shape(&text, &FontSpec::new("DefaultSans", 20.0));

        let mut rebuilt = String::new();
        for run in &runs {
            for span in run.clusters() {
                rebuilt.push_str(&text[span.range]);
            }
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn lines_fit_unless_a_single_run_overflows(
        text in mixed_text(),
        max in 5.0f32..150.0,
    ) {
        let engine = engine();
        let runs = engine.shape(&text, &FontSpec::new("DefaultSans", 20.0));
        for line in engine.layout(&runs, Some(max)) {
            prop_assert!(line.width <= max + 1e-3 || line.runs.len() == 1);
        }
    }
}
