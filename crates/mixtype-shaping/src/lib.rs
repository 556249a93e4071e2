//! From text to glyph runs
//!
//! The [`ShapingEngine`] owns the part of shaping that no OpenType backend
//! does on its own: cutting mixed text into script and direction runs,
//! choosing a face for every grapheme cluster, and shaping each stretch of
//! same-face clusters as one sub-run so conjuncts and ligatures survive.
//!
//! Shaping never fails. Clusters nothing can draw become notdef glyphs, and a
//! backend error turns its sub-run into notdef glyphs after a warning.

use std::ops::Range;
use std::sync::Arc;

use mixtype_core::{
    FontFace, FontSpec, Glyph, GlyphKind, GlyphRun, ShapedGlyph, Shaper, ShapingParams,
};
use mixtype_fontdb::FontRegistry;
use mixtype_unicode::{is_control, ScriptRun, TextAnalyzer};

pub mod cache;

pub use cache::{CacheStats, ShapingCache, ShapingCacheKey};

/// What a grapheme cluster will be drawn with
#[derive(Clone)]
enum Choice {
    Face(Arc<FontFace>),
    Notdef,
    Control,
}

impl Choice {
    fn same_as(&self, other: &Choice) -> bool {
        match (self, other) {
            (Choice::Face(a), Choice::Face(b)) => a.id() == b.id(),
            (Choice::Notdef, Choice::Notdef) | (Choice::Control, Choice::Control) => true,
            _ => false,
        }
    }
}

/// Clusters of one script run that share a face choice
struct SubRun {
    range: Range<usize>,
    clusters: Vec<Range<usize>>,
    choice: Choice,
}

/// Segments text, picks faces and drives the shaping backend
pub struct ShapingEngine {
    registry: Arc<FontRegistry>,
    shaper: Arc<dyn Shaper>,
    cache: Option<ShapingCache>,
    analyzer: TextAnalyzer,
}

impl ShapingEngine {
    pub fn new(registry: Arc<FontRegistry>, shaper: Arc<dyn Shaper>) -> Self {
        Self {
            registry,
            shaper,
            cache: None,
            analyzer: TextAnalyzer::new(),
        }
    }

    /// Keep up to `capacity` shaped paragraphs; 0 turns caching off
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = ShapingCache::new(capacity);
        self
    }

    pub fn registry(&self) -> &Arc<FontRegistry> {
        &self.registry
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ShapingCache::stats)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        self.shaper.clear_cache();
    }

    /// The face `spec` asks for, or the registry default when its family is unknown
    pub fn base_face(&self, text: &str, spec: &FontSpec) -> Arc<FontFace> {
        let hint = Some(self.analyzer.cluster_script(text));
        match self
            .registry
            .resolve(&spec.family, spec.style, spec.weight, hint)
        {
            Ok(face) => face,
            Err(e) => {
                log::warn!("{e}; using '{}'", self.registry.default_family());
                self.registry
                    .resolve(self.registry.default_family(), spec.style, spec.weight, hint)
                    .unwrap_or_else(|_| self.registry.default_face())
            }
        }
    }

    /// Shape `text` in the font described by `spec`
    ///
    /// `spec.size` is taken as pixels. Runs come back in logical order and
    /// tile the text exactly.
    pub fn shape(&self, text: &str, spec: &FontSpec) -> Vec<GlyphRun> {
        if text.is_empty() {
            return Vec::new();
        }
        let base = self.base_face(text, spec);
        self.shape_with_face(text, &base, spec)
    }

    /// Shape `text` starting from an already chosen base face
    pub fn shape_with_face(
        &self,
        text: &str,
        base: &Arc<FontFace>,
        spec: &FontSpec,
    ) -> Vec<GlyphRun> {
        if text.is_empty() {
            return Vec::new();
        }

        let key = self.cache.as_ref().map(|_| {
            ShapingCacheKey::new(
                text,
                base.id(),
                spec.size,
                spec.language.as_deref(),
                &spec.features,
            )
        });
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(runs) = cache.get(key) {
                log::trace!("Shaping cache hit for {} bytes", text.len());
                return runs;
            }
        }

        let source: Arc<str> = Arc::from(text);
        let graphemes = self.analyzer.graphemes(text);
        let mut runs = Vec::new();

        for script_run in self.analyzer.itemize(text, None) {
            let clusters: Vec<Range<usize>> = graphemes
                .iter()
                .filter(|g| g.start >= script_run.range.start && g.end <= script_run.range.end)
                .cloned()
                .collect();
            for sub_run in self.split_by_face(text, &clusters, base) {
                runs.push(self.shape_sub_run(&source, &script_run, &sub_run, base, spec));
            }
        }

        log::debug!(
            "Shaped {} bytes into {} runs ({})",
            text.len(),
            runs.len(),
            runs.iter()
                .map(|r| r.face().family())
                .collect::<Vec<_>>()
                .join(", ")
        );

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, runs.clone());
        }
        runs
    }

    /// Group consecutive clusters that get the same face
    fn split_by_face(
        &self,
        text: &str,
        clusters: &[Range<usize>],
        base: &Arc<FontFace>,
    ) -> Vec<SubRun> {
        let mut sub_runs: Vec<SubRun> = Vec::new();
        for cluster in clusters {
            let current = sub_runs.last().map(|s| &s.choice);
            let choice = self.choose(&text[cluster.clone()], current, base);
            match sub_runs.last_mut() {
                Some(last) if last.choice.same_as(&choice) => {
                    last.range.end = cluster.end;
                    last.clusters.push(cluster.clone());
                }
                _ => sub_runs.push(SubRun {
                    range: cluster.clone(),
                    clusters: vec![cluster.clone()],
                    choice,
                }),
            }
        }
        sub_runs
    }

    fn choose(&self, cluster: &str, current: Option<&Choice>, base: &Arc<FontFace>) -> Choice {
        if cluster.chars().all(is_control) {
            return Choice::Control;
        }
        if self.analyzer.cluster_class(cluster).is_neutral() {
            if let Some(Choice::Face(face)) = current {
                if self.registry.covers_cluster(face, cluster) {
                    return Choice::Face(Arc::clone(face));
                }
            }
        }
        if self.registry.covers_cluster(base, cluster) {
            return Choice::Face(Arc::clone(base));
        }
        match self.registry.fallback_for_cluster(cluster, base) {
            Some(face) => Choice::Face(face),
            None => {
                log::debug!("No face covers {cluster:?}");
                Choice::Notdef
            }
        }
    }

    fn shape_sub_run(
        &self,
        source: &Arc<str>,
        script_run: &ScriptRun,
        sub_run: &SubRun,
        base: &Arc<FontFace>,
        spec: &FontSpec,
    ) -> GlyphRun {
        let make_run = |face: &Arc<FontFace>, glyphs: Vec<Glyph>| {
            GlyphRun::new(
                Arc::clone(face),
                spec.size,
                script_run.script,
                script_run.level,
                Arc::clone(source),
                sub_run.range.clone(),
                glyphs,
            )
        };
        let rtl = script_run.level % 2 == 1;

        match &sub_run.choice {
            Choice::Control => {
                let glyphs = visual(sub_run.clusters.iter().map(|c| Glyph::control(c.start)), rtl);
                make_run(base, glyphs)
            }
            Choice::Notdef => make_run(base, notdef_glyphs(base, sub_run, spec.size, rtl)),
            Choice::Face(face) => {
                let params = ShapingParams {
                    size: spec.size,
                    direction: script_run.direction(),
                    script: Some(script_run.script).filter(|s| !s.is_neutral()),
                    language: spec.language.clone(),
                    features: spec.features.clone(),
                };
                let text = &source[sub_run.range.clone()];
                match self.shaper.shape(text, face.font(), &params) {
                    Ok(result) if valid_clusters(&result.glyphs, text.len()) => {
                        let glyphs = result
                            .glyphs
                            .iter()
                            .map(|g| to_glyph(g, sub_run.range.start))
                            .collect();
                        make_run(face, glyphs)
                    }
                    Ok(_) => {
                        log::warn!(
                            "{} returned unusable output for {:?} in '{}'",
                            self.shaper.name(),
                            text,
                            face.family()
                        );
                        make_run(face, notdef_glyphs(face, sub_run, spec.size, rtl))
                    }
                    Err(e) => {
                        log::warn!(
                            "{} failed on {:?} in '{}': {e}",
                            self.shaper.name(),
                            text,
                            face.family()
                        );
                        make_run(face, notdef_glyphs(face, sub_run, spec.size, rtl))
                    }
                }
            }
        }
    }
}

/// Non-empty output whose clusters all point inside the shaped text
fn valid_clusters(glyphs: &[ShapedGlyph], len: usize) -> bool {
    !glyphs.is_empty() && glyphs.iter().all(|g| (g.cluster as usize) < len)
}

fn to_glyph(shaped: &ShapedGlyph, offset: usize) -> Glyph {
    Glyph {
        id: shaped.id,
        cluster: offset + shaped.cluster as usize,
        x_advance: shaped.x_advance,
        y_advance: shaped.y_advance,
        x_offset: shaped.x_offset,
        y_offset: shaped.y_offset,
        kind: if shaped.id == 0 {
            GlyphKind::Notdef
        } else {
            GlyphKind::Regular
        },
    }
}

/// One notdef glyph per cluster, as wide as the face's glyph 0
fn notdef_glyphs(face: &FontFace, sub_run: &SubRun, size: f32, rtl: bool) -> Vec<Glyph> {
    let font = face.font();
    let advance = font.advance_width(0) * size / f32::from(font.units_per_em().max(1));
    visual(
        sub_run.clusters.iter().map(|c| Glyph::notdef(c.start, advance)),
        rtl,
    )
}

fn visual(glyphs: impl Iterator<Item = Glyph>, rtl: bool) -> Vec<Glyph> {
    let mut glyphs: Vec<Glyph> = glyphs.collect();
    if rtl {
        glyphs.reverse();
    }
    glyphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtype_core::{FontMetrics, FontRef, MixtypeError, Result, Script, ShapingResult};
    use mixtype_fontdb::synthetic_face;
    use mixtype_shape_hr::HarfrustShaper;
    use proptest::prelude::*;

    const LATIN: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ .,!?";

    fn registry() -> Arc<FontRegistry> {
        let analyzer = TextAnalyzer::new();
        let metrics = FontMetrics::default();
        Arc::new(
            FontRegistry::builder()
                .add_face(synthetic_face("Noto Sans", LATIN, 500.0, metrics, &analyzer).build())
                .add_face(
                    synthetic_face("Siemreap", "កខគឃងាិីុ ", 600.0, metrics, &analyzer).build(),
                )
                .add_face(
                    synthetic_face("Noto Color Emoji", "😀", 1000.0, metrics, &analyzer).build(),
                )
                .add_face(synthetic_face("Hebrew Stub", "שלום ", 550.0, metrics, &analyzer).build())
                .prefer_for_script(Script::Khmer, &["Siemreap"])
                .build(),
        )
    }

    fn engine() -> ShapingEngine {
        ShapingEngine::new(registry(), Arc::new(HarfrustShaper::new()))
    }

    fn spec() -> FontSpec {
        FontSpec::new("Noto Sans", 20.0)
    }

    fn families(runs: &[GlyphRun]) -> Vec<&str> {
        runs.iter().map(|r| r.face().family()).collect()
    }

    #[test]
    fn empty_text_has_no_runs() {
        assert!(engine().shape("", &spec()).is_empty());
    }

    #[test]
    fn single_face_text_is_one_run() {
        let runs = engine().shape("Hello, world!", &spec());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].range(), 0..13);
        assert_eq!(runs[0].glyphs().len(), 13);
        assert_eq!(runs[0].font_size(), 20.0);
        assert!((runs[0].advance() - 13.0 * 10.0).abs() < 1e-3);
    }

    #[test]
    fn mixed_scripts_fall_back_per_cluster() {
        let text = "ab កខ";
        let runs = engine().shape(text, &spec());
        assert_eq!(families(&runs), vec!["Noto Sans", "Siemreap"]);
        assert_eq!(runs[0].range(), 0..3);
        assert_eq!(runs[1].range(), 3..text.len());
        assert_eq!(runs[1].script(), Script::Khmer);
        assert!(runs.iter().all(|r| r.notdef_count() == 0));
    }

    #[test]
    fn emoji_goes_to_the_emoji_face() {
        let runs = engine().shape("hi 😀", &spec());
        assert_eq!(families(&runs), vec!["Noto Sans", "Noto Color Emoji"]);
        assert_eq!(runs[1].glyphs()[0].cluster, 3);
    }

    #[test]
    fn uncovered_clusters_become_notdef() {
        let runs = engine().shape("a\u{0E01}", &spec());
        let notdef: Vec<&Glyph> = runs
            .iter()
            .flat_map(|r| r.glyphs())
            .filter(|g| g.kind == GlyphKind::Notdef)
            .collect();
        assert_eq!(notdef.len(), 1);
        assert_eq!(notdef[0].cluster, 1);
        assert!(notdef[0].x_advance > 0.0);
    }

    #[test]
    fn controls_take_no_space() {
        let runs = engine().shape("a\nb", &spec());
        assert_eq!(runs.len(), 3);
        let newline = &runs[1].glyphs()[0];
        assert_eq!(newline.kind, GlyphKind::Control);
        assert_eq!(newline.x_advance, 0.0);
        assert_eq!(runs[1].range(), 1..2);
    }

    #[test]
    fn rtl_runs_are_visual() {
        let text = "שלום";
        let runs = engine().shape(text, &spec());
        assert_eq!(runs.len(), 1);
        assert!(runs[0].is_rtl());
        let clusters: Vec<usize> = runs[0].glyphs().iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![6, 4, 2, 0]);
    }

    #[test]
    fn unknown_family_uses_the_default() {
        let runs = engine().shape("abc", &FontSpec::new("No Such Family", 20.0));
        assert_eq!(families(&runs), vec!["Noto Sans"]);
    }

    #[test]
    fn cache_returns_identical_runs() {
        let engine = engine().with_cache_capacity(8);
        let first = engine.shape("ab កខ", &spec());
        let second = engine.shape("ab កខ", &spec());
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.glyphs(), b.glyphs());
            assert!(Arc::ptr_eq(a.face(), b.face()));
        }
        let stats = engine.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        engine.clear_cache();
        assert_eq!(engine.cache_stats().unwrap().entries, 0);
    }

    #[test]
    fn no_cache_by_default() {
        assert!(engine().cache_stats().is_none());
    }

    struct BrokenShaper;

    impl Shaper for BrokenShaper {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn shape(&self, _: &str, _: Arc<dyn FontRef>, _: &ShapingParams) -> Result<ShapingResult> {
            Err(MixtypeError::InvalidRequest("backend exploded".into()))
        }
    }

    #[test]
    fn backend_errors_degrade_to_notdef() {
        let engine = ShapingEngine::new(registry(), Arc::new(BrokenShaper));
        let runs = engine.shape("abc", &spec());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].notdef_count(), 3);
        assert!((runs[0].advance() - 30.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn clusters_tile_the_text(
            text in proptest::collection::vec(
                prop::sample::select(vec![
                    "a", "Z", " ", "ក", "ា", "😀", "ש", "ל", "\n", "\u{0E01}", "\u{200D}", ",",
                ]),
                1..24,
            ).prop_map(|parts| parts.concat())
        ) {
            let runs = engine().shape(&text, &spec());
            let mut next = 0;
            for run in &runs {
                prop_assert_eq!(run.range().start, next);
                for span in run.clusters() {
                    prop_assert_eq!(span.range.start, next);
                    next = span.range.end;
                }
                prop_assert_eq!(run.range().end, next);
            }
            prop_assert_eq!(next, text.len());
        }
    }
}
