//! Mixtype: multi-script text layout and rasterization
//!
//! Text goes through three stages:
//! 1. Shaping: itemize by script and direction, pick a face per grapheme
//!    with fallback, shape each sub-run
//! 2. Layout: break into lines, reorder runs visually, measure
//! 3. Rasterization: paint onto a canvas and encode it
//!
//! [`Engine`] owns the font registry and the stage implementations and exposes
//! each stage on its own, plus [`Engine::render`] for the whole trip.
//!
//! # Example
//!
//! ```no_run
//! use mixtype::prelude::*;
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! let mut request = RenderRequest::new("Hello ខ្មែរ 👋");
//! request.font.size = 22.0;
//! let result = engine.render(&request)?;
//! std::fs::write("hello.png", &result.data)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use mixtype_core::{
    CanvasSpec, EngineConfig, FontFace, FontSpec, FontStyle, GlyphRun, LayoutLine, NotFound,
    RasterizationError, RenderMetrics, RenderRequest, RenderResult, Renderer, Result, Script,
    Shaper, WrapMode,
};
use mixtype_fontdb::FontRegistry;
use mixtype_layout::LayoutEngine;
use mixtype_render_skia::SkiaRenderer;
use mixtype_shape_hr::HarfrustShaper;
use mixtype_shaping::{CacheStats, ShapingEngine};

pub use mixtype_core::{config, error, request, traits, types};
pub use mixtype_export as export;
pub use mixtype_fontdb as fontdb;
pub use mixtype_unicode as unicode;

/// Common imports for typical usage
pub mod prelude {
    pub use crate::{Engine, EngineBuilder};
    pub use mixtype_core::{
        Alignment, CanvasSpec, Color, Direction, EngineConfig, FontFace, FontSpec, FontStyle,
        GlyphRun, LayoutLine, MixtypeError, OutputFormat, RenderMetrics, RenderRequest,
        RenderResult, Result, Script, WrapMode,
    };
}

/// Shapes, lays out and rasterizes text against one font registry
///
/// Built once at startup and read-only afterwards; share it with `Arc`.
pub struct Engine {
    config: EngineConfig,
    shaping: ShapingEngine,
    layout: LayoutEngine,
    renderer: Arc<dyn Renderer>,
}

impl Engine {
    /// Load fonts from the configured directories and set up the default
    /// backends
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FontRegistry {
        self.shaping.registry()
    }

    /// Hit and miss counts of the shaping cache, if it is enabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.shaping.cache_stats()
    }

    /// Find the face of `family` closest to `style` and `weight`
    pub fn resolve_font(
        &self,
        family: &str,
        style: FontStyle,
        weight: u16,
        script_hint: Option<Script>,
    ) -> std::result::Result<Arc<FontFace>, NotFound> {
        self.registry().resolve(family, style, weight, script_hint)
    }

    /// Turn text into glyph runs
    ///
    /// `spec.size` is taken as pixels here; [`Engine::render`] converts the
    /// request's point size first. Never fails: characters no face covers
    /// come back as notdef glyphs.
    pub fn shape(&self, text: &str, spec: &FontSpec) -> Vec<GlyphRun> {
        self.shaping.shape(text, spec)
    }

    /// Break runs into lines no wider than `max_width`, where possible
    pub fn layout(&self, runs: &[GlyphRun], max_width: Option<f32>) -> Vec<LayoutLine> {
        self.layout.layout(runs, max_width)
    }

    pub fn layout_with(
        &self,
        runs: &[GlyphRun],
        max_width: Option<f32>,
        wrap: WrapMode,
    ) -> Vec<LayoutLine> {
        self.layout.layout_with(runs, max_width, wrap)
    }

    /// Paint `lines` and encode them in `canvas.format`
    pub fn rasterize(
        &self,
        lines: &[LayoutLine],
        canvas: &CanvasSpec,
    ) -> std::result::Result<RenderResult, RasterizationError> {
        let bitmap = self.renderer.render(lines, canvas)?;
        let data = mixtype_export::encode(&bitmap, canvas.format)?;
        log::debug!(
            "Rasterized {} lines into {}x{} {:?} ({} bytes) with {}",
            lines.len(),
            bitmap.width,
            bitmap.height,
            canvas.format,
            data.len(),
            self.renderer.name()
        );
        Ok(RenderResult {
            data,
            format: canvas.format,
            width: bitmap.width,
            height: bitmap.height,
            metrics: RenderMetrics::from_lines(lines),
        })
    }

    /// Validate `request`, then shape, lay out and rasterize it
    pub fn render(&self, request: &RenderRequest) -> Result<RenderResult> {
        request.validate()?;

        let spec = FontSpec {
            size: request.pixel_size(),
            ..request.font.clone()
        };
        let runs = self.shape(&request.text, &spec);
        let lines = self.layout_with(&runs, request.wrap_width(), request.wrap);
        log::debug!(
            "Shaped {} bytes into {} runs and {} lines at {}px",
            request.text.len(),
            runs.len(),
            lines.len(),
            spec.size
        );

        let result = self.rasterize(&lines, &request.canvas)?;
        if result.metrics.missing_glyphs > 0 {
            log::warn!(
                "{} glyphs of {:?} have no covering font",
                result.metrics.missing_glyphs,
                request.text
            );
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("faces", &self.registry().len())
            .field("default_family", &self.registry().default_family())
            .field("renderer", &self.renderer.name())
            .field("wrap", &self.layout.wrap())
            .finish()
    }
}

/// Builder for [`Engine`]
///
/// Anything not set falls back to the defaults: a registry loaded from the
/// configuration, the harfrust shaper and the tiny-skia renderer limited by
/// the configured canvas ceilings.
pub struct EngineBuilder {
    config: EngineConfig,
    registry: Option<FontRegistry>,
    shaper: Option<Arc<dyn Shaper>>,
    renderer: Option<Arc<dyn Renderer>>,
    wrap: WrapMode,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: None,
            shaper: None,
            renderer: None,
            wrap: WrapMode::default(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a prepared registry instead of scanning the configured directories
    pub fn registry(mut self, registry: FontRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn shaper(mut self, shaper: Arc<dyn Shaper>) -> Self {
        self.shaper = Some(shaper);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Wrap mode for [`Engine::layout`]
    pub fn wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => FontRegistry::from_config(&self.config),
        };
        if registry.is_empty() {
            log::warn!("Font registry is empty; every glyph will render as a box");
        }
        log::info!(
            "Engine ready: {} faces in {} families, default '{}'",
            registry.len(),
            registry.families().len(),
            registry.default_family()
        );

        let shaper = self
            .shaper
            .unwrap_or_else(|| Arc::new(HarfrustShaper::new()));
        let renderer = self.renderer.unwrap_or_else(|| {
            Arc::new(SkiaRenderer::with_limits(
                self.config.max_canvas_dimension,
                self.config.max_canvas_pixels,
            ))
        });
        let shaping = ShapingEngine::new(Arc::new(registry), shaper)
            .with_cache_capacity(self.config.shaping_cache_capacity);

        Ok(Engine {
            config: self.config,
            shaping,
            layout: LayoutEngine::new().with_wrap(self.wrap),
            renderer,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtype_core::{BitmapData, FontMetrics, MixtypeError, OutputFormat};
    use mixtype_fontdb::synthetic_face;
    use mixtype_unicode::TextAnalyzer;

    fn engine() -> Engine {
        let analyzer = TextAnalyzer::new();
        let registry = FontRegistry::builder()
            .add_face(
                synthetic_face("Stub Sans", "abcH ", 500.0, FontMetrics::default(), &analyzer)
                    .build(),
            )
            .default_family("Stub Sans")
            .build();
        Engine::builder()
            .config(EngineConfig::without_system_fonts())
            .registry(registry)
            .build()
            .unwrap()
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            max_canvas_dimension: 0,
            ..EngineConfig::without_system_fonts()
        };
        let err = Engine::new(config).unwrap_err();
        assert!(matches!(err, MixtypeError::Config(_)));
    }

    #[test]
    fn invalid_requests_fail_before_shaping() {
        let engine = engine();
        assert!(matches!(
            engine.render(&RenderRequest::new("")),
            Err(MixtypeError::InvalidRequest(_))
        ));

        let mut request = RenderRequest::new("abc");
        request.font.size = f32::NAN;
        assert!(matches!(
            engine.render(&request),
            Err(MixtypeError::InvalidRequest(_))
        ));
    }

    #[test]
    fn render_reports_canvas_and_metrics() {
        let engine = engine();
        let mut request = RenderRequest::new("abc");
        request.font = FontSpec::new("Stub Sans", 20.0);
        request.canvas.format = OutputFormat::Rgba8;
        let result = engine.render(&request).unwrap();

        // 3 glyphs of 10px, one 20px line
        assert_eq!((result.width, result.height), (30, 20));
        assert_eq!(result.data.len(), 30 * 20 * 4);
        assert_eq!(result.metrics.line_count, 1);
        assert_eq!(result.metrics.families, vec!["Stub Sans".to_string()]);
        assert_eq!(result.metrics.missing_glyphs, 0);
    }

    #[test]
    fn dpi_scales_the_point_size() {
        let engine = engine();
        let mut request = RenderRequest::new("ab");
        request.font = FontSpec::new("Stub Sans", 20.0);
        request.dpi = 144.0;
        request.canvas.format = OutputFormat::Rgba8;
        let result = engine.render(&request).unwrap();
        assert_eq!((result.width, result.height), (40, 40));
    }

    #[test]
    fn unknown_family_is_not_found() {
        let engine = engine();
        let err = engine
            .resolve_font("Nope", FontStyle::Normal, 400, None)
            .unwrap_err();
        assert_eq!(err.family, "Nope");
    }

    struct FixedRenderer;

    impl Renderer for FixedRenderer {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn render(
            &self,
            _lines: &[LayoutLine],
            _canvas: &CanvasSpec,
        ) -> std::result::Result<BitmapData, RasterizationError> {
            Ok(BitmapData {
                width: 2,
                height: 1,
                data: vec![1, 2, 3, 4, 5, 6, 7, 8],
            })
        }
    }

    #[test]
    fn custom_renderer_is_used() {
        let engine = Engine::builder()
            .config(EngineConfig::without_system_fonts())
            .registry(FontRegistry::builder().build())
            .renderer(Arc::new(FixedRenderer))
            .build()
            .unwrap();
        let canvas = CanvasSpec {
            format: OutputFormat::Rgba8,
            ..CanvasSpec::default()
        };
        let result = engine.rasterize(&[], &canvas).unwrap();
        assert_eq!(result.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(result.metrics.line_count, 0);
    }
}
