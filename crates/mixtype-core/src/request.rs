//! Rendering requests and results
//!
//! A [`RenderRequest`] arrives already decoded (from JSON, TOML or CLI flags),
//! is validated once, and is never touched again. A [`RenderResult`] carries
//! the encoded image plus enough layout metrics for a caller to reason about
//! what happened without decoding the pixels.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::MixtypeError;
use crate::face::{FontStyle, WEIGHT_NORMAL};
use crate::types::LayoutLine;
use crate::Result;

/// Points per inch; a point equals a pixel at this DPI
pub const DEFAULT_DPI: f32 = 72.0;

/// Default family when a request names none
pub const DEFAULT_FAMILY: &str = "Noto Sans";

/// An sRGB color with straight alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    /// Build from integer channels, clamping each to 0..=255
    pub fn from_channels(channels: &[i64]) -> std::result::Result<Self, String> {
        let clamp = |v: i64| v.clamp(0, 255) as u8;
        match *channels {
            [r, g, b] => Ok(Self::rgb(clamp(r), clamp(g), clamp(b))),
            [r, g, b, a] => Ok(Self::rgba(clamp(r), clamp(g), clamp(b), clamp(a))),
            _ => Err(format!(
                "color needs 3 or 4 channels, got {}",
                channels.len()
            )),
        }
    }

    /// The 16-bit 5-6-5 packing used by small TFT panels
    pub fn to_rgb565(self) -> u16 {
        (u16::from(self.r & 0xF8) << 8) | (u16::from(self.g & 0xFC) << 3) | u16::from(self.b >> 3)
    }
}

impl FromStr for Color {
    type Err = String;

    /// Parses `#RRGGBB` or `#RRGGBBAA`, with or without the leading `#`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(format!("invalid color '{s}', expected #RRGGBB"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid color '{s}'"))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Channels(Vec<i64>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => s.parse().map_err(de::Error::custom),
            Repr::Channels(channels) => Color::from_channels(&channels).map_err(de::Error::custom),
        }
    }
}

/// Horizontal placement of lines inside the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    /// Each line centered on its own
    #[default]
    Center,
    Right,
    /// The text block centered as a whole, its lines flush left inside it
    Block,
}

/// Where the layout engine may break a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Break only at line break opportunities; long words overflow
    #[default]
    Word,
    /// Like `Word`, but a word that cannot fit on a line of its own is broken
    /// between grapheme clusters
    WordChar,
}

/// How the painted canvas is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    /// Raw straight-alpha RGBA, 4 bytes per pixel, rows top to bottom
    Rgba8,
    /// 16-bit 5-6-5 pixels, little-endian, composited over black
    Rgb565,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Rgba8 => "rgba",
            OutputFormat::Rgb565 => "rgb565",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "rgba" | "rgba8" | "raw" => Ok(OutputFormat::Rgba8),
            "rgb565" | "565" => Ok(OutputFormat::Rgb565),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Which font the text should be set in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSpec {
    pub family: String,
    /// Size in points
    pub size: f32,
    pub weight: u16,
    pub style: FontStyle,
    /// BCP 47 language tag handed to the shaper
    pub language: Option<String>,
    /// OpenType feature settings, e.g. `("liga", 0)`
    pub features: Vec<(String, u32)>,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            ..Self::default()
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: DEFAULT_FAMILY.to_string(),
            size: 22.0,
            weight: WEIGHT_NORMAL,
            style: FontStyle::Normal,
            language: None,
            features: Vec::new(),
        }
    }
}

/// The surface text is painted on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSpec {
    /// Fixed width in pixels; `None` sizes the canvas to the text
    pub width: Option<u32>,
    /// Fixed height in pixels; `None` sizes the canvas to the text
    pub height: Option<u32>,
    pub padding: u32,
    pub foreground: Color,
    /// `None` leaves the canvas transparent
    pub background: Option<Color>,
    pub alignment: Alignment,
    pub format: OutputFormat,
}

impl CanvasSpec {
    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            padding: 0,
            foreground: Color::white(),
            background: Some(Color::black()),
            alignment: Alignment::Center,
            format: OutputFormat::Png,
        }
    }
}

/// Everything needed to turn one string into one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub text: String,
    #[serde(default)]
    pub font: FontSpec,
    /// Wrap width in pixels; `None` wraps at a fixed canvas width, or never
    #[serde(default)]
    pub max_width: Option<f32>,
    #[serde(default = "default_dpi")]
    pub dpi: f32,
    #[serde(default)]
    pub canvas: CanvasSpec,
    #[serde(default)]
    pub wrap: WrapMode,
}

fn default_dpi() -> f32 {
    DEFAULT_DPI
}

impl RenderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: FontSpec::default(),
            max_width: None,
            dpi: DEFAULT_DPI,
            canvas: CanvasSpec::default(),
            wrap: WrapMode::Word,
        }
    }

    /// Reject requests that cannot produce meaningful output
    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(MixtypeError::InvalidRequest("text is empty".into()));
        }
        if !(self.font.size.is_finite() && self.font.size > 0.0) {
            return Err(MixtypeError::InvalidRequest(format!(
                "font size must be positive, got {}",
                self.font.size
            )));
        }
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(MixtypeError::InvalidRequest(format!(
                "dpi must be positive, got {}",
                self.dpi
            )));
        }
        if let Some(width) = self.max_width {
            if width.is_nan() {
                return Err(MixtypeError::InvalidRequest("max_width is NaN".into()));
            }
        }
        if self.canvas.width == Some(0) || self.canvas.height == Some(0) {
            return Err(MixtypeError::InvalidRequest(
                "canvas dimensions must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Font size in pixels at the request's DPI
    pub fn pixel_size(&self) -> f32 {
        self.font.size * self.dpi / DEFAULT_DPI
    }

    /// The width lines wrap at
    ///
    /// An explicit `max_width` wins; otherwise a fixed canvas width minus
    /// padding; otherwise no wrapping.
    pub fn wrap_width(&self) -> Option<f32> {
        self.max_width.or_else(|| {
            self.canvas
                .width
                .map(|w| w.saturating_sub(2 * self.canvas.padding) as f32)
        })
    }
}

/// Painted pixels before encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapData {
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8, row-major, `width * height * 4` bytes
    pub data: Vec<u8>,
}

/// Per-line numbers reported with every render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMetrics {
    pub width: f32,
    pub height: f32,
    pub baseline: f32,
    pub start: usize,
    pub end: usize,
    pub overflow: bool,
}

/// Layout facts about a finished render
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderMetrics {
    pub line_count: usize,
    pub total_height: f32,
    pub max_line_width: f32,
    pub lines: Vec<LineMetrics>,
    /// Indices of lines wider than the wrap width
    pub overflow_lines: Vec<usize>,
    pub missing_glyphs: usize,
    /// Families that contributed glyphs, in first-use order
    pub families: Vec<String>,
}

impl RenderMetrics {
    pub fn from_lines(lines: &[LayoutLine]) -> Self {
        let mut families: Vec<String> = Vec::new();
        for line in lines {
            for positioned in &line.runs {
                let family = positioned.run.face().family();
                if !families.iter().any(|f| f == family) {
                    families.push(family.to_string());
                }
            }
        }

        Self {
            line_count: lines.len(),
            total_height: lines.iter().map(|l| l.height).sum(),
            max_line_width: lines.iter().map(|l| l.width).fold(0.0, f32::max),
            lines: lines
                .iter()
                .map(|l| LineMetrics {
                    width: l.width,
                    height: l.height,
                    baseline: l.baseline,
                    start: l.range.start,
                    end: l.range.end,
                    overflow: l.overflow,
                })
                .collect(),
            overflow_lines: lines
                .iter()
                .enumerate()
                .filter(|(_, l)| l.overflow)
                .map(|(i, _)| i)
                .collect(),
            missing_glyphs: lines.iter().map(LayoutLine::missing_glyphs).sum(),
            families,
        }
    }
}

/// The encoded image and what went into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResult {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub metrics: RenderMetrics,
}
