//! Font faces as the rest of the engine sees them
//!
//! A [`FontFace`] bundles what the registry learned about one face (family,
//! weight, style, coverage, vertical metrics) with the [`FontRef`] that owns
//! its bytes. Faces are built once, wrapped in `Arc` and never mutated.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::script::Script;
use crate::traits::{FontRef, GlyphId};

/// Upright or slanted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub fn is_slanted(self) -> bool {
        self != FontStyle::Normal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
            FontStyle::Oblique => "oblique",
        }
    }
}

impl fmt::Display for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "regular" | "upright" => Ok(FontStyle::Normal),
            "italic" => Ok(FontStyle::Italic),
            "oblique" => Ok(FontStyle::Oblique),
            other => Err(format!("unknown font style: {other}")),
        }
    }
}

/// Regular weight on the CSS scale
pub const WEIGHT_NORMAL: u16 = 400;

/// Vertical metrics in font units, as stored in the font
///
/// `descent` follows the font convention and is negative below the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

impl FontMetrics {
    /// Distance above the baseline in pixels at `size`
    pub fn ascent_px(&self, size: f32) -> f32 {
        self.ascent * self.scale(size)
    }

    /// Distance below the baseline in pixels at `size`, as a positive number
    pub fn descent_px(&self, size: f32) -> f32 {
        -self.descent * self.scale(size)
    }

    fn scale(&self, size: f32) -> f32 {
        size / f32::from(self.units_per_em.max(1))
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            units_per_em: 1000,
            ascent: 800.0,
            descent: -200.0,
            line_gap: 0.0,
        }
    }
}

/// The set of code points a face maps in its cmap
///
/// Stored as sorted inclusive ranges, so membership is a binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    ranges: Vec<(u32, u32)>,
    len: usize,
}

impl Coverage {
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let sorted: BTreeSet<u32> = chars.into_iter().map(u32::from).collect();
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for cp in &sorted {
            match ranges.last_mut() {
                Some((_, end)) if *end + 1 == *cp => *end = *cp,
                _ => ranges.push((*cp, *cp)),
            }
        }
        Self {
            ranges,
            len: sorted.len(),
        }
    }

    pub fn contains(&self, ch: char) -> bool {
        let cp = u32::from(ch);
        self.ranges
            .binary_search_by(|&(start, end)| {
                if end < cp {
                    std::cmp::Ordering::Less
                } else if start > cp {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.ranges
            .iter()
            .flat_map(|&(start, end)| (start..=end).filter_map(char::from_u32))
    }
}

/// Stable identity of a face within one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(u64);

static NEXT_FACE_ID: AtomicU64 = AtomicU64::new(1);

impl FaceId {
    fn next() -> Self {
        FaceId(NEXT_FACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a face came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceSource {
    File { path: PathBuf, index: u32 },
    Memory { name: String, index: u32 },
    Synthetic,
}

impl fmt::Display for FaceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceSource::File { path, index: 0 } => write!(f, "{}", path.display()),
            FaceSource::File { path, index } => write!(f, "{}#{index}", path.display()),
            FaceSource::Memory { name, index } => write!(f, "{name}#{index}"),
            FaceSource::Synthetic => f.write_str("<synthetic>"),
        }
    }
}

/// Everything the engine knows about one loaded face
pub struct FontFace {
    id: FaceId,
    family: String,
    weight: u16,
    style: FontStyle,
    source: FaceSource,
    metrics: FontMetrics,
    coverage: Coverage,
    script_coverage: BTreeMap<Script, u32>,
    font: Arc<dyn FontRef>,
}

impl FontFace {
    /// Start describing a face backed by `font`
    pub fn builder(family: impl Into<String>, font: Arc<dyn FontRef>) -> FontFaceBuilder {
        FontFaceBuilder {
            family: family.into(),
            weight: WEIGHT_NORMAL,
            style: FontStyle::Normal,
            source: FaceSource::Synthetic,
            metrics: None,
            coverage: Coverage::default(),
            script_coverage: BTreeMap::new(),
            font,
        }
    }

    pub fn id(&self) -> FaceId {
        self.id
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn source(&self) -> &FaceSource {
        &self.source
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    pub fn font(&self) -> Arc<dyn FontRef> {
        Arc::clone(&self.font)
    }

    /// How many mapped code points belong to each script
    pub fn script_coverage(&self) -> &BTreeMap<Script, u32> {
        &self.script_coverage
    }

    pub fn coverage_for(&self, script: Script) -> u32 {
        self.script_coverage.get(&script).copied().unwrap_or(0)
    }

    pub fn covers(&self, ch: char) -> bool {
        self.coverage.contains(ch)
    }

    pub fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        if self.covers(ch) {
            self.font.glyph_id(ch)
        } else {
            None
        }
    }

    /// True when the face carries no font bytes (synthetic or placeholder faces)
    pub fn is_synthetic(&self) -> bool {
        self.font.data().is_empty()
    }
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("weight", &self.weight)
            .field("style", &self.style)
            .field("source", &self.source)
            .field("code_points", &self.coverage.len())
            .finish()
    }
}

/// Collects face attributes before freezing them into a [`FontFace`]
pub struct FontFaceBuilder {
    family: String,
    weight: u16,
    style: FontStyle,
    source: FaceSource,
    metrics: Option<FontMetrics>,
    coverage: Coverage,
    script_coverage: BTreeMap<Script, u32>,
    font: Arc<dyn FontRef>,
}

impl FontFaceBuilder {
    pub fn weight(mut self, weight: u16) -> Self {
        self.weight = weight.clamp(1, 1000);
        self
    }

    pub fn style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn source(mut self, source: FaceSource) -> Self {
        self.source = source;
        self
    }

    pub fn metrics(mut self, metrics: FontMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn script_coverage(mut self, script_coverage: BTreeMap<Script, u32>) -> Self {
        self.script_coverage = script_coverage;
        self
    }

    pub fn build(self) -> FontFace {
        let metrics = self.metrics.unwrap_or(FontMetrics {
            units_per_em: self.font.units_per_em(),
            ..FontMetrics::default()
        });
        FontFace {
            id: FaceId::next(),
            family: self.family,
            weight: self.weight,
            style: self.style,
            source: self.source,
            metrics,
            coverage: self.coverage,
            script_coverage: self.script_coverage,
            font: self.font,
        }
    }
}

/// A font without bytes: fixed advances over an explicit character set
///
/// Backs the registry's last-resort face and lets tests build faces with
/// exactly the coverage they need.
#[derive(Debug, Clone)]
pub struct SyntheticFont {
    units_per_em: u16,
    advance: f32,
    chars: Vec<char>,
}

impl SyntheticFont {
    pub fn new(units_per_em: u16, advance: f32, chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: Vec<char> = chars.into_iter().collect();
        chars.sort_unstable();
        chars.dedup();
        Self {
            units_per_em: units_per_em.max(1),
            advance,
            chars,
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl FontRef for SyntheticFont {
    fn data(&self) -> &[u8] {
        &[]
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        self.chars
            .binary_search(&ch)
            .ok()
            .map(|index| index as GlyphId + 1)
    }

    fn advance_width(&self, glyph_id: GlyphId) -> f32 {
        if glyph_id == 0 {
            self.units_per_em as f32 / 2.0
        } else {
            self.advance
        }
    }

    fn glyph_count(&self) -> Option<u32> {
        Some(self.chars.len() as u32 + 1)
    }
}
