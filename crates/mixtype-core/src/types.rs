//! Glyph runs and laid out lines
//!
//! A [`GlyphRun`] is the unit that flows from shaping into layout: one face,
//! one script, one embedding level, one contiguous byte range of the source.
//! Runs are never edited in place. Layout derives new runs by splitting a run
//! at a cluster boundary and merging neighbours back together.

use std::ops::Range;
use std::sync::Arc;

use crate::face::FontFace;
use crate::script::{Direction, Script};
use crate::traits::GlyphId;

/// What a glyph stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphKind {
    /// An ordinary glyph produced by the shaper
    Regular,
    /// Nothing could display the cluster; painted as a hollow box
    Notdef,
    /// A control character; takes no space and is never painted
    Control,
}

/// One positioned glyph, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub id: GlyphId,
    /// Byte offset in the source text of the cluster this glyph belongs to
    pub cluster: usize,
    pub x_advance: f32,
    pub y_advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub kind: GlyphKind,
}

impl Glyph {
    pub fn notdef(cluster: usize, advance: f32) -> Self {
        Self {
            id: 0,
            cluster,
            x_advance: advance,
            y_advance: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
            kind: GlyphKind::Notdef,
        }
    }

    pub fn control(cluster: usize) -> Self {
        Self {
            id: 0,
            cluster,
            x_advance: 0.0,
            y_advance: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
            kind: GlyphKind::Control,
        }
    }
}

/// A text range and the glyphs that display it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpan {
    /// Absolute byte range in the source text
    pub range: Range<usize>,
    /// Indices into [`GlyphRun::glyphs`]
    pub glyphs: Vec<usize>,
}

/// Shaped glyphs for a contiguous slice of text
#[derive(Debug, Clone)]
pub struct GlyphRun {
    face: Arc<FontFace>,
    font_size: f32,
    script: Script,
    level: u8,
    source: Arc<str>,
    range: Range<usize>,
    glyphs: Vec<Glyph>,
}

impl GlyphRun {
    /// Assemble a run
    ///
    /// `glyphs` must be in visual order with clusters inside `range`.
    pub fn new(
        face: Arc<FontFace>,
        font_size: f32,
        script: Script,
        level: u8,
        source: Arc<str>,
        range: Range<usize>,
        glyphs: Vec<Glyph>,
    ) -> Self {
        debug_assert!(range.end <= source.len());
        debug_assert!(glyphs
            .iter()
            .all(|g| g.cluster >= range.start && g.cluster < range.end.max(range.start + 1)));
        Self {
            face,
            font_size,
            script,
            level,
            source,
            range,
            glyphs,
        }
    }

    pub fn face(&self) -> &Arc<FontFace> {
        &self.face
    }

    /// Pixel size the glyphs were shaped at
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn script(&self) -> Script {
        self.script
    }

    /// Bidi embedding level
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn direction(&self) -> Direction {
        Direction::from_level(self.level)
    }

    pub fn is_rtl(&self) -> bool {
        self.level % 2 == 1
    }

    /// Byte range in the source text
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The whole paragraph this run was cut from
    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    /// The slice of source text this run displays
    pub fn text(&self) -> &str {
        &self.source[self.range.clone()]
    }

    /// Glyphs in visual order
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn advance(&self) -> f32 {
        self.glyphs.iter().map(|g| g.x_advance).sum()
    }

    pub fn ascent(&self) -> f32 {
        self.face.metrics().ascent_px(self.font_size)
    }

    pub fn descent(&self) -> f32 {
        self.face.metrics().descent_px(self.font_size)
    }

    pub fn notdef_count(&self) -> usize {
        self.glyphs
            .iter()
            .filter(|g| g.kind == GlyphKind::Notdef)
            .count()
    }

    /// Cluster mapping in logical order
    ///
    /// The spans tile the run's byte range exactly. Bytes that no glyph claims
    /// (a shaper may fold several characters into one cluster) belong to the
    /// cluster that precedes them.
    pub fn clusters(&self) -> Vec<ClusterSpan> {
        let mut starts: Vec<usize> = self.glyphs.iter().map(|g| g.cluster).collect();
        starts.sort_unstable();
        starts.dedup();

        if starts.is_empty() {
            if self.range.is_empty() {
                return Vec::new();
            }
            return vec![ClusterSpan {
                range: self.range.clone(),
                glyphs: Vec::new(),
            }];
        }

        let mut spans = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(self.range.end);
            let span_start = if i == 0 { self.range.start } else { start };
            let glyphs = self
                .glyphs
                .iter()
                .enumerate()
                .filter(|(_, g)| g.cluster == start)
                .map(|(index, _)| index)
                .collect();
            spans.push(ClusterSpan {
                range: span_start..end,
                glyphs,
            });
        }
        spans
    }

    /// Byte offsets where this run may be cut, excluding its two ends
    pub fn cluster_boundaries(&self) -> Vec<usize> {
        self.clusters()
            .into_iter()
            .skip(1)
            .map(|span| span.range.start)
            .collect()
    }

    /// Cut the run at a cluster boundary
    ///
    /// Returns the logical head and tail. An offset outside the run, or one
    /// that does not fall on a cluster boundary, returns `None`.
    pub fn split_at(&self, offset: usize) -> Option<(GlyphRun, GlyphRun)> {
        if offset <= self.range.start || offset >= self.range.end {
            return None;
        }
        if !self.cluster_boundaries().contains(&offset) {
            return None;
        }
        let (head, tail): (Vec<Glyph>, Vec<Glyph>) =
            self.glyphs.iter().partition(|g| g.cluster < offset);
        Some((
            self.derive(self.range.start..offset, head),
            self.derive(offset..self.range.end, tail),
        ))
    }

    /// Join a run that continues this one logically
    ///
    /// Both pieces must share face, size, script and level, and `next` must
    /// start where `self` ends.
    pub fn merge(&self, next: &GlyphRun) -> Option<GlyphRun> {
        if !self.can_merge(next) {
            return None;
        }
        let glyphs = if self.is_rtl() {
            next.glyphs.iter().chain(self.glyphs.iter()).copied().collect()
        } else {
            self.glyphs.iter().chain(next.glyphs.iter()).copied().collect()
        };
        Some(self.derive(self.range.start..next.range.end, glyphs))
    }

    pub fn can_merge(&self, next: &GlyphRun) -> bool {
        Arc::ptr_eq(&self.face, &next.face)
            && Arc::ptr_eq(&self.source, &next.source)
            && self.font_size == next.font_size
            && self.script == next.script
            && self.level == next.level
            && self.range.end == next.range.start
    }

    fn derive(&self, range: Range<usize>, glyphs: Vec<Glyph>) -> GlyphRun {
        GlyphRun {
            face: Arc::clone(&self.face),
            font_size: self.font_size,
            script: self.script,
            level: self.level,
            source: Arc::clone(&self.source),
            range,
            glyphs,
        }
    }
}

/// A run placed on a line
#[derive(Debug, Clone)]
pub struct PositionedRun {
    pub run: GlyphRun,
    /// Pen position of the run's left edge, relative to the line start
    pub x: f32,
}

/// One line of a paragraph, ready to paint
#[derive(Debug, Clone)]
pub struct LayoutLine {
    /// Runs in visual order, left to right, spanning `0.0..width`
    pub runs: Vec<PositionedRun>,
    /// Whitespace and control characters at the logical end of the line, in
    /// logical order. They hang past the line edge and are never painted.
    pub trailing: Vec<GlyphRun>,
    /// Advance width of `runs`
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
    /// `ascent + descent`
    pub height: f32,
    /// Baseline distance from the top of the paragraph
    pub baseline: f32,
    /// Logical byte range, including any trailing whitespace or newline
    pub range: Range<usize>,
    /// Set when the line is wider than the wrap width
    pub overflow: bool,
}

impl LayoutLine {
    /// Top of the line measured from the top of the paragraph
    pub fn top(&self) -> f32 {
        self.baseline - self.ascent
    }

    pub fn missing_glyphs(&self) -> usize {
        self.runs
            .iter()
            .map(|p| &p.run)
            .chain(&self.trailing)
            .map(GlyphRun::notdef_count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::{Coverage, SyntheticFont};
    use crate::traits::FontRef;

    fn face() -> Arc<FontFace> {
        let font: Arc<dyn FontRef> = Arc::new(SyntheticFont::new(1000, 500.0, "abc ".chars()));
        Arc::new(
            FontFace::builder("Stub", font)
                .coverage(Coverage::from_chars("abc ".chars()))
                .build(),
        )
    }

    fn glyph(cluster: usize, id: GlyphId) -> Glyph {
        Glyph {
            id,
            cluster,
            x_advance: 10.0,
            y_advance: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
            kind: GlyphKind::Regular,
        }
    }

    fn run(level: u8, glyphs: Vec<Glyph>) -> GlyphRun {
        GlyphRun::new(face(), 20.0, Script::Latin, level, Arc::from("abc"), 0..3, glyphs)
    }

    #[test]
    fn clusters_tile_the_range() {
        let run = run(0, vec![glyph(0, 1), glyph(2, 3)]);
        let spans = run.clusters();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].range, 0..2);
        assert_eq!(spans[1].range, 2..3);
        assert_eq!(spans[1].glyphs, vec![1]);
    }

    #[test]
    fn rtl_clusters_are_logical() {
        let run = run(1, vec![glyph(2, 3), glyph(1, 2), glyph(0, 1)]);
        let spans = run.clusters();
        let starts: Vec<usize> = spans.iter().map(|s| s.range.start).collect();
        assert_eq!(starts, vec![0, 1, 2]);
        assert_eq!(spans[0].glyphs, vec![2]);
    }

    #[test]
    fn split_then_merge_restores_the_run() {
        let original = run(1, vec![glyph(2, 3), glyph(1, 2), glyph(0, 1)]);
        let (head, tail) = original.split_at(1).unwrap();
        assert_eq!(head.text(), "a");
        assert_eq!(tail.text(), "bc");
        assert_eq!(tail.glyphs().len(), 2);

        let merged = head.merge(&tail).unwrap();
        assert_eq!(merged.range(), 0..3);
        let ids: Vec<GlyphId> = merged.glyphs().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn split_rejects_non_boundaries() {
        let run = run(0, vec![glyph(0, 1), glyph(2, 3)]);
        assert!(run.split_at(1).is_none());
        assert!(run.split_at(0).is_none());
        assert!(run.split_at(3).is_none());
        assert!(run.split_at(2).is_some());
    }

    #[test]
    fn merge_refuses_gaps() {
        let a = run(0, vec![glyph(0, 1), glyph(1, 2), glyph(2, 3)]);
        let (head, tail) = a.split_at(1).unwrap();
        assert!(tail.merge(&head).is_none());
    }

    #[test]
    fn advance_and_metrics() {
        let run = run(0, vec![glyph(0, 1), glyph(1, 2), glyph(2, 3)]);
        assert_eq!(run.advance(), 30.0);
        assert_eq!(run.ascent(), 16.0);
        assert_eq!(run.descent(), 4.0);
    }
}
