//! Line layout for shaped text
//!
//! Takes the glyph runs of one paragraph, in logical order, and produces
//! positioned lines:
//!
//! 1. Break opportunities come from UAX #14 and are kept only where they fall
//!    on a cluster boundary. Newlines force a break.
//! 2. Lines are filled greedily. Trailing whitespace and controls do not count
//!    towards the width. A line exceeds the wrap width only when a single run
//!    on it is wider than the wrap width by itself.
//! 3. Each line is reordered for display with bidi rule L2 over the
//!    embedding levels of its runs. Trailing blanks are set aside first
//!    (rule L1), so they never shift the painted text.
//! 4. A line is as tall as the tallest ascent plus the deepest descent of the
//!    faces on it, and all runs share its baseline.

use std::ops::Range;

use mixtype_core::{GlyphRun, LayoutLine, PositionedRun, WrapMode};
use mixtype_unicode::{visual_order, TextAnalyzer};

mod breaks;

use breaks::{break_lines, collect_clusters, units, visible_len, Cluster};

/// Breaks paragraphs into lines
pub struct LayoutEngine {
    analyzer: TextAnalyzer,
    wrap: WrapMode,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self {
            analyzer: TextAnalyzer::new(),
            wrap: WrapMode::default(),
        }
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn wrap(&self) -> WrapMode {
        self.wrap
    }

    /// Lay out `runs` with the engine's wrap mode
    pub fn layout(&self, runs: &[GlyphRun], max_width: Option<f32>) -> Vec<LayoutLine> {
        self.layout_with(runs, max_width, self.wrap)
    }

    /// Lay out `runs`, wrapping at `max_width` pixels
    ///
    /// `runs` must be the output of one shaping call: logical order, one
    /// source text, contiguous ranges. `None`, zero or a negative width
    /// turns wrapping off, leaving only forced breaks.
    pub fn layout_with(
        &self,
        runs: &[GlyphRun],
        max_width: Option<f32>,
        wrap: WrapMode,
    ) -> Vec<LayoutLine> {
        let Some(first) = runs.first() else {
            return Vec::new();
        };
        let max_width = max_width.filter(|width| *width > 0.0);

        let clusters = collect_clusters(runs);
        let source = first.source();
        let units = units(&self.analyzer, source, &clusters);
        let graphemes = grapheme_starts(&self.analyzer, source, &clusters);
        let line_ranges = break_lines(&clusters, &units, &graphemes, max_width, wrap);

        let mut lines = Vec::with_capacity(line_ranges.len());
        let mut top = 0.0;
        for range in line_ranges {
            let line = build_line(runs, &clusters[range], top, max_width);
            top += line.height;
            lines.push(line);
        }

        log::debug!(
            "Laid out {} runs into {} lines (max width {:?}, {:?})",
            runs.len(),
            lines.len(),
            max_width,
            wrap
        );
        lines
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lay out `runs` with a throwaway engine
pub fn layout(runs: &[GlyphRun], max_width: Option<f32>, wrap: WrapMode) -> Vec<LayoutLine> {
    LayoutEngine::new().layout_with(runs, max_width, wrap)
}

/// Absolute byte offsets where grapheme clusters start
fn grapheme_starts(analyzer: &TextAnalyzer, source: &str, clusters: &[Cluster]) -> Vec<usize> {
    let (Some(first), Some(last)) = (clusters.first(), clusters.last()) else {
        return Vec::new();
    };
    let start = first.range.start;
    source
        .get(start..last.range.end)
        .map(|text| {
            analyzer
                .graphemes(text)
                .into_iter()
                .map(|g| g.start + start)
                .collect()
        })
        .unwrap_or_default()
}

/// The part of `run` covering `range`, which must sit on cluster boundaries
fn slice_run(run: &GlyphRun, range: Range<usize>) -> Option<GlyphRun> {
    let mut piece = run.clone();
    if range.start > piece.range().start {
        piece = piece.split_at(range.start)?.1;
    }
    if range.end < piece.range().end {
        piece = piece.split_at(range.end)?.0;
    }
    Some(piece)
}

/// Slices of `runs` covering `clusters`, with neighbours of one run joined
fn pieces(runs: &[GlyphRun], clusters: &[Cluster]) -> Vec<GlyphRun> {
    let mut pieces: Vec<GlyphRun> = Vec::new();
    let mut start = 0;
    while start < clusters.len() {
        let run_index = clusters[start].run;
        let mut end = start + 1;
        while end < clusters.len() && clusters[end].run == run_index {
            end += 1;
        }
        let bytes = clusters[start].range.start..clusters[end - 1].range.end;
        match runs.get(run_index).and_then(|run| slice_run(run, bytes.clone())) {
            Some(piece) => match pieces.last().and_then(|last| last.merge(&piece)) {
                Some(joined) => {
                    if let Some(last) = pieces.last_mut() {
                        *last = joined;
                    }
                }
                None => pieces.push(piece),
            },
            None => log::warn!("Could not cut run {run_index} at {bytes:?}"),
        }
        start = end;
    }
    pieces
}

fn build_line(
    runs: &[GlyphRun],
    clusters: &[Cluster],
    top: f32,
    max_width: Option<f32>,
) -> LayoutLine {
    // Trailing blanks stay out of the visual order so the painted runs span
    // exactly 0..width whatever the paragraph direction
    let (visible, trailing) = clusters.split_at(visible_len(clusters));
    let body = pieces(runs, visible);
    let trailing = pieces(runs, trailing);

    let levels: Vec<u8> = body.iter().map(GlyphRun::level).collect();
    let mut width = 0.0;
    let mut positioned = Vec::with_capacity(body.len());
    for index in visual_order(&levels) {
        if let Some(run) = body.get(index) {
            positioned.push(PositionedRun {
                run: run.clone(),
                x: width,
            });
            width += run.advance();
        }
    }

    let faces = || body.iter().chain(&trailing);
    let ascent = faces().map(GlyphRun::ascent).fold(0.0, f32::max);
    let descent = faces().map(GlyphRun::descent).fold(0.0, f32::max);
    let range = match (clusters.first(), clusters.last()) {
        (Some(first), Some(last)) => first.range.start..last.range.end,
        _ => 0..0,
    };

    LayoutLine {
        runs: positioned,
        trailing,
        width,
        ascent,
        descent,
        height: ascent + descent,
        baseline: top + ascent,
        range,
        overflow: max_width.is_some_and(|max| width > max + 1e-3),
    }
}
