//! Choosing where lines end
//!
//! Works on a flat list of clusters taken from the runs of one paragraph.
//! Text between two break opportunities is a unit; units are packed greedily.
//! A unit too wide for any line is cut into pieces first: at run boundaries in
//! [`WrapMode::Word`], at grapheme boundaries in [`WrapMode::WordChar`].

use std::ops::Range;

use mixtype_core::{GlyphKind, GlyphRun, WrapMode};
use mixtype_unicode::TextAnalyzer;

/// Rounding slack when comparing widths
const EPSILON: f32 = 1e-3;

/// One cluster of one run, in logical order
#[derive(Debug, Clone)]
pub(crate) struct Cluster {
    pub range: Range<usize>,
    /// Index of the run the cluster came from
    pub run: usize,
    pub advance: f32,
    /// Whitespace or a control character: takes no room at the end of a line
    pub blank: bool,
}

/// Clusters between two break opportunities
#[derive(Debug, Clone)]
pub(crate) struct Unit {
    pub clusters: Range<usize>,
    /// A line must end after this unit
    pub mandatory: bool,
}

pub(crate) fn collect_clusters(runs: &[GlyphRun]) -> Vec<Cluster> {
    let mut clusters = Vec::new();
    for (index, run) in runs.iter().enumerate() {
        let glyphs = run.glyphs();
        for span in run.clusters() {
            let advance = span
                .glyphs
                .iter()
                .filter_map(|&g| glyphs.get(g))
                .map(|g| g.x_advance)
                .sum();
            let whitespace = run
                .source()
                .get(span.range.clone())
                .is_some_and(|text| text.chars().all(char::is_whitespace));
            let control = !span.glyphs.is_empty()
                && span
                    .glyphs
                    .iter()
                    .filter_map(|&g| glyphs.get(g))
                    .all(|g| g.kind == GlyphKind::Control);
            clusters.push(Cluster {
                range: span.range,
                run: index,
                advance,
                blank: whitespace || control,
            });
        }
    }
    clusters
}

/// Full width and width without trailing blanks
pub(crate) fn widths(clusters: &[Cluster]) -> (f32, f32) {
    let full: f32 = clusters.iter().map(|c| c.advance).sum();
    let trailing: f32 = clusters[visible_len(clusters)..]
        .iter()
        .map(|c| c.advance)
        .sum();
    (full, full - trailing)
}

/// Number of clusters up to and including the last one that is not blank
pub(crate) fn visible_len(clusters: &[Cluster]) -> usize {
    clusters.iter().rposition(|c| !c.blank).map_or(0, |i| i + 1)
}

/// Cut the clusters into units at the break opportunities that fall on a
/// cluster boundary
pub(crate) fn units(analyzer: &TextAnalyzer, source: &str, clusters: &[Cluster]) -> Vec<Unit> {
    let (Some(first), Some(last)) = (clusters.first(), clusters.last()) else {
        return Vec::new();
    };
    let start = first.range.start;
    let breaks = source
        .get(start..last.range.end)
        .map(|text| analyzer.line_breaks(text))
        .unwrap_or_default();

    let mut units = Vec::new();
    let mut unit_start = 0;
    let mut pending = breaks.iter().peekable();
    for (index, cluster) in clusters.iter().enumerate().skip(1) {
        while pending
            .next_if(|b| b.offset + start < cluster.range.start)
            .is_some()
        {}
        if let Some(opportunity) = pending.next_if(|b| b.offset + start == cluster.range.start) {
            units.push(Unit {
                clusters: unit_start..index,
                mandatory: opportunity.mandatory,
            });
            unit_start = index;
        }
    }
    units.push(Unit {
        clusters: unit_start..clusters.len(),
        mandatory: false,
    });
    units
}

/// Cluster index ranges of every line
pub(crate) fn break_lines(
    clusters: &[Cluster],
    units: &[Unit],
    graphemes: &[usize],
    max_width: Option<f32>,
    wrap: WrapMode,
) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for unit in units {
        let pieces = match max_width {
            Some(max) if widths(&clusters[unit.clusters.clone()]).1 > max + EPSILON => {
                split_unit(clusters, unit.clusters.clone(), graphemes, wrap)
            }
            _ => vec![unit.clusters.clone()],
        };

        for piece in pieces {
            if let (Some(max), Some(line)) = (max_width, current.as_ref()) {
                let (line_full, _) = widths(&clusters[line.clone()]);
                let (_, piece_visible) = widths(&clusters[piece.clone()]);
                if piece_visible > 0.0 && line_full + piece_visible > max + EPSILON {
                    lines.extend(current.take());
                }
            }
            current = Some(match current.take() {
                Some(line) => line.start..piece.end,
                None => piece,
            });
        }

        if unit.mandatory {
            lines.extend(current.take());
        }
    }
    lines.extend(current);
    lines
}

/// Pieces of a unit that cannot fit on a line of its own
fn split_unit(
    clusters: &[Cluster],
    unit: Range<usize>,
    graphemes: &[usize],
    wrap: WrapMode,
) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut piece_start = unit.start;
    for index in unit.start + 1..unit.end {
        let (Some(prev), Some(next)) = (clusters.get(index - 1), clusters.get(index)) else {
            continue;
        };
        let cut = match wrap {
            WrapMode::Word => prev.run != next.run,
            WrapMode::WordChar => {
                prev.run != next.run || graphemes.binary_search(&next.range.start).is_ok()
            }
        };
        if cut {
            pieces.push(piece_start..index);
            piece_start = index;
        }
    }
    pieces.push(piece_start..unit.end);
    pieces
}
