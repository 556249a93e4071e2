//! Unicode analysis for Mixtype: scripts, bidi levels, graphemes and line breaks.
//!
//! Shaping needs text cut into runs of one script and one embedding level;
//! layout needs to know where lines may end. Both questions are answered here
//! from ICU4X data (baked in at compile time) and `unicode-bidi`.

use std::ops::Range;

use icu_properties::{
    props::{DefaultIgnorableCodePoint, ExtendedPictographic, Script as IcuScript},
    CodePointMapData, CodePointMapDataBorrowed, CodePointSetData, CodePointSetDataBorrowed,
};
use icu_segmenter::{options::LineBreakOptions, GraphemeClusterSegmenter, LineSegmenter};
use mixtype_core::{Direction, Script};
use unicode_bidi::{BidiInfo, Level};

/// A maximal stretch of text with one script and one embedding level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    pub range: Range<usize>,
    /// The first significant script in the run, `Common` when there is none
    pub script: Script,
    pub level: u8,
}

impl ScriptRun {
    pub fn direction(&self) -> Direction {
        Direction::from_level(self.level)
    }
}

/// A position where a line may end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakOpportunity {
    /// Byte offset of the first character of the next line
    pub offset: usize,
    /// The line must end here (after a newline or paragraph separator)
    pub mandatory: bool,
}

/// Characters that end a line no matter how much room is left
pub fn is_line_separator(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// C0/C1 controls, which get a zero-width control glyph instead of a shaped one
pub fn is_control(ch: char) -> bool {
    ch.is_control()
}

/// Script and break analysis backed by ICU data
pub struct TextAnalyzer {
    script_map: CodePointMapDataBorrowed<'static, IcuScript>,
    pictographic: CodePointSetDataBorrowed<'static>,
    ignorable: CodePointSetDataBorrowed<'static>,
}

impl TextAnalyzer {
    pub fn new() -> Self {
        Self {
            script_map: CodePointMapData::<IcuScript>::new(),
            pictographic: CodePointSetData::new::<ExtendedPictographic>(),
            ignorable: CodePointSetData::new::<DefaultIgnorableCodePoint>(),
        }
    }

    /// The Unicode script of a character
    pub fn script_of(&self, ch: char) -> Script {
        map_script(self.script_map.get(ch))
    }

    /// Pictographic symbols outside Latin-1 (emoji and their older dingbat kin)
    pub fn is_emoji(&self, ch: char) -> bool {
        u32::from(ch) > 0xFF && self.pictographic.contains(ch)
    }

    /// Format characters a font is not expected to map (ZWJ, variation selectors, ...)
    pub fn is_default_ignorable(&self, ch: char) -> bool {
        self.ignorable.contains(ch)
    }

    /// The chain a character falls back through: its script, or `Emoji`
    pub fn fallback_class(&self, ch: char) -> Script {
        if self.is_emoji(ch) {
            Script::Emoji
        } else {
            self.script_of(ch)
        }
    }

    /// The first significant script among a cluster's characters
    pub fn cluster_script(&self, cluster: &str) -> Script {
        cluster
            .chars()
            .map(|ch| self.script_of(ch))
            .find(|script| !script.is_neutral())
            .unwrap_or(Script::Common)
    }

    /// Fallback class of a whole cluster: `Emoji` if it holds a pictograph,
    /// else its first significant script
    pub fn cluster_class(&self, cluster: &str) -> Script {
        if cluster.chars().any(|ch| self.is_emoji(ch)) {
            Script::Emoji
        } else {
            self.cluster_script(cluster)
        }
    }

    /// Extended grapheme clusters as byte ranges
    pub fn graphemes(&self, text: &str) -> Vec<Range<usize>> {
        let boundaries: Vec<usize> = GraphemeClusterSegmenter::new().segment_str(text).collect();
        boundaries
            .windows(2)
            .filter(|pair| pair[0] < pair[1])
            .map(|pair| pair[0]..pair[1])
            .collect()
    }

    /// Resolved embedding level for every byte of `text`
    ///
    /// `base` forces the paragraph direction; `None` takes it from the first
    /// strong character, as UAX #9 rules P2 and P3 do.
    pub fn bidi_levels(&self, text: &str, base: Option<Direction>) -> Vec<u8> {
        if text.is_empty() {
            return Vec::new();
        }
        let base_level = base.map(|direction| match direction {
            Direction::LeftToRight => Level::ltr(),
            Direction::RightToLeft => Level::rtl(),
        });
        let bidi = BidiInfo::new(text, base_level);
        bidi.levels.iter().map(|level| level.number()).collect()
    }

    /// Split text into maximal runs of one significant script and one level
    ///
    /// Common and Inherited clusters never start a run of their own: they join
    /// the run they sit in. Runs tile the text exactly.
    pub fn itemize(&self, text: &str, base: Option<Direction>) -> Vec<ScriptRun> {
        if text.is_empty() {
            return Vec::new();
        }
        let levels = self.bidi_levels(text, base);
        let mut runs: Vec<ScriptRun> = Vec::new();
        let mut current: Option<ScriptRun> = None;

        for cluster in self.graphemes(text) {
            let script = self.cluster_script(&text[cluster.clone()]);
            let level = levels.get(cluster.start).copied().unwrap_or(0);

            match current.as_mut() {
                Some(run)
                    if run.level == level
                        && (script.is_neutral()
                            || run.script.is_neutral()
                            || run.script == script) =>
                {
                    if run.script.is_neutral() && !script.is_neutral() {
                        run.script = script;
                    }
                    run.range.end = cluster.end;
                }
                _ => {
                    if let Some(done) = current.take() {
                        runs.push(done);
                    }
                    current = Some(ScriptRun {
                        range: cluster,
                        script,
                        level,
                    });
                }
            }
        }
        runs.extend(current);
        log::trace!("Itemized {} bytes into {} runs", text.len(), runs.len());
        runs
    }

    /// UAX #14 break opportunities, excluding the start and end of the text
    ///
    /// Khmer, Lao, Myanmar and Thai have no spaces between words; ICU finds
    /// their opportunities with its dictionary and LSTM models.
    pub fn line_breaks(&self, text: &str) -> Vec<BreakOpportunity> {
        let segmenter = LineSegmenter::new_auto(LineBreakOptions::default());
        let mut breaks: Vec<BreakOpportunity> = segmenter
            .segment_str(text)
            .filter(|&offset| offset > 0 && offset < text.len())
            .map(|offset| BreakOpportunity {
                offset,
                mandatory: text[..offset]
                    .chars()
                    .next_back()
                    .is_some_and(is_line_separator),
            })
            .collect();

        // Hard breaks ICU folded into a CRLF pair or skipped are still hard breaks
        for (index, ch) in text.char_indices() {
            let offset = index + ch.len_utf8();
            if !is_line_separator(ch) || offset >= text.len() {
                continue;
            }
            if ch == '\r' && text[offset..].starts_with('\n') {
                continue;
            }
            match breaks.binary_search_by_key(&offset, |b| b.offset) {
                Ok(found) => breaks[found].mandatory = true,
                Err(insert_at) => breaks.insert(
                    insert_at,
                    BreakOpportunity {
                        offset,
                        mandatory: true,
                    },
                ),
            }
        }
        breaks
    }
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Visual order of items with the given embedding levels (UAX #9 rule L2)
///
/// From the highest level down to the lowest odd level, every maximal
/// sequence at or above the current level is reversed. Returns logical
/// indices in left-to-right display order.
pub fn visual_order(levels: &[u8]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..levels.len()).collect();
    let Some(&highest) = levels.iter().max() else {
        return order;
    };
    let lowest_odd = levels
        .iter()
        .copied()
        .filter(|level| level % 2 == 1)
        .min()
        .unwrap_or(highest + 1);

    let mut level = highest;
    while level >= lowest_odd && level > 0 {
        let mut i = 0;
        while i < order.len() {
            if levels[order[i]] >= level {
                let start = i;
                while i < order.len() && levels[order[i]] >= level {
                    i += 1;
                }
                order[start..i].reverse();
            } else {
                i += 1;
            }
        }
        level -= 1;
    }
    order
}

fn map_script(script: IcuScript) -> Script {
    match script {
        IcuScript::Common => Script::Common,
        IcuScript::Inherited => Script::Inherited,
        IcuScript::Unknown => Script::Unknown,
        IcuScript::Arabic => Script::Arabic,
        IcuScript::Armenian => Script::Armenian,
        IcuScript::Bengali => Script::Bengali,
        IcuScript::Cyrillic => Script::Cyrillic,
        IcuScript::Devanagari => Script::Devanagari,
        IcuScript::Georgian => Script::Georgian,
        IcuScript::Greek => Script::Greek,
        IcuScript::Gujarati => Script::Gujarati,
        IcuScript::Gurmukhi => Script::Gurmukhi,
        IcuScript::Han => Script::Han,
        IcuScript::Hangul => Script::Hangul,
        IcuScript::Hebrew => Script::Hebrew,
        IcuScript::Hiragana => Script::Hiragana,
        IcuScript::Kannada => Script::Kannada,
        IcuScript::Katakana => Script::Katakana,
        IcuScript::Khmer => Script::Khmer,
        IcuScript::Lao => Script::Lao,
        IcuScript::Latin => Script::Latin,
        IcuScript::Malayalam => Script::Malayalam,
        IcuScript::Myanmar => Script::Myanmar,
        IcuScript::Oriya => Script::Oriya,
        IcuScript::Sinhala => Script::Sinhala,
        IcuScript::Tamil => Script::Tamil,
        IcuScript::Telugu => Script::Telugu,
        IcuScript::Thai => Script::Thai,
        IcuScript::Tibetan => Script::Tibetan,
        _ => Script::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analyzer() -> TextAnalyzer {
        TextAnalyzer::new()
    }

    #[test]
    fn scripts_of_mixed_text() {
        let a = analyzer();
        assert_eq!(a.script_of('A'), Script::Latin);
        assert_eq!(a.script_of('ក'), Script::Khmer);
        assert_eq!(a.script_of('漢'), Script::Han);
        assert_eq!(a.script_of(' '), Script::Common);
        assert_eq!(a.script_of('\u{17D2}'), Script::Khmer);
        assert_eq!(a.script_of('😀'), Script::Common);
    }

    #[test]
    fn emoji_get_their_own_fallback_class() {
        let a = analyzer();
        assert_eq!(a.fallback_class('😀'), Script::Emoji);
        assert_eq!(a.fallback_class('☀'), Script::Emoji);
        assert_eq!(a.fallback_class('A'), Script::Latin);
        assert_eq!(a.fallback_class('©'), Script::Common);
        assert_eq!(a.cluster_class("👍🏽"), Script::Emoji);
    }

    #[test]
    fn ignorables() {
        let a = analyzer();
        assert!(a.is_default_ignorable('\u{200D}'));
        assert!(a.is_default_ignorable('\u{FE0F}'));
        assert!(!a.is_default_ignorable('a'));
    }

    #[test]
    fn khmer_vowel_sign_joins_its_base() {
        let text = "សីក";
        let clusters = analyzer().graphemes(text);
        assert_eq!(clusters, vec![0..6, 6..9]);
    }

    #[test]
    fn itemize_latin_then_khmer() {
        let text = "Hello សួស្តី";
        let runs = analyzer().itemize(text, None);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].script, Script::Latin);
        assert_eq!(runs[0].range, 0..6);
        assert_eq!(runs[1].script, Script::Khmer);
        assert_eq!(runs[1].range, 6..text.len());
    }

    #[test]
    fn itemize_leading_neutrals_join_first_script() {
        let runs = analyzer().itemize("123 abc", None);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].script, Script::Latin);
    }

    #[test]
    fn itemize_all_neutral_is_common() {
        let runs = analyzer().itemize("... !!", None);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].script, Script::Common);
    }

    #[test]
    fn itemize_splits_on_bidi_level() {
        let text = "A\u{05D0}\u{05D1}B";
        let runs = analyzer().itemize(text, None);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].level, 0);
        assert_eq!(runs[1].level, 1);
        assert_eq!(runs[1].script, Script::Hebrew);
        assert_eq!(runs[1].direction(), Direction::RightToLeft);
        assert_eq!(runs[2].level, 0);
    }

    #[test]
    fn forced_rtl_paragraph() {
        let levels = analyzer().bidi_levels("abc", Some(Direction::RightToLeft));
        assert!(levels.iter().all(|&level| level == 2));
    }

    #[test]
    fn line_breaks_after_spaces_and_newlines() {
        let text = "one two\nthree";
        let breaks = analyzer().line_breaks(text);
        assert!(breaks.contains(&BreakOpportunity {
            offset: 4,
            mandatory: false
        }));
        assert!(breaks.contains(&BreakOpportunity {
            offset: 8,
            mandatory: true
        }));
    }

    #[test]
    fn crlf_is_one_hard_break() {
        let breaks = analyzer().line_breaks("a\r\nb");
        assert_eq!(
            breaks,
            vec![BreakOpportunity {
                offset: 3,
                mandatory: true
            }]
        );
    }

    #[test]
    fn no_break_inside_a_word() {
        assert!(analyzer().line_breaks("word").is_empty());
    }

    #[test]
    fn visual_order_reverses_rtl_runs() {
        assert_eq!(visual_order(&[0, 1, 1, 0]), vec![0, 2, 1, 3]);
        assert_eq!(visual_order(&[1, 1, 1]), vec![2, 1, 0]);
        assert_eq!(visual_order(&[0, 0]), vec![0, 1]);
        // LTR number embedded in RTL text keeps its own order
        assert_eq!(visual_order(&[1, 2, 2, 1]), vec![3, 1, 2, 0]);
        assert!(visual_order(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn itemized_runs_tile_the_text(text in "[a-zA-Z \u{1780}-\u{17FF}\u{05D0}-\u{05EA}0-9,.!]{1,40}") {
            let runs = analyzer().itemize(&text, None);
            prop_assert!(!runs.is_empty());
            prop_assert_eq!(runs[0].range.start, 0);
            prop_assert_eq!(runs.last().unwrap().range.end, text.len());
            for pair in runs.windows(2) {
                prop_assert_eq!(pair[0].range.end, pair[1].range.start);
            }
        }

        #[test]
        fn visual_order_is_a_permutation(levels in proptest::collection::vec(0u8..4, 0..20)) {
            let mut order = visual_order(&levels);
            order.sort_unstable();
            prop_assert_eq!(order, (0..levels.len()).collect::<Vec<_>>());
        }

        #[test]
        fn graphemes_tile_the_text(text in "\\PC{0,30}") {
            let clusters = analyzer().graphemes(&text);
            let joined: String = clusters.iter().map(|r| &text[r.clone()]).collect();
            prop_assert_eq!(joined, text);
        }
    }
}
