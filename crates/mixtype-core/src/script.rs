//! Writing systems and text direction

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which way the text flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "ltr")]
    LeftToRight,
    #[serde(alias = "rtl")]
    RightToLeft,
}

impl Direction {
    /// Direction implied by a bidi embedding level (odd levels run right-to-left)
    pub fn from_level(level: u8) -> Self {
        if level % 2 == 1 {
            Direction::RightToLeft
        } else {
            Direction::LeftToRight
        }
    }

    pub fn is_rtl(self) -> bool {
        self == Direction::RightToLeft
    }
}

/// Writing system classification used for itemization, shaping and fallback
///
/// `Common`, `Inherited` and `Unknown` are script-neutral and never split a run.
/// `Emoji` is not a Unicode script value: pictographic symbols resolve to
/// `Common`, but fallback keeps a separate chain for them so they land on a
/// color emoji face instead of whatever text face happens to carry a few.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Script {
    Common,
    Inherited,
    Unknown,
    Arabic,
    Armenian,
    Bengali,
    Cyrillic,
    Devanagari,
    Emoji,
    Georgian,
    Greek,
    Gujarati,
    Gurmukhi,
    Han,
    Hangul,
    Hebrew,
    Hiragana,
    Kannada,
    Katakana,
    Khmer,
    Lao,
    Latin,
    Malayalam,
    Myanmar,
    Oriya,
    Sinhala,
    Tamil,
    Telugu,
    Thai,
    Tibetan,
    Other,
}

impl Script {
    /// All variants, in declaration order
    pub const ALL: [Script; 31] = [
        Script::Common,
        Script::Inherited,
        Script::Unknown,
        Script::Arabic,
        Script::Armenian,
        Script::Bengali,
        Script::Cyrillic,
        Script::Devanagari,
        Script::Emoji,
        Script::Georgian,
        Script::Greek,
        Script::Gujarati,
        Script::Gurmukhi,
        Script::Han,
        Script::Hangul,
        Script::Hebrew,
        Script::Hiragana,
        Script::Kannada,
        Script::Katakana,
        Script::Khmer,
        Script::Lao,
        Script::Latin,
        Script::Malayalam,
        Script::Myanmar,
        Script::Oriya,
        Script::Sinhala,
        Script::Tamil,
        Script::Telugu,
        Script::Thai,
        Script::Tibetan,
        Script::Other,
    ];

    /// Script-neutral values attach to whatever run surrounds them
    pub fn is_neutral(self) -> bool {
        matches!(self, Script::Common | Script::Inherited | Script::Unknown)
    }

    /// ISO 15924 tag handed to the shaper, when one exists
    pub fn iso15924(self) -> Option<&'static str> {
        let tag = match self {
            Script::Arabic => "Arab",
            Script::Armenian => "Armn",
            Script::Bengali => "Beng",
            Script::Cyrillic => "Cyrl",
            Script::Devanagari => "Deva",
            Script::Georgian => "Geor",
            Script::Greek => "Grek",
            Script::Gujarati => "Gujr",
            Script::Gurmukhi => "Guru",
            Script::Han => "Hani",
            Script::Hangul => "Hang",
            Script::Hebrew => "Hebr",
            Script::Hiragana => "Hira",
            Script::Kannada => "Knda",
            Script::Katakana => "Kana",
            Script::Khmer => "Khmr",
            Script::Lao => "Laoo",
            Script::Latin => "Latn",
            Script::Malayalam => "Mlym",
            Script::Myanmar => "Mymr",
            Script::Oriya => "Orya",
            Script::Sinhala => "Sinh",
            Script::Tamil => "Taml",
            Script::Telugu => "Telu",
            Script::Thai => "Thai",
            Script::Tibetan => "Tibt",
            Script::Common | Script::Emoji => "Zyyy",
            Script::Inherited => "Zinh",
            Script::Unknown | Script::Other => return None,
        };
        Some(tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            Script::Common => "Common",
            Script::Inherited => "Inherited",
            Script::Unknown => "Unknown",
            Script::Arabic => "Arabic",
            Script::Armenian => "Armenian",
            Script::Bengali => "Bengali",
            Script::Cyrillic => "Cyrillic",
            Script::Devanagari => "Devanagari",
            Script::Emoji => "Emoji",
            Script::Georgian => "Georgian",
            Script::Greek => "Greek",
            Script::Gujarati => "Gujarati",
            Script::Gurmukhi => "Gurmukhi",
            Script::Han => "Han",
            Script::Hangul => "Hangul",
            Script::Hebrew => "Hebrew",
            Script::Hiragana => "Hiragana",
            Script::Kannada => "Kannada",
            Script::Katakana => "Katakana",
            Script::Khmer => "Khmer",
            Script::Lao => "Lao",
            Script::Latin => "Latin",
            Script::Malayalam => "Malayalam",
            Script::Myanmar => "Myanmar",
            Script::Oriya => "Oriya",
            Script::Sinhala => "Sinhala",
            Script::Tamil => "Tamil",
            Script::Telugu => "Telugu",
            Script::Thai => "Thai",
            Script::Tibetan => "Tibetan",
            Script::Other => "Other",
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Script {
    type Err = String;

    /// Accepts the English name or the ISO 15924 tag, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Script::ALL
            .iter()
            .copied()
            .find(|script| {
                script.name().eq_ignore_ascii_case(wanted)
                    || script
                        .iso15924()
                        .is_some_and(|tag| tag.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| format!("unknown script: {s}"))
    }
}
