//! Reading font files into `FontFace`s
//!
//! A file yields one face per font in it (collections yield several). Every
//! face gets its family name, weight, style, vertical metrics and the code
//! points its cmap maps, counted per script for fallback ordering.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use read_fonts::FileRef;
use skrifa::instance::{LocationRef, Size};
use skrifa::string::StringId;
use skrifa::{attribute::Style, MetadataProvider};

use mixtype_core::{
    Coverage, FaceSource, FontFace, FontLoadError, FontMetrics, FontRef, FontStyle, Script,
    SyntheticFont,
};
use mixtype_unicode::TextAnalyzer;

use crate::font::Font;

/// Extensions picked up when scanning directories
pub const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];

pub fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FONT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Load every face of a font file no larger than `max_size` bytes
pub fn load_file(
    path: &Path,
    max_size: u64,
    analyzer: &TextAnalyzer,
) -> Result<Vec<FontFace>, FontLoadError> {
    let meta = fs::metadata(path).map_err(|e| io_error(path, e))?;
    if meta.len() > max_size {
        return Err(FontLoadError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            limit: max_size,
        });
    }
    let data = fs::read(path).map_err(|e| io_error(path, e))?;
    let source_name = path.display().to_string();
    load_data(Arc::from(data), &source_name, analyzer, |index| {
        FaceSource::File {
            path: path.to_path_buf(),
            index,
        }
    })
}

/// Load every face found in `data`
///
/// `source` names each face's origin from its collection index.
pub fn load_data(
    data: Arc<[u8]>,
    source_name: &str,
    analyzer: &TextAnalyzer,
    source: impl Fn(u32) -> FaceSource,
) -> Result<Vec<FontFace>, FontLoadError> {
    let face_count = match FileRef::new(&data) {
        Ok(FileRef::Font(_)) => 1,
        Ok(FileRef::Collection(collection)) => collection.len(),
        Err(e) => {
            return Err(FontLoadError::InvalidData {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })
        }
    };

    let mut faces = Vec::with_capacity(face_count as usize);
    for index in 0..face_count {
        match load_face(Arc::clone(&data), index, source_name, analyzer, source(index)) {
            Ok(face) => faces.push(face),
            Err(e) => log::warn!("Skipping face {index} of {source_name}: {e}"),
        }
    }

    if faces.is_empty() {
        return Err(FontLoadError::NoFaces(source_name.to_string()));
    }
    Ok(faces)
}

fn load_face(
    data: Arc<[u8]>,
    index: u32,
    source_name: &str,
    analyzer: &TextAnalyzer,
    source: FaceSource,
) -> Result<FontFace, FontLoadError> {
    let invalid = |reason: String| FontLoadError::InvalidData {
        source_name: source_name.to_string(),
        reason,
    };

    let font = Font::new(Arc::clone(&data), index, source_name)?;
    let skrifa_font =
        skrifa::FontRef::from_index(&data, index).map_err(|e| invalid(e.to_string()))?;

    let family = family_name(&skrifa_font).unwrap_or_else(|| fallback_family(source_name));

    let attributes = skrifa_font.attributes();
    let weight = attributes.weight.value().round().clamp(1.0, 1000.0) as u16;
    let style = match attributes.style {
        Style::Normal => FontStyle::Normal,
        Style::Italic => FontStyle::Italic,
        Style::Oblique(_) => FontStyle::Oblique,
    };

    let raw = skrifa_font.metrics(Size::unscaled(), LocationRef::default());
    let metrics = FontMetrics {
        units_per_em: raw.units_per_em.max(1),
        ascent: raw.ascent,
        descent: raw.descent,
        line_gap: raw.leading,
    };

    let chars: Vec<char> = skrifa_font
        .charmap()
        .mappings()
        .filter(|(_, gid)| gid.to_u32() != 0)
        .filter_map(|(cp, _)| char::from_u32(cp))
        .collect();
    if chars.is_empty() {
        return Err(invalid(format!("face {index} maps no characters")));
    }
    let script_coverage = count_scripts(&chars, analyzer);

    log::debug!(
        "Loaded '{family}' w{weight} {style} from {source_name}#{index}: {} code points",
        chars.len()
    );

    let font: Arc<dyn FontRef> = Arc::new(font);
    Ok(FontFace::builder(family, font)
        .weight(weight)
        .style(style)
        .source(source)
        .metrics(metrics)
        .coverage(Coverage::from_chars(chars))
        .script_coverage(script_coverage)
        .build())
}

/// Typographic family (name ID 16) when present, else the legacy family (ID 1)
fn family_name(font: &skrifa::FontRef<'_>) -> Option<String> {
    [StringId::TYPOGRAPHIC_FAMILY_NAME, StringId::FAMILY_NAME]
        .into_iter()
        .find_map(|id| {
            let name: String = font
                .localized_strings(id)
                .english_or_first()?
                .chars()
                .collect();
            let name = name.trim().to_string();
            (!name.is_empty()).then_some(name)
        })
}

fn fallback_family(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(source_name)
        .to_string()
}

/// Code points per fallback class
pub fn count_scripts(chars: &[char], analyzer: &TextAnalyzer) -> BTreeMap<Script, u32> {
    let mut counts = BTreeMap::new();
    for &ch in chars {
        *counts.entry(analyzer.fallback_class(ch)).or_insert(0) += 1;
    }
    counts
}

/// A face with no font bytes covering exactly `chars`
///
/// Glyphs get fixed advances and paint as boxes. Finish the returned builder
/// with weight and style as needed.
pub fn synthetic_face(
    family: &str,
    chars: &str,
    advance: f32,
    metrics: FontMetrics,
    analyzer: &TextAnalyzer,
) -> mixtype_core::face::FontFaceBuilder {
    let font = SyntheticFont::new(metrics.units_per_em, advance, chars.chars());
    let covered: Vec<char> = font.chars().to_vec();
    let script_coverage = count_scripts(&covered, analyzer);
    let font: Arc<dyn FontRef> = Arc::new(font);
    FontFace::builder(family, font)
        .metrics(metrics)
        .coverage(Coverage::from_chars(covered))
        .script_coverage(script_coverage)
}

fn io_error(path: &Path, error: std::io::Error) -> FontLoadError {
    if error.kind() == ErrorKind::NotFound {
        FontLoadError::FileNotFound(path.to_path_buf())
    } else {
        FontLoadError::Io {
            path: path.to_path_buf(),
            source: error,
        }
    }
}
