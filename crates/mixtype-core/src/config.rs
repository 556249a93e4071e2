//! Engine configuration
//!
//! Loaded from TOML, then optionally overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `MIXTYPE_FONT_DIRS` | `font_dirs` (platform path list, replaces the configured dirs) |
//! | `MIXTYPE_DEFAULT_FAMILY` | `default_family` |
//! | `MIXTYPE_MAX_CANVAS` | `max_canvas_dimension` |
//! | `MIXTYPE_SHAPING_CACHE` | `shaping_cache_capacity` (0 disables the cache) |
//!
//! ```
//! use mixtype_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     font_dirs = ["/opt/fonts"]
//!     default_family = "Noto Sans"
//!
//!     [script_fallback]
//!     Khmer = ["Siemreap", "Khmer OS"]
//! "#).unwrap();
//! assert_eq!(config.script_fallback["Khmer"][0], "Siemreap");
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MixtypeError;
use crate::request::DEFAULT_FAMILY;
use crate::Result;

/// Largest font file the registry will read
pub const DEFAULT_MAX_FONT_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Largest canvas side, in pixels
pub const DEFAULT_MAX_CANVAS_DIMENSION: u32 = 16_384;

/// Largest canvas area, in pixels
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directories scanned recursively for font files
    pub font_dirs: Vec<PathBuf>,
    /// Individual font files loaded in addition to the directories
    pub font_files: Vec<PathBuf>,
    /// Family used when a request names one the registry does not know
    pub default_family: String,
    pub max_canvas_dimension: u32,
    pub max_canvas_pixels: u64,
    pub max_font_file_size: u64,
    /// Entries kept in the shaping cache; 0 disables it
    pub shaping_cache_capacity: usize,
    /// Preferred families per script, keyed by script name (`Khmer`, `Emoji`, ...)
    pub script_fallback: BTreeMap<String, Vec<String>>,
    /// Families tried first when a face of the keyed family lacks a character
    pub family_fallback: BTreeMap<String, Vec<String>>,
    /// Generic names expanded to concrete families (`sans-serif`, `emoji`, ...)
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut script_fallback = BTreeMap::new();
        script_fallback.insert("Khmer".to_string(), strings(&["Siemreap", "Noto Sans Khmer"]));
        script_fallback.insert("Emoji".to_string(), strings(&["Noto Color Emoji"]));
        script_fallback.insert("Latin".to_string(), strings(&["Noto Sans", "DejaVu Sans"]));
        for cjk in ["Han", "Hiragana", "Katakana", "Hangul"] {
            script_fallback.insert(
                cjk.to_string(),
                strings(&["Noto Sans CJK SC", "Noto Sans CJK JP", "Noto Sans CJK KR"]),
            );
        }

        let mut aliases = BTreeMap::new();
        aliases.insert("sans-serif".to_string(), strings(&["Noto Sans", "DejaVu Sans"]));
        aliases.insert("serif".to_string(), strings(&["Noto Serif", "DejaVu Serif"]));
        aliases.insert(
            "monospace".to_string(),
            strings(&["Noto Sans Mono", "DejaVu Sans Mono"]),
        );
        aliases.insert("emoji".to_string(), strings(&["Noto Color Emoji"]));

        Self {
            font_dirs: system_font_dirs(),
            font_files: Vec::new(),
            default_family: DEFAULT_FAMILY.to_string(),
            max_canvas_dimension: DEFAULT_MAX_CANVAS_DIMENSION,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
            max_font_file_size: DEFAULT_MAX_FONT_FILE_SIZE,
            shaping_cache_capacity: 0,
            script_fallback,
            family_fallback: BTreeMap::new(),
            aliases,
        }
    }
}

impl EngineConfig {
    /// A configuration that loads no fonts from disk
    pub fn without_system_fonts() -> Self {
        Self {
            font_dirs: Vec::new(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| MixtypeError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            MixtypeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&source)?;
        log::debug!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `MIXTYPE_*` variables from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if let Some(dirs) = lookup("MIXTYPE_FONT_DIRS") {
            self.font_dirs = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            log::debug!("MIXTYPE_FONT_DIRS overrides font dirs: {:?}", self.font_dirs);
        }
        if let Some(family) = lookup("MIXTYPE_DEFAULT_FAMILY") {
            let family = family.trim();
            if !family.is_empty() {
                self.default_family = family.to_string();
            }
        }
        if let Some(value) = lookup("MIXTYPE_MAX_CANVAS") {
            self.max_canvas_dimension = parse_number("MIXTYPE_MAX_CANVAS", &value)?;
        }
        if let Some(value) = lookup("MIXTYPE_SHAPING_CACHE") {
            self.shaping_cache_capacity = parse_number("MIXTYPE_SHAPING_CACHE", &value)?;
        }
        Ok(self)
    }

    /// Check values that would make the engine useless
    pub fn validate(&self) -> Result<()> {
        if self.max_canvas_dimension == 0 || self.max_canvas_pixels == 0 {
            return Err(MixtypeError::Config(
                "canvas ceilings must be non-zero".into(),
            ));
        }
        if self.max_font_file_size == 0 {
            return Err(MixtypeError::Config(
                "max_font_file_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MixtypeError::Config(format!("{key} must be a number, got '{value}'")))
}

/// Font directories that exist on this machine
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "macos")]
    {
        candidates.push(PathBuf::from("/System/Library/Fonts"));
        candidates.push(PathBuf::from("/Library/Fonts"));
    }

    #[cfg(target_os = "windows")]
    {
        candidates.push(PathBuf::from("C:\\Windows\\Fonts"));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        candidates.push(PathBuf::from("/usr/share/fonts"));
        candidates.push(PathBuf::from("/usr/local/share/fonts"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        candidates.push(home.join(".fonts"));
        candidates.push(home.join(".local/share/fonts"));
    }

    candidates.into_iter().filter(|dir| dir.is_dir()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prefer_the_service_fonts() {
        let config = EngineConfig::default();
        assert_eq!(config.default_family, "Noto Sans");
        assert_eq!(config.script_fallback["Khmer"][0], "Siemreap");
        assert_eq!(config.script_fallback["Emoji"][0], "Noto Color Emoji");
        assert_eq!(config.shaping_cache_capacity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            font_dirs = []
            max_canvas_dimension = 512

            [aliases]
            khmer = ["Siemreap"]
            "#,
        )
        .unwrap();
        assert!(config.font_dirs.is_empty());
        assert_eq!(config.max_canvas_dimension, 512);
        assert_eq!(config.max_canvas_pixels, DEFAULT_MAX_CANVAS_PIXELS);
        assert_eq!(config.aliases["khmer"], vec!["Siemreap".to_string()]);
        assert!(!config.aliases.contains_key("serif"));
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = EngineConfig::from_toml_str("max_canvas_dimension = \"big\"").unwrap_err();
        assert!(matches!(err, MixtypeError::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let config = EngineConfig::without_system_fonts()
            .with_overrides_from(|key| match key {
                "MIXTYPE_DEFAULT_FAMILY" => Some("DejaVu Sans".into()),
                "MIXTYPE_MAX_CANVAS" => Some("2048".into()),
                "MIXTYPE_SHAPING_CACHE" => Some(" 256 ".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.default_family, "DejaVu Sans");
        assert_eq!(config.max_canvas_dimension, 2048);
        assert_eq!(config.shaping_cache_capacity, 256);
        assert!(config.font_dirs.is_empty());
    }

    #[test]
    fn bad_env_number_is_rejected() {
        let result = EngineConfig::without_system_fonts()
            .with_overrides_from(|key| (key == "MIXTYPE_MAX_CANVAS").then(|| "huge".into()));
        assert!(matches!(result, Err(MixtypeError::Config(_))));
    }

    #[test]
    fn zero_ceiling_fails_validation() {
        let config = EngineConfig {
            max_canvas_pixels: 0,
            ..EngineConfig::without_system_fonts()
        };
        assert!(config.validate().is_err());
    }
}
