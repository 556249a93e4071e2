//! The font registry: family resolution and fallback chains
//!
//! Built once from an [`EngineConfig`], then only read. Every chain is
//! computed at build time so lookups during shaping are plain scans over
//! short vectors.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use mixtype_core::config::DEFAULT_MAX_FONT_FILE_SIZE;
use mixtype_core::{
    EngineConfig, FaceSource, FontFace, FontLoadError, FontMetrics, FontRef, FontStyle, NotFound,
    Script, SyntheticFont, WEIGHT_NORMAL,
};
use mixtype_unicode::{is_control, TextAnalyzer};

use crate::loader::{self, has_font_extension};

const LAST_RESORT_FAMILY: &str = "Last Resort";

/// Every loaded face plus the chains used to pick among them
pub struct FontRegistry {
    faces: Vec<Arc<FontFace>>,
    script_chains: HashMap<Script, Vec<Arc<FontFace>>>,
    family_chains: HashMap<String, Vec<Arc<FontFace>>>,
    global_chain: Vec<Arc<FontFace>>,
    aliases: HashMap<String, Vec<String>>,
    default_family: String,
    last_resort: Arc<FontFace>,
    load_errors: Vec<FontLoadError>,
    analyzer: TextAnalyzer,
}

impl FontRegistry {
    pub fn builder() -> FontRegistryBuilder {
        FontRegistryBuilder::new()
    }

    /// Scan the configured directories and files
    ///
    /// Never fails: unreadable fonts are logged and listed in
    /// [`load_errors`](Self::load_errors).
    pub fn from_config(config: &EngineConfig) -> Self {
        FontRegistry::builder().config(config).build()
    }

    /// All faces in load order
    pub fn faces(&self) -> &[Arc<FontFace>] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Family names, sorted and deduplicated
    pub fn families(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.faces.iter().map(|f| f.family()).collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Files that could not be loaded while building
    pub fn load_errors(&self) -> &[FontLoadError] {
        &self.load_errors
    }

    pub fn analyzer(&self) -> &TextAnalyzer {
        &self.analyzer
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    /// The face used when nothing better is known
    ///
    /// The configured default family if present, else the face with the widest
    /// coverage, else a synthetic face that draws every glyph as a box.
    pub fn default_face(&self) -> Arc<FontFace> {
        self.resolve(&self.default_family, FontStyle::Normal, WEIGHT_NORMAL, None)
            .ok()
            .or_else(|| self.global_chain.first().cloned())
            .unwrap_or_else(|| Arc::clone(&self.last_resort))
    }

    /// The precomputed chain for a fallback class
    pub fn fallback_chain_for(&self, class: Script) -> &[Arc<FontFace>] {
        self.script_chains
            .get(&class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Faces tried after every other chain, widest coverage first
    pub fn global_chain(&self) -> &[Arc<FontFace>] {
        &self.global_chain
    }

    /// Pick the face of `family` that best matches style and weight
    ///
    /// The family name is matched case-insensitively after alias expansion.
    /// With a script hint, faces covering that script win over faces that do
    /// not. Style prefers an exact match, then italic and oblique for each
    /// other, then upright. Weight takes the nearest; on a tie, heavier wins
    /// above 400 and lighter otherwise. Remaining ties go to load order.
    pub fn resolve(
        &self,
        family: &str,
        style: FontStyle,
        weight: u16,
        script_hint: Option<Script>,
    ) -> Result<Arc<FontFace>, NotFound> {
        let wanted = family.trim();
        let names = self
            .aliases
            .get(&wanted.to_lowercase())
            .cloned()
            .unwrap_or_else(|| vec![wanted.to_string()]);

        let candidates: Vec<&Arc<FontFace>> = names
            .iter()
            .map(|name| {
                self.faces
                    .iter()
                    .filter(|face| face.family().eq_ignore_ascii_case(name))
                    .collect::<Vec<_>>()
            })
            .find(|found| !found.is_empty())
            .ok_or_else(|| NotFound::new(wanted))?;

        let candidates = match script_hint.filter(|script| !script.is_neutral()) {
            Some(script) => {
                let covering: Vec<&Arc<FontFace>> = candidates
                    .iter()
                    .copied()
                    .filter(|face| face.coverage_for(script) > 0)
                    .collect();
                if covering.is_empty() {
                    candidates
                } else {
                    covering
                }
            }
            None => candidates,
        };

        let candidates = match_style(candidates, style);
        pick_weight(&candidates, weight)
            .cloned()
            .ok_or_else(|| NotFound::new(wanted))
    }

    /// A face other than `current` that covers `ch`
    pub fn fallback_for(&self, ch: char, current: &FontFace) -> Option<Arc<FontFace>> {
        let mut buf = [0u8; 4];
        self.fallback_for_cluster(ch.encode_utf8(&mut buf), current)
    }

    /// A face other than `current` that covers every visible character of `cluster`
    ///
    /// Walks the chain configured for `current`'s family, then the chain for
    /// the cluster's fallback class, then the global chain.
    pub fn fallback_for_cluster(&self, cluster: &str, current: &FontFace) -> Option<Arc<FontFace>> {
        let class = self.analyzer.cluster_class(cluster);
        let family_chain = self
            .family_chains
            .get(&current.family().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        family_chain
            .iter()
            .chain(self.fallback_chain_for(class))
            .chain(self.global_chain.iter())
            .find(|face| face.id() != current.id() && self.covers_cluster(face, cluster))
            .cloned()
    }

    /// Whether `face` maps every character of `cluster` that needs a glyph
    ///
    /// Controls and default-ignorable characters (joiners, variation
    /// selectors) do not count.
    pub fn covers_cluster(&self, face: &FontFace, cluster: &str) -> bool {
        cluster
            .chars()
            .filter(|&ch| !is_control(ch) && !self.analyzer.is_default_ignorable(ch))
            .all(|ch| face.covers(ch))
    }
}

fn match_style(candidates: Vec<&Arc<FontFace>>, style: FontStyle) -> Vec<&Arc<FontFace>> {
    let order: &[FontStyle] = match style {
        FontStyle::Normal => &[FontStyle::Normal, FontStyle::Oblique, FontStyle::Italic],
        FontStyle::Italic => &[FontStyle::Italic, FontStyle::Oblique, FontStyle::Normal],
        FontStyle::Oblique => &[FontStyle::Oblique, FontStyle::Italic, FontStyle::Normal],
    };
    for wanted in order {
        let matching: Vec<&Arc<FontFace>> = candidates
            .iter()
            .copied()
            .filter(|face| face.style() == *wanted)
            .collect();
        if !matching.is_empty() {
            return matching;
        }
    }
    candidates
}

fn pick_weight<'a>(candidates: &[&'a Arc<FontFace>], weight: u16) -> Option<&'a Arc<FontFace>> {
    let mut best: Option<&'a Arc<FontFace>> = None;
    for &face in candidates {
        best = match best {
            None => Some(face),
            Some(current) if weight_better(face.weight(), current.weight(), weight) => Some(face),
            keep => keep,
        };
    }
    best
}

fn weight_better(candidate: u16, current: u16, wanted: u16) -> bool {
    let d_candidate = candidate.abs_diff(wanted);
    let d_current = current.abs_diff(wanted);
    if d_candidate != d_current {
        return d_candidate < d_current;
    }
    if candidate == current {
        return false;
    }
    if wanted > WEIGHT_NORMAL {
        candidate > current
    } else {
        candidate < current
    }
}

/// Order faces for a chain: widest coverage, then family name, then weight
/// closest to regular, then upright before slanted
fn chain_order(faces: &mut [Arc<FontFace>], coverage: impl Fn(&FontFace) -> u32) {
    faces.sort_by(|a, b| {
        coverage(&**b)
            .cmp(&coverage(&**a))
            .then_with(|| a.family().cmp(b.family()))
            .then_with(|| {
                a.weight()
                    .abs_diff(WEIGHT_NORMAL)
                    .cmp(&b.weight().abs_diff(WEIGHT_NORMAL))
            })
            .then_with(|| a.style().is_slanted().cmp(&b.style().is_slanted()))
    });
}

/// Collects font sources and preferences, then builds a [`FontRegistry`]
pub struct FontRegistryBuilder {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    memory: Vec<(String, Vec<u8>)>,
    faces: Vec<FontFace>,
    max_file_size: u64,
    default_family: String,
    script_preferences: Vec<(Script, Vec<String>)>,
    family_preferences: Vec<(String, Vec<String>)>,
    aliases: HashMap<String, Vec<String>>,
}

impl FontRegistryBuilder {
    pub fn new() -> Self {
        Self {
            dirs: Vec::new(),
            files: Vec::new(),
            memory: Vec::new(),
            faces: Vec::new(),
            max_file_size: DEFAULT_MAX_FONT_FILE_SIZE,
            default_family: mixtype_core::request::DEFAULT_FAMILY.to_string(),
            script_preferences: Vec::new(),
            family_preferences: Vec::new(),
            aliases: HashMap::new(),
        }
    }

    /// Take directories, files, limits and preferences from `config`
    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.dirs.extend(config.font_dirs.iter().cloned());
        self.files.extend(config.font_files.iter().cloned());
        self.max_file_size = config.max_font_file_size;
        self.default_family = config.default_family.clone();
        for (name, families) in &config.script_fallback {
            match name.parse::<Script>() {
                Ok(script) => self.script_preferences.push((script, families.clone())),
                Err(e) => log::warn!("Ignoring fallback preference: {e}"),
            }
        }
        for (family, families) in &config.family_fallback {
            self.family_preferences
                .push((family.to_lowercase(), families.clone()));
        }
        for (alias, families) in &config.aliases {
            self.aliases.insert(alias.to_lowercase(), families.clone());
        }
        self
    }

    pub fn add_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    pub fn add_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Register font bytes that did not come from disk
    pub fn add_font_data(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.memory.push((name.into(), data));
        self
    }

    /// Register an already built face
    pub fn add_face(mut self, face: FontFace) -> Self {
        self.faces.push(face);
        self
    }

    pub fn default_family(mut self, family: impl Into<String>) -> Self {
        self.default_family = family.into();
        self
    }

    /// Families tried first for characters of `script`
    pub fn prefer_for_script(mut self, script: Script, families: &[&str]) -> Self {
        self.script_preferences
            .push((script, families.iter().map(|f| f.to_string()).collect()));
        self
    }

    /// Families tried first when a face of `family` lacks a character
    pub fn prefer_for_family(mut self, family: &str, families: &[&str]) -> Self {
        self.family_preferences.push((
            family.to_lowercase(),
            families.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    pub fn alias(mut self, name: &str, families: &[&str]) -> Self {
        self.aliases.insert(
            name.to_lowercase(),
            families.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn build(self) -> FontRegistry {
        let analyzer = TextAnalyzer::new();
        let mut load_errors = Vec::new();
        let mut faces: Vec<Arc<FontFace>> = Vec::new();

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut paths: Vec<PathBuf> = Vec::new();
        for dir in &self.dirs {
            paths.extend(scan_dir(dir));
        }
        paths.extend(self.files.iter().cloned());

        for path in paths {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                continue;
            }
            match loader::load_file(&path, self.max_file_size, &analyzer) {
                Ok(loaded) => faces.extend(loaded.into_iter().map(Arc::new)),
                Err(e) => {
                    log::warn!("Excluding font: {e}");
                    load_errors.push(e);
                }
            }
        }

        for (name, data) in self.memory {
            let source_name = name.clone();
            let result = loader::load_data(Arc::from(data), &source_name, &analyzer, |index| {
                FaceSource::Memory {
                    name: name.clone(),
                    index,
                }
            });
            match result {
                Ok(loaded) => faces.extend(loaded.into_iter().map(Arc::new)),
                Err(e) => {
                    log::warn!("Excluding font: {e}");
                    load_errors.push(e);
                }
            }
        }

        faces.extend(self.faces.into_iter().map(Arc::new));

        let script_chains = build_script_chains(&faces, &self.script_preferences);
        let family_chains = build_family_chains(&faces, &self.family_preferences);
        let mut global_chain = faces.clone();
        chain_order(&mut global_chain, |face| face.coverage().len() as u32);

        let last_resort_font: Arc<dyn FontRef> =
            Arc::new(SyntheticFont::new(1000, 500.0, std::iter::empty()));
        let last_resort = Arc::new(
            FontFace::builder(LAST_RESORT_FAMILY, last_resort_font)
                .metrics(FontMetrics::default())
                .build(),
        );

        let registry = FontRegistry {
            faces,
            script_chains,
            family_chains,
            global_chain,
            aliases: self.aliases,
            default_family: self.default_family,
            last_resort,
            load_errors,
            analyzer,
        };
        log::info!(
            "Font registry ready: {} faces in {} families, {} files excluded",
            registry.faces.len(),
            registry.families().len(),
            registry.load_errors.len()
        );
        registry
    }
}

impl Default for FontRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn scan_dir(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        log::debug!("Font directory {} does not exist", dir.display());
        return Vec::new();
    }
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry under {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_font_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Faces of one family, regular upright first
fn faces_of_family<'a>(faces: &'a [Arc<FontFace>], family: &str) -> Vec<&'a Arc<FontFace>> {
    let mut found: Vec<&Arc<FontFace>> = faces
        .iter()
        .filter(|face| face.family().eq_ignore_ascii_case(family))
        .collect();
    found.sort_by_key(|face| (face.weight().abs_diff(WEIGHT_NORMAL), face.style().is_slanted()));
    found
}

fn push_unique(chain: &mut Vec<Arc<FontFace>>, face: &Arc<FontFace>) {
    if !chain.iter().any(|existing| existing.id() == face.id()) {
        chain.push(Arc::clone(face));
    }
}

fn build_script_chains(
    faces: &[Arc<FontFace>],
    preferences: &[(Script, Vec<String>)],
) -> HashMap<Script, Vec<Arc<FontFace>>> {
    let mut scripts: BTreeSet<Script> = faces
        .iter()
        .flat_map(|face| face.script_coverage().keys().copied())
        .collect();
    scripts.extend(preferences.iter().map(|(script, _)| *script));

    let mut chains = HashMap::new();
    for script in scripts {
        let mut chain: Vec<Arc<FontFace>> = Vec::new();
        for (_, families) in preferences.iter().filter(|(s, _)| *s == script) {
            for family in families {
                for face in faces_of_family(faces, family) {
                    if face.coverage_for(script) > 0 {
                        push_unique(&mut chain, face);
                    }
                }
            }
        }

        let mut rest: Vec<Arc<FontFace>> = faces
            .iter()
            .filter(|face| face.coverage_for(script) > 0)
            .filter(|face| !chain.iter().any(|c| c.id() == face.id()))
            .cloned()
            .collect();
        chain_order(&mut rest, |face| face.coverage_for(script));
        chain.extend(rest);

        log::debug!(
            "Fallback chain for {script}: {:?}",
            chain.iter().map(|f| f.family()).collect::<Vec<_>>()
        );
        chains.insert(script, chain);
    }
    chains
}

fn build_family_chains(
    faces: &[Arc<FontFace>],
    preferences: &[(String, Vec<String>)],
) -> HashMap<String, Vec<Arc<FontFace>>> {
    let mut chains: HashMap<String, Vec<Arc<FontFace>>> = HashMap::new();
    for (family, families) in preferences {
        let chain = chains.entry(family.clone()).or_default();
        for preferred in families {
            for face in faces_of_family(faces, preferred) {
                push_unique(chain, face);
            }
        }
    }
    chains
}
