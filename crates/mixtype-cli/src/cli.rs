//! Command line definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mixtype_core::{Alignment, Color, FontStyle, OutputFormat, Script, WrapMode};

/// Mixtype: shape, lay out and rasterize multi-script text
#[derive(Parser, Debug)]
#[command(name = "mixtype")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML); `MIXTYPE_*` variables override it
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Extra font directory, scanned in addition to the configured ones
    #[arg(long = "font-dir", global = true, action = clap::ArgAction::Append)]
    pub font_dirs: Vec<PathBuf>,

    /// Debug logging (`RUST_LOG` still applies)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render text to an image file
    #[command(alias = "r")]
    Render(Box<RenderArgs>),

    /// List loaded fonts and fallback chains
    Fonts(FontsArgs),

    /// Render a JSONL file of requests in parallel
    Batch(BatchArgs),
}

/// Which face the text is set in
#[derive(Args, Debug, Clone)]
pub struct FontArgs {
    /// Font family; falls back to the configured default when unknown
    #[arg(short = 'F', long = "family")]
    pub family: Option<String>,

    /// Font size in points
    #[arg(short = 's', long = "size", default_value_t = 22.0)]
    pub size: f32,

    /// Weight on the CSS scale (100..=900)
    #[arg(short = 'w', long = "weight", default_value_t = 400)]
    pub weight: u16,

    /// normal, italic or oblique
    #[arg(long = "style", default_value = "normal")]
    pub style: FontStyle,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Text to render (reads stdin if omitted)
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(short = 'T', long = "text-file", conflicts_with = "text")]
    pub text_file: Option<PathBuf>,

    /// Output file; the extension follows --format when omitted
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub font: FontArgs,

    /// BCP 47 language tag handed to the shaper
    #[arg(short = 'l', long = "language")]
    pub language: Option<String>,

    /// OpenType features, e.g. "liga=0,kern"
    #[arg(long = "features")]
    pub features: Option<String>,

    #[arg(long = "dpi", default_value_t = 72.0)]
    pub dpi: f32,

    /// Wrap width in pixels
    #[arg(long = "max-width")]
    pub max_width: Option<f32>,

    /// Fixed canvas width in pixels
    #[arg(long = "width")]
    pub width: Option<u32>,

    /// Fixed canvas height in pixels
    #[arg(long = "height")]
    pub height: Option<u32>,

    #[arg(short = 'p', long = "padding", default_value_t = 0)]
    pub padding: u32,

    /// Text color (#RRGGBB or #RRGGBBAA)
    #[arg(long = "foreground", default_value = "#FFFFFF")]
    pub foreground: Color,

    /// Background color (#RRGGBB or #RRGGBBAA)
    #[arg(long = "background", default_value = "#000000")]
    pub background: Color,

    /// Leave the background transparent
    #[arg(long = "transparent", conflicts_with = "background")]
    pub transparent: bool,

    #[arg(long = "align", value_enum, default_value_t = AlignArg::Center)]
    pub align: AlignArg,

    #[arg(long = "wrap", value_enum, default_value_t = WrapArg::Word)]
    pub wrap: WrapArg,

    /// png, rgba or rgb565
    #[arg(short = 'O', long = "format", default_value = "png")]
    pub format: OutputFormat,

    /// Print the layout metrics as JSON on stdout
    #[arg(long = "metrics")]
    pub metrics: bool,
}

#[derive(Args, Debug)]
pub struct FontsArgs {
    /// Only list faces of this family
    #[arg(long = "family")]
    pub family: Option<String>,

    /// Also print the fallback chain of every script
    #[arg(long = "chains")]
    pub chains: bool,

    /// Resolve a family and print the chosen face
    #[arg(long = "resolve")]
    pub resolve: Option<String>,

    /// Script hint for --resolve
    #[arg(long = "script")]
    pub script: Option<Script>,

    /// Print JSON instead of a table
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSONL file with one request per line (reads stdin if omitted)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Directory for the rendered images
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Worker threads (0 picks one per core)
    #[arg(short = 'j', long = "jobs", default_value_t = 0)]
    pub jobs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlignArg {
    Left,
    Center,
    Right,
    /// Center the whole block, lines flush left inside it
    Block,
}

impl From<AlignArg> for Alignment {
    fn from(arg: AlignArg) -> Self {
        match arg {
            AlignArg::Left => Alignment::Left,
            AlignArg::Center => Alignment::Center,
            AlignArg::Right => Alignment::Right,
            AlignArg::Block => Alignment::Block,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WrapArg {
    /// Break between words only
    Word,
    /// Break inside words that cannot fit on a line
    WordChar,
}

impl From<WrapArg> for WrapMode {
    fn from(arg: WrapArg) -> Self {
        match arg {
            WrapArg::Word => WrapMode::Word,
            WrapArg::WordChar => WrapMode::WordChar,
        }
    }
}
