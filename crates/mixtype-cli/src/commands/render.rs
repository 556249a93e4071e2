//! `mixtype render`

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use mixtype::prelude::*;

use crate::cli::RenderArgs;
use crate::parse_features;

pub fn run(engine: &Engine, args: &RenderArgs) -> Result<()> {
    let text = read_text(args)?;
    let request = build_request(text, args, engine.registry().default_family())?;
    let result = engine.render(&request).context("Rendering failed")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("output.{}", result.format.extension())));
    fs::write(&output, &result.data)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if args.metrics {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &result).context("Failed to write metrics")?;
        writeln!(stdout)?;
    }
    eprintln!(
        "Rendered {}x{} {} ({} lines) to {}",
        result.width,
        result.height,
        result.format.extension(),
        result.metrics.line_count,
        output.display()
    );
    if !result.metrics.overflow_lines.is_empty() {
        eprintln!(
            "  {} lines are wider than the wrap width",
            result.metrics.overflow_lines.len()
        );
    }
    Ok(())
}

/// The request described by the command line
pub fn build_request(
    text: String,
    args: &RenderArgs,
    default_family: &str,
) -> Result<RenderRequest> {
    let features = match &args.features {
        Some(spec) => parse_features(spec)?,
        None => Vec::new(),
    };

    Ok(RenderRequest {
        text,
        font: FontSpec {
            family: args
                .font
                .family
                .clone()
                .unwrap_or_else(|| default_family.to_string()),
            size: args.font.size,
            weight: args.font.weight,
            style: args.font.style,
            language: args.language.clone(),
            features,
        },
        max_width: args.max_width,
        dpi: args.dpi,
        canvas: CanvasSpec {
            width: args.width,
            height: args.height,
            padding: args.padding,
            foreground: args.foreground,
            background: (!args.transparent).then_some(args.background),
            alignment: args.align.into(),
            format: args.format,
        },
        wrap: args.wrap.into(),
    })
}

fn read_text(args: &RenderArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    let mut text = match &args.text_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read text from stdin")?;
            text
        }
    };
    // A file or pipe usually ends with one newline that is not meant as an
    // empty last line
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    Ok(text)
}
