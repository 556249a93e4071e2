//! `mixtype fonts`

use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Context, Result};
use mixtype::fontdb::FontRegistry;
use mixtype::prelude::*;
use serde::Serialize;

use crate::cli::FontsArgs;

#[derive(Debug, Serialize)]
struct FaceInfo {
    family: String,
    weight: u16,
    style: FontStyle,
    source: String,
    code_points: usize,
    scripts: BTreeMap<String, u32>,
}

impl FaceInfo {
    fn new(face: &FontFace) -> Self {
        Self {
            family: face.family().to_string(),
            weight: face.weight(),
            style: face.style(),
            source: face.source().to_string(),
            code_points: face.coverage().len(),
            scripts: face
                .script_coverage()
                .iter()
                .filter(|(script, _)| !script.is_neutral())
                .map(|(script, count)| (script.name().to_string(), *count))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Chain {
    class: String,
    families: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    default_family: String,
    faces: Vec<FaceInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chains: Vec<Chain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<FaceInfo>,
}

pub fn run(engine: &Engine, args: &FontsArgs) -> Result<()> {
    let report = build_report(engine, args)?;
    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        print_table(&mut stdout, &report)?;
    }
    Ok(())
}

fn build_report(engine: &Engine, args: &FontsArgs) -> Result<Report> {
    let registry = engine.registry();
    let faces = registry
        .faces()
        .iter()
        .filter(|face| {
            args.family
                .as_deref()
                .map_or(true, |family| face.family().eq_ignore_ascii_case(family))
        })
        .map(|face| FaceInfo::new(face))
        .collect();

    let chains = if args.chains { chains(registry) } else { Vec::new() };

    let resolved = match &args.resolve {
        Some(family) => {
            let face = engine
                .resolve_font(family, FontStyle::Normal, 400, args.script)
                .with_context(|| format!("Cannot resolve '{family}'"))?;
            Some(FaceInfo::new(&face))
        }
        None => None,
    };

    Ok(Report {
        default_family: registry.default_family().to_string(),
        faces,
        chains,
        resolved,
    })
}

fn chains(registry: &FontRegistry) -> Vec<Chain> {
    let families = |faces: &[std::sync::Arc<FontFace>]| {
        let mut names: Vec<String> = Vec::new();
        for face in faces {
            if !names.iter().any(|n| n == face.family()) {
                names.push(face.family().to_string());
            }
        }
        names
    };

    let mut chains: Vec<Chain> = Script::ALL
        .iter()
        .filter_map(|&script| {
            let chain = registry.fallback_chain_for(script);
            (!chain.is_empty()).then(|| Chain {
                class: script.name().to_string(),
                families: families(chain),
            })
        })
        .collect();
    chains.push(Chain {
        class: "last resort".to_string(),
        families: families(registry.global_chain()),
    });
    chains
}

fn print_table(out: &mut impl Write, report: &Report) -> Result<()> {
    writeln!(out, "Default family: {}", report.default_family)?;
    writeln!(out, "{} faces:", report.faces.len())?;
    for face in &report.faces {
        let scripts: Vec<String> = face
            .scripts
            .iter()
            .map(|(script, count)| format!("{script}:{count}"))
            .collect();
        writeln!(
            out,
            "  {:<32} {:>4} {:<8} {:>6} cp  {}  [{}]",
            face.family,
            face.weight,
            face.style.as_str(),
            face.code_points,
            face.source,
            scripts.join(" ")
        )?;
    }
    if !report.chains.is_empty() {
        writeln!(out)?;
        writeln!(out, "Fallback chains:")?;
        for chain in &report.chains {
            writeln!(out, "  {:<12} {}", chain.class, chain.families.join(" > "))?;
        }
    }
    if let Some(face) = &report.resolved {
        writeln!(out)?;
        writeln!(
            out,
            "Resolved: {} {} {} ({})",
            face.family,
            face.weight,
            face.style.as_str(),
            face.source
        )?;
    }
    Ok(())
}
