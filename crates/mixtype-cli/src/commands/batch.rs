//! `mixtype batch`: one render request per JSONL line, rendered in parallel
//!
//! Each line is a render request with two optional extras:
//!
//! ```json
//! {"id": "greeting", "output": "greeting.png", "text": "Hello ខ្មែរ", "font": {"size": 24}}
//! ```
//!
//! Results go to stdout as JSONL in input order, one per request.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use mixtype::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cli::BatchArgs;

#[derive(Debug, Deserialize)]
struct BatchJob {
    #[serde(default)]
    id: Option<String>,
    /// File name inside the output directory
    #[serde(default)]
    output: Option<String>,
    #[serde(flatten)]
    request: RenderRequest,
}

#[derive(Debug, Serialize)]
struct JobResult {
    id: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<RenderMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    elapsed_ms: f64,
}

impl JobResult {
    fn error(id: String, message: impl Into<String>, started: Instant) -> Self {
        Self {
            id,
            status: "error",
            output: None,
            width: None,
            height: None,
            metrics: None,
            error: Some(message.into()),
            elapsed_ms: elapsed_ms(started),
        }
    }
}

pub fn run(engine: &Engine, args: &BatchArgs) -> Result<()> {
    let started = Instant::now();
    let lines = read_lines(args.input.as_deref())?;
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    log::info!("Processing {} jobs", lines.len());
    let results = if args.jobs > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(args.jobs)
            .build()
            .context("Failed to start worker threads")?;
        pool.install(|| process_all(engine, &lines, &args.output_dir))
    } else {
        process_all(engine, &lines, &args.output_dir)
    };

    let mut stdout = io::stdout().lock();
    for result in &results {
        serde_json::to_writer(&mut stdout, result).context("Failed to write result")?;
        writeln!(stdout)?;
    }
    stdout.flush()?;

    let failed = results.iter().filter(|r| r.status != "ok").count();
    log::info!(
        "Completed {} jobs in {:.2}s, {} failed",
        results.len(),
        started.elapsed().as_secs_f64(),
        failed
    );
    if failed > 0 {
        anyhow::bail!("{failed} of {} jobs failed", results.len());
    }
    Ok(())
}

/// Non-empty input lines with their 1-based line numbers
fn read_lines(input: Option<&Path>) -> Result<Vec<(usize, String)>> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let mut lines = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read jobs")?;
        if !line.trim().is_empty() {
            lines.push((index + 1, line));
        }
    }
    Ok(lines)
}

fn process_all(engine: &Engine, lines: &[(usize, String)], output_dir: &Path) -> Vec<JobResult> {
    lines
        .par_iter()
        .map(|(number, line)| process_line(engine, *number, line, output_dir))
        .collect()
}

fn process_line(engine: &Engine, number: usize, line: &str, output_dir: &Path) -> JobResult {
    let started = Instant::now();
    let job: BatchJob = match serde_json::from_str(line) {
        Ok(job) => job,
        Err(e) => {
            return JobResult::error(format!("line-{number}"), format!("Invalid job: {e}"), started)
        }
    };
    let id = job.id.clone().unwrap_or_else(|| format!("line-{number}"));

    let name = job
        .output
        .clone()
        .unwrap_or_else(|| format!("{id}.{}", job.request.canvas.format.extension()));
    let path = match output_path(output_dir, &name) {
        Ok(path) => path,
        Err(message) => return JobResult::error(id, message, started),
    };

    let result = match engine.render(&job.request) {
        Ok(result) => result,
        Err(e) => return JobResult::error(id, e.to_string(), started),
    };
    if let Err(e) = fs::write(&path, &result.data) {
        return JobResult::error(id, format!("Cannot write {}: {e}", path.display()), started);
    }
    log::debug!("Job {id}: {}x{} -> {}", result.width, result.height, path.display());

    JobResult {
        id,
        status: "ok",
        output: Some(path),
        width: Some(result.width),
        height: Some(result.height),
        metrics: Some(result.metrics),
        error: None,
        elapsed_ms: elapsed_ms(started),
    }
}

/// Keep job outputs inside the output directory
fn output_path(dir: &Path, name: &str) -> std::result::Result<PathBuf, String> {
    let relative = Path::new(name);
    let plain = relative.components().count() > 0
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(dir.join(relative))
    } else {
        Err(format!("Output name '{name}' must be a relative path without '..'"))
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtype::fontdb::{synthetic_face, FontRegistry};
    use mixtype::unicode::TextAnalyzer;
    use mixtype_core::FontMetrics;

    fn engine() -> Engine {
        let analyzer = TextAnalyzer::new();
        let registry = FontRegistry::builder()
            .add_face(
                synthetic_face("Stub Sans", "abc ", 500.0, FontMetrics::default(), &analyzer)
                    .build(),
            )
            .default_family("Stub Sans")
            .build();
        Engine::builder()
            .config(EngineConfig::without_system_fonts())
            .registry(registry)
            .build()
            .unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mixtype-batch-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn output_names_stay_inside_the_directory() {
        let dir = Path::new("/out");
        assert_eq!(output_path(dir, "a.png").unwrap(), dir.join("a.png"));
        assert_eq!(output_path(dir, "sub/a.png").unwrap(), dir.join("sub/a.png"));
        assert!(output_path(dir, "../a.png").is_err());
        assert!(output_path(dir, "/etc/a.png").is_err());
        assert!(output_path(dir, "").is_err());
    }

    #[test]
    fn jobs_render_to_files() {
        let dir = temp_dir("ok");
        let lines = vec![
            (
                1,
                r#"{"id": "first", "text": "abc", "font": {"family": "Stub Sans", "size": 20}}"#
                    .to_string(),
            ),
            (2, r#"{"text": "cab", "canvas": {"format": "rgba8"}}"#.to_string()),
        ];
        let results = process_all(&engine(), &lines, &dir);

        assert_eq!(results[0].id, "first");
        assert_eq!(results[0].status, "ok");
        assert_eq!(results[0].width, Some(30));
        assert!(dir.join("first.png").exists());

        assert_eq!(results[1].id, "line-2");
        assert_eq!(results[1].output, Some(dir.join("line-2.rgba")));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_lines_fail_alone() {
        let dir = temp_dir("bad");
        let lines = vec![
            (1, "not json".to_string()),
            (2, r#"{"text": ""}"#.to_string()),
            (3, r#"{"text": "a", "output": "../escape.png"}"#.to_string()),
            (4, r#"{"text": "a"}"#.to_string()),
        ];
        let results = process_all(&engine(), &lines, &dir);
        let statuses: Vec<&str> = results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec!["error", "error", "error", "ok"]);
        assert!(results[1].error.as_deref().unwrap_or("").contains("text is empty"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn results_serialize_without_empty_fields() {
        let result = JobResult::error("x".into(), "boom", Instant::now());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("metrics").is_none());
    }
}
