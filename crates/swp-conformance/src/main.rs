//! swp-vectors - SWP conformance runner CLI.
//!
//! Exit codes: 0 when every vector passes, 1 on any failure, 2 on a
//! configuration error (bad pattern, no vectors matched).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use swp_conformance::{
    collect_vectors, effective_pattern, evaluate_runtime, load_vector, Observed, RunInfo, Summary,
    Vector, VectorResult,
};

/// SWP conformance vector runner.
#[derive(Parser, Debug)]
#[command(name = "swp-vectors")]
#[command(version, about, long_about = None)]
struct Args {
    /// Comma-separated glob(s) for vector JSON files.
    #[arg(long, default_value = "")]
    pattern: String,

    /// Optional JSON summary output path.
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Fail vectors that require fallback evaluation.
    #[arg(long)]
    no_fallback: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let paths = match collect_vectors(&args.pattern) {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let mut summary = Summary::new(
        RunInfo {
            pattern: effective_pattern(&args.pattern),
            no_fallback: args.no_fallback,
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            runner_git_sha: detect_git_sha(),
        },
        paths.len(),
    );

    for path in &paths {
        let result = run_one(path, args.no_fallback);
        if result.pass {
            if result.used_fallback {
                println!("PASS {} (fallback)", result.vector_id);
            } else {
                println!("PASS {}", result.vector_id);
            }
        } else {
            println!("FAIL {}: {}", result.vector_id, result.detail);
        }
        summary.record(result);
    }

    if let Some(json_out) = &args.json_out {
        match serde_json::to_vec_pretty(&summary) {
            Ok(mut bytes) => {
                bytes.push(b'\n');
                if let Err(err) = std::fs::write(json_out, bytes) {
                    eprintln!("write {}: {err}", json_out.display());
                }
            }
            Err(err) => eprintln!("serialize summary: {err}"),
        }
    }

    println!(
        "summary: passed={} failed={} total={} fallback={}",
        summary.passed, summary.failed, summary.total, summary.fallback_count
    );
    if summary.failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_one(path: &Path, no_fallback: bool) -> VectorResult {
    let vector = match load_vector(path) {
        Ok(vector) => vector,
        Err(err) => {
            return VectorResult {
                vector_id: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.display().to_string(),
                pass: false,
                detail: err.to_string(),
                ..VectorResult::default()
            };
        }
    };

    let observed = match observe(path, &vector) {
        Ok(observed) => observed,
        Err(detail) => {
            return VectorResult {
                vector_id: vector.vector_id.clone(),
                path: path.display().to_string(),
                pass: false,
                expected: vector.expected.outcome.clone(),
                code_expected: vector.expected.code.clone(),
                error_code_expected: vector.expected_canonical_code(),
                detail,
                ..VectorResult::default()
            };
        }
    };

    let mut result = VectorResult {
        vector_id: vector.vector_id.clone(),
        path: path.display().to_string(),
        pass: false,
        expected: vector.expected.outcome.clone(),
        observed: observed.outcome.clone(),
        code_expected: vector.expected.code.clone(),
        code_observed: observed.code.clone(),
        error_code_expected: vector.expected_canonical_code(),
        error_code_observed: observed.canonical_code(),
        used_fallback: observed.fallback,
        fallback_mode: if no_fallback { "disallowed" } else { "allowed" }.to_string(),
        detail: String::new(),
    };

    if no_fallback && observed.fallback {
        result.detail = "fallback evaluation was used but --no-fallback is set".to_string();
        return result;
    }

    match swp_conformance::report::compare(&vector, &observed) {
        Some(detail) => result.detail = detail,
        None => result.pass = true,
    }
    result
}

/// Resolves the fixture and produces the observation.
fn observe(path: &Path, vector: &Vector) -> Result<Observed, String> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    if vector.expected.evidence_type == "process" || vector.expected.outcome == "process_check" {
        let evidence = &vector.expected.fixture.evidence_file;
        if evidence.is_empty() {
            return Err("process vector missing evidence_file".to_string());
        }
        let evidence_path = base_dir.join(evidence);
        if !evidence_path.exists() {
            return Err(format!("process evidence missing: {}", evidence_path.display()));
        }
        if let Some(artifact) = vector
            .expected
            .assertions
            .as_ref()
            .and_then(|a| a.get("artifact"))
            .and_then(serde_json::Value::as_str)
        {
            if !Path::new(artifact).exists() {
                return Err(format!("asserted artifact missing: {artifact}"));
            }
        }
        return Ok(Observed {
            outcome: "process_check".to_string(),
            code: vector.expected.code.clone(),
            reason: String::new(),
            fallback: false,
        });
    }

    let bin_file = &vector.expected.fixture.bin_file;
    if bin_file.is_empty() {
        return Err("runtime vector missing bin_file".to_string());
    }
    let raw = std::fs::read(base_dir.join(bin_file)).map_err(|e| e.to_string())?;
    Ok(evaluate_runtime(vector, &raw))
}

fn detect_git_sha() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|sha| sha.trim().to_string())
        .filter(|sha| !sha.is_empty())
        .unwrap_or_else(|| "nogit".to_string())
}
