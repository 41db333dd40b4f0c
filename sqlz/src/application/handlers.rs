use std::io::Write;
use std::path::PathBuf;

use serde_json::json;
use sqlz_core::codec::gzip::GzipCompressor;
use sqlz_core::error::{Result, SqlzError};
use sqlz_core::package::verify;
use sqlz_core::session::IntakeReport;
use sqlz_core::{BlockComments, Config, ProgressStatus, Session, collect_blobs, format_size};
use tracing::debug;

use crate::application::shell;
use crate::presentation::cli::PipelineArgs;

fn config_from_args(args: &PipelineArgs) -> Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(level) = args.level {
        cfg.level = level;
    }
    if args.spanning_comments {
        cfg.block_comments = BlockComments::Spanning;
    }
    if args.deterministic {
        cfg.deterministic = true;
    }
    debug!(?cfg, "effective config");
    Ok(cfg)
}

fn session_from_args(args: &PipelineArgs) -> Result<Session> {
    Ok(Session::new(&config_from_args(args)?))
}

/// Loads `inputs` into the session and tells the user about anything that was
/// renamed or could not be read.
pub(crate) fn load_inputs(session: &mut Session, inputs: &[PathBuf]) -> Result<IntakeReport> {
    let blobs = collect_blobs(inputs)?;
    match session.intake(blobs) {
        Ok(report) => {
            for failure in &report.failures {
                eprintln!("intake: {failure}");
            }
            for (from, to) in &report.renamed {
                eprintln!("intake: {from} renamed to {to}");
            }
            Ok(report)
        }
        Err(SqlzError::NoValidFiles { failures }) => {
            for failure in &failures {
                eprintln!("intake: {failure}");
            }
            Err(SqlzError::NoValidFiles { failures })
        }
        Err(e) => Err(e),
    }
}

pub fn handle_list(args: &PipelineArgs, inputs: Vec<PathBuf>) -> Result<()> {
    let mut session = session_from_args(args)?;
    load_inputs(&mut session, &inputs)?;
    for f in session.files() {
        println!("{:<40} {:>10}  ({} bytes)", f.name(), format_size(f.size()), f.size());
    }
    println!("{}", session.summary());
    Ok(())
}

pub fn handle_minify(args: &PipelineArgs, inputs: Vec<PathBuf>) -> Result<()> {
    let mut session = session_from_args(args)?;
    load_inputs(&mut session, &inputs)?;
    let many = session.len() > 1;
    let mut out = std::io::stdout().lock();
    for f in session.files() {
        let preview = session.preview(f.name())?;
        if many {
            eprintln!("== {}", f.name());
        }
        writeln!(out, "{}", preview.minified)?;
    }
    Ok(())
}

pub fn handle_compress(
    args: &PipelineArgs,
    inputs: Vec<PathBuf>,
    out: PathBuf,
    bundle: bool,
    no_individual: bool,
    json: bool,
) -> Result<()> {
    let mut session = session_from_args(args)?;
    load_inputs(&mut session, &inputs)?;

    let report = session.compress_all(|name, status| match status {
        ProgressStatus::Complete | ProgressStatus::Failed => {
            eprintln!("compress: {name} {status}")
        }
        _ => {}
    });

    if !no_individual {
        for name in session.results().keys() {
            let path = session.single(name)?.save_to(&out)?;
            eprintln!("wrote {}", path.display());
        }
    }
    if bundle {
        let path = session.bundle()?.save_to(&out)?;
        eprintln!("wrote {}", path.display());
    }

    let summary = session.summary();
    if json {
        let files: Vec<_> = session
            .files()
            .iter()
            .map(|f| {
                json!({
                    "name": f.name(),
                    "original": f.size(),
                    "compressed": session.result(f.name()).map(|r| r.len()),
                    "status": session.status(f.name()),
                })
            })
            .collect();
        let doc = json!({ "files": files, "summary": summary });
        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| SqlzError::Format(format!("json: {e}")))?;
        println!("{text}");
    } else {
        for f in session.files() {
            let compressed = session
                .result(f.name())
                .map(|r| format_size(r.len()))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<40} {:>10} -> {:>10}  {}",
                f.name(),
                format_size(f.size()),
                compressed,
                session.status(f.name())
            );
        }
        println!("{summary}");
    }

    if !report.failed.is_empty() {
        return Err(SqlzError::Format(format!(
            "{} file(s) failed to compress: {}",
            report.failed.len(),
            report.failed.join(", ")
        )));
    }
    Ok(())
}

pub fn handle_verify(artifact: PathBuf) -> Result<()> {
    let checks = verify(&artifact, &GzipCompressor::new())?;
    for c in &checks {
        println!(
            "{:<48} {:>10} -> {:>10}",
            c.name,
            format_size(c.compressed),
            format_size(c.decompressed)
        );
    }
    eprintln!("verify: OK ({} payload(s))", checks.len());
    Ok(())
}

pub fn handle_shell(args: &PipelineArgs, inputs: Vec<PathBuf>) -> Result<()> {
    let mut session = session_from_args(args)?;
    if !inputs.is_empty() {
        if let Err(e) = load_inputs(&mut session, &inputs) {
            eprintln!("error: {e}");
        }
    }
    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    shell::run(&mut session, stdin, &mut stdout)
}
