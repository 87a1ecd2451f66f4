//! Binary to generate typed models from CRDs and OpenAPI documents.
//!
//! Usage: `crdtypegen [OPTIONS] <INPUT>...`
//!
//! Every input is loaded, all roots are generated together, and the classes are
//! written as Rust modules under `--out` (or listed on stdout without it).
//! Failures are printed as `<input>: <error kind>: <detail>`; the exit code is 1
//! if anything failed.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use crd_typegen::document::{input_files, load_file};
use crd_typegen::{
    BuildConfig, ClassKind, GenerateSettings, GenerationReport, LoadError, RootSchema,
    RustEmitter, TracingTrace, generate, write_all,
};

#[derive(Parser, Debug)]
#[command(name = "crdtypegen")]
#[command(
    version,
    about = "Generate typed models from Kubernetes CRDs and OpenAPI documents",
    long_about = None
)]
struct Cli {
    /// CRD or OpenAPI files (JSON or YAML); quoted glob patterns are expanded
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Directory to write Rust modules into (prints a class listing if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Target package; replaces the package derived from a CRD's API group
    #[arg(short, long)]
    package: Option<String>,

    /// Prepended to each root class name
    #[arg(long, default_value = "")]
    prefix: String,

    /// Appended to each root class name
    #[arg(long, default_value = "")]
    suffix: String,

    /// Root class name for schemas without a title or kind
    #[arg(long, default_value = "")]
    root_name: String,

    /// Fail a root on oneOf/anyOf/allOf or untyped nodes instead of using an untyped value
    #[arg(long)]
    deny_unsupported: bool,

    /// Rust path of the output directory's module
    #[arg(long, default_value = "crate")]
    module_root: String,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli: Cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let ok: bool = run(&cli, &mut std::io::stdout().lock(), &mut std::io::stderr().lock())?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

/// Loads every input, generates, and writes or lists the result. One line per
/// failed input or root goes to `diagnostics`. Returns whether everything
/// succeeded.
fn run(cli: &Cli, listing: &mut dyn Write, diagnostics: &mut dyn Write) -> anyhow::Result<bool> {
    let template = BuildConfig {
        package: cli.package.clone().unwrap_or_default(),
        class_name_prefix: cli.prefix.clone(),
        class_name_suffix: cli.suffix.clone(),
        root_name: cli.root_name.clone(),
    };

    let mut ok: bool = true;
    let mut files: Vec<PathBuf> = Vec::new();
    for path in expand_inputs(&cli.inputs)? {
        match input_files(&path) {
            Ok(found) => files.extend(found),
            Err(error) => {
                ok = false;
                writeln!(diagnostics, "{}: LoadError: {error}", path.display())?;
            }
        }
    }

    let loaded: Vec<(PathBuf, Result<Vec<RootSchema>, LoadError>)> = files
        .par_iter()
        .map(|path| (path.clone(), load_file(path, &template)))
        .collect();

    let mut roots: Vec<RootSchema> = Vec::new();
    for (path, result) in loaded {
        match result {
            Ok(found) => roots.extend(found),
            Err(error) => {
                ok = false;
                writeln!(diagnostics, "{}: LoadError: {error}", path.display())?;
            }
        }
    }

    let settings = GenerateSettings {
        deny_unsupported_constructs: cli.deny_unsupported,
    };
    let report: GenerationReport = generate(&roots, &settings, &TracingTrace);
    for (label, error) in report.failures() {
        ok = false;
        writeln!(diagnostics, "{label}: {}: {error}", error.kind())?;
    }

    match &cli.out {
        Some(out) => {
            let emitter = RustEmitter::new(cli.module_root.as_str());
            write_all(&emitter, &report.result, out)
                .with_context(|| format!("writing sources to {}", out.display()))?;
        }
        None => print_listing(&report, listing)?,
    }
    Ok(ok)
}

/// Literal paths pass through; patterns with glob characters must match something.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }
        let before: usize = paths.len();
        for entry in glob::glob(input).with_context(|| format!("invalid pattern {input}"))? {
            paths.push(entry?);
        }
        anyhow::ensure!(paths.len() > before, "glob pattern matched no files: {input}");
    }
    Ok(paths)
}

fn print_listing(report: &GenerationReport, out: &mut dyn Write) -> anyhow::Result<()> {
    for class in &report.result.classes {
        let kind: String = match &class.kind {
            ClassKind::Object { fields, .. } => format!("object, {} fields", fields.len()),
            ClassKind::Enum { constants } => format!("enum, {} constants", constants.len()),
            ClassKind::Alias { target } => format!("alias of {target}"),
        };
        writeln!(out, "{} ({kind})", class.name)?;
    }
    Ok(())
}
