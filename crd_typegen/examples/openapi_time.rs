//! Generates the Kubernetes `Time` type from an OpenAPI document.
//!
//! Run with `cargo run --example openapi_time -- [OUT_DIR]`. Without an output
//! directory the rendered files are printed.

use std::path::PathBuf;

use crd_typegen::document::load_str;
use crd_typegen::{
    BuildConfig, GenerateSettings, GenerationReport, RustEmitter, TracingTrace, generate,
    render_all, write_all,
};

const OPENAPI: &str = r##"{
  "openapi": "3.0.0",
  "info": { "title": "Kubernetes", "version": "v1.30.0" },
  "paths": {},
  "components": {
    "schemas": {
      "io.k8s.apimachinery.pkg.apis.meta.v1.Time": {
        "description": "Time is a wrapper around time.Time which supports correct marshaling to YAML and JSON.",
        "type": "string",
        "format": "date-time"
      },
      "io.k8s.apimachinery.pkg.apis.meta.v1.Condition": {
        "type": "object",
        "required": ["type", "status", "lastTransitionTime"],
        "properties": {
          "type": { "type": "string" },
          "status": { "type": "string", "enum": ["True", "False", "Unknown"] },
          "lastTransitionTime": { "$ref": "#/components/schemas/io.k8s.apimachinery.pkg.apis.meta.v1.Time" },
          "message": { "type": "string" }
        }
      }
    }
  }
}"##;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let roots = load_str(OPENAPI, "kubernetes-openapi.json", &BuildConfig::default())?;
    let report: GenerationReport = generate(&roots, &GenerateSettings::default(), &TracingTrace);
    for (label, error) in report.failures() {
        eprintln!("{label}: {}: {error}", error.kind());
    }

    let emitter = RustEmitter::new("crate::generated");
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(out) => {
            for path in write_all(&emitter, &report.result, &out)? {
                println!("wrote {}", path.display());
            }
        }
        None => {
            for (path, text) in render_all(&emitter, &report.result)? {
                println!("// ---- {}", path.display());
                println!("{text}");
            }
        }
    }
    Ok(())
}
