pub(crate) mod inspect;
pub(crate) mod mapping;

use std::io::Read;
use std::path::Path;
use std::process;

use modelmap_core::{load_bundle, Registry};

use crate::{report_error, report_model_error, OutputFormat};

/// Read and parse a JSON file, exiting with status 1 on failure.
fn read_json_file(path: &Path, what: &str, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => {
            let msg = format!("error: {} file not found: {}", what, path.display());
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error: invalid JSON in {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Load a schema bundle into a fresh registry.
pub(crate) fn load_registry(path: &Path, output: OutputFormat, quiet: bool) -> Registry {
    let bundle = read_json_file(path, "schema", output, quiet);
    let mut registry = Registry::new();
    if let Err(e) = load_bundle(&bundle, &mut registry) {
        report_model_error(&e, output, quiet);
        process::exit(1);
    }
    registry
}

/// Read input JSON from a file, or from stdin when `path` is absent or `-`.
pub(crate) fn read_input(path: Option<&Path>, output: OutputFormat, quiet: bool) -> serde_json::Value {
    match path {
        Some(p) if p != Path::new("-") => read_json_file(p, "input", output, quiet),
        _ => {
            let mut text = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut text) {
                report_error(&format!("error: failed to read stdin: {}", e), output, quiet);
                process::exit(1);
            }
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    report_error(&format!("error: invalid JSON on stdin: {}", e), output, quiet);
                    process::exit(1);
                }
            }
        }
    }
}

pub(crate) fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("serialization error: {}", e))
    );
}
