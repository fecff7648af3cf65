use std::path::Path;
use std::process;

use modelmap_core::{ModelError, Schema, Value};

use super::{load_registry, print_json, read_input};
use crate::{report_model_error, OutputFormat};

/// Direction of a mapping command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mapping {
    /// External data in, attribute-keyed instances out.
    FromData,
    /// Attribute-keyed values in, external data out.
    ToData,
    RoundTrip,
}

pub(crate) fn cmd_map(
    mapping: Mapping,
    schema_path: &Path,
    model_name: &str,
    input: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let registry = load_registry(schema_path, output, quiet);
    let schema = match registry.require_schema(model_name) {
        Ok(s) => s.clone(),
        Err(e) => {
            report_model_error(&e, output, quiet);
            process::exit(1);
        }
    };
    let data = read_input(input, output, quiet);

    match run(mapping, &schema, &data) {
        Ok(result) => {
            if !quiet {
                print_json(&result);
            }
        }
        Err(e) => {
            report_model_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

fn run(mapping: Mapping, schema: &Schema, data: &serde_json::Value) -> Result<serde_json::Value, ModelError> {
    match mapping {
        Mapping::FromData => schema.from_data_value(data).map(|v| v.to_local_json()),
        Mapping::ToData => schema.to_data(&Value::from_json(data)),
        Mapping::RoundTrip => {
            let value = schema.from_data_value(data)?;
            schema.to_data(&value)
        }
    }
}
