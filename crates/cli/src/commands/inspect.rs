use std::path::Path;

use modelmap_core::{Attribute, DefaultValue, Registry, Schema};

use super::{load_registry, print_json};
use crate::OutputFormat;

pub(crate) fn cmd_inspect(schema_path: &Path, output: OutputFormat, quiet: bool) {
    let registry = load_registry(schema_path, output, quiet);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&describe_registry(&registry)),
        OutputFormat::Text => print!("{}", render_text(&registry)),
    }
}

fn describe_registry(registry: &Registry) -> serde_json::Value {
    let models: Vec<serde_json::Value> = registry.schemas().map(describe_schema).collect();
    serde_json::json!({ "models": models })
}

fn describe_schema(schema: &Schema) -> serde_json::Value {
    let attributes: Vec<serde_json::Value> =
        schema.attributes().iter().map(describe_attribute).collect();
    serde_json::json!({
        "name": schema.name(),
        "attributes": attributes,
    })
}

fn describe_attribute(attribute: &Attribute) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("name".to_string(), serde_json::json!(attribute.name()));
    obj.insert(
        "type".to_string(),
        serde_json::json!(attribute.attribute_type().type_name()),
    );
    obj.insert(
        "category".to_string(),
        serde_json::json!(attribute.category().as_str()),
    );
    obj.insert("field".to_string(), serde_json::json!(attribute.field_path()));
    match attribute.default() {
        Some(DefaultValue::Literal(value)) => {
            obj.insert("default".to_string(), value.to_json());
        }
        Some(DefaultValue::Factory(_)) => {
            obj.insert("factory_default".to_string(), serde_json::json!(true));
        }
        None => {}
    }
    serde_json::Value::Object(obj)
}

fn render_text(registry: &Registry) -> String {
    let mut out = String::new();
    for schema in registry.schemas() {
        out.push_str(&format!("{} ({} attributes)\n", schema.name(), schema.len()));
        for attribute in schema.attributes() {
            out.push_str(&format!(
                "  {} : {} [{}] <- {}",
                attribute.name(),
                attribute.attribute_type().type_name(),
                attribute.category(),
                attribute.field_path()
            ));
            match attribute.default() {
                Some(DefaultValue::Literal(value)) => {
                    out.push_str(&format!(" = {}", value.to_json()));
                }
                Some(DefaultValue::Factory(_)) => out.push_str(" = <factory>"),
                None => {}
            }
            out.push('\n');
        }
    }
    out
}
