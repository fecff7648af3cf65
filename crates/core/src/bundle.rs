//! Loading schema bundles: many model declarations in one JSON document.
//!
//! ```json
//! { "models": [
//!     { "name": "Contact", "attributes": [
//!         { "name": "kind", "type": "String", "field": "lei_xin" } ] },
//!     { "name": "User", "attributes": {
//!         "contacts": ["Contact"], "born": "Date" } }
//! ] }
//! ```
//!
//! Models may reference models declared later in the same bundle; they
//! are built in dependency order. A bundle is loaded all-or-nothing: the
//! registry is only updated when every model builds.

use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;

use crate::attribute::{AttributeSpec, DefaultValue};
use crate::error::ModelError;
use crate::registry::Registry;
use crate::schema::{Schema, SchemaBuilder, ANONYMOUS_MODEL};
use crate::types::TypeDecl;
use crate::value::Value;

type Json = serde_json::Value;

/// Parse `bundle`, build its models and register them into `registry`.
///
/// Returns the built schemas in the order they were built.
pub fn load_bundle(bundle: &Json, registry: &mut Registry) -> Result<Vec<Schema>, ModelError> {
    let models_arr = bundle
        .get("models")
        .and_then(Json::as_array)
        .ok_or_else(|| ModelError::MissingField {
            field: "models".to_string(),
        })?;

    let decls = models_arr
        .iter()
        .map(parse_model)
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_name = HashMap::with_capacity(decls.len());
    for (position, decl) in decls.iter().enumerate() {
        if by_name.insert(decl.name.as_str(), position).is_some() {
            return Err(ModelError::DuplicateModel(decl.name.clone()));
        }
    }

    let order = dependency_order(&decls, &by_name)?;

    let mut staged = registry.clone();
    let mut built = Vec::with_capacity(decls.len());
    for position in order {
        let schema = build_model(&decls[position], &staged)?;
        staged.register_schema(schema.clone())?;
        built.push(schema);
    }
    *registry = staged;

    tracing::debug!(models = built.len(), "loaded schema bundle");
    Ok(built)
}

/// Parse a bundle from JSON text.
pub fn load_bundle_str(text: &str, registry: &mut Registry) -> Result<Vec<Schema>, ModelError> {
    let bundle: Json = serde_json::from_str(text).map_err(|e| ModelError::InvalidDeclaration {
        model: "<bundle>".to_string(),
        message: format!("invalid JSON: {}", e),
    })?;
    load_bundle(&bundle, registry)
}

// ── Declarations ────────────────────────────────────────────────────

#[derive(Debug)]
struct ModelDecl {
    name: String,
    attributes: Vec<AttributeDecl>,
}

#[derive(Debug)]
struct AttributeDecl {
    name: String,
    ty: TypeToken,
    field: Option<String>,
    default: Option<DefaultDecl>,
}

#[derive(Debug)]
enum TypeToken {
    Named(String),
    Collection(Box<TypeToken>),
    SelfRef,
}

#[derive(Debug)]
enum DefaultDecl {
    Literal(Json),
    Factory(String),
}

impl ModelDecl {
    /// Names of other models this declaration refers to, in attribute order.
    fn references(&self) -> Vec<&str> {
        fn collect<'a>(token: &'a TypeToken, out: &mut Vec<&'a str>) {
            match token {
                TypeToken::Named(name) => out.push(name),
                TypeToken::Collection(inner) => collect(inner, out),
                TypeToken::SelfRef => {}
            }
        }
        let mut out = Vec::new();
        for attribute in &self.attributes {
            collect(&attribute.ty, &mut out);
        }
        out
    }
}

fn invalid(model: &str, message: impl Into<String>) -> ModelError {
    ModelError::InvalidDeclaration {
        model: model.to_string(),
        message: message.into(),
    }
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn parse_model(obj: &Json) -> Result<ModelDecl, ModelError> {
    if !obj.is_object() {
        return Err(invalid("<bundle>", "model declaration must be an object"));
    }
    let name = match obj.get("name") {
        None | Some(Json::Null) => ANONYMOUS_MODEL.to_string(),
        Some(Json::String(s)) if !s.is_empty() => s.clone(),
        Some(_) => return Err(invalid("<bundle>", "model name must be a non-empty string")),
    };

    let attributes = match obj.get("attributes") {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(entries)) => entries
            .iter()
            .map(|entry| {
                let attr_name = entry
                    .get("name")
                    .and_then(Json::as_str)
                    .ok_or_else(|| invalid(&name, "attribute entry missing 'name'"))?;
                parse_attribute(&name, attr_name, entry)
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(Json::Object(entries)) => entries
            .iter()
            .map(|(attr_name, decl)| parse_attribute(&name, attr_name, decl))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(invalid(&name, "'attributes' must be an array or object")),
    };

    Ok(ModelDecl { name, attributes })
}

/// A declaration object, or a bare type token as shorthand.
fn parse_attribute(model: &str, name: &str, decl: &Json) -> Result<AttributeDecl, ModelError> {
    let Some(obj) = decl.as_object() else {
        return Ok(AttributeDecl {
            name: name.to_string(),
            ty: parse_token(model, decl)?,
            field: None,
            default: None,
        });
    };

    let ty = match obj.get("type") {
        Some(token) => parse_token(model, token)?,
        None => TypeToken::SelfRef,
    };
    let field = match obj.get("field") {
        None | Some(Json::Null) => None,
        Some(Json::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(invalid(
                model,
                format!("field of attribute '{}' must be a string", name),
            ))
        }
    };
    let default = obj.get("default").map(parse_default);

    Ok(AttributeDecl {
        name: name.to_string(),
        ty,
        field,
        default,
    })
}

fn parse_token(model: &str, token: &Json) -> Result<TypeToken, ModelError> {
    match token {
        Json::Null => Ok(TypeToken::SelfRef),
        Json::String(name) if name == model => Ok(TypeToken::SelfRef),
        Json::String(name) => Ok(TypeToken::Named(name.clone())),
        Json::Array(items) if items.len() == 1 => Ok(TypeToken::Collection(Box::new(
            parse_token(model, &items[0])?,
        ))),
        Json::Array(_) => Err(invalid(
            model,
            "collection type must have exactly one element",
        )),
        other => Err(invalid(model, format!("invalid type token {}", other))),
    }
}

fn parse_default(default: &Json) -> DefaultDecl {
    match default.as_object() {
        Some(obj) if obj.len() == 1 => match obj.get("factory") {
            Some(Json::String(name)) => DefaultDecl::Factory(name.clone()),
            _ => DefaultDecl::Literal(default.clone()),
        },
        _ => DefaultDecl::Literal(default.clone()),
    }
}

// ── Ordering ────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Topological order of bundle models. References to models outside the
/// bundle and self-references impose no ordering.
fn dependency_order(
    decls: &[ModelDecl],
    by_name: &HashMap<&str, usize>,
) -> Result<Vec<usize>, ModelError> {
    let mut marks = vec![Mark::Unvisited; decls.len()];
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(decls.len());
    for position in 0..decls.len() {
        visit(position, decls, by_name, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    position: usize,
    decls: &[ModelDecl],
    by_name: &HashMap<&str, usize>,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), ModelError> {
    match marks[position] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let start = path.iter().position(|&p| p == position).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..]
                .iter()
                .map(|&p| decls[p].name.clone())
                .collect();
            cycle.push(decls[position].name.clone());
            return Err(ModelError::CyclicReference(cycle));
        }
        Mark::Unvisited => {}
    }

    marks[position] = Mark::InProgress;
    path.push(position);
    for reference in decls[position].references() {
        if let Some(&dependency) = by_name.get(reference) {
            if dependency != position {
                visit(dependency, decls, by_name, marks, path, order)?;
            }
        }
    }
    path.pop();
    marks[position] = Mark::Done;
    order.push(position);
    Ok(())
}

// ── Building ────────────────────────────────────────────────────────

fn build_model(decl: &ModelDecl, registry: &Registry) -> Result<Schema, ModelError> {
    let mut builder = SchemaBuilder::new(decl.name.as_str());
    for attribute in &decl.attributes {
        let mut spec = AttributeSpec::new(resolve_token(&decl.name, &attribute.ty, registry)?);
        if let Some(field) = &attribute.field {
            spec = spec.field(field.as_str());
        }
        if let Some(default) = &attribute.default {
            spec = spec.with_default(resolve_default(&decl.name, default)?);
        }
        builder = builder.attribute(attribute.name.as_str(), spec);
    }
    builder.build()
}

/// Built-in tokens first, then registered constructible types, then models.
fn resolve_token(model: &str, token: &TypeToken, registry: &Registry) -> Result<TypeDecl, ModelError> {
    match token {
        TypeToken::SelfRef => Ok(TypeDecl::SelfRef),
        TypeToken::Collection(inner) => {
            resolve_token(model, inner, registry).map(TypeDecl::collection_of)
        }
        TypeToken::Named(name) => TypeDecl::builtin(name)
            .or_else(|| registry.constructible(name).map(TypeDecl::Constructible))
            .or_else(|| registry.schema(name).map(TypeDecl::model))
            .ok_or_else(|| ModelError::UnknownType {
                model: model.to_string(),
                type_name: name.clone(),
            }),
    }
}

fn resolve_default(model: &str, default: &DefaultDecl) -> Result<DefaultValue, ModelError> {
    match default {
        DefaultDecl::Literal(json) => Ok(DefaultValue::Literal(Value::from_json(json))),
        DefaultDecl::Factory(name) => match name.as_str() {
            "emptyArray" => Ok(DefaultValue::factory(|| Value::Array(Vec::new()))),
            "emptyObject" => Ok(DefaultValue::factory(|| Value::Object(BTreeMap::new()))),
            "now" => Ok(DefaultValue::factory(|| {
                Value::Date(OffsetDateTime::now_utc())
            })),
            other => Err(invalid(model, format!("unknown default factory '{}'", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use serde_json::json;

    #[test]
    fn orders_forward_references() {
        let mut registry = Registry::new();
        let built = load_bundle(
            &json!({ "models": [
                { "name": "User", "attributes": { "company": "Company" } },
                { "name": "Company", "attributes": { "name": "String" } }
            ] }),
            &mut registry,
        )
        .unwrap();
        let names: Vec<_> = built.iter().map(Schema::name).collect();
        assert_eq!(names, vec!["Company", "User"]);
        let company = registry.schema("Company").unwrap();
        let user = registry.schema("User").unwrap();
        let target = user
            .attribute("company")
            .unwrap()
            .attribute_type()
            .model_ref()
            .unwrap()
            .resolve()
            .unwrap();
        assert!(target.ptr_eq(company));
    }

    #[test]
    fn null_and_own_name_mean_self() {
        let mut registry = Registry::new();
        load_bundle(
            &json!({ "models": [ { "name": "Node", "attributes": [
                { "name": "parent", "type": null },
                { "name": "next", "type": "Node" },
                { "name": "children", "type": [null] }
            ] } ] }),
            &mut registry,
        )
        .unwrap();
        let node = registry.schema("Node").unwrap();
        for name in ["parent", "next"] {
            let model_ref = node.attribute(name).unwrap().attribute_type().model_ref().unwrap();
            assert!(model_ref.is_self());
        }
        assert_eq!(
            node.attribute("children").unwrap().category(),
            Category::ModelCollection
        );
    }

    #[test]
    fn rejects_cycles_between_models() {
        let mut registry = Registry::new();
        let err = load_bundle(
            &json!({ "models": [
                { "name": "A", "attributes": { "b": "B" } },
                { "name": "B", "attributes": { "a": ["A"] } }
            ] }),
            &mut registry,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::CyclicReference(vec!["A".into(), "B".into(), "A".into()])
        );
        assert!(registry.schema("A").is_none());
    }

    #[test]
    fn failed_bundle_leaves_registry_untouched() {
        let mut registry = Registry::new();
        let err = load_bundle(
            &json!({ "models": [
                { "name": "Good", "attributes": { "x": "Number" } },
                { "name": "Bad", "attributes": { "x": "Widget" } }
            ] }),
            &mut registry,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownType {
                model: "Bad".into(),
                type_name: "Widget".into()
            }
        );
        assert!(registry.schema("Good").is_none());
    }

    #[test]
    fn factory_defaults_are_fresh() {
        let mut registry = Registry::new();
        load_bundle(
            &json!({ "models": [ { "name": "Bag", "attributes": [
                { "name": "items", "type": "Any", "default": { "factory": "emptyArray" } },
                { "name": "meta", "type": "Any", "default": { "factory": "other", "x": 1 } }
            ] } ] }),
            &mut registry,
        )
        .unwrap();
        let bag = registry.schema("Bag").unwrap();
        assert!(bag.attribute("items").unwrap().default().unwrap().is_factory());
        assert!(!bag.attribute("meta").unwrap().default().unwrap().is_factory());
    }

    #[test]
    fn rejects_unknown_factory_and_bad_tokens() {
        let mut registry = Registry::new();
        let err = load_bundle(
            &json!({ "models": [ { "name": "M", "attributes": [
                { "name": "x", "type": "Any", "default": { "factory": "random" } }
            ] } ] }),
            &mut registry,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_declaration");

        let err = load_bundle(
            &json!({ "models": [ { "name": "M", "attributes": { "x": ["String", "Number"] } } ] }),
            &mut registry,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_declaration");
    }

    #[test]
    fn missing_models_field() {
        let mut registry = Registry::new();
        assert_eq!(
            load_bundle(&json!({}), &mut registry).unwrap_err(),
            ModelError::MissingField {
                field: "models".into()
            }
        );
    }

    #[test]
    fn anonymous_models_get_default_name() {
        let mut registry = Registry::new();
        let built = load_bundle(&json!({ "models": [ { "attributes": {} } ] }), &mut registry).unwrap();
        assert_eq!(built[0].name(), ANONYMOUS_MODEL);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = Registry::new();
        let bundle = json!({ "models": [ { "name": "A" }, { "name": "A" } ] });
        assert_eq!(
            load_bundle(&bundle, &mut registry).unwrap_err(),
            ModelError::DuplicateModel("A".into())
        );
        load_bundle(&json!({ "models": [ { "name": "A" } ] }), &mut registry).unwrap();
        assert_eq!(
            load_bundle(&json!({ "models": [ { "name": "A" } ] }), &mut registry).unwrap_err(),
            ModelError::DuplicateModel("A".into())
        );
    }
}
