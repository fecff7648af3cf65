//! Model instances and the mapping engine.
//!
//! Construction walks every declared attribute in order, so an instance
//! is never observable half-built. Two construction paths exist:
//!
//! - local: [`Schema::create`] reads values by attribute name and
//!   normalizes them in place.
//! - external: [`Schema::from_data`] reads each attribute at its field
//!   path and recurses into nested schemas through their own field paths.
//!
//! [`Model::to_data`] is the inverse of the external path.

use modelmap_path::set_at_segments;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ModelError;
use crate::schema::Schema;
use crate::types::Category;
use crate::value::Value;

type Json = serde_json::Value;

/// An instance of a schema: one value slot per attribute.
///
/// A slot holding `None` is present but unspecified (no value and no
/// default). Unspecified slots are omitted from `to_data` output.
#[derive(Clone, PartialEq)]
pub struct Model {
    schema: Schema,
    values: BTreeMap<String, Option<Value>>,
}

// ──────────────────────────────────────────────
// Schema-level operations
// ──────────────────────────────────────────────

impl Schema {
    /// Build an instance from locally-shaped values (an object or another
    /// model). Missing attributes take their defaults; any other shape
    /// yields a fully defaulted instance.
    pub fn create(&self, values: &Value) -> Result<Model, ModelError> {
        self.construct_with(|name| values.get(name).cloned())
    }

    /// Build a fully defaulted instance.
    pub fn create_default(&self) -> Result<Model, ModelError> {
        self.construct_with(|_| None)
    }

    pub fn create_all(&self, values: &[Value]) -> Result<Vec<Model>, ModelError> {
        values.iter().map(|v| self.create(v)).collect()
    }

    /// `create` for one or many: arrays map element-wise to an array of models.
    pub fn create_value(&self, values: &Value) -> Result<Value, ModelError> {
        match values {
            Value::Array(items) => Ok(self
                .create_all(items)?
                .into_iter()
                .map(Value::Model)
                .collect()),
            other => self.create(other).map(Value::Model),
        }
    }

    /// Build an instance from external data, remapping field paths.
    pub fn from_data(&self, data: &Json) -> Result<Model, ModelError> {
        let mut model = self.create_default()?;
        model.fill_from_data(data)?;
        Ok(model)
    }

    /// One instance per element. An element that is itself an array yields
    /// a defaulted instance, as `fill_from_data` ignores arrays; use
    /// [`Schema::from_data_value`] to keep nested arrays.
    pub fn from_data_set(&self, data: &[Json]) -> Result<Vec<Model>, ModelError> {
        data.iter().map(|d| self.from_data(d)).collect()
    }

    /// `from_data` for one or many: arrays map element-wise at every depth,
    /// so `[[a], b]` becomes `[[model], model]`.
    pub fn from_data_value(&self, data: &Json) -> Result<Value, ModelError> {
        match data {
            Json::Array(items) => items
                .iter()
                .map(|item| self.from_data_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => self.from_data(other).map(Value::Model),
        }
    }

    /// Serialize to external data. Model instances serialize directly;
    /// arrays element-wise; any other value is first built with `create`.
    pub fn to_data(&self, value: &Value) -> Result<Json, ModelError> {
        match value {
            Value::Model(model) => Ok(model.to_data()),
            Value::Array(items) => items
                .iter()
                .map(|item| self.to_data(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            other => Ok(self.create(other)?.to_data()),
        }
    }

    pub fn to_data_set(&self, models: &[Model]) -> Vec<Json> {
        models.iter().map(Model::to_data).collect()
    }

    /// Rebuild `model` through this schema's `create`.
    pub fn clone_model(&self, model: &Model) -> Result<Model, ModelError> {
        self.construct_with(|name| model.get(name).cloned())
    }

    pub(crate) fn construct_with(
        &self,
        mut lookup: impl FnMut(&str) -> Option<Value>,
    ) -> Result<Model, ModelError> {
        let mut values = BTreeMap::new();
        for attribute in self.attributes() {
            let value = attribute.normalize_local(lookup(attribute.name()))?;
            values.insert(attribute.name().to_string(), value);
        }
        Ok(Model {
            schema: self.clone(),
            values,
        })
    }
}

// ──────────────────────────────────────────────
// Instance-level operations
// ──────────────────────────────────────────────

impl Model {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        self.schema.name()
    }

    /// Conformance check against a specific schema.
    pub fn is_instance_of(&self, schema: &Schema) -> bool {
        self.schema.ptr_eq(schema)
    }

    /// Current value of an attribute. `None` when unspecified or unknown.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name).and_then(Option::as_mut)
    }

    /// True when a slot exists for `name`, even if unspecified.
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Assign a value directly. No coercion is applied.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ModelError> {
        if name.is_empty() {
            return Err(ModelError::InvalidArgument(
                "attribute name must not be empty".to_string(),
            ));
        }
        self.values.insert(name.to_string(), Some(value.into()));
        Ok(())
    }

    /// Overwrite every declared attribute from external data.
    ///
    /// Null and array data leave the instance unchanged. On error the
    /// instance is left untouched.
    pub fn fill_from_data(&mut self, data: &Json) -> Result<&mut Self, ModelError> {
        if data.is_null() {
            return Ok(self);
        }
        if data.is_array() {
            tracing::warn!(
                model = %self.model_name(),
                "array data passed to singular from_data; instance left unchanged"
            );
            return Ok(self);
        }

        let mut mapped = Vec::with_capacity(self.schema.len());
        for attribute in self.schema.attributes() {
            let raw = attribute.read_external(data);
            tracing::trace!(
                model = %self.schema.name(),
                attribute = attribute.name(),
                field = attribute.field_path(),
                found = raw.is_some(),
                "mapping external field"
            );
            mapped.push((
                attribute.name().to_string(),
                attribute.normalize_external(raw)?,
            ));
        }
        self.values.extend(mapped);
        Ok(self)
    }

    /// Serialize to external data, writing each attribute at its field path.
    pub fn to_data(&self) -> Json {
        let mut data = Json::Object(serde_json::Map::new());
        for attribute in self.schema.attributes() {
            let value = self.get(attribute.name());
            let external = match attribute.category() {
                Category::ModelCollection => match value {
                    Some(Value::Array(items)) => Json::Array(items.iter().map(Value::to_json).collect()),
                    _ => Json::Array(Vec::new()),
                },
                _ => match value {
                    Some(value) => value.to_json(),
                    None => continue,
                },
            };
            set_at_segments(&mut data, attribute.field_segments(), external);
        }
        data
    }

    /// A structurally independent copy, rebuilt through `create`.
    pub fn clone_model(&self) -> Result<Model, ModelError> {
        self.schema.clone_model(self)
    }

    /// Slots in declaration order, followed by any extra assigned names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        let declared = self
            .schema
            .attributes()
            .iter()
            .filter_map(move |attribute| {
                self.values
                    .get_key_value(attribute.name())
                    .map(|(k, v)| (k.as_str(), v.as_ref()))
            });
        let extra = self
            .values
            .iter()
            .filter(move |(k, _)| !self.schema.has_attribute(k))
            .map(|(k, v)| (k.as_str(), v.as_ref()));
        declared.chain(extra)
    }

    /// JSON keyed by attribute names, nested models included.
    pub fn to_local_json(&self) -> Json {
        let mut map = serde_json::Map::new();
        for (name, value) in self.iter() {
            if let Some(value) = value {
                map.insert(name.to_string(), value.to_local_json());
            }
        }
        Json::Object(map)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.model_name());
        for (name, value) in self.iter() {
            s.field(name, &value);
        }
        s.finish()
    }
}

impl serde::Serialize for Model {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_local_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeSpec;
    use serde_json::json;

    fn person() -> Schema {
        Schema::builder("Person")
            .attribute("id", AttributeSpec::number().default_value(0))
            .attribute("name", AttributeSpec::string().field("xing_ming"))
            .attribute("city", AttributeSpec::string().field("address.city"))
            .build()
            .unwrap()
    }

    #[test]
    fn create_fills_every_declared_attribute() {
        let model = person().create(&Value::object([("name", "Ada")])).unwrap();
        assert_eq!(model.get("id"), Some(&Value::from(0)));
        assert_eq!(model.get("name"), Some(&Value::from("Ada")));
        assert!(model.has("city"));
        assert_eq!(model.get("city"), None);
    }

    #[test]
    fn create_from_non_object_is_fully_defaulted() {
        let model = person().create(&Value::from("x")).unwrap();
        assert_eq!(model.get("id"), Some(&Value::from(0)));
    }

    #[test]
    fn set_rejects_empty_name_and_skips_coercion() {
        let mut model = person().create_default().unwrap();
        assert!(matches!(
            model.set("", 1),
            Err(ModelError::InvalidArgument(_))
        ));
        model.set("id", "not a number").unwrap();
        assert_eq!(model.get("id"), Some(&Value::from("not a number")));
    }

    #[test]
    fn from_data_follows_nested_field_paths() {
        let data = json!({ "id": "7", "xing_ming": "Ada", "address": { "city": "London" } });
        let model = person().from_data(&data).unwrap();
        assert_eq!(model.get("id"), Some(&Value::from(7)));
        assert_eq!(model.get("city"), Some(&Value::from("London")));
        assert_eq!(model.to_data(), json!({ "id": 7, "xing_ming": "Ada", "address": { "city": "London" } }));
    }

    #[test]
    fn fill_from_data_ignores_null_and_arrays() {
        let schema = person();
        let mut model = schema.create(&Value::object([("id", 3)])).unwrap();
        let before = model.clone();
        model.fill_from_data(&Json::Null).unwrap();
        model.fill_from_data(&json!([{ "id": 9 }])).unwrap();
        assert_eq!(model, before);
    }

    #[test]
    fn from_data_value_maps_arrays() {
        let value = person()
            .from_data_value(&json!([{ "id": 1 }, { "id": 2 }]))
            .unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].get("id"), Some(&Value::from(2)));
    }

    #[test]
    fn from_data_value_keeps_nested_arrays() {
        let schema = person();
        let value = schema
            .from_data_value(&json!([[{ "id": 1 }, { "id": 2 }], { "id": 3 }]))
            .unwrap();
        let outer = value.as_array().unwrap();
        let inner = outer[0].as_array().unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner[1].get("id"), Some(&Value::from(2)));
        assert_eq!(outer[1].get("id"), Some(&Value::from(3)));
        assert_eq!(
            schema.to_data(&value).unwrap(),
            json!([[{ "id": 1 }, { "id": 2 }], { "id": 3 }])
        );
    }

    #[test]
    fn to_data_omits_unspecified_but_keeps_null() {
        let schema = person();
        let mut model = schema.create_default().unwrap();
        assert_eq!(model.to_data(), json!({ "id": 0 }));
        model.set("name", Value::Null).unwrap();
        assert_eq!(model.to_data(), json!({ "id": 0, "xing_ming": null }));
    }

    #[test]
    fn static_to_data_creates_from_plain_values() {
        let data = person()
            .to_data(&Value::object([("name", Value::from("Bo"))]))
            .unwrap();
        assert_eq!(data, json!({ "id": 0, "xing_ming": "Bo" }));
    }

    #[test]
    fn local_json_uses_attribute_names() {
        let model = person()
            .from_data(&json!({ "xing_ming": "Ada", "address": { "city": "Paris" } }))
            .unwrap();
        assert_eq!(
            model.to_local_json(),
            json!({ "id": 0, "name": "Ada", "city": "Paris" })
        );
    }

    #[test]
    fn extra_assigned_names_are_kept_locally_only() {
        let mut model = person().create_default().unwrap();
        model.set("note", "hi").unwrap();
        assert_eq!(model.get("note"), Some(&Value::from("hi")));
        let names: Vec<_> = model.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["id", "name", "city", "note"]);
        assert_eq!(model.to_data(), json!({ "id": 0 }));
    }

    #[test]
    fn debug_shows_model_name() {
        let model = person().create_default().unwrap();
        let text = format!("{:?}", model);
        assert!(text.starts_with("Person"));
    }
}
