//! Value normalization: coerce a raw local value into its declared type.
//!
//! Dispatch order, first match wins:
//! 1. plain array: sequences pass through, anything else becomes empty
//! 2. constructible or model: construct from the value, or with no argument
//! 3. collection: normalize each element of a sequence, else empty
//! 4. scalar: convert present values, pass null and unspecified through

use crate::error::ModelError;
use crate::types::{AttributeType, ModelRef};
use crate::value::Value;

/// Normalize `raw` against `ty`. `None` means unspecified, both in and out.
///
/// Never fails for scalar and array types. Constructor failures of
/// constructible types are returned unchanged.
pub fn normalize(raw: Option<Value>, ty: &AttributeType) -> Result<Option<Value>, ModelError> {
    let normalized = match ty {
        AttributeType::Array => match raw {
            Some(Value::Array(items)) => Value::Array(items),
            _ => Value::Array(Vec::new()),
        },
        AttributeType::Constructible(ctor) => {
            ctor.construct(raw.as_ref().filter(|value| !value.is_null()))?
        }
        AttributeType::Model(model_ref) => construct_model(raw, model_ref)?,
        AttributeType::Collection(element) => {
            let items = match raw {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            items
                .into_iter()
                .map(|item| normalize(Some(item), element).map(|v| v.unwrap_or(Value::Null)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)?
        }
        AttributeType::Scalar(kind) => {
            return Ok(match raw {
                Some(value) if !value.is_null() => Some(kind.convert(value)),
                other => other,
            })
        }
    };
    Ok(Some(normalized))
}

/// Build a nested model from a locally-shaped value.
///
/// Objects and other model instances are read attribute by attribute;
/// anything else yields a fully defaulted instance. An absent value for a
/// self-reference stays null so that recursive schemas terminate.
fn construct_model(raw: Option<Value>, model_ref: &ModelRef) -> Result<Value, ModelError> {
    let schema = model_ref.resolve()?;
    let model = match raw {
        None | Some(Value::Null) if model_ref.is_self() => return Ok(Value::Null),
        Some(Value::Model(source)) => {
            schema.construct_with(|name| source.get(name).cloned())?
        }
        Some(Value::Object(mut map)) => schema.construct_with(|name| map.remove(name))?,
        _ => schema.create_default()?,
    };
    Ok(Value::Model(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeSpec;
    use crate::schema::Schema;
    use crate::types::{DateType, ScalarKind};
    use std::sync::Arc;

    fn scalar(kind: ScalarKind) -> AttributeType {
        AttributeType::Scalar(kind)
    }

    #[test]
    fn plain_array_passes_sequences_and_replaces_others() {
        let items = Value::Array(vec![Value::from(1), Value::from("x")]);
        assert_eq!(
            normalize(Some(items.clone()), &AttributeType::Array).unwrap(),
            Some(items)
        );
        assert_eq!(
            normalize(Some(Value::from("x")), &AttributeType::Array).unwrap(),
            Some(Value::Array(vec![]))
        );
        assert_eq!(
            normalize(None, &AttributeType::Array).unwrap(),
            Some(Value::Array(vec![]))
        );
    }

    #[test]
    fn scalars_pass_absent_values_through() {
        assert_eq!(normalize(None, &scalar(ScalarKind::Number)).unwrap(), None);
        assert_eq!(
            normalize(Some(Value::Null), &scalar(ScalarKind::String)).unwrap(),
            Some(Value::Null)
        );
        assert_eq!(
            normalize(Some(Value::from("3")), &scalar(ScalarKind::Number)).unwrap(),
            Some(Value::from(3))
        );
    }

    #[test]
    fn constructible_treats_null_as_absent() {
        let ty = AttributeType::Constructible(Arc::new(DateType));
        let from_null = normalize(Some(Value::Null), &ty).unwrap().unwrap();
        assert!(from_null.as_date().is_some());
        let err = normalize(Some(Value::from("garbage")), &ty).unwrap_err();
        assert!(matches!(err, ModelError::Coercion { .. }));
    }

    #[test]
    fn collections_normalize_each_element() {
        let ty = AttributeType::Collection(Box::new(scalar(ScalarKind::Number)));
        let raw = Value::Array(vec![Value::from("1"), Value::from(2), Value::Null]);
        assert_eq!(
            normalize(Some(raw), &ty).unwrap(),
            Some(Value::Array(vec![
                Value::from(1),
                Value::from(2),
                Value::Null
            ]))
        );
        assert_eq!(
            normalize(Some(Value::from(5)), &ty).unwrap(),
            Some(Value::Array(vec![]))
        );
    }

    #[test]
    fn models_construct_from_objects_and_default_otherwise() {
        let point = Schema::define(
            "Point",
            [
                ("x", AttributeSpec::number().default_value(0)),
                ("y", AttributeSpec::number().default_value(0)),
            ],
        )
        .unwrap();
        let ty = AttributeType::Model(ModelRef::Schema(point.clone()));

        let built = normalize(Some(Value::object([("x", "4")])), &ty)
            .unwrap()
            .unwrap();
        let model = built.as_model().unwrap();
        assert!(model.is_instance_of(&point));
        assert_eq!(model.get("x"), Some(&Value::from(4)));
        assert_eq!(model.get("y"), Some(&Value::from(0)));

        let defaulted = normalize(Some(Value::from("junk")), &ty).unwrap().unwrap();
        assert_eq!(defaulted.as_model().unwrap().get("x"), Some(&Value::from(0)));

        let absent = normalize(None, &ty).unwrap().unwrap();
        assert!(absent.is_model());
    }

    #[test]
    fn model_from_other_instance_is_reconstructed() {
        let point = Schema::define("Point", [("x", AttributeSpec::number())]).unwrap();
        let source = point.create(&Value::object([("x", 1)])).unwrap();
        let ty = AttributeType::Model(ModelRef::Schema(point));
        let rebuilt = normalize(Some(Value::Model(source.clone())), &ty)
            .unwrap()
            .unwrap();
        assert_eq!(rebuilt, Value::Model(source));
    }
}
