//! Attribute declarations and resolved attribute descriptors.

use modelmap_path::{get_at_segments, Segment};
use std::fmt;
use std::sync::Arc;

use crate::error::ModelError;
use crate::normalize::normalize;
use crate::schema::WeakSchema;
use crate::types::{AttributeType, Category, Constructible, TypeDecl};
use crate::value::Value;

type Json = serde_json::Value;

// ──────────────────────────────────────────────
// Defaults
// ──────────────────────────────────────────────

/// A default value: a literal, or a factory invoked on every use.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn factory(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        DefaultValue::Factory(Arc::new(f))
    }

    /// Produce a fresh default value.
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, DefaultValue::Factory(_))
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

/// Declaration of one attribute, before schema build.
///
/// Built with chained setters:
///
/// ```ignore
/// AttributeSpec::string().field("xing_ming").default_value("name")
/// ```
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub(crate) ty: TypeDecl,
    pub(crate) field: Option<String>,
    pub(crate) default: Option<DefaultValue>,
}

impl AttributeSpec {
    pub fn new(ty: TypeDecl) -> Self {
        AttributeSpec {
            ty,
            field: None,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::new(TypeDecl::string())
    }

    pub fn number() -> Self {
        Self::new(TypeDecl::number())
    }

    pub fn boolean() -> Self {
        Self::new(TypeDecl::boolean())
    }

    pub fn any() -> Self {
        Self::new(TypeDecl::any())
    }

    pub fn array() -> Self {
        Self::new(TypeDecl::Array)
    }

    pub fn date() -> Self {
        Self::new(TypeDecl::date())
    }

    pub fn decimal() -> Self {
        Self::new(TypeDecl::decimal())
    }

    pub fn constructible(ty: impl Constructible + 'static) -> Self {
        Self::new(TypeDecl::constructible(ty))
    }

    pub fn model(schema: &crate::schema::Schema) -> Self {
        Self::new(TypeDecl::model(schema))
    }

    pub fn models(schema: &crate::schema::Schema) -> Self {
        Self::new(TypeDecl::models(schema))
    }

    /// An attribute typed as the model being defined.
    pub fn self_ref() -> Self {
        Self::new(TypeDecl::SelfRef)
    }

    /// An attribute typed as a collection of the model being defined.
    pub fn self_collection() -> Self {
        Self::new(TypeDecl::self_collection())
    }

    /// External field path. An empty path falls back to the attribute name.
    pub fn field(mut self, path: impl Into<String>) -> Self {
        self.field = Some(path.into());
        self
    }

    /// Literal default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Factory default, invoked once per construction.
    pub fn default_fn(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::factory(f));
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn type_decl(&self) -> &TypeDecl {
        &self.ty
    }
}

/// Bare type shorthand: a declaration that is only a type.
impl From<TypeDecl> for AttributeSpec {
    fn from(ty: TypeDecl) -> Self {
        AttributeSpec::new(ty)
    }
}

// ──────────────────────────────────────────────
// Descriptors
// ──────────────────────────────────────────────

/// A resolved attribute of a built schema.
#[derive(Clone)]
pub struct Attribute {
    name: String,
    ty: AttributeType,
    field: String,
    segments: Vec<Segment>,
    default: Option<DefaultValue>,
}

impl Attribute {
    pub(crate) fn resolve(
        name: String,
        spec: AttributeSpec,
        field: String,
        segments: Vec<Segment>,
        owner: &WeakSchema,
    ) -> Self {
        Attribute {
            name,
            ty: AttributeType::resolve(spec.ty, owner),
            field,
            segments,
            default: spec.default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> &AttributeType {
        &self.ty
    }

    pub fn category(&self) -> Category {
        self.ty.category()
    }

    /// Dotted path of this attribute in external data.
    pub fn field_path(&self) -> &str {
        &self.field
    }

    pub fn field_segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Evaluate the default afresh. `None` when no default is declared.
    pub fn resolve_default(&self) -> Option<Value> {
        self.default.as_ref().map(DefaultValue::resolve)
    }

    /// Normalize an already locally-shaped value.
    pub fn normalize_local(&self, value: Option<Value>) -> Result<Option<Value>, ModelError> {
        let value = match value {
            Some(value) => Some(value),
            None => self.resolve_default(),
        };
        normalize(value, &self.ty)
    }

    /// Normalize a raw value read from external data. Model and
    /// model-collection attributes recurse through the nested schema's own
    /// field mapping.
    pub fn normalize_external(&self, raw: Option<&Json>) -> Result<Option<Value>, ModelError> {
        let Some(raw) = raw else {
            return normalize(self.resolve_default(), &self.ty);
        };

        match &self.ty {
            AttributeType::Model(model_ref) => {
                if model_ref.is_self() && raw.is_null() {
                    return Ok(Some(Value::Null));
                }
                let schema = model_ref.resolve()?;
                Ok(Some(schema.from_data_value(raw)?))
            }
            AttributeType::Collection(element) => match element.as_ref() {
                AttributeType::Model(model_ref) => match raw {
                    Json::Array(_) => Ok(Some(model_ref.resolve()?.from_data_value(raw)?)),
                    _ => Ok(Some(Value::Array(Vec::new()))),
                },
                _ => normalize(Some(Value::from_json(raw)), &self.ty),
            },
            _ => normalize(Some(Value::from_json(raw)), &self.ty),
        }
    }

    /// Locate this attribute's raw value inside external data.
    pub fn read_external<'a>(&self, data: &'a Json) -> Option<&'a Json> {
        get_at_segments(data, &self.segments)
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.ty)
            .field("field", &self.field)
            .field("default", &self.default)
            .finish()
    }
}
