//! Declared attribute types and their classification.
//!
//! A schema declaration uses [`TypeDecl`] tokens, which may contain the
//! self-reference sentinel. When the schema is built every token is
//! resolved exactly once into an [`AttributeType`], the closed set of
//! categories the normalizer dispatches on.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::error::ModelError;
use crate::schema::{Schema, WeakSchema};
use crate::value::Value;

// ──────────────────────────────────────────────
// Scalars
// ──────────────────────────────────────────────

/// Scalar types are converted by a pure conversion function, never constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Number,
    Boolean,
    /// Passes values through unchanged.
    Any,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Number => "Number",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Any => "Any",
        }
    }

    pub fn from_name(name: &str) -> Option<ScalarKind> {
        match name {
            "String" => Some(ScalarKind::String),
            "Number" => Some(ScalarKind::Number),
            "Boolean" => Some(ScalarKind::Boolean),
            "Any" => Some(ScalarKind::Any),
            _ => None,
        }
    }

    /// Apply the conversion function to a present, non-null value.
    pub fn convert(self, value: Value) -> Value {
        match (self, value) {
            (ScalarKind::Any, v) => v,
            (ScalarKind::String, Value::String(s)) => Value::String(s),
            (ScalarKind::String, v) => Value::String(v.coerce_text()),
            (ScalarKind::Number, Value::Number(n)) => Value::Number(n),
            (ScalarKind::Number, v) => Value::Number(v.coerce_number()),
            (ScalarKind::Boolean, Value::Bool(b)) => Value::Bool(b),
            (ScalarKind::Boolean, v) => Value::Bool(v.is_truthy()),
        }
    }
}

// ──────────────────────────────────────────────
// Constructible types
// ──────────────────────────────────────────────

/// A reference type built by invoking a constructor on the raw value.
///
/// `raw` is `None` when the value is absent (unspecified or null); the
/// constructor then builds its zero-argument value. Errors are propagated
/// to the caller unchanged.
pub trait Constructible: Send + Sync {
    fn name(&self) -> &str;
    fn construct(&self, raw: Option<&Value>) -> Result<Value, ModelError>;
}

/// Timestamps. Accepts RFC 3339 text, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`
/// (read as UTC) and epoch milliseconds. Constructs "now" with no argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl Constructible for DateType {
    fn name(&self) -> &str {
        "Date"
    }

    fn construct(&self, raw: Option<&Value>) -> Result<Value, ModelError> {
        let date = match raw {
            None => OffsetDateTime::now_utc(),
            Some(Value::Date(d)) => *d,
            Some(Value::String(s)) => parse_date_text(s).ok_or_else(|| {
                ModelError::coercion("Date", format!("invalid date string '{}'", s))
            })?,
            Some(Value::Number(ms)) => date_from_millis(*ms)?,
            Some(other) => {
                return Err(ModelError::coercion(
                    "Date",
                    format!("unsupported {} input", other.type_name()),
                ))
            }
        };
        Ok(Value::Date(date))
    }
}

fn parse_date_text(text: &str) -> Option<OffsetDateTime> {
    let s = text.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(
        s,
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
        ),
    ) {
        return Some(dt.assume_utc());
    }
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

fn date_from_millis(ms: f64) -> Result<OffsetDateTime, ModelError> {
    if !ms.is_finite() {
        return Err(ModelError::coercion("Date", "timestamp is not finite"));
    }
    let nanos = (ms * 1_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| ModelError::coercion("Date", format!("timestamp out of range: {}", e)))
}

/// Exact decimals. Accepts decimal text, numbers and booleans.
/// Constructs zero with no argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalType;

impl Constructible for DecimalType {
    fn name(&self) -> &str {
        "Decimal"
    }

    fn construct(&self, raw: Option<&Value>) -> Result<Value, ModelError> {
        let d = match raw {
            None => Decimal::ZERO,
            Some(Value::Decimal(d)) => *d,
            Some(Value::Number(n)) => Decimal::from_f64(*n).ok_or_else(|| {
                ModelError::coercion("Decimal", format!("number {} is not representable", n))
            })?,
            Some(Value::String(s)) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|e| ModelError::coercion("Decimal", format!("invalid decimal: {}", e)))?,
            Some(Value::Bool(b)) => {
                if *b {
                    Decimal::ONE
                } else {
                    Decimal::ZERO
                }
            }
            Some(other) => {
                return Err(ModelError::coercion(
                    "Decimal",
                    format!("unsupported {} input", other.type_name()),
                ))
            }
        };
        Ok(Value::Decimal(d))
    }
}

/// A constructible type backed by a closure.
pub struct FnConstructible<F> {
    name: String,
    construct: F,
}

impl<F> FnConstructible<F>
where
    F: Fn(Option<&Value>) -> Result<Value, ModelError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, construct: F) -> Self {
        FnConstructible {
            name: name.into(),
            construct,
        }
    }
}

impl<F> Constructible for FnConstructible<F>
where
    F: Fn(Option<&Value>) -> Result<Value, ModelError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, raw: Option<&Value>) -> Result<Value, ModelError> {
        (self.construct)(raw)
    }
}

// ──────────────────────────────────────────────
// Declaration tokens
// ──────────────────────────────────────────────

/// A type token as written in a schema declaration.
#[derive(Clone)]
pub enum TypeDecl {
    Scalar(ScalarKind),
    /// Bare array: sequences pass through, anything else becomes empty.
    Array,
    Constructible(Arc<dyn Constructible>),
    Model(Schema),
    /// One-element sequence token: "array of" the inner type.
    Collection(Box<TypeDecl>),
    /// The model being defined.
    SelfRef,
}

impl TypeDecl {
    pub fn string() -> Self {
        TypeDecl::Scalar(ScalarKind::String)
    }

    pub fn number() -> Self {
        TypeDecl::Scalar(ScalarKind::Number)
    }

    pub fn boolean() -> Self {
        TypeDecl::Scalar(ScalarKind::Boolean)
    }

    pub fn any() -> Self {
        TypeDecl::Scalar(ScalarKind::Any)
    }

    pub fn date() -> Self {
        TypeDecl::Constructible(Arc::new(DateType))
    }

    pub fn decimal() -> Self {
        TypeDecl::Constructible(Arc::new(DecimalType))
    }

    pub fn constructible(ty: impl Constructible + 'static) -> Self {
        TypeDecl::Constructible(Arc::new(ty))
    }

    pub fn model(schema: &Schema) -> Self {
        TypeDecl::Model(schema.clone())
    }

    pub fn collection_of(element: TypeDecl) -> Self {
        TypeDecl::Collection(Box::new(element))
    }

    pub fn models(schema: &Schema) -> Self {
        TypeDecl::collection_of(TypeDecl::model(schema))
    }

    pub fn self_collection() -> Self {
        TypeDecl::collection_of(TypeDecl::SelfRef)
    }

    /// Look up a built-in token by name: the scalars and `Array`.
    pub fn builtin(name: &str) -> Option<TypeDecl> {
        if name == "Array" {
            return Some(TypeDecl::Array);
        }
        ScalarKind::from_name(name).map(TypeDecl::Scalar)
    }

    fn describe(&self) -> String {
        match self {
            TypeDecl::Scalar(kind) => kind.name().to_string(),
            TypeDecl::Array => "Array".to_string(),
            TypeDecl::Constructible(c) => c.name().to_string(),
            TypeDecl::Model(schema) => schema.name().to_string(),
            TypeDecl::Collection(element) => format!("[{}]", element.describe()),
            TypeDecl::SelfRef => "Self".to_string(),
        }
    }
}

impl fmt::Debug for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDecl({})", self.describe())
    }
}

// ──────────────────────────────────────────────
// Resolved types
// ──────────────────────────────────────────────

/// Reference to a model schema from an attribute type.
#[derive(Clone)]
pub enum ModelRef {
    Schema(Schema),
    /// The owning schema; held weakly so recursive schemas do not leak.
    SelfRef(WeakSchema),
}

impl ModelRef {
    pub fn name(&self) -> &str {
        match self {
            ModelRef::Schema(schema) => schema.name(),
            ModelRef::SelfRef(weak) => weak.name(),
        }
    }

    pub fn is_self(&self) -> bool {
        matches!(self, ModelRef::SelfRef(_))
    }

    pub fn resolve(&self) -> Result<Schema, ModelError> {
        match self {
            ModelRef::Schema(schema) => Ok(schema.clone()),
            ModelRef::SelfRef(weak) => {
                weak.upgrade()
                    .ok_or_else(|| ModelError::DanglingSelfReference {
                        model: weak.name().to_string(),
                    })
            }
        }
    }
}

/// Category of a resolved attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Scalar,
    Constructible,
    Model,
    ModelCollection,
    /// Collection of scalars, constructibles or nested collections.
    Collection,
    Array,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Scalar => "scalar",
            Category::Constructible => "constructible",
            Category::Model => "model",
            Category::ModelCollection => "model-collection",
            Category::Collection => "collection",
            Category::Array => "array",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type token after schema build. Never contains the self sentinel.
#[derive(Clone)]
pub enum AttributeType {
    Scalar(ScalarKind),
    Array,
    Constructible(Arc<dyn Constructible>),
    Model(ModelRef),
    Collection(Box<AttributeType>),
}

impl AttributeType {
    /// Resolve a declaration token, binding self-references to `owner`.
    pub(crate) fn resolve(decl: TypeDecl, owner: &WeakSchema) -> AttributeType {
        match decl {
            TypeDecl::Scalar(kind) => AttributeType::Scalar(kind),
            TypeDecl::Array => AttributeType::Array,
            TypeDecl::Constructible(c) => AttributeType::Constructible(c),
            TypeDecl::Model(schema) => AttributeType::Model(ModelRef::Schema(schema)),
            TypeDecl::Collection(element) => {
                AttributeType::Collection(Box::new(AttributeType::resolve(*element, owner)))
            }
            TypeDecl::SelfRef => AttributeType::Model(ModelRef::SelfRef(owner.clone())),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            AttributeType::Scalar(_) => Category::Scalar,
            AttributeType::Array => Category::Array,
            AttributeType::Constructible(_) => Category::Constructible,
            AttributeType::Model(_) => Category::Model,
            AttributeType::Collection(element) => match element.as_ref() {
                AttributeType::Model(_) => Category::ModelCollection,
                _ => Category::Collection,
            },
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, AttributeType::Scalar(_))
    }

    pub fn is_model(&self) -> bool {
        matches!(self, AttributeType::Model(_))
    }

    pub fn is_model_collection(&self) -> bool {
        self.category() == Category::ModelCollection
    }

    /// The referenced model, for model and model-collection types.
    pub fn model_ref(&self) -> Option<&ModelRef> {
        match self {
            AttributeType::Model(model_ref) => Some(model_ref),
            AttributeType::Collection(element) => match element.as_ref() {
                AttributeType::Model(model_ref) => Some(model_ref),
                _ => None,
            },
            _ => None,
        }
    }

    /// Display name: `Number`, `Date`, `Company`, `[Contact]`.
    pub fn type_name(&self) -> String {
        match self {
            AttributeType::Scalar(kind) => kind.name().to_string(),
            AttributeType::Array => "Array".to_string(),
            AttributeType::Constructible(c) => c.name().to_string(),
            AttributeType::Model(model_ref) => model_ref.name().to_string(),
            AttributeType::Collection(element) => format!("[{}]", element.type_name()),
        }
    }
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.category(), self.type_name())
    }
}
