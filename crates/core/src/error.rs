use modelmap_path::PathError;

/// All errors raised while defining schemas, loading bundles or mapping values.
///
/// Malformed *data* never produces an error: shape mismatches degrade to
/// defaults. Errors come from malformed *declarations*, from programmer
/// mistakes such as an empty attribute name, and from constructible types
/// rejecting their input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An argument that must be non-empty or well-formed was not.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A constructible type rejected the raw value it was given.
    #[error("cannot construct {type_name}: {message}")]
    Coercion { type_name: String, message: String },

    /// Two attributes of one model share a name.
    #[error("duplicate attribute '{attribute}' in model '{model}'")]
    DuplicateAttribute { model: String, attribute: String },

    /// An attribute's external field path does not parse.
    #[error("invalid field path for '{model}.{attribute}': {source}")]
    InvalidFieldPath {
        model: String,
        attribute: String,
        #[source]
        source: PathError,
    },

    /// A self-referencing attribute outlived the schema it points to.
    #[error("self-reference of model '{model}' is no longer alive")]
    DanglingSelfReference { model: String },

    /// The bundle is missing a required top-level field.
    #[error("bundle missing required field: '{field}'")]
    MissingField { field: String },

    /// A model declaration in a bundle is structurally invalid.
    #[error("model '{model}': {message}")]
    InvalidDeclaration { model: String, message: String },

    /// A type token names neither a built-in, a registered type nor a model.
    #[error("unknown type '{type_name}' in model '{model}'")]
    UnknownType { model: String, type_name: String },

    /// A model name is not present in the registry.
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// A model with this name is already registered.
    #[error("duplicate model '{0}'")]
    DuplicateModel(String),

    /// Models reference each other in a cycle (self-reference excluded).
    #[error("cyclic model references: {}", .0.join(" -> "))]
    CyclicReference(Vec<String>),

    /// A plugin failed while installing itself.
    #[error("plugin '{plugin}' failed to install: {message}")]
    Plugin { plugin: String, message: String },
}

impl ModelError {
    /// Short machine-readable kind, used in JSON error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::InvalidArgument(_) => "invalid_argument",
            ModelError::Coercion { .. } => "coercion",
            ModelError::DuplicateAttribute { .. } => "duplicate_attribute",
            ModelError::InvalidFieldPath { .. } => "invalid_field_path",
            ModelError::DanglingSelfReference { .. } => "dangling_self_reference",
            ModelError::MissingField { .. } => "missing_field",
            ModelError::InvalidDeclaration { .. } => "invalid_declaration",
            ModelError::UnknownType { .. } => "unknown_type",
            ModelError::UnknownModel(_) => "unknown_model",
            ModelError::DuplicateModel(_) => "duplicate_model",
            ModelError::CyclicReference(_) => "cyclic_reference",
            ModelError::Plugin { .. } => "plugin",
        }
    }

    /// Serialize to the JSON error report format.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }

    pub(crate) fn coercion(type_name: &str, message: impl Into<String>) -> Self {
        ModelError::Coercion {
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }
}
