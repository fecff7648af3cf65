//! Model schemas: the ordered attribute set behind every model.
//!
//! A schema is built in two phases. Declarations are validated first
//! (names, field paths); then the schema is allocated with
//! `Arc::new_cyclic`, which hands out a weak handle to the schema before it
//! exists. Every self-referencing declaration is bound to that handle, so
//! recursive schemas such as trees need no forward declaration.

use modelmap_path::parse_path;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::attribute::{Attribute, AttributeSpec};
use crate::error::ModelError;

/// Name given to models defined without one.
pub const ANONYMOUS_MODEL: &str = "AnonymousModel";

pub(crate) struct SchemaInner {
    name: String,
    attributes: Vec<Attribute>,
    index: HashMap<String, usize>,
}

/// A built model schema. Cheap to clone; clones share the definition.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

/// Non-owning handle to a schema, used for self-references.
#[derive(Clone)]
pub struct WeakSchema {
    name: String,
    inner: Weak<SchemaInner>,
}

impl WeakSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upgrade(&self) -> Option<Schema> {
        self.inner.upgrade().map(|inner| Schema { inner })
    }
}

impl fmt::Debug for WeakSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakSchema({})", self.name)
    }
}

impl Schema {
    /// Define a schema from `(name, declaration)` pairs, in order.
    pub fn define<I, K, S>(name: impl Into<String>, attributes: I) -> Result<Schema, ModelError>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<AttributeSpec>,
    {
        attributes
            .into_iter()
            .fold(SchemaBuilder::new(name), |builder, (k, s)| {
                builder.attribute(k, s)
            })
            .build()
    }

    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.inner.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.inner
            .index
            .get(name)
            .map(|&position| &self.inner.attributes[position])
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.inner.attributes.iter().map(Attribute::name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.inner.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.attributes.is_empty()
    }

    /// True when both handles point at the same definition.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakSchema {
        WeakSchema {
            name: self.inner.name.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.inner.name)
            .field("attributes", &self.inner.attributes)
            .finish()
    }
}

// ──────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────

/// Collects attribute declarations and builds a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    attributes: Vec<(String, AttributeSpec)>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        SchemaBuilder {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder for a model named [`ANONYMOUS_MODEL`].
    pub fn anonymous() -> Self {
        SchemaBuilder::new(ANONYMOUS_MODEL)
    }

    pub fn attribute(mut self, name: impl Into<String>, spec: impl Into<AttributeSpec>) -> Self {
        self.attributes.push((name.into(), spec.into()));
        self
    }

    pub fn build(self) -> Result<Schema, ModelError> {
        let SchemaBuilder { name, attributes } = self;

        let mut index = HashMap::with_capacity(attributes.len());
        let mut validated = Vec::with_capacity(attributes.len());
        for (position, (attr_name, spec)) in attributes.into_iter().enumerate() {
            if attr_name.is_empty() {
                return Err(ModelError::InvalidDeclaration {
                    model: name,
                    message: "attribute name must not be empty".to_string(),
                });
            }
            if index.insert(attr_name.clone(), position).is_some() {
                return Err(ModelError::DuplicateAttribute {
                    model: name,
                    attribute: attr_name,
                });
            }
            let field = spec
                .field
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| attr_name.clone());
            let segments = match parse_path(&field) {
                Ok(segments) => segments,
                Err(source) => {
                    return Err(ModelError::InvalidFieldPath {
                        model: name,
                        attribute: attr_name,
                        source,
                    })
                }
            };
            validated.push((attr_name, spec, field, segments));
        }

        let inner = Arc::new_cyclic(|weak| {
            let owner = WeakSchema {
                name: name.clone(),
                inner: weak.clone(),
            };
            let attributes = validated
                .into_iter()
                .map(|(attr_name, spec, field, segments)| {
                    Attribute::resolve(attr_name, spec, field, segments, &owner)
                })
                .collect();
            SchemaInner {
                name,
                attributes,
                index,
            }
        });

        tracing::debug!(
            model = %inner.name,
            attributes = inner.attributes.len(),
            "defined model schema"
        );

        Ok(Schema { inner })
    }
}
