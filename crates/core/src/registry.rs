//! Named schemas, constructible types and installed plugins.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ModelError;
use crate::schema::Schema;
use crate::types::{Constructible, DateType, DecimalType, TypeDecl};

type Json = serde_json::Value;

/// An extension that registers types or schemas into a [`Registry`].
///
/// A plugin is installed at most once per registry, keyed by its name.
pub trait Plugin {
    fn name(&self) -> &str;
    fn install(&self, registry: &mut Registry) -> Result<(), ModelError>;
}

/// Lookup table used to resolve type names in schema bundles.
#[derive(Clone)]
pub struct Registry {
    schemas: BTreeMap<String, Schema>,
    types: BTreeMap<String, Arc<dyn Constructible>>,
    plugins: Vec<String>,
}

impl Registry {
    /// A registry with the built-in `Date` and `Decimal` types.
    pub fn new() -> Self {
        let mut registry = Registry::empty();
        registry.insert_type(Arc::new(DateType));
        registry.insert_type(Arc::new(DecimalType));
        registry
    }

    /// A registry with no types at all.
    pub fn empty() -> Self {
        Registry {
            schemas: BTreeMap::new(),
            types: BTreeMap::new(),
            plugins: Vec::new(),
        }
    }

    // ── Schemas ─────────────────────────────────

    pub fn register_schema(&mut self, schema: Schema) -> Result<&mut Self, ModelError> {
        let name = schema.name().to_string();
        if self.is_name_taken(&name) {
            return Err(ModelError::DuplicateModel(name));
        }
        tracing::debug!(model = %name, "registered schema");
        self.schemas.insert(name, schema);
        Ok(self)
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn require_schema(&self, name: &str) -> Result<&Schema, ModelError> {
        self.schema(name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    /// Registered schemas, ordered by name.
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    // ── Constructible types ─────────────────────

    pub fn register_type(
        &mut self,
        ty: impl Constructible + 'static,
    ) -> Result<&mut Self, ModelError> {
        self.register_type_arc(Arc::new(ty))
    }

    pub fn register_type_arc(
        &mut self,
        ty: Arc<dyn Constructible>,
    ) -> Result<&mut Self, ModelError> {
        if self.is_name_taken(ty.name()) {
            return Err(ModelError::DuplicateModel(ty.name().to_string()));
        }
        self.insert_type(ty);
        Ok(self)
    }

    pub fn constructible(&self, name: &str) -> Option<Arc<dyn Constructible>> {
        self.types.get(name).cloned()
    }

    fn insert_type(&mut self, ty: Arc<dyn Constructible>) {
        self.types.insert(ty.name().to_string(), ty);
    }

    fn is_name_taken(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
            || self.types.contains_key(name)
            || TypeDecl::builtin(name).is_some()
    }

    // ── Plugins ─────────────────────────────────

    /// Install `plugin` unless one with the same name is already installed.
    ///
    /// The plugin installs into a staged copy; a failed install leaves this
    /// registry unchanged.
    pub fn use_plugin(&mut self, plugin: &dyn Plugin) -> Result<&mut Self, ModelError> {
        let name = plugin.name();
        if self.is_installed(name) {
            tracing::debug!(plugin = name, "plugin already installed");
            return Ok(self);
        }
        let mut staged = self.clone();
        plugin.install(&mut staged).map_err(|err| match err {
            ModelError::Plugin { .. } => err,
            other => ModelError::Plugin {
                plugin: name.to_string(),
                message: other.to_string(),
            },
        })?;
        staged.plugins.push(name.to_string());
        *self = staged;
        tracing::debug!(plugin = name, "installed plugin");
        Ok(self)
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }

    /// Installed plugin names, in installation order.
    pub fn installed_plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Load a schema bundle into this registry. See [`crate::bundle`].
    pub fn load_bundle(&mut self, bundle: &Json) -> Result<Vec<Schema>, ModelError> {
        crate::bundle::load_bundle(bundle, self)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins)
            .finish()
    }
}
