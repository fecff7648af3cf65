//! modelmap-core: schema-driven object mapping.
//!
//! A [`Schema`] declares named, typed attributes. Each attribute carries a
//! field path into external data and an optional default. Instances are
//! built either from local values ([`Schema::create`]) or from external
//! data ([`Schema::from_data`]), and serialized back with
//! [`Model::to_data`]. Values are normalized to their declared type on the
//! way in; shape mismatches degrade to defaults rather than errors.
//!
//! # Public API
//!
//! - [`Schema`], [`SchemaBuilder`] -- define models
//! - [`AttributeSpec`], [`TypeDecl`] -- declare attributes
//! - [`Model`] -- instances: `get`, `set`, `to_data`, `fill_from_data`
//! - [`Value`] -- the local value representation
//! - [`Registry`], [`Plugin`], [`load_bundle`] -- JSON schema bundles
//! - [`ModelError`] -- the single error type

pub mod attribute;
pub mod bundle;
pub mod error;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod schema;
pub mod types;
pub mod value;

pub use attribute::{Attribute, AttributeSpec, DefaultValue};
pub use bundle::{load_bundle, load_bundle_str};
pub use error::ModelError;
pub use model::Model;
pub use normalize::normalize;
pub use registry::{Plugin, Registry};
pub use schema::{Schema, SchemaBuilder, WeakSchema, ANONYMOUS_MODEL};
pub use types::{
    AttributeType, Category, Constructible, DateType, DecimalType, FnConstructible, ModelRef,
    ScalarKind, TypeDecl,
};
pub use value::Value;

/// Re-exported so callers can build field paths without a direct dependency.
pub use modelmap_path as path;
