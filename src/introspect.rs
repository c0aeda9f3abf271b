//! The type-introspection capability consumed by the resolver.
//!
//! Rust has no runtime reflection, so the ability to enumerate a type's
//! constructor parameters and to build an instance from collected arguments
//! is a contract the embedding application implements: the [TypeIntrospector]
//! trait. The registry only ever talks to this trait; how a given environment
//! answers it (a hand-written catalog, generated code, ...) is its own
//! business. [crate::SchemaIntrospector] is the batteries-included
//! implementation shipped with this crate.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// A dynamically typed, shareable value held by the registry.
///
/// `Arc` sharing is what makes injection identity-preserving: handing the
/// same entry to two consumers hands them the same allocation.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Downcast a dynamically typed instance to its concrete type.
pub fn downcast<T: Any + Send + Sync>(instance: Instance) -> Option<Arc<T>> {
    instance.downcast::<T>().ok()
}

/// One constructor parameter, in declaration order.
#[derive(Clone)]
pub struct ParameterSpec {
    /// Parameter name, as used for overrides and argument passing.
    pub name: String,
    /// Identifier of the parameter's constructible type, if it has one.
    ///
    /// `None` marks a primitive or otherwise unconstructible parameter:
    /// such a parameter can only be satisfied by an override or a default.
    pub declared_type: Option<String>,
    /// Declared default value, if any.
    pub default: Option<Instance>,
}

impl ParameterSpec {
    /// A parameter whose declared type can itself be resolved or constructed.
    pub fn typed(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
            default: None,
        }
    }

    /// A parameter with no usable type reference.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: None,
        }
    }

    /// Attach a default value.
    pub fn with_default<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }
}

/// By-name argument map handed to [TypeIntrospector::construct].
#[derive(Default)]
pub struct Arguments {
    values: HashMap<String, Instance>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Instance) {
        self.values.insert(name.into(), value);
    }

    /// A dependency argument, shared as `Arc<T>`.
    pub fn shared<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, IntrospectError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| IntrospectError::MissingArgument(name.to_string()))?;
        value
            .clone()
            .downcast::<T>()
            .map_err(|_| IntrospectError::ArgumentType(name.to_string()))
    }

    /// A plain value argument, copied out of the map.
    pub fn value<T: Any + Clone>(&self, name: &str) -> Result<T, IntrospectError> {
        self.values
            .get(name)
            .ok_or_else(|| IntrospectError::MissingArgument(name.to_string()))?
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| IntrospectError::ArgumentType(name.to_string()))
    }

    /// The raw stored instance, if present.
    pub fn raw(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Failures on the introspection side of the contract.
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("`{0}` is not a constructible type")]
    NotConstructible(String),
    #[error("constructor argument `{0}` is missing")]
    MissingArgument(String),
    #[error("constructor argument `{0}` has an unexpected type")]
    ArgumentType(String),
    #[error("constructing `{ty}` failed: {message}")]
    Failed { ty: String, message: String },
}

/// Enumerate constructor parameters and build instances for a type universe.
///
/// Identifiers are plain strings, conventionally fully-qualified type names.
pub trait TypeIntrospector: Send + Sync {
    /// The constructor parameters of `ty`, in declaration order.
    ///
    /// A type with no constructor parameters returns an empty list.
    fn constructor_parameters(&self, ty: &str) -> Result<Vec<ParameterSpec>, IntrospectError>;

    /// Build an instance of `ty` from the collected by-name arguments.
    fn construct(&self, ty: &str, args: Arguments) -> Result<Instance, IntrospectError>;
}

/// The null capability: no type is constructible.
///
/// Installed by [crate::Registry::new] so a registry used purely as a
/// key-value store needs no introspector of its own.
pub struct Opaque;

impl TypeIntrospector for Opaque {
    fn constructor_parameters(&self, ty: &str) -> Result<Vec<ParameterSpec>, IntrospectError> {
        Err(IntrospectError::NotConstructible(ty.to_string()))
    }

    fn construct(&self, ty: &str, _args: Arguments) -> Result<Instance, IntrospectError> {
        Err(IntrospectError::NotConstructible(ty.to_string()))
    }
}
