//! Recursive constructor-based instantiation.
//!
//! [Registry::resolve] walks the target type's constructor parameters in
//! declaration order and satisfies each one from, in order of precedence:
//! an explicit override, the registry (full [Registry::get] semantics,
//! aliases and factories included), recursive construction of the declared
//! type, or the declared default value. Constructed instances are returned
//! to the caller and never cached in the registry.
//!
//! A resolution-in-progress stack of type identifiers guards the recursion:
//! re-entering an identifier already on the stack fails fast with
//! [RegistryError::Cycle] instead of overflowing the call stack.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::introspect::{Arguments, Instance, ParameterSpec};
use crate::registry::{Registry, RegistryError};

/// Explicit caller-supplied values for named constructor parameters.
///
/// An override always wins over registry lookup, recursive construction and
/// defaults, and is used verbatim: no type checking is performed against the
/// declared parameter type.
#[derive(Default)]
pub struct Overrides {
    values: HashMap<String, Instance>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override `name` with a plain value (wrapped for storage).
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.values.insert(name.into(), Arc::new(value));
        self
    }

    /// Override `name` with an already-shared instance, passed through
    /// untouched.
    pub fn with_instance(mut self, name: impl Into<String>, value: Instance) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }
}

impl Registry {
    /// Construct a fresh instance of `ty` with no explicit overrides.
    pub fn resolve(&mut self, ty: &str) -> Result<Instance, RegistryError> {
        self.resolve_with(ty, &Overrides::default())
    }

    /// Construct a fresh instance of `ty`.
    ///
    /// The override map is forwarded unchanged to every nested resolution.
    /// The result is not stored in the registry; resolving the same type
    /// twice yields two distinct instances. Callers wanting the registered
    /// singleton for a type name should [Registry::get] it instead.
    pub fn resolve_with(
        &mut self,
        ty: &str,
        overrides: &Overrides,
    ) -> Result<Instance, RegistryError> {
        let mut in_progress = Vec::new();
        self.resolve_guarded(ty, overrides, &mut in_progress)
    }

    fn resolve_guarded(
        &mut self,
        ty: &str,
        overrides: &Overrides,
        in_progress: &mut Vec<String>,
    ) -> Result<Instance, RegistryError> {
        if in_progress.iter().any(|seen| seen == ty) {
            let mut chain = in_progress.clone();
            chain.push(ty.to_string());
            return Err(RegistryError::Cycle(chain));
        }
        in_progress.push(ty.to_string());
        let outcome = self.construct(ty, overrides, in_progress);
        in_progress.pop();
        outcome
    }

    fn construct(
        &mut self,
        ty: &str,
        overrides: &Overrides,
        in_progress: &mut Vec<String>,
    ) -> Result<Instance, RegistryError> {
        let introspector = Arc::clone(&self.introspector);
        let parameters = introspector
            .constructor_parameters(ty)
            .map_err(|source| RegistryError::Construction {
                target: ty.to_string(),
                source,
            })?;
        trace!(%ty, parameters = parameters.len(), "collecting constructor arguments");

        let mut args = Arguments::new();
        for parameter in &parameters {
            let value = self.argument_for(ty, parameter, overrides, in_progress)?;
            args.insert(parameter.name.as_str(), value);
        }

        debug!(%ty, "constructing instance");
        introspector
            .construct(ty, args)
            .map_err(|source| RegistryError::Construction {
                target: ty.to_string(),
                source,
            })
    }

    /// Satisfy one constructor parameter of `ty`.
    fn argument_for(
        &mut self,
        ty: &str,
        parameter: &ParameterSpec,
        overrides: &Overrides,
        in_progress: &mut Vec<String>,
    ) -> Result<Instance, RegistryError> {
        if let Some(value) = overrides.get(&parameter.name) {
            trace!(%ty, parameter = %parameter.name, "using explicit override");
            return Ok(value.clone());
        }

        let Some(declared) = parameter.declared_type.as_deref() else {
            return match &parameter.default {
                Some(value) => {
                    trace!(%ty, parameter = %parameter.name, "using default value");
                    Ok(value.clone())
                }
                None => Err(RegistryError::Unresolved {
                    target: ty.to_string(),
                    parameter: parameter.name.clone(),
                    reason: "not overridden, not a constructible type and no default value".into(),
                }),
            };
        };

        // Registered entries win over recursive construction. A NotFound
        // while probing is not an error: it means "construct it".
        match self.get(declared) {
            Ok(value) => {
                trace!(%ty, parameter = %parameter.name, entry = %declared, "using registered entry");
                Ok(value)
            }
            Err(RegistryError::NotFound(_)) => self
                .resolve_guarded(declared, overrides, in_progress)
                .map_err(|err| match err {
                    // Cycle errors already carry the full chain.
                    cycle @ RegistryError::Cycle(_) => cycle,
                    other => RegistryError::Nested {
                        target: ty.to_string(),
                        parameter: parameter.name.clone(),
                        source: Box::new(other),
                    },
                }),
            Err(cycle @ RegistryError::Cycle(_)) => Err(cycle),
            Err(other) => Err(RegistryError::Nested {
                target: ty.to_string(),
                parameter: parameter.name.clone(),
                source: Box::new(other),
            }),
        }
    }
}
