//! The registry: two string-keyed maps and the lazy-initialization protocol.
//!
//! An entry is either a resolved value or an unresolved factory. The first
//! successful [Registry::get] of a factory entry runs the factory once, with
//! the registry itself as its sole argument, and overwrites the slot with the
//! produced value. Aliases form an independent namespace of pure redirections
//! on top of the entries.
//!
//! The registry is ordinary mutable state with no internal locking: mutating
//! operations take `&mut self`, and a multi-threaded embedder is expected to
//! guard the whole registry with a single external mutex.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::introspect::{Instance, IntrospectError, Opaque, TypeIntrospector};

/// A lazily evaluated entry body: given the registry, produce the value.
pub type FactoryFn = Box<dyn Fn(&mut Registry) -> Result<Instance, RegistryError> + Send + Sync>;

/// A registry slot: resolved value, or factory not yet invoked.
enum Entry {
    Value(Instance),
    Factory(FactoryFn),
}

/// Everything that can go wrong in the registry and the resolver.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The identifier has neither an entry nor a resolvable alias.
    #[error("no entry or alias registered for `{0}`")]
    NotFound(String),

    /// Registration without `overwrite` against an existing identifier.
    #[error("`{0}` is already registered")]
    AlreadyExists(String),

    /// An alias chain or a constructor graph revisited an identifier.
    #[error("cyclic resolution: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    /// A constructor parameter with no override, no constructible type and
    /// no default value.
    #[error("cannot resolve parameter `{parameter}` of `{target}`: {reason}")]
    Unresolved {
        target: String,
        parameter: String,
        reason: String,
    },

    /// The target type could not be inspected, or its constructor failed.
    #[error("cannot construct `{target}`")]
    Construction {
        target: String,
        #[source]
        source: IntrospectError,
    },

    /// A dependency of the named parameter failed to resolve.
    #[error("while resolving parameter `{parameter}` of `{target}`")]
    Nested {
        target: String,
        parameter: String,
        #[source]
        source: Box<RegistryError>,
    },
}

/// String-keyed service registry with lazy factories, aliases and
/// constructor-based resolution.
pub struct Registry {
    entries: HashMap<String, Entry>,
    aliases: HashMap<String, String>,
    pub(crate) introspector: Arc<dyn TypeIntrospector>,
}

impl Registry {
    /// A registry without introspection: usable as a plain store, but
    /// [Registry::resolve](crate::Registry::resolve) will not construct anything.
    pub fn new() -> Self {
        Self::with_introspector(Arc::new(Opaque))
    }

    /// A registry backed by the given introspection capability.
    pub fn with_introspector(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self {
            entries: HashMap::new(),
            aliases: HashMap::new(),
            introspector,
        }
    }

    /// Store a resolved value under `id`.
    ///
    /// Fails with [RegistryError::AlreadyExists] if `id` is taken and
    /// `overwrite` is false.
    pub fn set(
        &mut self,
        id: impl Into<String>,
        value: Instance,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if !overwrite && self.entries.contains_key(&id) {
            return Err(RegistryError::AlreadyExists(id));
        }
        debug!(%id, "storing value entry");
        self.entries.insert(id, Entry::Value(value));
        Ok(())
    }

    /// Store a factory under `id`, to be invoked on first [Registry::get].
    pub fn set_factory<F>(
        &mut self,
        id: impl Into<String>,
        factory: F,
        overwrite: bool,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&mut Registry) -> Result<Instance, RegistryError> + Send + Sync + 'static,
    {
        let id = id.into();
        if !overwrite && self.entries.contains_key(&id) {
            return Err(RegistryError::AlreadyExists(id));
        }
        debug!(%id, "storing factory entry");
        self.entries.insert(id, Entry::Factory(Box::new(factory)));
        Ok(())
    }

    /// Look up `id`, evaluating a pending factory if needed.
    ///
    /// Aliases are checked first and chased through any number of hops; a
    /// chain that revisits an identifier fails with [RegistryError::Cycle].
    /// If the chain dead-ends on a missing entry but `id` itself is a direct
    /// entry, the direct entry wins.
    pub fn get(&mut self, id: &str) -> Result<Instance, RegistryError> {
        let target = self.follow_aliases(id)?;
        match self.fetch(&target) {
            Err(RegistryError::NotFound(_)) if target != id && self.entries.contains_key(id) => {
                self.fetch(id)
            }
            outcome => outcome,
        }
    }

    /// Whether a direct entry exists for `id`. Aliases are not consulted.
    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Remove the entry for `id`, if any.
    pub fn remove(&mut self, id: &str) {
        if self.entries.remove(id).is_some() {
            debug!(%id, "removed entry");
        }
    }

    /// Map `alias` to `target`. Purely a redirection: no value is held.
    pub fn set_alias(
        &mut self,
        alias: impl Into<String>,
        target: impl Into<String>,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        let alias = alias.into();
        if !overwrite && self.aliases.contains_key(&alias) {
            return Err(RegistryError::AlreadyExists(alias));
        }
        let target = target.into();
        debug!(%alias, %target, "storing alias");
        self.aliases.insert(alias, target);
        Ok(())
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Remove the alias mapping, if any. The target entry is untouched.
    pub fn remove_alias(&mut self, alias: &str) {
        if self.aliases.remove(alias).is_some() {
            debug!(%alias, "removed alias");
        }
    }

    /// Identifiers of all current entries, in no particular order.
    pub fn entries(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Identifiers of all current aliases, in no particular order.
    pub fn aliases(&self) -> Vec<&str> {
        self.aliases.keys().map(String::as_str).collect()
    }

    /// Chase the alias chain starting at `id` to its final target.
    fn follow_aliases(&self, id: &str) -> Result<String, RegistryError> {
        let mut current = id.to_string();
        if !self.aliases.contains_key(&current) {
            return Ok(current);
        }
        let mut trail = vec![current.clone()];
        while let Some(next) = self.aliases.get(&current) {
            if trail.iter().any(|seen| seen == next) {
                let mut chain = trail;
                chain.push(next.clone());
                return Err(RegistryError::Cycle(chain));
            }
            current = next.clone();
            trail.push(current.clone());
        }
        Ok(current)
    }

    /// Direct entry lookup, running the factory→value transition on first
    /// successful access. A failing factory is put back untouched.
    fn fetch(&mut self, id: &str) -> Result<Instance, RegistryError> {
        match self.entries.get(id) {
            Some(Entry::Value(value)) => Ok(value.clone()),
            Some(Entry::Factory(_)) => {
                trace!(%id, "evaluating factory entry");
                let Some(Entry::Factory(factory)) = self.entries.remove(id) else {
                    unreachable!("entry vanished between lookup and removal");
                };
                match factory(self) {
                    Ok(value) => {
                        debug!(%id, "factory entry resolved");
                        self.entries.insert(id.to_string(), Entry::Value(value.clone()));
                        Ok(value)
                    }
                    Err(err) => {
                        self.entries.insert(id.to_string(), Entry::Factory(factory));
                        Err(err)
                    }
                }
            }
            None => Err(RegistryError::NotFound(id.to_string())),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
