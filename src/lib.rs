//! Runtime service registry and dependency-injection resolver with lazy factories and aliases.
//!
//! # Simple use case
//!
//! ```
//! # use std::sync::Arc;
//! # use larder::*;
//! // Define ordinary service types
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! impl Greeter {
//!     fn new(greeting: String) -> Self {
//!         Greeter { greeting }
//!     }
//!
//!     fn greet(&self, name: &str) -> String {
//!         format!("{}, {}!", self.greeting, name)
//!     }
//! }
//!
//! struct Kiosk {
//!     greeter: Arc<Greeter>,
//!     retries: i64,
//! }
//!
//! impl Kiosk {
//!     fn new(greeter: Arc<Greeter>, retries: i64) -> Self {
//!         Kiosk { greeter, retries }
//!     }
//! }
//!
//! # fn main() -> Result<(), RegistryError> {
//! // Declare constructor schemas, then resolve through a registry
//! let mut schemas = SchemaIntrospector::new();
//! schema!(schemas, "demo.Greeter", Greeter::new,
//!     greeting: String = String::from("Hello"));
//! schema!(schemas, "demo.Kiosk", Kiosk::new,
//!     greeter: shared Greeter => "demo.Greeter",
//!     retries: i64 = 3,
//! );
//!
//! let mut registry = Registry::with_introspector(Arc::new(schemas));
//! let kiosk = downcast::<Kiosk>(registry.resolve("demo.Kiosk")?).unwrap();
//! assert_eq!(kiosk.retries, 3);
//! assert_eq!(kiosk.greeter.greet("world"), "Hello, world!");
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! The registry owns two string-keyed maps: entries and aliases.
//!
//! * An entry holds either a resolved value or an unresolved factory. A
//!   factory is a callable receiving the registry itself; the first
//!   successful [Registry::get] runs it once and overwrites the slot with
//!   the produced value, so later lookups are plain map hits.
//! * An alias is a pure redirection onto another identifier. Lookups chase
//!   alias chains of any length, failing fast on a cycle.
//! * [Registry::resolve] constructs a fresh instance of a requested type by
//!   walking its constructor parameters in declaration order and satisfying
//!   each one from explicit overrides, the registry, recursive construction,
//!   or declared defaults.
//!
//! Enumerating constructor parameters and building instances is the
//! [TypeIntrospector] capability, injected at registry construction.
//! [SchemaIntrospector] is the shipped implementation: a catalog of
//! constructor schemas declared in code, most conveniently through the
//! [schema!](crate::schema) macro. Values are stored as
//! `Arc<dyn Any + Send + Sync>` ([Instance]), which keeps injection
//! identity-preserving: consumers of a shared entry all hold the same
//! allocation.

mod helpers;
mod introspect;
mod registry;
mod resolve;

pub use helpers::SchemaIntrospector;
pub use introspect::{
    downcast, Arguments, Instance, IntrospectError, Opaque, ParameterSpec, TypeIntrospector,
};
pub use registry::{FactoryFn, Registry, RegistryError};
pub use resolve::Overrides;

#[cfg(test)]
mod tests;
