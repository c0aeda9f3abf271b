//! A code-driven implementation of the introspection capability.
//!
//! [SchemaIntrospector] is a catalog in which the embedding application
//! declares, per constructible type, the ordered constructor parameters and
//! a build closure. The [schema!](crate::schema) macro generates both from a
//! constructor signature, including the downcasting glue.

use std::collections::HashMap;

use crate::introspect::{Arguments, Instance, IntrospectError, ParameterSpec, TypeIntrospector};

type BuildFn = Box<dyn Fn(&Arguments) -> Result<Instance, IntrospectError> + Send + Sync>;

struct TypeSchema {
    parameters: Vec<ParameterSpec>,
    build: BuildFn,
}

/// Catalog-backed [TypeIntrospector].
///
/// Declare every constructible type up front, then hand the catalog to
/// [Registry::with_introspector](crate::Registry::with_introspector).
#[derive(Default)]
pub struct SchemaIntrospector {
    schemas: HashMap<String, TypeSchema>,
}

impl SchemaIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a constructible type: its ordered parameters and the closure
    /// that builds an instance from collected arguments.
    pub fn define<F>(
        &mut self,
        ty: impl Into<String>,
        parameters: Vec<ParameterSpec>,
        build: F,
    ) -> &mut Self
    where
        F: Fn(&Arguments) -> Result<Instance, IntrospectError> + Send + Sync + 'static,
    {
        self.schemas.insert(
            ty.into(),
            TypeSchema {
                parameters,
                build: Box::new(build),
            },
        );
        self
    }

    /// Whether a schema has been declared for `ty`.
    pub fn knows(&self, ty: &str) -> bool {
        self.schemas.contains_key(ty)
    }
}

impl TypeIntrospector for SchemaIntrospector {
    fn constructor_parameters(&self, ty: &str) -> Result<Vec<ParameterSpec>, IntrospectError> {
        self.schemas
            .get(ty)
            .map(|schema| schema.parameters.clone())
            .ok_or_else(|| IntrospectError::NotConstructible(ty.to_string()))
    }

    fn construct(&self, ty: &str, args: Arguments) -> Result<Instance, IntrospectError> {
        let schema = self
            .schemas
            .get(ty)
            .ok_or_else(|| IntrospectError::NotConstructible(ty.to_string()))?;
        (schema.build)(&args)
    }
}

/// Declare a constructor schema on a [SchemaIntrospector].
///
/// Takes the catalog, the type identifier, the constructor, and the
/// parameter list in declaration order. Three parameter forms exist:
///
/// * `name: shared Concrete => "identifier"` — a dependency with a
///   constructible declared type, received as `Arc<Concrete>`;
/// * `name: Type = default` — a plain value with a default;
/// * `name: Type` — a required plain value (override-only).
///
/// ```
/// use std::sync::Arc;
/// use larder::{schema, SchemaIntrospector};
///
/// struct Engine;
/// impl Engine {
///     fn new() -> Self {
///         Engine
///     }
/// }
///
/// struct Car {
///     engine: Arc<Engine>,
///     wheels: i64,
/// }
/// impl Car {
///     fn new(engine: Arc<Engine>, wheels: i64) -> Self {
///         Car { engine, wheels }
///     }
/// }
///
/// let mut schemas = SchemaIntrospector::new();
/// schema!(schemas, "demo.Engine", Engine::new);
/// schema!(schemas, "demo.Car", Car::new,
///     engine: shared Engine => "demo.Engine",
///     wheels: i64 = 4,
/// );
/// assert!(schemas.knows("demo.Car"));
/// ```
#[macro_export]
macro_rules! schema {
    // Internal rules first, so public inputs never reach them by accident.

    // `name: shared Concrete => "identifier"`
    (@munch $s:expr, $id:expr, $c:expr, [$($done:tt)*]
        $name:ident : shared $T:ty => $decl:literal, $($rest:tt)+) => {
        $crate::schema!(@munch $s, $id, $c, [$($done)* (shared $name, $T, $decl)] $($rest)+)
    };
    (@munch $s:expr, $id:expr, $c:expr, [$($done:tt)*]
        $name:ident : shared $T:ty => $decl:literal $(,)?) => {
        $crate::schema!(@emit $s, $id, $c, [$($done)* (shared $name, $T, $decl)])
    };
    // `name: Type = default`
    (@munch $s:expr, $id:expr, $c:expr, [$($done:tt)*]
        $name:ident : $T:ty = $default:expr, $($rest:tt)+) => {
        $crate::schema!(@munch $s, $id, $c, [$($done)* (default $name, $T, $default)] $($rest)+)
    };
    (@munch $s:expr, $id:expr, $c:expr, [$($done:tt)*]
        $name:ident : $T:ty = $default:expr $(,)?) => {
        $crate::schema!(@emit $s, $id, $c, [$($done)* (default $name, $T, $default)])
    };
    // `name: Type`
    (@munch $s:expr, $id:expr, $c:expr, [$($done:tt)*]
        $name:ident : $T:ty, $($rest:tt)+) => {
        $crate::schema!(@munch $s, $id, $c, [$($done)* (value $name, $T)] $($rest)+)
    };
    (@munch $s:expr, $id:expr, $c:expr, [$($done:tt)*]
        $name:ident : $T:ty $(,)?) => {
        $crate::schema!(@emit $s, $id, $c, [$($done)* (value $name, $T)])
    };

    (@emit $s:expr, $id:expr, $c:expr, [$(($($p:tt)*))*]) => {
        $s.define(
            $id,
            ::std::vec![$($crate::schema!(@spec $($p)*)),*],
            move |args| {
                ::std::result::Result::Ok(::std::sync::Arc::new(
                    ($c)($($crate::schema!(@arg args, $($p)*)),*),
                ) as $crate::Instance)
            },
        )
    };

    (@spec shared $name:ident, $T:ty, $decl:literal) => {
        $crate::ParameterSpec::typed(stringify!($name), $decl)
    };
    (@spec default $name:ident, $T:ty, $default:expr) => {
        $crate::ParameterSpec::plain(stringify!($name)).with_default::<$T>($default)
    };
    (@spec value $name:ident, $T:ty) => {
        $crate::ParameterSpec::plain(stringify!($name))
    };

    (@arg $args:ident, shared $name:ident, $T:ty, $decl:literal) => {
        $args.shared::<$T>(stringify!($name))?
    };
    (@arg $args:ident, default $name:ident, $T:ty, $default:expr) => {
        $args.value::<$T>(stringify!($name))?
    };
    (@arg $args:ident, value $name:ident, $T:ty) => {
        $args.value::<$T>(stringify!($name))?
    };

    // Constructor without parameters.
    ($schemas:expr, $id:expr, $ctor:expr $(,)?) => {
        $schemas.define($id, ::std::vec::Vec::new(), move |_args| {
            ::std::result::Result::Ok(::std::sync::Arc::new(($ctor)()) as $crate::Instance)
        })
    };
    ($schemas:expr, $id:expr, $ctor:expr, $($params:tt)+) => {
        $crate::schema!(@munch $schemas, $id, $ctor, [] $($params)+)
    };
}
