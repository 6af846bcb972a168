//! Constructible class declarations for autowiring
//!
//! A [`ClassDefinition`] states up front which constructor parameters a type
//! has and which service identifier each parameter is declared as. The
//! container uses that declaration to resolve dependencies recursively, so no
//! runtime reflection is involved.
//!
//! ```
//! use keel_core::{ClassDefinition, Container, Definition};
//!
//! struct Database { url: String }
//! struct UserRepository { db: std::sync::Arc<Database>, page_size: i64 }
//!
//! let container = Container::new();
//! container.register(
//!     "Database",
//!     Definition::value(Database { url: "sqlite::memory:".into() }),
//!     true,
//! );
//! container.class(
//!     ClassDefinition::new("UserRepository", |args| {
//!         Ok(UserRepository {
//!             db: args.service::<Database>("db")?,
//!             page_size: args.int("page_size")?,
//!         })
//!     })
//!     .inject("db", "Database")
//!     .value_or("page_size", 25),
//! );
//!
//! let repo = container.get::<UserRepository>("UserRepository").unwrap();
//! assert_eq!(repo.page_size, 25);
//! assert_eq!(repo.db.url, "sqlite::memory:");
//! ```

use crate::{Argument, Arguments, Error, Instance};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Constructor invoked with the bound parameter list.
pub type ConstructorFn = Arc<dyn Fn(&Arguments) -> Result<Instance, Error> + Send + Sync>;

/// A declared constructor parameter.
#[derive(Debug, Clone)]
pub struct ClassParam {
    name: String,
    declared_type: Option<String>,
    default: Option<Argument>,
}

impl ClassParam {
    /// An untyped parameter; it must be given a default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            default: None,
        }
    }

    /// A parameter declared as the given service id or class name.
    pub fn inject(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self::new(name).typed(declared_type)
    }

    pub fn typed(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    pub fn default(mut self, value: impl Into<Argument>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn default_value(&self) -> Option<&Argument> {
        self.default.as_ref()
    }
}

/// A type the container can build on demand.
#[derive(Clone)]
pub struct ClassDefinition {
    name: String,
    params: Vec<ClassParam>,
    constructor: ConstructorFn,
}

impl ClassDefinition {
    pub fn new<T, F>(name: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> Result<T, Error> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            constructor: Arc::new(move |args| constructor(args).map(|v| Arc::new(v) as Instance)),
        }
    }

    pub fn param(mut self, param: ClassParam) -> Self {
        self.params.push(param);
        self
    }

    /// Declare a parameter resolved from `declared_type`.
    pub fn inject(self, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        self.param(ClassParam::inject(name, declared_type))
    }

    /// Declare a service parameter that falls back to `default` when
    /// `declared_type` is not resolvable.
    pub fn inject_or(
        self,
        name: impl Into<String>,
        declared_type: impl Into<String>,
        default: impl Into<Argument>,
    ) -> Self {
        self.param(ClassParam::inject(name, declared_type).default(default))
    }

    /// Declare a plain value parameter with a default.
    pub fn value_or(self, name: impl Into<String>, default: impl Into<Argument>) -> Self {
        self.param(ClassParam::new(name).default(default))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ClassParam] {
        &self.params
    }

    pub(crate) fn construct(&self, args: &Arguments) -> Result<Instance, Error> {
        (self.constructor)(args)
    }
}

impl fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}
