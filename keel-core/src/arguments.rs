//! Bound arguments for constructors and handlers
//!
//! Both autowired class constructors and route handlers receive their inputs
//! as an ordered list of named [`Argument`]s, with typed accessors that fail
//! with a descriptive error instead of panicking.

use crate::{Error, Instance};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A single bound value.
#[derive(Clone)]
pub enum Argument {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A value resolved from the container.
    Service(Instance),
}

impl Argument {
    /// A service argument wrapping an arbitrary value.
    pub fn service<T: Any + Send + Sync>(value: T) -> Self {
        Argument::Service(Arc::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Argument::Int(_) => "integer",
            Argument::Float(_) => "float",
            Argument::Bool(_) => "boolean",
            Argument::Str(_) => "string",
            Argument::Service(_) => "service",
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Argument::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Argument::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Argument::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Argument::Service(_) => f.write_str("Service(..)"),
        }
    }
}

impl From<i64> for Argument {
    fn from(v: i64) -> Self {
        Argument::Int(v)
    }
}

impl From<i32> for Argument {
    fn from(v: i32) -> Self {
        Argument::Int(i64::from(v))
    }
}

impl From<f64> for Argument {
    fn from(v: f64) -> Self {
        Argument::Float(v)
    }
}

impl From<bool> for Argument {
    fn from(v: bool) -> Self {
        Argument::Bool(v)
    }
}

impl From<String> for Argument {
    fn from(v: String) -> Self {
        Argument::Str(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Argument::Str(v.to_string())
    }
}

/// Ordered, named arguments.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    owner: String,
    values: Vec<(String, Argument)>,
}

impl Arguments {
    /// Create an empty list for the named owner (class or handler), used in
    /// error messages.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            values: Vec::new(),
        }
    }

    /// The class or handler these arguments were bound for.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn push(&mut self, name: impl Into<String>, value: Argument) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&Argument, Error> {
        self.get(name).ok_or_else(|| Error::MissingRouteParameter {
            target: self.owner.clone(),
            parameter: name.to_string(),
        })
    }

    fn mismatch(&self, name: &str, found: &Argument, expected: &'static str) -> Error {
        Error::ParameterCoercionError {
            parameter: name.to_string(),
            value: format!("{:?}", found),
            expected,
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, Error> {
        match self.require(name)? {
            Argument::Int(v) => Ok(*v),
            other => Err(self.mismatch(name, other, "integer")),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, Error> {
        match self.require(name)? {
            Argument::Float(v) => Ok(*v),
            Argument::Int(v) => Ok(*v as f64),
            other => Err(self.mismatch(name, other, "float")),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, Error> {
        match self.require(name)? {
            Argument::Bool(v) => Ok(*v),
            other => Err(self.mismatch(name, other, "boolean")),
        }
    }

    pub fn str(&self, name: &str) -> Result<&str, Error> {
        match self.require(name)? {
            Argument::Str(v) => Ok(v.as_str()),
            other => Err(self.mismatch(name, other, "string")),
        }
    }

    /// Get an injected service, downcast to `T`.
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Error> {
        match self.require(name)? {
            Argument::Service(instance) => {
                Arc::downcast::<T>(instance.clone()).map_err(|_| Error::ServiceTypeMismatch {
                    id: name.to_string(),
                    expected: std::any::type_name::<T>(),
                })
            }
            other => Err(self.mismatch(name, other, "service")),
        }
    }
}
