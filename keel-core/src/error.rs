// Error types for the Keel core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Matching
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {method} {path} (allowed: {})", .allowed.join(", "))]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<String>,
    },

    #[error("No route has been matched yet")]
    NoMatchYet,

    // Route table construction
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Duplicate route name: {0}")]
    DuplicateRouteName(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Route cache error: {0}")]
    RouteCache(String),

    // Binding
    #[error("Missing route parameter '{parameter}' for {target}")]
    MissingRouteParameter { target: String, parameter: String },

    #[error("Cannot coerce parameter '{parameter}' value '{value}' to {expected}")]
    ParameterCoercionError {
        parameter: String,
        value: String,
        expected: &'static str,
    },

    // Container
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Unresolvable dependency '{parameter}' of {class}")]
    UnresolvableDependency { class: String, parameter: String },

    #[error("Circular dependency: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("Alias cycle: {}", .chain.join(" -> "))]
    AliasCycle { chain: Vec<String> },

    #[error("Service '{id}' is not a {expected}")]
    ServiceTypeMismatch { id: String, expected: &'static str },

    // Invocation
    #[error("Handler not found: {service}@{method}")]
    HandlerNotFound { service: String, method: String },

    #[error("Invalid controller response: {0}")]
    InvalidControllerResponse(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that indicate a configuration mistake caught while building the
    /// route table or service table.
    pub fn is_boot_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPattern { .. }
                | Error::DuplicateRouteName(_)
                | Error::InvalidManifest(_)
        )
    }

    /// Name of the error kind, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::RouteNotFound(_) => "RouteNotFound",
            Error::MethodNotAllowed { .. } => "MethodNotAllowed",
            Error::NoMatchYet => "NoMatchYet",
            Error::InvalidPattern { .. } => "InvalidPattern",
            Error::DuplicateRouteName(_) => "DuplicateRouteName",
            Error::InvalidManifest(_) => "InvalidManifest",
            Error::RouteCache(_) => "RouteCache",
            Error::MissingRouteParameter { .. } => "MissingRouteParameter",
            Error::ParameterCoercionError { .. } => "ParameterCoercionError",
            Error::ServiceNotFound(_) => "ServiceNotFound",
            Error::UnresolvableDependency { .. } => "UnresolvableDependency",
            Error::CircularDependency { .. } => "CircularDependency",
            Error::AliasCycle { .. } => "AliasCycle",
            Error::ServiceTypeMismatch { .. } => "ServiceTypeMismatch",
            Error::HandlerNotFound { .. } => "HandlerNotFound",
            Error::InvalidControllerResponse(_) => "InvalidControllerResponse",
            Error::Handler(_) => "Handler",
            Error::Io(_) => "Io",
        }
    }
}
