// Core library for the Keel framework
// Route matching, dependency injection and handler dispatch

pub mod application;
pub mod arguments;
pub mod autowire;
pub mod container;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod manifest;
pub mod route_cache;
pub mod route_constraint;
pub mod route_params;
pub mod route_pattern;
pub mod routing;
pub mod traits;
pub mod url_generator;

// Re-export commonly used types
pub use application::*;
pub use arguments::*;
pub use autowire::*;
pub use container::*;
pub use dispatcher::*;
pub use error::*;
pub use handler::*;
pub use manifest::*;
pub use route_cache::*;
pub use route_constraint::*;
pub use route_params::*;
pub use route_pattern::*;
pub use routing::{MatchedRoute, RouteDefinition, RouteTable, Router, normalize_uri};
pub use traits::*;
pub use url_generator::*;

pub use keel_log::{LogConfig, init as init_logging};
