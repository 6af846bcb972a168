// Keel - request routing, dependency injection and handler dispatch
//
// This crate re-exports the Keel core together with logging and, behind the
// `config` feature, configuration loading.

// Re-export core functionality
pub use keel_core::*;

// Re-export logging
pub use keel_log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use keel_config;

pub use serde;
pub use serde_json;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application,
        Arguments,
        CallbackRef,
        ClassDefinition,
        Container,
        ContainerScope,
        Definition,
        Dispatcher,
        Error,
        Handler,
        HandlerParam,
        HttpMethod,
        MatchedRoute,
        MethodHandler,
        MethodSet,
        Render,
        Reply,
        RequestInfo,
        ResponseSink,
        RouteTable,
        Router,
        UrlGenerator,
    };

    #[cfg(feature = "config")]
    pub use keel_config::{ConfigManager, KeelSettings};
}
