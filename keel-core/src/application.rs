// Application: request handling over a route table, container and dispatcher

use crate::container::Container;
use crate::dispatcher::Dispatcher;
use crate::routing::{MatchedRoute, RouteTable, Router};
use crate::traits::{RequestInfo, ResponseSink};
use crate::Error;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

/// Seeds a request-scoped container before the handler runs.
pub type RequestSetup = Arc<dyn Fn(&Container, &MatchedRoute) -> Result<(), Error> + Send + Sync>;

/// How the container is shared between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainerScope {
    /// Every request resolves from the application container.
    #[default]
    Shared,
    /// Each request gets a child container, seeded by the request setup
    /// hook; only the application container's singletons outlive the request.
    PerRequest,
}

/// The request pipeline
pub struct Application {
    routes: Arc<RouteTable>,
    container: Container,
    dispatcher: Arc<Dispatcher>,
    scope: ContainerScope,
    setup: Option<RequestSetup>,
}

impl Application {
    pub fn new(routes: Arc<RouteTable>, container: Container, dispatcher: Dispatcher) -> Self {
        info!(routes = routes.len(), "Application created");
        Self {
            routes,
            container,
            dispatcher: Arc::new(dispatcher),
            scope: ContainerScope::Shared,
            setup: None,
        }
    }

    pub fn with_scope(mut self, scope: ContainerScope) -> Self {
        self.scope = scope;
        self
    }

    /// Register services on each request container from the matched route.
    ///
    /// Switches the application to [`ContainerScope::PerRequest`]; the hook
    /// never runs against the shared container.
    pub fn with_request_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&Container, &MatchedRoute) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self.scope = ContainerScope::PerRequest;
        self
    }

    /// Get a reference to the DI container
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn scope(&self) -> ContainerScope {
        self.scope
    }

    /// Match and dispatch one request, returning the response body.
    pub fn dispatch(&self, method: &str, uri: &str) -> Result<String, Error> {
        let mut router = Router::new(Arc::clone(&self.routes));
        let matched = router.match_route(method, uri)?;

        match self.scope {
            ContainerScope::Shared => self.dispatcher.call(matched, &self.container),
            ContainerScope::PerRequest => {
                let scoped = self.container.for_request();
                if let Some(setup) = &self.setup {
                    trace!(route = %matched.route().label(), "Seeding request container");
                    setup(&scoped, matched)?;
                }
                self.dispatcher.call(matched, &scoped)
            }
        }
    }

    /// Handle a request and send the response, returning the status sent.
    ///
    /// Errors become a JSON body of the form `{"error": .., "kind": .., "status": ..}`.
    pub fn handle(&self, request: &dyn RequestInfo, sink: &mut dyn ResponseSink) -> u16 {
        let method = request.request_method();
        let uri = request.request_uri();

        let (status, body) = match self.dispatch(method, uri) {
            Ok(body) => (200, body),
            Err(err) => {
                let status = status_for(&err);
                if status >= 500 {
                    error!(method, uri, error = %err, "Request failed");
                } else {
                    debug!(method, uri, error = %err, "Request rejected");
                }
                let body = serde_json::json!({
                    "error": err.to_string(),
                    "kind": err.kind(),
                    "status": status,
                });
                (status, body.to_string())
            }
        };

        debug!(method, uri, status, "Request handled");
        sink.send(status, body);
        status
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.routes.len())
            .field("scope", &self.scope)
            .field("request_setup", &self.setup.is_some())
            .finish()
    }
}

/// HTTP status for an error escaping the pipeline.
pub fn status_for(err: &Error) -> u16 {
    match err {
        Error::RouteNotFound(_) => 404,
        Error::MethodNotAllowed { .. } => 405,
        _ => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, HandlerParam};
    use crate::traits::HttpMethod;

    struct Request(&'static str, &'static str);

    impl RequestInfo for Request {
        fn request_uri(&self) -> &str {
            self.1
        }

        fn request_method(&self) -> &str {
            self.0
        }
    }

    #[derive(Default)]
    struct Captured(Vec<(u16, String)>);

    impl ResponseSink for Captured {
        fn send(&mut self, status: u16, body: String) {
            self.0.push((status, body));
        }
    }

    fn app() -> Application {
        let mut table = RouteTable::new();
        table
            .register(HttpMethod::GET, "/", Handler::new("home", |_| Ok("home")), None)
            .unwrap();
        Application::new(Arc::new(table), Container::new(), Dispatcher::new())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::RouteNotFound("/x".into())), 404);
        assert_eq!(
            status_for(&Error::MethodNotAllowed {
                method: "POST".into(),
                path: "/".into(),
                allowed: vec!["GET".into()],
            }),
            405
        );
        assert_eq!(status_for(&Error::ServiceNotFound("db".into())), 500);
    }

    #[test]
    fn test_handle_success_and_errors() {
        let app = app();
        let mut sink = Captured::default();

        assert_eq!(app.handle(&Request("GET", "/?x=1"), &mut sink), 200);
        assert_eq!(app.handle(&Request("POST", "/"), &mut sink), 405);
        assert_eq!(app.handle(&Request("GET", "/nope"), &mut sink), 404);

        assert_eq!(sink.0[0], (200, "home".to_string()));
        let body: serde_json::Value = serde_json::from_str(&sink.0[2].1).unwrap();
        assert_eq!(body["kind"], "RouteNotFound");
        assert_eq!(body["status"], 404);
    }

    fn seeded_app(scope: ContainerScope) -> Application {
        let mut table = RouteTable::new();
        table
            .get(
                "/users/{id:numeric}",
                Handler::new("profile", |args| {
                    Ok(args.service::<String>("user")?.as_ref().clone())
                })
                .param(HandlerParam::service("user", "current_user")),
                None,
            )
            .unwrap();

        let container = Container::new();
        container.factory("current_user", |r| {
            Ok(format!("user {}", r.get::<i64>("request.user_id")?))
        });

        Application::new(Arc::new(table), container, Dispatcher::new())
            .with_request_setup(|scoped, matched| {
                let id = matched.param("id").unwrap_or_default();
                let id: i64 = id
                    .parse()
                    .map_err(|_| Error::Handler(format!("bad user id {}", id)))?;
                scoped.value("request.user_id", id);
                Ok(())
            })
            .with_scope(scope)
    }

    #[test]
    fn test_request_setup_seeds_each_request() {
        let app = seeded_app(ContainerScope::PerRequest);
        assert_eq!(app.dispatch("GET", "/users/7").unwrap(), "user 7");
        assert_eq!(app.dispatch("GET", "/users/8").unwrap(), "user 8");
        assert!(!app.container().has("request.user_id"));
    }

    #[test]
    fn test_shared_scope_skips_request_setup() {
        let app = seeded_app(ContainerScope::Shared);
        assert!(matches!(
            app.dispatch("GET", "/users/7"),
            Err(Error::ServiceNotFound(id)) if id == "request.user_id"
        ));
    }
}
