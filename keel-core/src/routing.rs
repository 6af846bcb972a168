// Route table and first-match router

use crate::handler::CallbackRef;
use crate::route_params::RouteParams;
use crate::route_pattern::{CompiledRoute, RoutePattern};
use crate::traits::{HttpMethod, MethodSet};
use crate::Error;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A registered route.
pub struct RouteDefinition {
    name: Option<String>,
    methods: MethodSet,
    pattern: RoutePattern,
    compiled: CompiledRoute,
    callback: CallbackRef,
}

impl RouteDefinition {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn methods(&self) -> MethodSet {
        self.methods
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn compiled(&self) -> &CompiledRoute {
        &self.compiled
    }

    pub fn callback(&self) -> &CallbackRef {
        &self.callback
    }

    /// Human readable identification for logs and errors.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.methods, self.pattern.as_str()),
        }
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("name", &self.name)
            .field("methods", &self.methods.to_string())
            .field("pattern", &self.pattern.as_str())
            .field("callback", &self.callback)
            .finish()
    }
}

/// The ordered set of routes.
///
/// Built once at boot and then shared read-only behind an `Arc`. Patterns are
/// compiled on registration so a malformed table fails before serving.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteDefinition>>,
    names: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// Fails with `InvalidPattern` for malformed placeholder syntax or an
    /// empty method set, and with `DuplicateRouteName` if `name` is already
    /// taken.
    pub fn register(
        &mut self,
        methods: impl Into<MethodSet>,
        pattern: &str,
        callback: impl Into<CallbackRef>,
        name: Option<&str>,
    ) -> Result<Arc<RouteDefinition>, Error> {
        let methods: MethodSet = methods.into();
        let pattern = RoutePattern::parse(pattern)?;
        if methods.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: pattern.as_str().to_string(),
                reason: "route accepts no methods".to_string(),
            });
        }
        let compiled = pattern.compile()?;
        self.insert(methods, pattern, compiled, callback.into(), name)
    }

    /// Register a route with an already compiled matcher.
    pub(crate) fn insert(
        &mut self,
        methods: MethodSet,
        pattern: RoutePattern,
        compiled: CompiledRoute,
        callback: CallbackRef,
        name: Option<&str>,
    ) -> Result<Arc<RouteDefinition>, Error> {
        if let Some(name) = name {
            if self.names.contains_key(name) {
                return Err(Error::DuplicateRouteName(name.to_string()));
            }
        }

        let route = Arc::new(RouteDefinition {
            name: name.map(str::to_string),
            methods,
            pattern,
            compiled,
            callback,
        });

        if let Some(name) = name {
            self.names.insert(name.to_string(), self.routes.len());
        }
        self.routes.push(Arc::clone(&route));

        debug!(
            route = %route.label(),
            methods = %methods,
            pattern = route.pattern.as_str(),
            callback = %route.callback.describe(),
            "Route registered"
        );
        Ok(route)
    }

    pub fn get(
        &mut self,
        pattern: &str,
        callback: impl Into<CallbackRef>,
        name: Option<&str>,
    ) -> Result<Arc<RouteDefinition>, Error> {
        self.register(HttpMethod::GET, pattern, callback, name)
    }

    pub fn post(
        &mut self,
        pattern: &str,
        callback: impl Into<CallbackRef>,
        name: Option<&str>,
    ) -> Result<Arc<RouteDefinition>, Error> {
        self.register(HttpMethod::POST, pattern, callback, name)
    }

    pub fn put(
        &mut self,
        pattern: &str,
        callback: impl Into<CallbackRef>,
        name: Option<&str>,
    ) -> Result<Arc<RouteDefinition>, Error> {
        self.register(HttpMethod::PUT, pattern, callback, name)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        callback: impl Into<CallbackRef>,
        name: Option<&str>,
    ) -> Result<Arc<RouteDefinition>, Error> {
        self.register(HttpMethod::DELETE, pattern, callback, name)
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Arc<RouteDefinition>] {
        &self.routes
    }

    /// Look up a named route.
    pub fn route(&self, name: &str) -> Option<&Arc<RouteDefinition>> {
        self.names.get(name).map(|&index| &self.routes[index])
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// SHA-256 over the ordered definition list, hex encoded.
    pub fn fingerprint(&self) -> String {
        fingerprint(self.routes.iter().map(|r| {
            RouteDigest {
                name: r.name(),
                methods: r.methods,
                pattern: r.pattern.as_str(),
                callback: r.callback.describe(),
            }
        }))
    }

    /// Match `(method, uri)` against the table without recording the result.
    ///
    /// The first route in registration order whose pattern matches and whose
    /// method set accepts `method` wins.
    pub fn find(&self, method: &str, uri: &str) -> Result<MatchedRoute, Error> {
        let verb = HttpMethod::from_str(method);
        let path = normalize_uri(uri);
        let mut allowed = MethodSet::empty();

        for route in &self.routes {
            if !route.compiled.is_match(&path) {
                continue;
            }
            match verb {
                Some(verb) if route.methods.contains(verb) => {
                    let params = route.compiled.captures(&path).unwrap_or_default();
                    trace!(route = %route.label(), path = %path, "Route matched");
                    return Ok(MatchedRoute {
                        route: Arc::clone(route),
                        params,
                        method: verb,
                    });
                }
                _ => {
                    trace!(route = %route.label(), method, "Pattern matched, method rejected");
                    allowed = allowed.union(route.methods);
                }
            }
        }

        if allowed.is_empty() {
            trace!(method, path = %path, "No route matched");
            Err(Error::RouteNotFound(path.into_owned()))
        } else {
            Err(Error::MethodNotAllowed {
                method: method.to_string(),
                path: path.into_owned(),
                allowed: allowed.iter().map(|m| m.as_str().to_string()).collect(),
            })
        }
    }
}

pub(crate) struct RouteDigest<'a> {
    pub name: Option<&'a str>,
    pub methods: MethodSet,
    pub pattern: &'a str,
    pub callback: String,
}

pub(crate) fn fingerprint<'a>(routes: impl Iterator<Item = RouteDigest<'a>>) -> String {
    let mut hasher = Sha256::new();
    for route in routes {
        hasher.update(route.name.unwrap_or_default().as_bytes());
        hasher.update([0u8]);
        hasher.update(route.methods.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(route.pattern.as_bytes());
        hasher.update([0u8]);
        hasher.update(route.callback.as_bytes());
        hasher.update([b'\n']);
    }
    format!("{:x}", hasher.finalize())
}

/// Outcome of a successful match.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    route: Arc<RouteDefinition>,
    params: RouteParams,
    method: HttpMethod,
}

impl MatchedRoute {
    pub fn route(&self) -> &Arc<RouteDefinition> {
        &self.route
    }

    /// Captured values, in pattern order.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn name(&self) -> Option<&str> {
        self.route.name()
    }
}

/// Per request matching context over a shared route table.
#[derive(Debug, Clone)]
pub struct Router {
    table: Arc<RouteTable>,
    last: Option<MatchedRoute>,
}

impl Router {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table, last: None }
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// Match a request and remember it as the current route.
    ///
    /// A failed match leaves the previous match in place.
    pub fn match_route(&mut self, method: &str, uri: &str) -> Result<&MatchedRoute, Error> {
        let matched = self.table.find(method, uri)?;
        Ok(self.last.insert(matched))
    }

    /// The last successful match.
    pub fn matched(&self) -> Result<&MatchedRoute, Error> {
        self.last.as_ref().ok_or(Error::NoMatchYet)
    }
}

/// Reduce a request URI to the path matched against route patterns.
///
/// Drops the query string and fragment, trims one trailing `/` except for
/// the root, and maps an empty path to `/`.
pub fn normalize_uri(uri: &str) -> Cow<'_, str> {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    let mut path = &uri[..end];
    if path.len() > 1 && path.ends_with('/') {
        path = &path[..path.len() - 1];
    }
    if path.is_empty() {
        Cow::Borrowed("/")
    } else if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{}", path))
    }
}
