//! Route and service manifests
//!
//! Manifests are the parsed, boot-time form of route and service tables, as
//! read from JSON or TOML configuration:
//!
//! ```json
//! {
//!   "routes": [
//!     { "methods": ["GET"], "pattern": "/users/{id:numeric}",
//!       "handler": "UsersController@show", "name": "user.show" }
//!   ]
//! }
//! ```
//!
//! ```json
//! {
//!   "services": [
//!     { "id": "UsersController", "class": "UsersController", "singleton": true },
//!     { "id": "app.name", "value": "keel" },
//!     { "id": "users", "alias": "UsersController" }
//!   ]
//! }
//! ```

use crate::container::{Container, Definition};
use crate::handler::CallbackRef;
use crate::route_cache::{CachedMatcher, RouteCache};
use crate::route_pattern::{CompiledRoute, RoutePattern};
use crate::routing::{RouteDigest, RouteTable, fingerprint};
use crate::traits::MethodSet;
use crate::Error;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An ordered list of route entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteManifest {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One route: accepted methods, pattern, `Service@method` handler, optional name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    #[serde(alias = "verbs")]
    pub methods: Vec<String>,
    pub pattern: String,
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RouteEntry {
    pub fn new(methods: &[&str], pattern: &str, handler: &str, name: Option<&str>) -> Self {
        Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            pattern: pattern.to_string(),
            handler: handler.to_string(),
            name: name.map(str::to_string),
        }
    }
}

impl RouteManifest {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidManifest(e.to_string()))
    }
}

struct ParsedRoute<'a> {
    entry: &'a RouteEntry,
    methods: MethodSet,
    pattern: RoutePattern,
    callback: CallbackRef,
}

fn parse_entry(entry: &RouteEntry) -> Result<ParsedRoute<'_>, Error> {
    let methods = MethodSet::parse(entry.methods.as_slice()).ok_or_else(|| {
        Error::InvalidManifest(format!(
            "unknown method in [{}] for '{}'",
            entry.methods.join(", "),
            entry.pattern
        ))
    })?;
    if methods.is_empty() {
        return Err(Error::InvalidManifest(format!(
            "route '{}' accepts no methods",
            entry.pattern
        )));
    }
    Ok(ParsedRoute {
        entry,
        methods,
        pattern: RoutePattern::parse(&entry.pattern)?,
        callback: CallbackRef::parse(&entry.handler)?,
    })
}

impl RouteTable {
    /// Build a table from a manifest, reusing compiled matchers from `cache`
    /// when its fingerprint matches and refreshing it otherwise.
    pub fn from_manifest(manifest: &RouteManifest, cache: Option<&RouteCache>) -> Result<Self, Error> {
        let parsed = manifest
            .routes
            .iter()
            .map(parse_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let digest = fingerprint(parsed.iter().map(|p| RouteDigest {
            name: p.entry.name.as_deref(),
            methods: p.methods,
            pattern: p.pattern.as_str(),
            callback: p.callback.describe(),
        }));

        let cached = match cache {
            Some(cache) => cache.load(&digest)?,
            None => None,
        };

        let reused = cached.and_then(|hits| from_cache(&parsed, hits));
        let stale = reused.is_none();
        let compiled = match reused {
            Some(compiled) => {
                debug!(routes = compiled.len(), "Using cached route matchers");
                compiled
            }
            None => parsed
                .iter()
                .map(|p| p.pattern.compile())
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut table = RouteTable::new();
        for (route, matcher) in parsed.into_iter().zip(compiled) {
            table.insert(
                route.methods,
                route.pattern,
                matcher,
                route.callback,
                route.entry.name.as_deref(),
            )?;
        }

        if let Some(cache) = cache.filter(|_| stale) {
            cache.store(&table)?;
        }

        debug!(routes = table.len(), fingerprint = %digest, "Route table built from manifest");
        Ok(table)
    }
}

fn from_cache(parsed: &[ParsedRoute<'_>], hits: Vec<CachedMatcher>) -> Option<Vec<CompiledRoute>> {
    if hits.len() != parsed.len() {
        warn!(cached = hits.len(), expected = parsed.len(), "Route cache size mismatch");
        return None;
    }
    parsed
        .iter()
        .zip(hits)
        .map(|(route, hit)| {
            if hit.pattern != route.pattern.as_str() {
                warn!(pattern = route.pattern.as_str(), cached = %hit.pattern, "Route cache entry mismatch");
                return None;
            }
            CompiledRoute::from_source(route.pattern.as_str(), hit.regex, hit.params)
                .map_err(|e| warn!(error = %e, "Rejecting cached route matcher"))
                .ok()
        })
        .collect()
}

/// An ordered list of service entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceManifest {
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

/// One service: exactly one of `value`, `class` or `alias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub singleton: bool,
}

enum ServiceSource<'a> {
    Value(&'a serde_json::Value),
    Class(&'a str),
    Alias(&'a str),
}

impl ServiceEntry {
    fn source(&self) -> Result<ServiceSource<'_>, Error> {
        match (&self.value, &self.class, &self.alias) {
            (Some(value), None, None) => Ok(ServiceSource::Value(value)),
            (None, Some(class), None) => Ok(ServiceSource::Class(class)),
            (None, None, Some(alias)) => Ok(ServiceSource::Alias(alias)),
            _ => Err(Error::InvalidManifest(format!(
                "service '{}' must set exactly one of value, class or alias",
                self.id
            ))),
        }
    }
}

impl ServiceManifest {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidManifest(e.to_string()))
    }
}

impl Container {
    /// Register every entry of `manifest`, in order.
    ///
    /// The manifest is validated as a whole first, so an invalid entry leaves
    /// the container untouched. Values are stored as `serde_json::Value`.
    pub fn load_manifest(&self, manifest: &ServiceManifest) -> Result<(), Error> {
        let sources = manifest
            .services
            .iter()
            .map(|entry| entry.source().map(|source| (entry, source)))
            .collect::<Result<Vec<_>, _>>()?;

        for (entry, source) in sources {
            match source {
                ServiceSource::Value(value) => {
                    self.register(&entry.id, Definition::value(value.clone()), entry.singleton)
                }
                ServiceSource::Class(class) => {
                    self.register(&entry.id, Definition::class(class), entry.singleton)
                }
                ServiceSource::Alias(target) => self.alias(&entry.id, target),
            }
        }

        debug!(services = manifest.services.len(), "Service manifest loaded");
        Ok(())
    }
}
