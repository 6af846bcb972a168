// Dependency injection container
//
// Services are registered under string identifiers as values, factories or
// class names, and resolved on demand. Class names are autowired from their
// `ClassDefinition`. Singletons are cached per container until the id is
// registered again.

use crate::autowire::ClassDefinition;
use crate::{Argument, Arguments, Error};
use parking_lot::RwLock;
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A resolved service instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A deferred computation producing a service.
pub type FactoryFn = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, Error> + Send + Sync>;

/// Maximum alias hops followed before giving up.
pub const DEFAULT_MAX_ALIAS_DEPTH: usize = 32;

/// How a service is produced.
#[derive(Clone)]
pub enum Definition {
    /// An opaque value returned verbatim on every resolve.
    Value(Instance),
    /// Invoked with the resolving context.
    Factory(FactoryFn),
    /// A class identifier to autowire.
    Class(String),
}

impl Definition {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Definition::Value(Arc::new(value))
    }

    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        Definition::Factory(Arc::new(move |resolver| {
            factory(resolver).map(|v| Arc::new(v) as Instance)
        }))
    }

    pub fn class(name: impl Into<String>) -> Self {
        Definition::Class(name.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Definition::Value(_) => "value",
            Definition::Factory(_) => "factory",
            Definition::Class(_) => "class",
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Value(_) => f.write_str("Value(..)"),
            Definition::Factory(_) => f.write_str("Factory(..)"),
            Definition::Class(name) => f.debug_tuple("Class").field(name).finish(),
        }
    }
}

#[derive(Clone)]
struct ServiceDefinition {
    definition: Definition,
    singleton: bool,
}

struct Registry {
    services: RwLock<HashMap<String, ServiceDefinition>>,
    aliases: RwLock<HashMap<String, String>>,
    classes: RwLock<HashMap<String, Arc<ClassDefinition>>>,
    instances: RwLock<HashMap<String, Instance>>,
    max_alias_depth: usize,
}

impl Registry {
    fn new(max_alias_depth: usize) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            classes: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            max_alias_depth,
        }
    }
}

/// The dependency injection container.
///
/// Cloning a container shares its registrations and singleton cache. A
/// request-scoped child created with [`Container::for_request`] has its own
/// registrations and cache and falls back to its parent for everything else.
#[derive(Clone)]
pub struct Container {
    registry: Arc<Registry>,
    parent: Option<Box<Container>>,
}

impl Container {
    pub fn new() -> Self {
        Self::with_max_alias_depth(DEFAULT_MAX_ALIAS_DEPTH)
    }

    pub fn with_max_alias_depth(max_alias_depth: usize) -> Self {
        debug!(max_alias_depth, "Creating new DI container");
        Self {
            registry: Arc::new(Registry::new(max_alias_depth)),
            parent: None,
        }
    }

    /// Create a child container for one unit of work.
    ///
    /// Singletons registered on the parent stay cached on the parent and are
    /// shared by every child; registrations made on the child (and their
    /// singleton instances) are dropped with it.
    pub fn for_request(&self) -> Self {
        trace!("Creating request-scoped container");
        Self {
            registry: Arc::new(Registry::new(self.registry.max_alias_depth)),
            parent: Some(Box::new(self.clone())),
        }
    }

    pub fn max_alias_depth(&self) -> usize {
        self.registry.max_alias_depth
    }

    /// Register a service definition.
    ///
    /// Replaces any previous definition or alias for `id` in this container
    /// and evicts its cached singleton.
    pub fn register(&self, id: impl Into<String>, definition: Definition, singleton: bool) {
        let id = id.into();
        let kind = definition.kind();

        self.registry.aliases.write().remove(&id);
        self.registry.instances.write().remove(&id);
        self.registry.services.write().insert(
            id.clone(),
            ServiceDefinition {
                definition,
                singleton,
            },
        );

        debug!(service = %id, kind, singleton, "Service registered in DI container");
    }

    /// Register a value returned verbatim on every resolve.
    pub fn value<T: Any + Send + Sync>(&self, id: impl Into<String>, value: T) {
        self.register(id, Definition::value(value), false);
    }

    /// Register a factory invoked on every resolve.
    pub fn factory<T, F>(&self, id: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.register(id, Definition::factory(factory), false);
    }

    /// Register a factory whose first result is cached.
    pub fn singleton<T, F>(&self, id: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.register(id, Definition::factory(factory), true);
    }

    /// Declare a constructible class. Resolving its name autowires a fresh
    /// instance unless the name is also registered as a singleton.
    pub fn class(&self, class: ClassDefinition) {
        let name = class.name().to_string();
        trace!(class = %name, deps = class.params().len(), "Declaring class");
        self.registry.classes.write().insert(name, Arc::new(class));
    }

    /// Point `alias` at `target`. Followed lazily at resolve time.
    pub fn alias(&self, alias: impl Into<String>, target: impl Into<String>) {
        let alias = alias.into();
        let target = target.into();
        debug!(alias = %alias, target = %target, "Alias registered");
        self.registry.aliases.write().insert(alias, target);
    }

    /// Resolve a service by id.
    pub fn resolve(&self, id: &str) -> Result<Instance, Error> {
        let stack = RefCell::default();
        Resolver::new(self, &stack).resolve(id)
    }

    /// Resolve a service and downcast it to `T`.
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, Error> {
        let stack = RefCell::default();
        Resolver::new(self, &stack).get(id)
    }

    /// Whether resolving `id` would find an alias, a definition or a class.
    pub fn has(&self, id: &str) -> bool {
        self.find_alias(id).is_some()
            || self.find_service(id).is_some()
            || self.find_class(id).is_some()
    }

    /// Whether a singleton instance is currently cached for `id`.
    pub fn is_cached(&self, id: &str) -> bool {
        self.follow_aliases(id)
            .ok()
            .and_then(|id| {
                let (_, owner) = self.find_service(&id)?;
                owner.cached_instance(&id)
            })
            .is_some()
    }

    /// Remove a definition, alias or class from this container.
    pub fn remove(&self, id: &str) -> bool {
        let service = self.registry.services.write().remove(id).is_some();
        let alias = self.registry.aliases.write().remove(id).is_some();
        let class = self.registry.classes.write().remove(id).is_some();
        self.registry.instances.write().remove(id);
        debug!(service = id, "Service removed from DI container");
        service || alias || class
    }

    /// Drop a cached singleton so the next resolve builds a new one.
    pub fn forget_instance(&self, id: &str) -> bool {
        self.registry.instances.write().remove(id).is_some()
    }

    /// All known identifiers, including parents', sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids = BTreeSet::new();
        for scope in self.scopes() {
            ids.extend(scope.registry.services.read().keys().cloned());
            ids.extend(scope.registry.aliases.read().keys().cloned());
            ids.extend(scope.registry.classes.read().keys().cloned());
        }
        ids.into_iter().collect()
    }

    /// Clear everything registered on this container.
    pub fn clear(&self) {
        let count = self.registry.services.read().len();
        self.registry.services.write().clear();
        self.registry.aliases.write().clear();
        self.registry.classes.write().clear();
        self.registry.instances.write().clear();
        debug!(service_count = count, "Cleared all services from container");
    }

    fn scopes(&self) -> impl Iterator<Item = &Container> {
        std::iter::successors(Some(self), |c| c.parent.as_deref())
    }

    /// The alias target for `id`, from the nearest scope that knows `id`.
    /// A definition in a nearer scope shadows an alias further up.
    fn find_alias(&self, id: &str) -> Option<String> {
        for scope in self.scopes() {
            if let Some(target) = scope.registry.aliases.read().get(id) {
                return Some(target.clone());
            }
            if scope.registry.services.read().contains_key(id) {
                return None;
            }
        }
        None
    }

    /// The definition for `id` and the container that owns it.
    fn find_service(&self, id: &str) -> Option<(ServiceDefinition, &Container)> {
        self.scopes().find_map(|c| {
            let service = c.registry.services.read().get(id).cloned()?;
            Some((service, c))
        })
    }

    fn find_class(&self, name: &str) -> Option<Arc<ClassDefinition>> {
        self.scopes()
            .find_map(|c| c.registry.classes.read().get(name).cloned())
    }

    fn cached_instance(&self, id: &str) -> Option<Instance> {
        self.registry.instances.read().get(id).cloned()
    }

    /// Cache `instance` unless another resolve got there first; either way
    /// return the cached one.
    fn promote(&self, id: &str, instance: Instance) -> Instance {
        let mut instances = self.registry.instances.write();
        instances
            .entry(id.to_string())
            .or_insert(instance)
            .clone()
    }

    /// Follow the alias chain from `id` to a concrete identifier.
    pub fn follow_aliases(&self, id: &str) -> Result<String, Error> {
        let max_depth = self.max_alias_depth();
        let mut chain = vec![id.to_string()];
        let mut current = id.to_string();

        while let Some(target) = self.find_alias(&current) {
            let revisited = chain.contains(&target);
            chain.push(target.clone());
            if revisited || chain.len() - 1 > max_depth {
                return Err(Error::AliasCycle { chain });
            }
            current = target;
        }

        if chain.len() > 1 {
            trace!(alias = id, target = %current, hops = chain.len() - 1, "Alias resolved");
        }
        Ok(current)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.registry.services.read().len())
            .field("aliases", &self.registry.aliases.read().len())
            .field("classes", &self.registry.classes.read().len())
            .field("cached", &self.registry.instances.read().len())
            .field("scoped", &self.parent.is_some())
            .finish()
    }
}

/// The context of a single top-level resolve.
///
/// Factories receive the resolver so that nested resolutions share the same
/// resolution stack and cycles are reported instead of recursing forever.
/// A singleton is built against the scope that owns its definition, so it
/// never sees services registered on a request-scoped child.
pub struct Resolver<'a> {
    container: &'a Container,
    stack: &'a RefCell<Vec<String>>,
}

impl<'a> Resolver<'a> {
    fn new(container: &'a Container, stack: &'a RefCell<Vec<String>>) -> Self {
        Self { container, stack }
    }

    /// The same resolution rooted at another scope.
    fn scoped(&self, container: &'a Container) -> Resolver<'a> {
        Resolver::new(container, self.stack)
    }

    /// Whether `id` is resolvable from the scope being built in.
    pub fn has(&self, id: &str) -> bool {
        self.container.has(id)
    }

    /// Identifiers currently being resolved, outermost first.
    pub fn path(&self) -> Vec<String> {
        self.stack.borrow().clone()
    }

    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, Error> {
        let instance = self.resolve(id)?;
        Arc::downcast::<T>(instance).map_err(|_| Error::ServiceTypeMismatch {
            id: id.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn resolve(&self, id: &str) -> Result<Instance, Error> {
        let id = self.container.follow_aliases(id)?;
        let found = self.container.find_service(&id);

        if let Some((_, owner)) = &found {
            if let Some(instance) = owner.cached_instance(&id) {
                trace!(service = %id, "Resolved cached singleton");
                return Ok(instance);
            }
        }

        let result = self.within(&id, || self.build(&id, found));
        match &result {
            Ok(_) => debug!(service = %id, "Service resolved successfully"),
            Err(e) => debug!(service = %id, error = %e, "Service resolution failed"),
        }
        result
    }

    /// Run `f` with `id` pushed on the resolution stack.
    fn within<R>(&self, id: &str, f: impl FnOnce() -> Result<R, Error>) -> Result<R, Error> {
        {
            let mut stack = self.stack.borrow_mut();
            if let Some(pos) = stack.iter().position(|s| s == id) {
                let mut path = stack[pos..].to_vec();
                path.push(id.to_string());
                return Err(Error::CircularDependency { path });
            }
            stack.push(id.to_string());
        }
        let result = f();
        self.stack.borrow_mut().pop();
        result
    }

    fn build(&self, id: &str, found: Option<(ServiceDefinition, &'a Container)>) -> Result<Instance, Error> {
        let Some((service, owner)) = found else {
            return match self.container.find_class(id) {
                Some(class) => self.autowire(&class),
                None => Err(Error::ServiceNotFound(id.to_string())),
            };
        };

        if service.singleton {
            let instance = self.scoped(owner).construct(id, &service.definition)?;
            Ok(owner.promote(id, instance))
        } else {
            self.construct(id, &service.definition)
        }
    }

    fn construct(&self, id: &str, definition: &Definition) -> Result<Instance, Error> {
        let instance = match definition {
            Definition::Value(value) => value.clone(),
            Definition::Factory(factory) => factory(self)?,
            Definition::Class(name) if name == id => match self.container.find_class(name) {
                Some(class) => self.autowire(&class)?,
                None => return Err(Error::ServiceNotFound(name.clone())),
            },
            Definition::Class(name) => match self.container.find_class(name) {
                Some(class) => self.within(name, || self.autowire(&class))?,
                None if self.container.has(name) => self.resolve(name)?,
                None => return Err(Error::ServiceNotFound(name.clone())),
            },
        };
        Ok(instance)
    }

    fn autowire(&self, class: &ClassDefinition) -> Result<Instance, Error> {
        let mut args = Arguments::new(class.name());

        for param in class.params() {
            let value = match param.declared_type() {
                Some(ty) if self.container.has(ty) => Argument::Service(self.resolve(ty)?),
                _ => match param.default_value() {
                    Some(default) => default.clone(),
                    None => {
                        return Err(Error::UnresolvableDependency {
                            class: class.name().to_string(),
                            parameter: param.name().to_string(),
                        });
                    }
                },
            };
            args.push(param.name(), value);
        }

        trace!(class = class.name(), args = args.len(), "Autowiring class");
        class.construct(&args)
    }
}
