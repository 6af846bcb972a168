use keel_core::{ClassDefinition, ClassParam, Container, Definition, Error};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Database {
    url: String,
}

struct Repository {
    db: Arc<Database>,
    page_size: i64,
}

struct Service {
    repo: Arc<Repository>,
}

fn wired() -> Container {
    let container = Container::new();
    container.register(
        "Database",
        Definition::value(Database {
            url: "sqlite::memory:".to_string(),
        }),
        false,
    );
    container.class(
        ClassDefinition::new("Repository", |args| {
            Ok(Repository {
                db: args.service::<Database>("db")?,
                page_size: args.int("page_size")?,
            })
        })
        .inject("db", "Database")
        .value_or("page_size", 20),
    );
    container.class(
        ClassDefinition::new("Service", |args| {
            Ok(Service {
                repo: args.service::<Repository>("repo")?,
            })
        })
        .inject("repo", "Repository"),
    );
    container
}

#[test]
fn test_register_and_resolve() {
    let container = wired();
    let service = container.get::<Service>("Service").unwrap();
    assert_eq!(service.repo.page_size, 20);
    assert_eq!(service.repo.db.url, "sqlite::memory:");
}

#[test]
fn test_resolve_nonexistent() {
    let container = Container::new();
    match container.resolve("Missing") {
        Err(Error::ServiceNotFound(id)) => assert_eq!(id, "Missing"),
        other => panic!("expected ServiceNotFound, got {:?}", other.err()),
    }
}

#[test]
fn test_has_provider() {
    let container = wired();
    assert!(container.has("Database"));
    assert!(container.has("Repository"));
    assert!(!container.has("Cache"));
}

#[test]
fn test_non_singleton_class_gives_distinct_instances() {
    let container = wired();
    let a = container.get::<Repository>("Repository").unwrap();
    let b = container.get::<Repository>("Repository").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.db, &b.db));
}

#[test]
fn test_singleton_class_is_shared() {
    let container = wired();
    container.register("Repository", Definition::class("Repository"), true);

    let a = container.get::<Repository>("Repository").unwrap();
    let b = container.get::<Repository>("Repository").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let service = container.get::<Service>("Service").unwrap();
    assert!(Arc::ptr_eq(&service.repo, &a));
}

#[test]
fn test_singleton_factory_runs_once() {
    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    container.singleton("Clock", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(1_700_000_000i64)
    });

    for _ in 0..5 {
        assert_eq!(*container.get::<i64>("Clock").unwrap(), 1_700_000_000);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reregistration_evicts_singleton() {
    let container = Container::new();
    container.register("name", Definition::value("first".to_string()), true);
    assert_eq!(*container.get::<String>("name").unwrap(), "first");

    container.register("name", Definition::value("second".to_string()), true);
    assert_eq!(*container.get::<String>("name").unwrap(), "second");
}

#[test]
fn test_class_definition_under_other_id() {
    let container = wired();
    container.register("repository.default", Definition::class("Repository"), true);
    container.alias("repo", "repository.default");

    let a = container.get::<Repository>("repo").unwrap();
    let b = container.get::<Repository>("repository.default").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_class_definition_pointing_at_id() {
    let container = wired();
    container.register("db.primary", Definition::class("Database"), false);
    let db = container.get::<Database>("db.primary").unwrap();
    assert_eq!(db.url, "sqlite::memory:");
}

#[test]
fn test_unresolvable_dependency() {
    let container = Container::new();
    container.class(
        ClassDefinition::new("Mailer", |args| Ok(args.str("transport")?.to_string()))
            .inject("transport", "Transport"),
    );

    match container.resolve("Mailer") {
        Err(Error::UnresolvableDependency { class, parameter }) => {
            assert_eq!(class, "Mailer");
            assert_eq!(parameter, "transport");
        }
        other => panic!("expected UnresolvableDependency, got {:?}", other.err()),
    }
}

#[test]
fn test_injected_default_when_unresolvable() {
    let container = Container::new();
    container.class(
        ClassDefinition::new("Mailer", |args| Ok(args.str("transport")?.to_string()))
            .param(ClassParam::inject("transport", "Transport").default("smtp")),
    );
    assert_eq!(*container.get::<String>("Mailer").unwrap(), "smtp");

    container.value("Transport", "ignored");
    assert!(matches!(
        container.get::<String>("Mailer"),
        Err(Error::ParameterCoercionError { .. })
    ));
}

#[test]
fn test_fifty_deep_chain_resolves() {
    let container = Container::new();
    container.value("svc0", 0i64);
    for i in 1..50 {
        let dep = format!("svc{}", i - 1);
        container.class(
            ClassDefinition::new(format!("svc{}", i), |args| {
                Ok(*args.service::<i64>("dep")? + 1)
            })
            .inject("dep", dep),
        );
    }

    assert_eq!(*container.get::<i64>("svc49").unwrap(), 49);
}

#[test]
fn test_two_cycle_fails() {
    let container = Container::new();
    container.class(ClassDefinition::new("A", |_| Ok(())).inject("b", "B"));
    container.class(ClassDefinition::new("B", |_| Ok(())).inject("a", "A"));

    match container.resolve("A") {
        Err(Error::CircularDependency { path }) => assert_eq!(path, vec!["A", "B", "A"]),
        other => panic!("expected CircularDependency, got {:?}", other.err()),
    }

    let err = container.resolve("B").err().unwrap();
    assert_eq!(err.to_string(), "Circular dependency: B -> A -> B");
}

#[test]
fn test_self_dependency() {
    let container = Container::new();
    container.factory("loop", |r| r.resolve("loop").map(|_| ()));
    match container.resolve("loop") {
        Err(Error::CircularDependency { path }) => assert_eq!(path, vec!["loop", "loop"]),
        other => panic!("expected CircularDependency, got {:?}", other.err()),
    }
}

#[test]
fn test_failed_resolve_leaves_container_usable() {
    let container = Container::new();
    container.factory("flaky", |_| -> Result<i64, Error> {
        Err(Error::Handler("boom".to_string()))
    });
    container.value("ok", 1i64);

    assert!(matches!(container.resolve("flaky"), Err(Error::Handler(_))));
    assert_eq!(*container.get::<i64>("ok").unwrap(), 1);
}

#[test]
fn test_shared_across_threads() {
    let container = Container::new();
    container.singleton("counter", |_| Ok(AtomicUsize::new(0)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            std::thread::spawn(move || {
                let counter = container.get::<AtomicUsize>("counter").unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                counter
            })
        })
        .collect();

    let counters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(counters.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(counters[0].load(Ordering::SeqCst), 8);
}

#[test]
fn test_request_scope_keeps_own_singletons() {
    let root = wired();
    root.register("Repository", Definition::class("Repository"), true);

    let request = root.for_request();
    request.singleton("request.id", |_| Ok("req-1".to_string()));
    let repo_from_request = request.get::<Repository>("Repository").unwrap();
    let repo_from_root = root.get::<Repository>("Repository").unwrap();

    assert!(Arc::ptr_eq(&repo_from_request, &repo_from_root));

    let first = request.get::<String>("request.id").unwrap();
    let second = request.get::<String>("request.id").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(request.is_cached("request.id"));
    assert!(!root.has("request.id"));
    assert!(!root.for_request().is_cached("request.id"));
}
