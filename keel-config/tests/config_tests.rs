use keel_config::{
    ConfigManager, FileFormat, KeelSettings, load_route_manifest, load_service_manifest,
};
use keel_core::{CacheSnapshot, Error, RouteTable};
use std::fs;

#[test]
fn test_settings_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keel.toml");
    fs::write(
        &path,
        r#"
[container]
max_alias_depth = 8

[log]
level = "warn"
format = "compact"
"#,
    )
    .unwrap();

    let manager = ConfigManager::with_prefix("KEEL_CONFIG_TEST");
    manager.load_file(&path, FileFormat::Toml).unwrap();
    let settings = KeelSettings::from_manager(&manager).unwrap();

    assert_eq!(settings.container.max_alias_depth, 8);
    assert_eq!(settings.log.format, "compact");

    let container = settings.container();
    container.alias("a", "b");
    container.alias("b", "a");
    assert!(matches!(container.resolve("a"), Err(Error::AliasCycle { .. })));
}

#[test]
fn test_route_manifest_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("routes.toml");
    fs::write(
        &path,
        r#"
[[routes]]
methods = ["GET"]
pattern = "/users/{id:numeric}"
handler = "UsersController@show"
name = "user.show"

[[routes]]
methods = ["*"]
pattern = "/health"
handler = "Health@check"
"#,
    )
    .unwrap();

    let manifest = load_route_manifest(&path).unwrap();
    let table = RouteTable::from_manifest(&manifest, None).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.generate_url("user.show", [("id", 5)]).unwrap(),
        "/users/5"
    );
}

#[test]
fn test_route_cache_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache/routes.json");
    let routes_path = dir.path().join("routes.json");
    fs::write(
        &routes_path,
        r#"{"routes":[{"methods":["GET"],"pattern":"/a/{x:alpha}","handler":"A@show","name":"a"}]}"#,
    )
    .unwrap();

    let manager = ConfigManager::new();
    manager
        .set("routing.cache_path", cache_path.to_string_lossy())
        .unwrap();
    let settings = KeelSettings::from_manager(&manager).unwrap();
    let cache = settings.route_cache().unwrap();

    let manifest = load_route_manifest(&routes_path).unwrap();
    let first = RouteTable::from_manifest(&manifest, Some(&cache)).unwrap();
    assert!(cache_path.exists());

    let mut snapshot: CacheSnapshot = serde_json::from_slice(&fs::read(&cache_path).unwrap()).unwrap();
    assert_eq!(snapshot.fingerprint, first.fingerprint());
    snapshot.routes[0].regex = "^/a/([a-z]+)$".to_string();
    fs::write(&cache_path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let second = RouteTable::from_manifest(&manifest, Some(&cache)).unwrap();
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(second.routes()[0].compiled().as_str(), "^/a/([a-z]+)$");
    assert!(second.find("GET", "/a/ABC").is_err());
}

#[test]
fn test_service_manifest_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("services.json");
    fs::write(
        &path,
        r#"{"services":[{"id":"app.name","value":"keel","singleton":true},{"id":"name","alias":"app.name"}]}"#,
    )
    .unwrap();

    let manifest = load_service_manifest(&path).unwrap();
    let container = KeelSettings::default().container();
    container.load_manifest(&manifest).unwrap();

    let a = container.get::<serde_json::Value>("name").unwrap();
    let b = container.get::<serde_json::Value>("app.name").unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn test_missing_manifest_file() {
    assert!(load_route_manifest("/definitely/not/here/routes.json").is_err());
}
