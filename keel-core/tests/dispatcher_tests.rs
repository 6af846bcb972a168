use keel_core::{
    Arguments, CallbackRef, ClassDefinition, Container, Definition, Dispatcher, Error, Handler,
    HandlerParam, HttpMethod, MethodHandler, Render, Reply, RouteTable, Router,
};
use std::sync::Arc;

struct UserStore {
    prefix: &'static str,
}

struct UsersController {
    store: Arc<UserStore>,
}

impl UsersController {
    fn show(&self, id: i64) -> String {
        format!("{} {}", self.store.prefix, id)
    }
}

struct Profile {
    name: String,
}

impl Render for Profile {
    fn render(&self) -> Result<String, Error> {
        Ok(format!("<h1>{}</h1>", self.name))
    }
}

fn container() -> Container {
    let container = Container::new();
    container.register("UserStore", Definition::value(UserStore { prefix: "User" }), true);
    container.class(
        ClassDefinition::new("UsersController", |args| {
            Ok(UsersController {
                store: args.service::<UserStore>("store")?,
            })
        })
        .inject("store", "UserStore"),
    );
    container
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new().with_method(
        "UsersController",
        "show",
        MethodHandler::new(|c: &UsersController, args: &Arguments| Ok(c.show(args.int("id")?)))
            .param(HandlerParam::int("id")),
    )
}

fn route(table: RouteTable, method: &str, uri: &str) -> Router {
    let mut router = Router::new(Arc::new(table));
    router.match_route(method, uri).unwrap();
    router
}

#[test]
fn test_controller_method_dispatch() {
    let mut table = RouteTable::new();
    table
        .register(
            HttpMethod::GET,
            "/users/{id:numeric}",
            CallbackRef::parse("UsersController@show").unwrap(),
            Some("user.show"),
        )
        .unwrap();

    let mut router = Router::new(Arc::new(table));
    let matched = router.match_route("GET", "/users/42").unwrap();
    assert_eq!(matched.param("id"), Some("42"));

    let body = dispatcher().call(matched, &container()).unwrap();
    assert_eq!(body, "User 42");
    assert_eq!(
        router.table().generate_url("user.show", [("id", 42)]).unwrap(),
        "/users/42"
    );
}

#[test]
fn test_handler_not_found() {
    let mut table = RouteTable::new();
    table
        .get("/users", CallbackRef::method("UsersController", "index"), None)
        .unwrap();
    let router = route(table, "GET", "/users");

    match dispatcher().call(router.matched().unwrap(), &container()) {
        Err(Error::HandlerNotFound { service, method }) => {
            assert_eq!(service, "UsersController");
            assert_eq!(method, "index");
        }
        other => panic!("expected HandlerNotFound, got {:?}", other),
    }
}

#[test]
fn test_owner_not_in_container() {
    let mut table = RouteTable::new();
    table
        .get("/users/{id}", CallbackRef::method("UsersController", "show"), None)
        .unwrap();
    let router = route(table, "GET", "/users/1");

    assert!(matches!(
        dispatcher().call(router.matched().unwrap(), &Container::new()),
        Err(Error::ServiceNotFound(id)) if id == "UsersController"
    ));
}

#[test]
fn test_coercion_error() {
    let mut table = RouteTable::new();
    table
        .get("/users/{id}", CallbackRef::method("UsersController", "show"), None)
        .unwrap();
    let router = route(table, "GET", "/users/abc");

    match dispatcher().call(router.matched().unwrap(), &container()) {
        Err(Error::ParameterCoercionError {
            parameter,
            value,
            expected,
        }) => {
            assert_eq!(parameter, "id");
            assert_eq!(value, "abc");
            assert_eq!(expected, "integer");
        }
        other => panic!("expected ParameterCoercionError, got {:?}", other),
    }
}

#[test]
fn test_binding_priority() {
    let handler = Handler::new("report", |args| {
        Ok(format!(
            "{}:{}:{}:{}",
            args.int("year")?,
            args.bool("draft")?,
            args.float("scale")?,
            args.service::<UserStore>("store")?.prefix
        ))
    })
    .param(HandlerParam::int("year").default(1970))
    .param(HandlerParam::bool("draft").default(false))
    .param(HandlerParam::float("scale").default(1.5))
    .param(HandlerParam::service("store", "UserStore"));

    let mut table = RouteTable::new();
    table
        .get("/reports/{year}/{draft}", handler, None)
        .unwrap();
    let router = route(table, "GET", "/reports/2024/yes");

    let body = Dispatcher::new()
        .call(router.matched().unwrap(), &container())
        .unwrap();
    assert_eq!(body, "2024:true:1.5:User");
}

#[test]
fn test_service_param_ignores_same_named_capture() {
    let handler = Handler::new("store", |args| {
        Ok(args.service::<UserStore>("store")?.prefix.to_string())
    })
    .param(HandlerParam::service("store", "UserStore"));

    let mut table = RouteTable::new();
    table.get("/stores/{store}", handler, None).unwrap();
    let router = route(table, "GET", "/stores/main");

    let body = Dispatcher::new()
        .call(router.matched().unwrap(), &container())
        .unwrap();
    assert_eq!(body, "User");
}

#[test]
fn test_missing_route_parameter() {
    let handler = Handler::new("needs_token", |args| Ok(args.str("token")?.to_string()))
        .param(HandlerParam::string("token"));

    let mut table = RouteTable::new();
    table.get("/secure", handler, None).unwrap();
    let router = route(table, "GET", "/secure");

    match Dispatcher::new().call(router.matched().unwrap(), &container()) {
        Err(Error::MissingRouteParameter { target, parameter }) => {
            assert_eq!(target, "fn:needs_token");
            assert_eq!(parameter, "token");
        }
        other => panic!("expected MissingRouteParameter, got {:?}", other),
    }
}

#[test]
fn test_unresolvable_service_param_is_missing() {
    let handler = Handler::new("mail", |_| Ok("sent"))
        .param(HandlerParam::service("mailer", "Mailer"));

    let mut table = RouteTable::new();
    table.get("/mail", handler, None).unwrap();
    let router = route(table, "GET", "/mail");

    assert!(matches!(
        Dispatcher::new().call(router.matched().unwrap(), &container()),
        Err(Error::MissingRouteParameter { .. })
    ));
}

#[test]
fn test_view_reply_is_rendered() {
    let handler = Handler::new("profile", |args| {
        Ok(Reply::view(Profile {
            name: args.str("name")?.to_string(),
        }))
    })
    .param(HandlerParam::string("name"));

    let mut table = RouteTable::new();
    table.get("/profiles/{name}", handler, None).unwrap();
    let router = route(table, "GET", "/profiles/Ada%20L");

    let body = Dispatcher::new()
        .call(router.matched().unwrap(), &container())
        .unwrap();
    assert_eq!(body, "<h1>Ada L</h1>");
}

#[test]
fn test_invalid_controller_response() {
    let handler = Handler::new("json", |_| Ok(serde_json::json!({"ok": true})));

    let mut table = RouteTable::new();
    table.get("/json", handler, None).unwrap();
    let router = route(table, "GET", "/json");

    assert!(matches!(
        Dispatcher::new().call(router.matched().unwrap(), &container()),
        Err(Error::InvalidControllerResponse(_))
    ));
}

#[test]
fn test_handler_errors_propagate() {
    let handler = Handler::new("fails", |_| -> Result<String, Error> {
        Err(Error::Handler("database offline".to_string()))
    });

    let mut table = RouteTable::new();
    table.get("/fails", handler, None).unwrap();
    let router = route(table, "GET", "/fails");

    assert!(matches!(
        Dispatcher::new().call(router.matched().unwrap(), &container()),
        Err(Error::Handler(msg)) if msg == "database offline"
    ));
}
