// Handler declarations for route dispatch
//
// A route's callback is either a standalone `Handler` or a reference to a
// method on a container-managed service. Both declare their parameter list up
// front; the dispatcher binds captures, services and defaults against it and
// invokes the boxed function with the resulting `Arguments`.

use crate::traits::Render;
use crate::{Argument, Arguments, Error, Instance};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Declared type of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Bool,
    Str,
    /// A service id or class name resolved from the container.
    Service(String),
}

impl ParamType {
    pub fn name(&self) -> &str {
        match self {
            ParamType::Int => "integer",
            ParamType::Float => "float",
            ParamType::Bool => "boolean",
            ParamType::Str => "string",
            ParamType::Service(id) => id,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ParamType::Service(_))
    }
}

/// A declared handler parameter.
#[derive(Debug, Clone)]
pub struct HandlerParam {
    name: String,
    ty: ParamType,
    default: Option<Argument>,
}

impl HandlerParam {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Str)
    }

    pub fn service(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(name, ParamType::Service(id.into()))
    }

    /// Value used when nothing else binds.
    pub fn default(mut self, value: impl Into<Argument>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ParamType {
        &self.ty
    }

    pub fn default_value(&self) -> Option<&Argument> {
        self.default.as_ref()
    }
}

/// What a handler produced.
pub enum Reply {
    Text(String),
    View(Box<dyn Render>),
    /// Structured data; not a valid controller response on its own.
    Data(serde_json::Value),
    Empty,
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Text(body.into())
    }

    pub fn view<R: Render + 'static>(view: R) -> Self {
        Reply::View(Box::new(view))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Text(_) => "text",
            Reply::View(_) => "view",
            Reply::Data(_) => "data",
            Reply::Empty => "empty",
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(body) => f.debug_tuple("Text").field(body).finish(),
            Reply::View(_) => f.write_str("View(..)"),
            Reply::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Reply::Empty => f.write_str("Empty"),
        }
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Reply::Text(body)
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Reply::Text(body.to_string())
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::Data(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

type HandlerFn = Arc<dyn Fn(&Arguments) -> Result<Reply, Error> + Send + Sync>;
type MethodFn = Arc<dyn Fn(&Instance, &Arguments) -> Result<Reply, Error> + Send + Sync>;

/// A standalone route handler.
#[derive(Clone)]
pub struct Handler {
    label: String,
    params: Vec<HandlerParam>,
    func: HandlerFn,
}

impl Handler {
    pub fn new<R, F>(label: impl Into<String>, func: F) -> Self
    where
        R: Into<Reply>,
        F: Fn(&Arguments) -> Result<R, Error> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            params: Vec::new(),
            func: Arc::new(move |args| func(args).map(Into::into)),
        }
    }

    pub fn param(mut self, param: HandlerParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn params(&self) -> &[HandlerParam] {
        &self.params
    }

    #[inline]
    pub(crate) fn invoke(&self, args: &Arguments) -> Result<Reply, Error> {
        (self.func)(args)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("label", &self.label)
            .field("params", &self.params)
            .finish()
    }
}

/// A method callable on a resolved service instance of type `T`.
#[derive(Clone)]
pub struct MethodHandler {
    params: Vec<HandlerParam>,
    func: MethodFn,
}

impl MethodHandler {
    /// Wrap a method of `T`. The owning instance is downcast before the call;
    /// a container entry of another type fails with `ServiceTypeMismatch`.
    pub fn new<T, R, F>(func: F) -> Self
    where
        T: Any + Send + Sync,
        R: Into<Reply>,
        F: Fn(&T, &Arguments) -> Result<R, Error> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            func: Arc::new(move |instance, args| {
                let owner = instance.downcast_ref::<T>().ok_or_else(|| {
                    Error::ServiceTypeMismatch {
                        id: args.owner().to_string(),
                        expected: std::any::type_name::<T>(),
                    }
                })?;
                func(owner, args).map(Into::into)
            }),
        }
    }

    pub fn param(mut self, param: HandlerParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(&self) -> &[HandlerParam] {
        &self.params
    }

    #[inline]
    pub(crate) fn invoke(&self, instance: &Instance, args: &Arguments) -> Result<Reply, Error> {
        (self.func)(instance, args)
    }
}

impl fmt::Debug for MethodHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandler")
            .field("params", &self.params)
            .finish()
    }
}

/// The callback a route dispatches to.
#[derive(Clone)]
pub enum CallbackRef {
    Direct(Handler),
    Method { service: String, method: String },
}

impl CallbackRef {
    pub fn method(service: impl Into<String>, method: impl Into<String>) -> Self {
        CallbackRef::Method {
            service: service.into(),
            method: method.into(),
        }
    }

    /// Parse `"Service@method"`.
    pub fn parse(reference: &str) -> Result<Self, Error> {
        match reference.split_once('@') {
            Some((service, method))
                if !service.trim().is_empty()
                    && !method.trim().is_empty()
                    && !method.contains('@') =>
            {
                Ok(Self::method(service.trim(), method.trim()))
            }
            _ => Err(Error::InvalidManifest(format!(
                "handler reference '{}' is not of the form Service@method",
                reference
            ))),
        }
    }

    /// A stable description used in logs, errors and route fingerprints.
    pub fn describe(&self) -> String {
        match self {
            CallbackRef::Direct(handler) => format!("fn:{}", handler.label()),
            CallbackRef::Method { service, method } => format!("{}@{}", service, method),
        }
    }
}

impl From<Handler> for CallbackRef {
    fn from(handler: Handler) -> Self {
        CallbackRef::Direct(handler)
    }
}

impl fmt::Debug for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter {
        greeting: &'static str,
    }

    struct Page(String);

    impl Render for Page {
        fn render(&self) -> Result<String, Error> {
            Ok(format!("<h1>{}</h1>", self.0))
        }
    }

    #[test]
    fn test_parse_callback_ref() {
        let callback = CallbackRef::parse("UsersController@show").unwrap();
        assert_eq!(callback.describe(), "UsersController@show");

        for bad in ["UsersController", "@show", "Users@", "a@b@c"] {
            assert!(CallbackRef::parse(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_direct_handler() {
        let handler = Handler::new("echo", |args| Ok(args.str("word")?.to_uppercase()))
            .param(HandlerParam::string("word"));
        let mut args = Arguments::new("echo");
        args.push("word", Argument::from("hi"));

        match handler.invoke(&args).unwrap() {
            Reply::Text(body) => assert_eq!(body, "HI"),
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(CallbackRef::from(handler).describe(), "fn:echo");
    }

    #[test]
    fn test_method_handler_downcasts_owner() {
        let method = MethodHandler::new(|greeter: &Greeter, args: &Arguments| {
            Ok(format!("{} {}", greeter.greeting, args.str("name")?))
        });
        let owner: Instance = Arc::new(Greeter { greeting: "Hello" });
        let mut args = Arguments::new("Greeter@greet");
        args.push("name", Argument::from("Ada"));

        match method.invoke(&owner, &args).unwrap() {
            Reply::Text(body) => assert_eq!(body, "Hello Ada"),
            other => panic!("unexpected reply {:?}", other),
        }

        let wrong: Instance = Arc::new(5i64);
        assert!(matches!(
            method.invoke(&wrong, &args),
            Err(Error::ServiceTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_reply_conversions() {
        assert_eq!(Reply::from("x").kind(), "text");
        assert_eq!(Reply::from(()).kind(), "empty");
        assert_eq!(Reply::from(serde_json::json!({"a": 1})).kind(), "data");
        assert_eq!(Reply::view(Page("Home".into())).kind(), "view");
    }
}
