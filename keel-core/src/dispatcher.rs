// Handler dispatch for matched routes
//
// Binding order for each declared parameter:
//   1. a same-named route capture, coerced to the declared scalar type
//   2. a service resolvable from the container
//   3. the declared default
// A parameter that none of these provide fails with MissingRouteParameter.

use crate::container::Container;
use crate::handler::{CallbackRef, HandlerParam, MethodHandler, ParamType, Reply};
use crate::route_params::RouteParams;
use crate::routing::MatchedRoute;
use crate::{Argument, Arguments, Error};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Invokes the callback of a matched route.
#[derive(Debug, Default, Clone)]
pub struct Dispatcher {
    methods: HashMap<(String, String), MethodHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the implementation of `service@method`.
    pub fn register_method(
        &mut self,
        service: impl Into<String>,
        method: impl Into<String>,
        handler: MethodHandler,
    ) {
        let service = service.into();
        let method = method.into();
        debug!(service = %service, method = %method, params = handler.params().len(), "Controller method registered");
        self.methods.insert((service, method), handler);
    }

    pub fn with_method(
        mut self,
        service: impl Into<String>,
        method: impl Into<String>,
        handler: MethodHandler,
    ) -> Self {
        self.register_method(service, method, handler);
        self
    }

    pub fn has_method(&self, service: &str, method: &str) -> bool {
        self.methods
            .contains_key(&(service.to_string(), method.to_string()))
    }

    /// Dispatch `matched` and return the response body.
    pub fn call(&self, matched: &MatchedRoute, container: &Container) -> Result<String, Error> {
        let route = matched.route();
        let callback = route.callback();
        let target = callback.describe();
        debug!(route = %route.label(), callback = %target, "Dispatching route");

        let reply = match callback {
            CallbackRef::Direct(handler) => {
                let args = bind(&target, handler.params(), matched.params(), container)?;
                handler.invoke(&args)?
            }
            CallbackRef::Method { service, method } => {
                let handler = self
                    .methods
                    .get(&(service.clone(), method.clone()))
                    .ok_or_else(|| Error::HandlerNotFound {
                        service: service.clone(),
                        method: method.clone(),
                    })?;
                let owner = container.resolve(service)?;
                let args = bind(&target, handler.params(), matched.params(), container)?;
                handler.invoke(&owner, &args)?
            }
        };

        into_body(&target, reply)
    }
}

fn bind(
    target: &str,
    params: &[HandlerParam],
    captures: &RouteParams,
    container: &Container,
) -> Result<Arguments, Error> {
    let mut args = Arguments::new(target);

    for param in params {
        let capture = if param.ty().is_scalar() {
            captures.get(param.name())
        } else {
            None
        };

        let value = match (capture, param.ty()) {
            (Some(raw), ty) => coerce(param.name(), raw, ty)?,
            (None, ParamType::Service(id)) if container.has(id) => {
                Argument::Service(container.resolve(id)?)
            }
            _ => match param.default_value() {
                Some(default) => default.clone(),
                None => {
                    return Err(Error::MissingRouteParameter {
                        target: target.to_string(),
                        parameter: param.name().to_string(),
                    });
                }
            },
        };

        trace!(callback = target, parameter = param.name(), kind = value.type_name(), "Parameter bound");
        args.push(param.name(), value);
    }

    Ok(args)
}

/// Convert a captured string to the declared scalar type.
///
/// The capture is percent-decoded first. Text that does not decode to UTF-8
/// is a coercion error whatever the declared type.
pub fn coerce(name: &str, raw: &str, ty: &ParamType) -> Result<Argument, Error> {
    let fail = |expected: &'static str| Error::ParameterCoercionError {
        parameter: name.to_string(),
        value: raw.to_string(),
        expected,
    };
    let value = urlencoding::decode(raw).map_err(|_| fail("UTF-8 text"))?;

    match ty {
        ParamType::Int => value.parse::<i64>().map(Argument::Int).map_err(|_| fail("integer")),
        ParamType::Float => match value.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Argument::Float(v)),
            _ => Err(fail("float")),
        },
        ParamType::Bool => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Argument::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Argument::Bool(false)),
            _ => Err(fail("boolean")),
        },
        ParamType::Str => Ok(Argument::Str(value.into_owned())),
        ParamType::Service(_) => Err(fail("service")),
    }
}

fn into_body(target: &str, reply: Reply) -> Result<String, Error> {
    match reply {
        Reply::Text(body) => Ok(body),
        Reply::View(view) => view.render(),
        other => Err(Error::InvalidControllerResponse(format!(
            "{} returned {}, expected text or a renderable view",
            target,
            other.kind()
        ))),
    }
}
