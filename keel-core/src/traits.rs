// Core traits and shared types for the Keel core

use crate::Error;
use std::fmt;

/// HTTP methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    /// All known methods, in bit order.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::DELETE,
        HttpMethod::PATCH,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of HTTP methods a route accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MethodSet(u8);

impl MethodSet {
    /// An empty set; routes cannot be registered with it.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every known method.
    pub fn any() -> Self {
        HttpMethod::ALL.into_iter().collect()
    }

    pub fn with(mut self, method: HttpMethod) -> Self {
        self.0 |= method.bit();
        self
    }

    pub fn contains(&self, method: HttpMethod) -> bool {
        self.0 & method.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate over the methods in the set, in `HttpMethod::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        HttpMethod::ALL.into_iter().filter(|m| self.contains(*m))
    }

    /// Parse method names; `*` and `ANY` stand for every method.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        let mut set = MethodSet::empty();
        for name in names {
            let name = name.as_ref();
            if name == "*" || name.eq_ignore_ascii_case("any") {
                set = set.union(MethodSet::any());
            } else {
                set = set.with(HttpMethod::from_str(name)?);
            }
        }
        Some(set)
    }

    pub fn union(self, other: MethodSet) -> Self {
        Self(self.0 | other.0)
    }
}

impl FromIterator<HttpMethod> for MethodSet {
    fn from_iter<I: IntoIterator<Item = HttpMethod>>(iter: I) -> Self {
        iter.into_iter().fold(MethodSet::empty(), MethodSet::with)
    }
}

impl From<HttpMethod> for MethodSet {
    fn from(method: HttpMethod) -> Self {
        MethodSet::empty().with(method)
    }
}

impl<const N: usize> From<[HttpMethod; N]> for MethodSet {
    fn from(methods: [HttpMethod; N]) -> Self {
        methods.into_iter().collect()
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|m| m.as_str()).collect();
        f.write_str(&names.join("|"))
    }
}

/// A value that can render itself into a response body.
pub trait Render: Send {
    fn render(&self) -> Result<String, Error>;
}

/// Request information provided by the surrounding HTTP layer.
pub trait RequestInfo {
    /// The raw request URI, possibly including a query string.
    fn request_uri(&self) -> &str;

    /// The request method as sent by the client.
    fn request_method(&self) -> &str;
}

/// Destination for a produced response.
pub trait ResponseSink {
    fn send(&mut self, status: u16, body: String);
}
