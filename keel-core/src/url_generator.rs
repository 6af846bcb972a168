// Reverse URL generation for named routes

use crate::Error;
use crate::route_pattern::Token;
use crate::routing::RouteTable;
use std::sync::Arc;
use tracing::trace;

impl RouteTable {
    /// Build the path of a named route.
    ///
    /// Every placeholder must be supplied; values are percent-encoded.
    /// Parameters that do not name a placeholder are appended as a query
    /// string, in the order given.
    pub fn generate_url<I, K, V>(&self, name: &str, params: I) -> Result<String, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let route = self
            .route(name)
            .ok_or_else(|| Error::RouteNotFound(name.to_string()))?;

        let mut supplied: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
            .collect();

        let mut url = String::with_capacity(route.pattern().as_str().len() + 16);
        for token in route.pattern().tokens() {
            match token {
                Token::Literal(text) => url.push_str(text),
                Token::Placeholder { name: param, .. } => {
                    let index = supplied
                        .iter()
                        .position(|(k, _)| k == param)
                        .ok_or_else(|| Error::MissingRouteParameter {
                            target: name.to_string(),
                            parameter: param.clone(),
                        })?;
                    let (_, value) = supplied.remove(index);
                    url.push_str(&urlencoding::encode(&value));
                }
            }
        }

        if !supplied.is_empty() {
            let query: Vec<String> = supplied
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }

        trace!(route = name, url = %url, "Generated URL");
        Ok(url)
    }
}

/// Generates URLs for named routes, optionally absolute.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    table: Arc<RouteTable>,
    base: Option<String>,
}

impl UrlGenerator {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table, base: None }
    }

    /// Prefix generated paths with `base`, e.g. `https://example.com`.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.base = Some(base.trim_end_matches('/').to_string());
        self
    }

    pub fn route<I, K, V>(&self, name: &str, params: I) -> Result<String, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let path = self.table.generate_url(name, params)?;
        Ok(match &self.base {
            Some(base) => format!("{}{}", base, path),
            None => path,
        })
    }
}
