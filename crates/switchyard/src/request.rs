//! HTTP request type.

use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;

use serde_json::Value;

use crate::error::RouterError;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
}

impl Method {
    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = RouterError;

    /// Parses a method name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(RouterError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Path parameters extracted from the URL, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter, replacing an earlier value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An HTTP request.
///
/// Built by the host, then handed to [`Router::dispatch`](crate::Router::dispatch).
/// Route parameters are filled by the matching route; attributes are free for
/// middleware to carry data down the chain.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Query string parameters.
    pub query: HashMap<String, String>,
    /// Request headers, keyed by lowercase name.
    pub headers: HashMap<String, String>,
    /// Parsed body parameters.
    pub body: HashMap<String, Value>,
    /// Peer address, when the host knows it.
    pub remote_addr: Option<IpAddr>,
    params: PathParams,
    attributes: HashMap<String, Value>,
}

impl Request {
    /// Creates a new request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: normalize_path(&path.into()),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: HashMap::new(),
            remote_addr: None,
            params: PathParams::new(),
            attributes: HashMap::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Builds a request from the pieces a host server hands over.
    ///
    /// `uri` may carry a query string. The body is parsed according to the
    /// `content-type` header: JSON objects and urlencoded forms are
    /// understood, anything else leaves the body parameters empty.
    pub fn from_parts<'h>(
        method: &str,
        uri: &str,
        headers: impl IntoIterator<Item = (&'h str, &'h str)>,
        body: &[u8],
    ) -> crate::Result<Self> {
        let method: Method = method.parse()?;
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));

        let mut request = Self::new(method, path);
        request.query = Self::parse_query_string(query);
        for (name, value) in headers {
            request.headers.insert(name.to_lowercase(), value.to_string());
        }
        request.body = parse_body(request.header("content-type"), body);

        Ok(request)
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Sets a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Sets a body parameter.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Gets a header value, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Gets a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Gets a body parameter.
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Returns all body parameters.
    pub fn inputs(&self) -> &HashMap<String, Value> {
        &self.body
    }

    /// Gets a route parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// Returns all route parameters.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Installs the route parameters. Called by the matching route.
    pub fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    /// Sets an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Gets an attribute.
    pub fn get_attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the authenticated user stored by middleware, if any.
    pub fn user(&self) -> Option<&Value> {
        self.get_attr("user")
    }

    /// Parses query parameters from a query string.
    pub fn parse_query_string(query: &str) -> HashMap<String, String> {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }
}

fn parse_body(content_type: Option<&str>, body: &[u8]) -> HashMap<String, Value> {
    let Some(content_type) = content_type else {
        return HashMap::new();
    };

    // Media types compare case-insensitively; parameters after `;` are ignored.
    let essence = content_type
        .split_once(';')
        .map_or(content_type, |(essence, _)| essence)
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => {
            match serde_json::from_slice::<serde_json::Map<String, Value>>(body) {
                Ok(map) => map.into_iter().collect(),
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring malformed JSON body");
                    HashMap::new()
                }
            }
        }
        "application/x-www-form-urlencoded" => url::form_urlencoded::parse(body)
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
        _ => HashMap::new(),
    }
}

/// Ensures a leading slash.
fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
