use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;

use crate::app::AppHandle;
use crate::events::{EventBus, EventData, SubscriptionId};
use crate::http::headers::{HeaderSet, RequestLine};

/// HTTP request methods.
///
/// Routes compare methods exactly, so a handler registered for GET never
/// sees a HEAD request. Tokens outside the common set are kept verbatim in
/// [`Method::Other`]; they still pass through `use` middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other token, exactly as sent (e.g. "TRACE")
    Other(String),
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, typically uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use waypoint::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    /// Like [`Method::from_str`], but keeps unknown tokens as [`Method::Other`].
    ///
    /// ```
    /// # use waypoint::http::request::Method;
    /// assert_eq!(Method::parse("PUT"), Method::PUT);
    /// assert_eq!(Method::parse("TRACE"), Method::Other("TRACE".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| Method::Other(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(token) => token,
        }
    }

    /// Whether requests with this method normally carry an entity body.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::POST | Method::PUT | Method::PATCH)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path parameters bound while matching a route, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Binds `name`, replacing an earlier value for the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn extend(&mut self, other: Params) {
        for (name, value) in other.0 {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A request being served on one connection.
///
/// The request exists from the moment its header block has been parsed.
/// Dispatch starts right away, so the body may still be arriving while the
/// first handlers run: check [`Request::is_body_complete`] or subscribe to
/// the `"data"` and `"end"` events.
#[derive(Debug)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target as sent, including any query string
    pub path: String,
    /// Protocol token from the request line (typically "HTTP/1.1")
    pub protocol: String,
    /// Absolute URL rebuilt from the protocol, `host` header and path
    pub url: String,
    /// Request headers, including the request line
    pub headers: HeaderSet,
    /// Path parameters bound by the routes matched so far
    pub params: Params,
    body: BytesMut,
    body_complete: bool,
    events: EventBus,
    app: Arc<AppHandle>,
}

impl Request {
    pub(crate) fn from_head(method: Method, headers: HeaderSet, app: Arc<AppHandle>) -> Self {
        let RequestLine { path, protocol, .. } = headers.request_line().clone();
        let url = build_url(&protocol, headers.get("host").unwrap_or(""), &path);
        let body_complete = headers.content_length().unwrap_or(0) == 0;

        let mut events = EventBus::new();
        events.register("data");
        events.register("end");

        Self {
            method,
            path,
            protocol,
            url,
            headers,
            params: Params::new(),
            body: BytesMut::new(),
            body_complete,
            events,
            app,
        }
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// The declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.content_length()
    }

    /// The path without its query string.
    pub fn path_only(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(p, _)| p)
    }

    pub fn query_string(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, q)| q)
    }

    /// Looks up a query parameter, percent-decoded. The first occurrence wins.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.query_string()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// The entity body received so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// True once `Content-Length` bytes of body have arrived, or
    /// immediately for requests that declare no body.
    pub fn is_body_complete(&self) -> bool {
        self.body_complete
    }

    /// Appends body bytes, never beyond the declared `Content-Length`.
    pub(crate) fn append_body(&mut self, data: &[u8]) {
        let declared = self.content_length().unwrap_or(0);
        let room = declared.saturating_sub(self.body.len());
        self.body.extend_from_slice(&data[..data.len().min(room)]);
        self.body_complete = self.body.len() >= declared;
    }

    /// Subscribes to a request event (`"data"` per received chunk, `"end"`
    /// with everything received once the exchange is over).
    pub fn on<F>(&mut self, event: &str, callback: F) -> SubscriptionId
    where
        F: FnMut(&EventData) + Send + 'static,
    {
        self.events.on(event, callback)
    }

    pub fn once<F>(&mut self, event: &str, callback: F) -> SubscriptionId
    where
        F: FnMut(&EventData) + Send + 'static,
    {
        self.events.once(event, callback)
    }

    pub fn off(&mut self, event: &str, id: SubscriptionId) -> bool {
        self.events.off(event, id)
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// The application serving this request.
    pub fn app(&self) -> &AppHandle {
        &self.app
    }
}

fn build_url(protocol: &str, host: &str, path: &str) -> String {
    let scheme = if protocol.starts_with("HTTPS") {
        "https://"
    } else {
        "http://"
    };
    format!("{scheme}{host}{path}")
}

/// Builder for constructing Request objects outside a live connection.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    protocol: Option<String>,
    headers: HeaderSet,
    body: Vec<u8>,
    app: Option<Arc<AppHandle>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            protocol: None,
            headers: HeaderSet::new(),
            body: Vec::new(),
            app: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Sets the body. A matching `content-length` header is added unless one was given.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn app(mut self, app: Arc<AppHandle>) -> Self {
        self.app = Some(app);
        self
    }

    pub fn build(mut self) -> Result<Request, &'static str> {
        let method = self.method.ok_or("method missing")?;
        let line = RequestLine {
            method: method.as_str().to_string(),
            path: self.path.ok_or("path missing")?,
            protocol: self.protocol.unwrap_or_else(|| "HTTP/1.1".to_string()),
        };

        if !self.body.is_empty() && !self.headers.contains("content-length") {
            self.headers.set("content-length", self.body.len().to_string());
        }
        self.headers.set_request_line(line);

        let app = self.app.unwrap_or_default();
        let mut request = Request::from_head(method, self.headers, app);
        request.append_body(&self.body);
        Ok(request)
    }
}
