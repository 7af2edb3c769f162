/// Method, target and protocol taken from the first line of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    /// Method token exactly as sent (e.g. "GET")
    pub method: String,
    /// Request target, including any query string
    pub path: String,
    /// Protocol token (e.g. "HTTP/1.1")
    pub protocol: String,
}

/// An ordered collection of HTTP headers.
///
/// Header names are stored lower-cased, so every lookup is case-insensitive.
/// The raw text the set was parsed from is kept alongside for diagnostics.
/// When the set belongs to a request it also carries the request line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    raw: String,
    entries: Vec<(String, String)>,
    request_line: RequestLine,
}

impl HeaderSet {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty header set that remembers the text it came from.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }

    /// The unparsed text this set was built from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    pub fn set_request_line(&mut self, line: RequestLine) {
        self.request_line = line;
    }

    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Adds or replaces a header. The name is lower-cased; an existing
    /// header keeps its position in the set.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().trim().to_ascii_lowercase();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Removes a header, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses the `content-length` header. Missing or non-numeric values
    /// yield `None`.
    pub fn content_length(&self) -> Option<usize> {
        self.get("content-length")
            .and_then(|v| v.trim().parse().ok())
    }
}
