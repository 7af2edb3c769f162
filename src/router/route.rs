use std::fmt;
use std::sync::Arc;

use crate::http::request::{Method, Params};
use crate::router::handler::Middleware;

/// Which requests a route applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Generic middleware: any method, prefix match on the path
    Use,
    /// Routed handler: exact method, templated path
    Method(Method),
}

/// One entry of the dispatch list.
#[derive(Clone)]
pub struct Route {
    pattern: String,
    kind: RouteKind,
    handler: Arc<dyn Middleware>,
    is_wildcard: bool,
    needs_body: bool,
}

impl Route {
    pub fn new(kind: RouteKind, pattern: impl Into<String>, handler: Arc<dyn Middleware>) -> Self {
        let pattern = pattern.into();
        let is_wildcard = pattern.split('/').any(|s| s.starts_with('*'));
        let needs_body = matches!(&kind, RouteKind::Method(m) if m.carries_body());

        Self {
            pattern,
            kind,
            handler,
            is_wildcard,
            needs_body,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> &RouteKind {
        &self.kind
    }

    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }

    /// Whether dispatch waits for the complete request body before running
    /// this route.
    pub fn needs_body(&self) -> bool {
        self.needs_body
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Middleware> {
        &self.handler
    }

    /// Tests the route against a request. `path` must not include the query
    /// string. Returns the bound parameters on a match.
    pub fn matches(&self, method: &Method, path: &str) -> Option<Params> {
        match &self.kind {
            RouteKind::Use => {
                (self.pattern.is_empty() || path.starts_with(self.pattern.as_str()))
                    .then(Params::new)
            }
            RouteKind::Method(expected) if expected == method => {
                match_pattern(&self.pattern, path)
            }
            RouteKind::Method(_) => None,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("kind", &self.kind)
            .field("is_wildcard", &self.is_wildcard)
            .field("needs_body", &self.needs_body)
            .finish_non_exhaustive()
    }
}

/// Matches a templated pattern against a request path.
///
/// Both sides lose one leading `/` and are split on `/`. Segment counts
/// must agree; `:name` binds the request segment under `name` and `*`
/// accepts any single segment.
///
/// # Example
///
/// ```
/// # use waypoint::router::match_pattern;
/// let params = match_pattern("/home/:epic", "/home/friday").unwrap();
/// assert_eq!(params.get("epic"), Some("friday"));
/// assert!(match_pattern("/home/:epic", "/away/friday").is_none());
/// ```
pub fn match_pattern(pattern: &str, path: &str) -> Option<Params> {
    let pattern = strip_root(pattern);
    let path = strip_root(path);

    let wanted = segments(pattern);
    let given = segments(path);

    if pattern == path || (wanted.is_empty() && given.is_empty()) {
        return Some(Params::new());
    }

    if wanted.len() != given.len() {
        return None;
    }

    let mut params = Params::new();

    for (want, got) in wanted.iter().zip(&given) {
        if want == got || want.starts_with('*') {
            continue;
        }
        match want.strip_prefix(':') {
            Some(name) => params.insert(name, *got),
            None => return None,
        }
    }

    Some(params)
}

fn strip_root(path: &str) -> &str {
    let path = path.trim();
    path.strip_prefix('/').unwrap_or(path)
}

fn segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_drop_trailing_slash_only() {
        assert!(segments("").is_empty());
        assert_eq!(segments("home/"), vec!["home"]);
        assert_eq!(segments("a//b"), vec!["a", "", "b"]);
    }

    #[test]
    fn strip_root_removes_one_slash() {
        assert_eq!(strip_root("/home"), "home");
        assert_eq!(strip_root("//home"), "/home");
        assert_eq!(strip_root(" /x "), "x");
    }
}
