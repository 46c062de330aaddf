//! Locations and query strings.
//!
//! - [`Location`]: the immutable `(path, query)` pair the coordinator
//!   displays. A new value is built for every navigation.
//! - [`QueryParams`]: the `?key=value&...` part of a URL, percent-decoded to
//!   plain strings. Key order is not significant: two query strings with the
//!   same pairs in a different order are equal.
//! - [`UrlParts`]: a URL resolved against [`APP_ORIGIN`] and split into path,
//!   query and fragment, used to tell path changes apart from
//!   query/fragment-only changes.
//!
//! # Example
//!
//! ```
//! use async_navigator::Location;
//!
//! let location = Location::parse("/?tab=wip&q=async%20react");
//! assert_eq!(location.path(), "/");
//! assert_eq!(location.query().get("q"), Some("async react"));
//!
//! let next = location.with_param("tab", "");
//! assert_eq!(next.to_url(), "/?q=async+react");
//! ```

use crate::warn_log;
use std::collections::BTreeMap;
use std::fmt;
use url::{form_urlencoded, Url};

// ============================================================================
// QueryParams
// ============================================================================

/// Single-valued query parameters.
///
/// Parsing follows `URLSearchParams`: `+` decodes to a space, percent escapes
/// are decoded, and a repeated key keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams {
    params: BTreeMap<String, String>,
}

impl QueryParams {
    /// Create empty query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string. A leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params = form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { params }
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Remove a parameter, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.params.remove(key)
    }

    /// Return a copy with `key` set to `value`, or removed when `value` is empty.
    pub fn with(&self, key: &str, value: &str) -> Self {
        let mut next = self.clone();
        if value.is_empty() {
            next.remove(key);
        } else {
            next.insert(key, value);
        }
        next
    }

    /// Iterate over all `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Serialize to `key=value&...` without a leading `?`.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ============================================================================
// UrlParts
// ============================================================================

/// Origin that relative URLs are resolved against.
pub const APP_ORIGIN: &str = "https://app.local";

/// Resolve `url` against the absolute URL `base`.
///
/// Returns `None` when either does not parse.
pub fn join_url(base: &str, url: &str) -> Option<Url> {
    Url::parse(base).and_then(|base| base.join(url)).ok()
}

/// A URL split into path, query and fragment, without the leading `?` / `#`.
///
/// The URL is resolved against [`APP_ORIGIN`] first, so
/// `https://example.com/a?b=1` and `/a?b=1` split identically and an empty
/// path becomes `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl UrlParts {
    /// Split `url` into its parts. Returns `None` for a URL that does not parse.
    pub fn split(url: &str) -> Option<Self> {
        join_url(APP_ORIGIN, url).map(|url| Self::from_url(&url))
    }

    fn from_url(url: &Url) -> Self {
        Self {
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
            fragment: url.fragment().unwrap_or_default().to_string(),
        }
    }

    /// `true` when both URLs share a path but differ in query or fragment.
    pub fn only_query_or_fragment_differs(&self, other: &UrlParts) -> bool {
        self.path == other.path && (self.query != other.query || self.fragment != other.fragment)
    }
}

// ============================================================================
// Location
// ============================================================================

/// The displayed `(path, query)` pair.
///
/// Never mutated in place: [`with_param`](Self::with_param) and
/// [`resolve`](Self::resolve) build new values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    path: String,
    query: QueryParams,
}

impl Location {
    /// Create a location from a path and query parameters.
    pub fn new(path: impl Into<String>, query: QueryParams) -> Self {
        let path = path.into();
        Self {
            path: if path.is_empty() { "/".to_string() } else { path },
            query,
        }
    }

    /// Parse a URL. The fragment is discarded; an empty path becomes `/`.
    ///
    /// A URL that does not parse yields `/`.
    pub fn parse(url: &str) -> Self {
        match UrlParts::split(url) {
            Some(parts) => Self::from_parts(&parts),
            None => {
                warn_log!("Cannot parse URL '{}', using '/'", url);
                Self::default()
            }
        }
    }

    /// Resolve `url` against `base` as a URL reference.
    ///
    /// `?tab=done` keeps the base path; `#top` or an empty URL keeps the base
    /// path and query. A URL that does not parse yields `base` unchanged.
    pub fn resolve(base: &Location, url: &str) -> Self {
        match join_url(APP_ORIGIN, &base.to_url()).and_then(|base| base.join(url).ok()) {
            Some(resolved) => Self::from_parts(&UrlParts::from_url(&resolved)),
            None => {
                warn_log!("Cannot resolve '{}' against '{}'", url, base);
                base.clone()
            }
        }
    }

    fn from_parts(parts: &UrlParts) -> Self {
        Self::new(parts.path.as_str(), QueryParams::parse(&parts.query))
    }

    /// The path component.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query parameters.
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Same path with one query parameter set; an empty `value` removes it.
    pub fn with_param(&self, key: &str, value: &str) -> Self {
        Self {
            path: self.path.clone(),
            query: self.query.with(key, value),
        }
    }

    /// Serialize to `path` or `path?query`.
    pub fn to_url(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query.to_query_string())
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new("/", QueryParams::new())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}
