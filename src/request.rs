//! Incoming HTTP request type.
//!
//! A [`Request`] is created once per inbound request, moved through every
//! pipeline stage and finally consumed by the terminal handler. Stages may
//! mutate it (the culture stage replaces its [`Locale`]); nothing about it is
//! shared with other requests.

use std::collections::HashMap;

use bytes::Bytes;
use http_body_util::BodyExt;
use url::form_urlencoded;

use crate::error::Error;
use crate::locale::Locale;
use crate::method::Method;

/// An incoming HTTP request plus its request-scoped state.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Bytes,
    params: HashMap<String, String>,
    locale: Locale,
}

impl Request {
    /// Builds a request by hand, mostly useful for driving a
    /// [`Pipeline`](crate::Pipeline) in tests.
    ///
    /// `target` is an origin-form request target; anything after `?` is
    /// decoded as the query string.
    ///
    /// ```rust
    /// use relais::{Method, Request};
    ///
    /// let req = Request::new(Method::Get, "/todos?culture=fr-FR")
    ///     .with_header("Authorization", "token123");
    /// assert_eq!(req.path(), "/todos");
    /// assert_eq!(req.query("culture"), Some("fr-FR"));
    /// ```
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, decode_query(query)),
            None => (target, Vec::new()),
        };
        Self {
            method,
            path: path.to_owned(),
            query,
            headers: Vec::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            locale: Locale::invariant(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Converts a wire request into a [`Request`], buffering the body.
    pub(crate) async fn from_http<B>(
        req: http::Request<B>,
        locale: Locale,
    ) -> Result<Self, Error>
    where
        B: hyper::body::Body,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let method = Method::try_from(&parts.method)?;

        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_owned(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();

        let body = body
            .collect()
            .await
            .map_err(|e| Error::Body(e.to_string()))?
            .to_bytes();

        Ok(Self {
            method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(decode_query).unwrap_or_default(),
            headers,
            body,
            params: HashMap::new(),
            locale,
        })
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decoded query parameter, matched case-insensitively like
    /// [`header`](Request::header). Returns the first value when a key repeats.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/todos/{id}`, `req.param("id")` on `/todos/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The culture in effect for this request.
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

fn decode_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use http_body_util::Full;

    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::Get, "/").with_header("authorization", "x");
        assert_eq!(req.header("Authorization"), Some("x"));
        assert_eq!(req.header("AUTHORIZATION"), Some("x"));
        assert_eq!(req.header("cookie"), None);
    }

    #[test]
    fn query_is_percent_decoded() {
        let req = Request::new(Method::Get, "/search?q=caf%C3%A9+noir&culture=fr-FR&culture=de");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query("q"), Some("café noir"));
        assert_eq!(req.query("culture"), Some("fr-FR"));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn query_keys_ignore_case() {
        let req = Request::new(Method::Get, "/todos?Culture=fr-FR&CULTURE=de-DE");
        assert_eq!(req.query("culture"), Some("fr-FR"));
        assert_eq!(req.query("CuLtUrE"), Some("fr-FR"));
    }

    #[tokio::test]
    async fn converts_wire_requests() {
        let wire = http::Request::builder()
            .method("POST")
            .uri("/todos?culture=en-US")
            .header("Authorization", "token123")
            .body(Full::new(Bytes::from_static(b"{\"title\":\"x\"}")))
            .unwrap();

        let req = Request::from_http(wire, Locale::parse("de-DE").unwrap())
            .await
            .unwrap();

        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.path(), "/todos");
        assert_eq!(req.query("culture"), Some("en-US"));
        assert_eq!(req.header("authorization"), Some("token123"));
        assert_eq!(req.body(), b"{\"title\":\"x\"}");
        assert_eq!(req.locale().tag(), "de-DE");
    }

    #[tokio::test]
    async fn unknown_methods_are_reported() {
        let wire = http::Request::builder()
            .method("PURGE")
            .uri("/cache")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let err = Request::from_http(wire, Locale::invariant()).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedMethod(ref m) if m.0 == "PURGE"));
    }
}
