//! Per-request culture selection from the query string.
//!
//! `?culture=fr-FR` switches the request's [`Locale`] for the rest of the
//! pipeline and the handler. The change is scoped to that request; other
//! requests keep whatever locale the server seeded them with.
//!
//! A blank or missing parameter leaves the locale alone. A tag that does not
//! parse is a fault: the request ends with `500` and no fallback locale is
//! substituted.
//!
//! Every request that gets past this stage leaves one `debug` event naming the
//! culture it runs under and whether the query chose it.

use tracing::debug;

use super::{Flow, Stage};
use crate::error::Error;
use crate::locale::Locale;
use crate::request::Request;

pub struct QueryCulture {
    param: String,
}

impl QueryCulture {
    pub fn new() -> Self {
        Self { param: "culture".to_owned() }
    }

    /// Reads the culture from `name` instead of `culture`.
    pub fn with_param(mut self, name: impl Into<String>) -> Self {
        self.param = name.into();
        self
    }
}

impl Default for QueryCulture {
    fn default() -> Self { Self::new() }
}

impl Stage for QueryCulture {
    fn name(&self) -> &'static str { "culture" }

    fn before(&self, req: &mut Request) -> Result<Flow, Error> {
        let requested = req
            .query(&self.param)
            .filter(|tag| !tag.trim().is_empty())
            .map(Locale::parse)
            .transpose()?;

        let from_query = requested.is_some();
        if let Some(locale) = requested {
            req.set_locale(locale);
        }

        let locale = req.locale();
        let culture = if locale.is_invariant() { "invariant" } else { locale.tag() };
        debug!(culture = %culture, from_query, path = %req.path(), "request culture");
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    #[test]
    fn sets_request_locale() {
        let mut req = Request::new(Method::Get, "/todos?culture=fr-fr");
        let flow = QueryCulture::new().before(&mut req).unwrap();

        assert!(matches!(flow, Flow::Continue));
        assert_eq!(req.locale().tag(), "fr-FR");
    }

    #[test]
    fn blank_or_missing_leaves_locale_untouched() {
        let seeded = Locale::parse("de-DE").unwrap();
        for target in ["/todos", "/todos?culture=", "/todos?culture=%20%20"] {
            let mut req = Request::new(Method::Get, target).with_locale(seeded.clone());
            QueryCulture::new().before(&mut req).unwrap();
            assert_eq!(req.locale(), &seeded, "{target}");
        }
    }

    #[test]
    fn invalid_tag_is_an_error() {
        let mut req = Request::new(Method::Get, "/todos?culture=not-a-locale");
        let err = QueryCulture::new().before(&mut req).unwrap_err();

        assert!(matches!(err, Error::UnknownLocale(ref tag) if tag == "not-a-locale"));
        assert!(req.locale().is_invariant());
    }

    #[test]
    fn parameter_name_ignores_case() {
        let mut req = Request::new(Method::Get, "/todos?Culture=fr-FR");
        QueryCulture::new().before(&mut req).unwrap();
        assert_eq!(req.locale().tag(), "fr-FR");
    }

    #[test]
    fn accepts_cultures_without_formatting_rules() {
        for (target, tag) in [
            ("/todos?culture=ca-ES", "ca-ES"),
            ("/todos?culture=sr-Latn-RS", "sr-Latn-RS"),
            ("/todos?culture=en-US-POSIX", "en-US-posix"),
        ] {
            let mut req = Request::new(Method::Get, target);
            QueryCulture::new().before(&mut req).unwrap();
            assert_eq!(req.locale().tag(), tag);
        }
    }

    #[test]
    fn custom_parameter_name() {
        let mut req = Request::new(Method::Get, "/?lang=ja-JP&culture=fr-FR");
        QueryCulture::new().with_param("lang").before(&mut req).unwrap();
        assert_eq!(req.locale().tag(), "ja-JP");
    }
}
