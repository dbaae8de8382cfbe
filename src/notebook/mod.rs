//! Kindle notebook access: the HTTP client and the two page parsers (library, annotations).

mod client;
mod error;

pub mod annotations;
pub mod library;

pub use annotations::parse_annotations;
pub use client::{Credential, NotebookClient, NotebookClientBuilder, Session, DEFAULT_ENDPOINT};
pub use error::FetchError;
pub use library::parse_library;

use crate::model::Warning;
use scraper::{ElementRef, Selector};

/// Where the pipeline gets its two pages from. Implemented by [Session] over HTTP.
pub trait NotebookSource {
    /// The library page listing every book with annotations.
    fn library_page(&self) -> Result<String, FetchError>;

    /// The annotation page of the book identified by `asin`.
    fn annotations_page(&self, asin: &str) -> Result<String, FetchError>;
}

/// Parse a CSS selector, reporting failure as a warning instead of panicking.
fn parse_selector(css: &'static str) -> Result<Selector, Warning> {
    Selector::parse(css).map_err(|e| Warning::InvalidSelector {
        selector: css,
        reason: e.to_string(),
    })
}

/// First element matching `selector`, counting `scope` itself before its descendants.
fn find_first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    if selector.matches(&scope) {
        return Some(scope);
    }
    scope.select(selector).next()
}

/// Trim and fold every whitespace run (including newlines) into a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn collapse_whitespace_folds_runs() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn find_first_matches_scope_itself() {
        let doc = Html::parse_fragment(r#"<div class="outer"><div class="inner">x</div></div>"#);
        let outer_sel = Selector::parse("div.outer").expect("outer selector");
        let inner_sel = Selector::parse("div.inner").expect("inner selector");
        let outer = doc.select(&outer_sel).next().expect("outer element");
        let found = find_first(outer, &outer_sel).map(|e| e.value().classes().collect::<Vec<_>>());
        assert_eq!(found, Some(vec!["outer"]));
        let found = find_first(outer, &inner_sel).map(|e| e.text().collect::<String>());
        assert_eq!(found.as_deref(), Some("x"));
    }

    #[test]
    fn invalid_selector_is_a_warning() {
        assert!(matches!(
            parse_selector("div[["),
            Err(Warning::InvalidSelector { selector: "div[[", .. })
        ));
    }
}
