//! Library page parser. Turns `div#kp-notebook-library` into [Book] records in document order.

use crate::model::{
    Book, BookField, Parsed, Warning, UNKNOWN_ASIN, UNKNOWN_AUTHOR, UNKNOWN_DATE, UNKNOWN_TITLE,
};
use crate::notebook::{collapse_whitespace, find_first, parse_selector};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

const DATE_INPUT_ID_PREFIX: &str = "kp-notebook-annotated-date-";

struct LibrarySelectors {
    container: Selector,
    entry: Selector,
    title: Selector,
    author: Selector,
    input: Selector,
}

impl LibrarySelectors {
    fn new() -> Result<Self, Warning> {
        Ok(Self {
            container: parse_selector("div#kp-notebook-library.a-row")?,
            entry: parse_selector("div.kp-notebook-library-each-book")?,
            title: parse_selector("h2")?,
            author: parse_selector("p")?,
            input: parse_selector("input")?,
        })
    }
}

/// Parse the library page into books. Never fails: anomalies are returned as warnings.
///
/// A page without the library container yields no books and a single
/// [Warning::LibraryContainerMissing].
pub fn parse_library(html: &str) -> Parsed<Book> {
    let selectors = match LibrarySelectors::new() {
        Ok(s) => s,
        Err(w) => return Parsed::empty_with(w),
    };
    let doc = Html::parse_document(html);
    let Some(container) = doc.select(&selectors.container).next() else {
        return Parsed::empty_with(Warning::LibraryContainerMissing);
    };

    let mut parsed = Parsed::default();
    let mut seen_asins = HashSet::new();
    let mut index = 0;
    for child in container.children() {
        match child.value() {
            Node::Element(_) => {}
            Node::Text(text) if text.trim().is_empty() => continue,
            Node::Text(_) => {
                index += 1;
                parsed.warnings.push(Warning::MalformedBookEntry {
                    index,
                    reason: "stray text instead of a book element".to_string(),
                });
                continue;
            }
            _ => continue,
        }
        let Some(entry) = ElementRef::wrap(child) else {
            continue;
        };
        index += 1;

        let Some(book) = parse_entry(entry, index, &selectors, &mut parsed.warnings) else {
            continue;
        };
        // Entries without an identifier all share the sentinel and are kept.
        if book.has_asin() && !seen_asins.insert(book.asin.clone()) {
            parsed.warnings.push(Warning::DuplicateAsin {
                index,
                asin: book.asin,
            });
            continue;
        }
        parsed.items.push(book);
    }
    parsed
}

/// One library entry. `None` when the per-book marker is missing; field gaps fall back to sentinels.
fn parse_entry(
    entry: ElementRef<'_>,
    index: usize,
    selectors: &LibrarySelectors,
    warnings: &mut Vec<Warning>,
) -> Option<Book> {
    let Some(marker) = find_first(entry, &selectors.entry) else {
        warnings.push(Warning::MalformedBookEntry {
            index,
            reason: "missing kp-notebook-library-each-book element".to_string(),
        });
        return None;
    };

    let mut or_sentinel = |value: Option<String>, field: BookField, sentinel: &str| {
        value.unwrap_or_else(|| {
            warnings.push(Warning::MissingBookField { index, field });
            sentinel.to_string()
        })
    };

    let asin = marker
        .value()
        .attr("id")
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty());
    let asin = or_sentinel(asin, BookField::Asin, UNKNOWN_ASIN);

    let title = find_first(entry, &selectors.title)
        .map(text_of)
        .filter(|s| !s.is_empty());
    let title = or_sentinel(title, BookField::Title, UNKNOWN_TITLE);

    let author = find_first(entry, &selectors.author)
        .map(|p| strip_author_prefix(&text_of(p)))
        .filter(|s| !s.is_empty());
    let author = or_sentinel(author, BookField::Author, UNKNOWN_AUTHOR);

    let date = annotated_date(entry, &asin, &selectors.input);
    let date = or_sentinel(date, BookField::Date, UNKNOWN_DATE);

    Some(Book {
        asin,
        title,
        author,
        date,
    })
}

/// The last-annotated date lives in a hidden input keyed by the ASIN.
fn annotated_date(entry: ElementRef<'_>, asin: &str, input: &Selector) -> Option<String> {
    let wanted = format!("{}{}", DATE_INPUT_ID_PREFIX, asin);
    entry
        .select(input)
        .find(|el| el.value().attr("id") == Some(wanted.as_str()))
        .and_then(|el| el.value().attr("value"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn strip_author_prefix(s: &str) -> String {
    s.strip_prefix("By: ").unwrap_or(s).trim().to_string()
}
