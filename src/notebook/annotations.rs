//! Annotation page parser. Each `div.kp-notebook-row-separator` holds one highlight and its optional note.

use crate::model::{Highlight, Parsed, Warning};
use crate::notebook::{find_first, parse_selector};
use scraper::{ElementRef, Html, Selector};

struct AnnotationSelectors {
    row: Selector,
    text: Selector,
    position: Selector,
    note: Selector,
}

impl AnnotationSelectors {
    fn new() -> Result<Self, Warning> {
        Ok(Self {
            row: parse_selector("div.kp-notebook-row-separator")?,
            text: parse_selector("div.kp-notebook-highlight")?,
            position: parse_selector("input#kp-annotation-location")?,
            note: parse_selector("span#note")?,
        })
    }
}

/// Parse one book's annotation page into highlights in reading order. Never fails.
///
/// Rows without highlighted text or a location are dropped with a warning. A page with
/// no rows, or no usable rows, is a valid empty result and carries an explanatory warning.
pub fn parse_annotations(html: &str) -> Parsed<Highlight> {
    let selectors = match AnnotationSelectors::new() {
        Ok(s) => s,
        Err(w) => return Parsed::empty_with(w),
    };
    let doc = Html::parse_document(html);
    let rows: Vec<ElementRef<'_>> = doc.select(&selectors.row).collect();
    if rows.is_empty() {
        return Parsed::empty_with(Warning::NoAnnotationRows);
    }

    let mut parsed = Parsed::default();
    for (i, row) in rows.into_iter().enumerate() {
        match parse_row(row, &selectors) {
            Ok(highlight) => parsed.items.push(highlight),
            Err(missing) => parsed.warnings.push(Warning::HighlightDropped {
                index: i + 1,
                missing,
            }),
        }
    }
    if parsed.items.is_empty() {
        parsed.warnings.push(Warning::NoHighlights);
    }
    parsed
}

/// Extract one row. `Err` names the required field(s) that were absent.
fn parse_row(
    row: ElementRef<'_>,
    selectors: &AnnotationSelectors,
) -> Result<Highlight, &'static str> {
    let text = find_first(row, &selectors.text)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());
    let position = row
        .select(&selectors.position)
        .next()
        .and_then(|el| el.value().attr("value"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    // Kindle renders an empty span#note for every highlight without one.
    let note = row
        .select(&selectors.note)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    match (text, position) {
        (Some(text), Some(position)) => Ok(Highlight {
            text,
            position,
            note,
        }),
        (None, Some(_)) => Err("highlighted text"),
        (Some(_), None) => Err("position"),
        (None, None) => Err("highlighted text and position"),
    }
}
