//! Canonical records produced by the notebook parsers.
//!
//! The selector and renderers consume these as the single source of truth.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNKNOWN_ASIN: &str = "Unknown ASIN";
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// One entry of the notebook library. Identity is the ASIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub asin: String,
    pub title: String,
    pub author: String,
    /// Last-annotated date as shown by the site. Free-form, never parsed.
    pub date: String,
}

impl Book {
    /// Display line handed to the chooser: `"{title} - {author} ({date})"`.
    pub fn display_line(&self) -> String {
        format!("{} - {} ({})", self.title, self.author, self.date)
    }

    /// False when the library entry carried no identifier and the sentinel was used.
    pub fn has_asin(&self) -> bool {
        self.asin != UNKNOWN_ASIN
    }
}

/// One highlighted passage, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub text: String,
    /// Location marker as shown by the site (e.g. "1234").
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Book metadata field that can fall back to a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookField {
    Asin,
    Title,
    Author,
    Date,
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookField::Asin => "ASIN",
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Date => "date",
        };
        f.write_str(name)
    }
}

/// Non-fatal structural anomaly found while parsing a page.
///
/// Entry indices are 1-based positions in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    InvalidSelector { selector: &'static str, reason: String },
    LibraryContainerMissing,
    MalformedBookEntry { index: usize, reason: String },
    MissingBookField { index: usize, field: BookField },
    DuplicateAsin { index: usize, asin: String },
    NoAnnotationRows,
    HighlightDropped { index: usize, missing: &'static str },
    NoHighlights,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::InvalidSelector { selector, reason } => {
                write!(f, "invalid selector {:?}: {}", selector, reason)
            }
            Warning::LibraryContainerMissing => {
                write!(f, "library container not found; no books listed")
            }
            Warning::MalformedBookEntry { index, reason } => {
                write!(f, "skipping library entry {}: {}", index, reason)
            }
            Warning::MissingBookField { index, field } => {
                write!(f, "library entry {} has no {}; using placeholder", index, field)
            }
            Warning::DuplicateAsin { index, asin } => {
                write!(f, "skipping library entry {}: duplicate ASIN {}", index, asin)
            }
            Warning::NoAnnotationRows => write!(f, "no highlights found for this book"),
            Warning::HighlightDropped { index, missing } => {
                write!(f, "skipping highlight row {}: missing {}", index, missing)
            }
            Warning::NoHighlights => write!(f, "this book has no notes or highlights"),
        }
    }
}

/// Parser output: items in document order plus the anomalies met along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub warnings: Vec<Warning>,
}

impl<T> Parsed<T> {
    pub fn empty_with(warning: Warning) -> Self {
        Self {
            items: Vec::new(),
            warnings: vec![warning],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn sample_book() -> Book {
        Book {
            asin: "B00TEST123".to_string(),
            title: "Thinking in Systems".to_string(),
            author: "Donella H. Meadows".to_string(),
            date: "Sunday March 3, 2024".to_string(),
        }
    }

    #[test]
    fn display_line_format() {
        assert_eq!(
            sample_book().display_line(),
            "Thinking in Systems - Donella H. Meadows (Sunday March 3, 2024)"
        );
    }

    #[test]
    fn has_asin_false_for_sentinel() {
        let mut book = sample_book();
        assert!(book.has_asin());
        book.asin = UNKNOWN_ASIN.to_string();
        assert!(!book.has_asin());
    }

    #[test]
    fn highlight_without_note_omits_note_key() -> Result<(), Box<dyn Error>> {
        let h = Highlight {
            text: "Alpha".to_string(),
            position: "12".to_string(),
            note: None,
        };
        let value: serde_json::Value = serde_json::to_value(&h)?;
        let obj = value.as_object().ok_or("highlight must serialize to an object")?;
        assert_eq!(obj.get("text").and_then(|t| t.as_str()), Some("Alpha"));
        assert_eq!(obj.get("position").and_then(|p| p.as_str()), Some("12"));
        assert!(!obj.contains_key("note"));
        Ok(())
    }

    #[test]
    fn warning_messages_name_the_entry() {
        let w = Warning::MissingBookField {
            index: 2,
            field: BookField::Author,
        };
        assert_eq!(
            w.to_string(),
            "library entry 2 has no author; using placeholder"
        );
        let w = Warning::HighlightDropped {
            index: 3,
            missing: "position",
        };
        assert_eq!(w.to_string(), "skipping highlight row 3: missing position");
    }
}
