//! Output rendering: Markdown quote callouts and a JSON export of the selected book.

use crate::model::{Book, Highlight};
use serde::Serialize;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Append the reader's note inside the callout when one exists.
    pub include_notes: bool,
}

/// Render highlights as `> [!quote]` callouts separated by a blank line. Notes are omitted.
pub fn render(highlights: &[Highlight]) -> String {
    render_with(highlights, RenderOptions::default())
}

pub fn render_with(highlights: &[Highlight], options: RenderOptions) -> String {
    highlights
        .iter()
        .map(|h| render_block(h, options))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_block(highlight: &Highlight, options: RenderOptions) -> String {
    let mut block = format!(
        "> [!quote] Position {}:\n{}",
        highlight.position,
        quote_lines(&highlight.text)
    );
    if options.include_notes {
        if let Some(note) = &highlight.note {
            block.push_str("\n>\n");
            block.push_str(&quote_lines(&format!("Note: {}", note)));
        }
    }
    block
}

/// Prefix every line with `> ` so multi-line passages stay inside one callout.
fn quote_lines(s: &str) -> String {
    s.lines()
        .map(|line| {
            if line.trim().is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct Export<'a> {
    book: &'a Book,
    highlights: &'a [Highlight],
}

/// Pretty JSON document `{ "book": ..., "highlights": [...] }`.
pub fn render_json(book: &Book, highlights: &[Highlight]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Export { book, highlights })
}
