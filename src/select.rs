//! Book selection. Formats the library for an external chooser (fzf by default) and maps the
//! chosen line back to exactly one book.

use crate::model::Book;
use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Default chooser command.
pub const DEFAULT_CHOOSER: &str = "fzf";

/// Failure of the chooser process itself (not a user decision).
#[derive(Debug, Error)]
pub enum ChooserError {
    #[error("Could not run chooser '{command}': {source}. Is it installed and on PATH?")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Chooser '{command}' failed: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("Chooser '{command}' exited with status {code}")]
    Status { command: String, code: i32 },
}

/// Interactive picker: shown a list of lines, returns at most one of them.
pub trait Chooser {
    fn choose(&mut self, lines: &[String]) -> Result<Option<String>, ChooserError>;
}

/// Chooser backed by an external command reading lines on stdin and printing the pick on stdout.
#[derive(Debug, Clone)]
pub struct FzfChooser {
    command: String,
    args: Vec<String>,
}

impl Default for FzfChooser {
    fn default() -> Self {
        Self::new(DEFAULT_CHOOSER)
    }
}

impl FzfChooser {
    /// `command` is split on whitespace: the first word is the program, the rest its arguments.
    pub fn new(command: &str) -> Self {
        let mut words = command.split_whitespace().map(String::from);
        let program = words.next().unwrap_or_else(|| DEFAULT_CHOOSER.to_string());
        Self {
            command: program,
            args: words.collect(),
        }
    }
}

impl Chooser for FzfChooser {
    fn choose(&mut self, lines: &[String]) -> Result<Option<String>, ChooserError> {
        let io_err = |source| ChooserError::Io {
            command: self.command.clone(),
            source,
        };
        // stderr stays attached to the terminal so the picker UI can draw.
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ChooserError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(lines.join("\n").as_bytes()) {
                Ok(()) => {}
                // The chooser may quit before reading every line; its exit status decides.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(io_err(e)),
            }
        }
        let output = child.wait_with_output().map_err(io_err)?;
        match output.status.code() {
            Some(0) => {}
            // fzf: 1 = no match, 130 = aborted with Esc / Ctrl-C.
            Some(1) | Some(130) | None => return Ok(None),
            Some(code) => {
                return Err(ChooserError::Status {
                    command: self.command.clone(),
                    code,
                })
            }
        }
        let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if chosen.is_empty() { None } else { Some(chosen) })
    }
}

/// Result of a selection round. Only [Selection::Selected] may lead to further requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(Book),
    /// The chooser returned nothing (user aborted).
    Cancelled,
    /// The chooser returned a line that matches no book.
    NoMatch(String),
    /// There was nothing to choose from; the chooser was not run.
    NoBooks,
}

impl Selection {
    pub fn book(&self) -> Option<&Book> {
        match self {
            Selection::Selected(book) => Some(book),
            _ => None,
        }
    }

    pub fn into_book(self) -> Option<Book> {
        match self {
            Selection::Selected(book) => Some(book),
            _ => None,
        }
    }
}

/// Display lines for `books`, in order, each keyed to exactly one book.
///
/// Lines are `"{title} - {author} ({date})"`; when two books would render the same line,
/// every copy gets ` [{asin}]` appended.
pub fn display_lines(books: &[Book]) -> Vec<String> {
    let plain: Vec<String> = books.iter().map(Book::display_line).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in &plain {
        *counts.entry(line.as_str()).or_default() += 1;
    }
    books
        .iter()
        .zip(plain.iter())
        .map(|(book, line)| {
            if counts.get(line.as_str()).copied().unwrap_or(0) > 1 {
                format!("{} [{}]", line, book.asin)
            } else {
                line.clone()
            }
        })
        .collect()
}

/// Ask `chooser` to pick one of `books` and resolve the answer by exact line match.
pub fn select(books: &[Book], chooser: &mut dyn Chooser) -> Result<Selection, ChooserError> {
    if books.is_empty() {
        return Ok(Selection::NoBooks);
    }
    let lines = display_lines(books);
    let Some(chosen) = chooser.choose(&lines)? else {
        return Ok(Selection::Cancelled);
    };
    let chosen = chosen.trim();
    if chosen.is_empty() {
        return Ok(Selection::Cancelled);
    }
    let selection = lines
        .iter()
        .position(|line| line == chosen)
        .map(|i| Selection::Selected(books[i].clone()))
        .unwrap_or_else(|| Selection::NoMatch(chosen.to_string()));
    Ok(selection)
}

/// Non-interactive selection by ASIN.
pub fn select_by_asin(books: &[Book], asin: &str) -> Selection {
    if books.is_empty() {
        return Selection::NoBooks;
    }
    let asin = asin.trim();
    books
        .iter()
        .find(|b| b.asin == asin)
        .cloned()
        .map(Selection::Selected)
        .unwrap_or_else(|| Selection::NoMatch(asin.to_string()))
}
