//! CLI parsing and orchestration. Prompts for the cookie, runs library -> selection -> annotations
//! -> render, writes one file. Maps errors to exit codes.

use crate::config;
use crate::model::{Book, Warning};
use crate::notebook::{
    collapse_whitespace, parse_annotations, parse_library, Credential, FetchError, NotebookClient,
    NotebookSource,
};
use crate::render::{render_json, render_with, OutputFormat, RenderOptions};
use crate::select::{
    select, select_by_asin, Chooser, ChooserError, FzfChooser, Selection, DEFAULT_CHOOSER,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const MAX_FILE_STEM_CHARS: usize = 150;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Chooser(#[from] ChooserError),

    #[error("{0}")]
    SelectionMiss(String),

    #[error("Failed to write output: {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_)
            | CliRunError::Chooser(_)
            | CliRunError::SelectionMiss(_) => 1,
            CliRunError::Fetch(_) => 2,
            CliRunError::Write { .. } => 3,
        }
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Written { path: PathBuf, highlights: usize },
    /// The library page listed no books.
    NoBooks,
    /// The user closed the chooser without picking a book.
    Cancelled,
    /// The selected book has no usable highlights; nothing was written.
    NoHighlights(Book),
}

#[derive(Parser, Debug)]
#[command(name = "kindlenotes")]
#[command(about = "Export the highlights of one Kindle book to a Markdown file")]
#[command(
    after_help = "The session cookie is read from a hidden prompt. Config file keys (endpoint, user_agent, chooser, include_notes, format) are read from ./kindlenotes.toml or the user config dir; CLI flags override config."
)]
pub struct Args {
    /// Output directory, or a filename prefix. The sanitized book title and extension are appended.
    pub output_path: PathBuf,

    /// Output format: markdown or json.
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Render each highlight's note inside its quote block.
    #[arg(long)]
    pub notes: bool,

    /// Select the book by ASIN instead of opening the chooser.
    #[arg(long)]
    pub asin: Option<String>,

    /// Chooser command line (default fzf). Receives one book per line on stdin.
    #[arg(long)]
    pub chooser: Option<String>,

    /// Notebook URL (overrides config; default https://read.amazon.com/notebook).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use markdown or json.",
            s
        )),
    }
}

/// Turn a book title into a single safe path component.
///
/// Path separators, characters reserved on common filesystems and control characters become
/// spaces; whitespace runs collapse; leading/trailing dots and spaces are dropped.
fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*')
            {
                ' '
            } else {
                c
            }
        })
        .collect();
    let collapsed = collapse_whitespace(&replaced);
    let trimmed: String = collapsed
        .trim_matches(|c: char| c == '.' || c == ' ')
        .chars()
        .take(MAX_FILE_STEM_CHARS)
        .collect();
    let trimmed = trimmed.trim_end().to_string();
    if trimmed.is_empty() {
        "book".to_string()
    } else {
        trimmed
    }
}

/// `output` names a directory when it exists as one or ends with a separator; otherwise its
/// last component is a filename prefix.
fn resolve_output_path(output: &Path, title: &str, format: OutputFormat) -> PathBuf {
    let file_name = format!("{}.{}", sanitize_title(title), format.extension());
    let raw = output.as_os_str().to_string_lossy();
    if output.is_dir() || raw.ends_with(std::path::is_separator) {
        return output.join(file_name);
    }
    let prefix = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = output.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{}{}", prefix, file_name))
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn log_warnings(page: &str, warnings: &[Warning]) {
    for w in warnings {
        tracing::warn!("{} page: {}", page, w);
    }
}

/// Spinner on stderr while a request is in flight; `None` when quiet.
fn spinner(quiet: bool, message: &str) -> Option<indicatif::ProgressBar> {
    if quiet {
        return None;
    }
    let bar = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("{spinner} {msg}") {
        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}

fn finish_spinner(bar: Option<indicatif::ProgressBar>) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

/// Settings for one export, after merging CLI flags and config.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub format: OutputFormat,
    pub render: RenderOptions,
    /// Skip the chooser and select this ASIN.
    pub asin: Option<String>,
    pub quiet: bool,
}

/// The pipeline: library page -> books -> selection -> annotation page -> highlights -> file.
///
/// Stops before the second request when the selection does not resolve to a book with an ASIN.
pub fn export(
    source: &dyn NotebookSource,
    chooser: &mut dyn Chooser,
    output: &Path,
    options: &ExportOptions,
) -> Result<RunOutcome, CliRunError> {
    let bar = spinner(options.quiet, "Fetching library");
    let library_html = source.library_page();
    finish_spinner(bar);
    let library = parse_library(&library_html?);
    log_warnings("library", &library.warnings);
    tracing::info!("Library lists {} book(s)", library.items.len());
    if library.is_empty() {
        return Ok(RunOutcome::NoBooks);
    }

    let selection = match options.asin.as_deref() {
        Some(asin) => select_by_asin(&library.items, asin),
        None => select(&library.items, chooser)?,
    };
    let book = match selection {
        Selection::Selected(book) => book,
        Selection::Cancelled => return Ok(RunOutcome::Cancelled),
        Selection::NoBooks => return Ok(RunOutcome::NoBooks),
        Selection::NoMatch(line) => {
            return Err(CliRunError::SelectionMiss(format!(
                "Selected book not found in the library: {}",
                line
            )))
        }
    };
    if !book.has_asin() {
        return Err(CliRunError::SelectionMiss(format!(
            "Selected book '{}' has no ASIN on the library page; cannot fetch its highlights.",
            book.title
        )));
    }
    tracing::info!("Selected {} ({})", book.title, book.asin);

    let output_path = resolve_output_path(output, &book.title, options.format);
    validate_output_path(&output_path)?;

    let bar = spinner(options.quiet, &format!("Fetching highlights for {}", book.title));
    let annotations_html = source.annotations_page(&book.asin);
    finish_spinner(bar);
    let annotations = parse_annotations(&annotations_html?);
    log_warnings("annotations", &annotations.warnings);
    if annotations.is_empty() {
        return Ok(RunOutcome::NoHighlights(book));
    }

    let content = match options.format {
        OutputFormat::Markdown => render_with(&annotations.items, options.render),
        OutputFormat::Json => render_json(&book, &annotations.items).map_err(|e| {
            CliRunError::InvalidInput(format!("Failed to serialize JSON: {}", e))
        })?,
    };
    std::fs::write(&output_path, content).map_err(|e| CliRunError::Write {
        path: output_path.clone(),
        source: e,
    })?;
    Ok(RunOutcome::Written {
        path: output_path,
        highlights: annotations.items.len(),
    })
}

/// Read the session cookie without echoing it.
fn prompt_credential() -> Result<Credential, CliRunError> {
    let cookie = rpassword::prompt_password("Enter the cookie: ")
        .map_err(|e| CliRunError::InvalidInput(format!("Cannot read cookie: {}", e)))?;
    let credential = Credential::new(cookie);
    if credential.is_empty() {
        return Err(CliRunError::InvalidInput("No cookie entered.".to_string()));
    }
    Ok(credential)
}

/// Entry point for the CLI. Returns the outcome on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<RunOutcome, CliRunError> {
    let config = config::load_config()
        .map_err(CliRunError::InvalidInput)?
        .unwrap_or_default();

    let format = match args.format {
        Some(f) => f,
        None => match config.format.as_deref() {
            Some(s) => parse_format(s).map_err(CliRunError::InvalidInput)?,
            None => OutputFormat::Markdown,
        },
    };
    let include_notes = args.notes || config.include_notes.unwrap_or(false);
    let chooser_cmd = args
        .chooser
        .clone()
        .or_else(|| config.chooser.clone())
        .unwrap_or_else(|| DEFAULT_CHOOSER.to_string());

    let mut builder = NotebookClient::builder();
    if let Some(endpoint) = args.endpoint.clone().or_else(|| config.endpoint.clone()) {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ua) = args.user_agent.clone().or_else(|| config.user_agent.clone()) {
        builder = builder.user_agent(ua);
    }
    let client = builder.build().map_err(|e| match e {
        FetchError::InvalidUrl { .. } => CliRunError::InvalidInput(e.to_string()),
        other => CliRunError::Fetch(other),
    })?;
    tracing::debug!("Notebook endpoint {}", client.endpoint());

    // Fail on a missing output directory before asking for secrets.
    validate_output_path(&resolve_output_path(&args.output_path, "book", format))?;

    let credential = prompt_credential()?;
    let mut chooser = FzfChooser::new(&chooser_cmd);
    let options = ExportOptions {
        format,
        render: RenderOptions { include_notes },
        asin: args.asin.clone(),
        quiet: args.quiet,
    };
    let outcome = export(
        &client.session(&credential),
        &mut chooser,
        &args.output_path,
        &options,
    )?;

    if !args.quiet {
        match &outcome {
            RunOutcome::Written { path, highlights } => {
                eprintln!("Wrote {} highlight(s) to {}", highlights, path.display())
            }
            RunOutcome::NoBooks => eprintln!("No books with highlights found in the library."),
            RunOutcome::Cancelled => eprintln!("No book selected."),
            RunOutcome::NoHighlights(book) => {
                eprintln!("'{}' has no notes or highlights; nothing written.", book.title)
            }
        }
    }
    Ok(outcome)
}
