//! kindlenotes: export the highlights of one Kindle book from the web notebook to Markdown.

pub mod cli;
pub mod config;
pub mod model;
pub mod notebook;
pub mod render;
pub mod select;

// Re-exports for CLI and consumers.
pub use model::{Book, Highlight, Parsed, Warning};
pub use notebook::{
    parse_annotations, parse_library, Credential, FetchError, NotebookClient, NotebookSource,
};
pub use render::{render, render_json, render_with, OutputFormat, RenderOptions};
pub use select::{select, select_by_asin, Chooser, ChooserError, FzfChooser, Selection};
