//! Tab-separated codec for the IMDb dataset dumps.
//!
//! Converts header-led, tab-separated text into [`reel_core`] documents.
//! Pure synchronous; no HTTP or database dependencies.
//!
//! The dumps use no quoting: every line is split on tabs verbatim, and the
//! two-character cell `\N` stands for an explicit null.
//!
//! # Quick start
//!
//! ```no_run
//! use reel_tsv::{TsvOptions, parse_str};
//!
//! let input = "tconst\tstartYear\ntt0000001\t1894\n";
//! let docs = parse_str(input, &TsvOptions::default()).unwrap();
//! println!("{} documents", docs.len());
//! ```

pub mod error;
mod parse;

pub use error::{Error, Result};
pub use parse::{Header, Reader, is_blank_line};
use reel_core::document::Document;

/// Cell content denoting an explicit null.
pub const NULL_MARKER: &str = "\\N";

/// Columns coerced to integers unless configured otherwise.
pub const DEFAULT_INTEGER_COLUMNS: [&str; 5] =
  ["startYear", "endYear", "birthYear", "deathYear", "runtimeMinutes"];

/// Decoding options shared by every row of a file.
#[derive(Debug, Clone)]
pub struct TsvOptions {
  /// Columns whose cells become JSON integers when they parse as one.
  /// Cells that do not parse are kept as text.
  pub integer_columns: Vec<String>,
}

impl Default for TsvOptions {
  fn default() -> Self {
    Self {
      integer_columns: DEFAULT_INTEGER_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
    }
  }
}

/// Parse a whole TSV text (header included) into documents.
pub fn parse_str(input: &str, options: &TsvOptions) -> Result<Vec<Document>> {
  Reader::new(input.as_bytes(), options.clone())?.collect()
}
