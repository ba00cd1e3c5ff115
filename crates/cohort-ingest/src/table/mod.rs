//! Source table reading.

mod header;
mod reader;

pub use header::{normalize_header, normalize_headers};
pub use reader::{read_csv_table, validate_encoding};
