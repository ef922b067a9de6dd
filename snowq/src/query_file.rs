//! SQL file loading

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Read a SQL file and join its lines with no separator.
///
/// This is a character-level transformation: a line break that separated
/// two tokens disappears with nothing in its place.
pub fn load_query(path: &Path) -> Result<String> {
    if path.as_os_str().is_empty() {
        return Err(Error::EmptyFilename);
    }

    let text = fs::read_to_string(path).map_err(|source| Error::ReadQuery {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(collapse_lines(&text))
}

/// Remove every line break (`\n`, `\r\n` and bare `\r`)
pub fn collapse_lines(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}
