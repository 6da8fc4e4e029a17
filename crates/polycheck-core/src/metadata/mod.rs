//! # Allocation Metadata
//!
//! Parsing of the static allocation-site table and construction of the
//! location index built from it.
//!
//! The table is produced by the build toolchain alongside the type
//! descriptor binary. Each line is one tab-separated record:
//!
//! ```text
//! <ignored>\t<ignored>\t<ignored>\t<file>\t<line_start>\t<line_end>\t<alloc_type>\t<type_name>[\t...]
//! ```
//!
//! Blank lines are skipped. Any other deviation is a fatal
//! [`PolycheckError::MalformedRecord`]: the table is trusted build output and
//! a broken record means the whole index would be untrustworthy.

pub mod descriptors;
pub mod type_map;

use std::fs;
use std::path::Path;

use crate::error::{PolycheckError, PolycheckResult};

pub use descriptors::{SymbolTableLookup, TypeDescriptorLookup};
pub use type_map::{SharedTypeMap, TypeMap, TypeMapBuilder};

/// Number of leading columns the checker does not use.
const IGNORED_COLUMNS: usize = 3;
/// Minimum number of columns in a record.
const RECORD_COLUMNS: usize = IGNORED_COLUMNS + 5;

/// One parsed row of the allocation table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord
{
    /// 1-based line number in the table (for diagnostics)
    pub line: usize,
    /// Source file of the allocation site
    pub file: String,
    /// First source line of the site
    pub line_start: u32,
    /// Last source line of the site (inclusive)
    pub line_end: u32,
    /// Allocation kind (`heap`, `stack`, `static`, ...)
    pub alloc_type: String,
    /// Name of the allocated type's descriptor
    pub type_name: String,
}

/// Parse a single table line.
///
/// ## Errors
///
/// Returns [`PolycheckError::MalformedRecord`] if a column is missing, the
/// file or type name is empty, a line bound is not an unsigned integer, or
/// the range is inverted.
pub fn parse_record(text: &str, line: usize) -> PolycheckResult<MetadataRecord>
{
    let malformed = |reason: String| PolycheckError::MalformedRecord { line, reason };

    let columns: Vec<&str> = text.trim_end_matches(['\r', '\n']).split('\t').collect();
    if columns.len() < RECORD_COLUMNS {
        return Err(malformed(format!(
            "expected at least {RECORD_COLUMNS} tab-separated fields, found {}",
            columns.len()
        )));
    }

    let fields = &columns[IGNORED_COLUMNS..];
    // Text columns are taken byte for byte; only the line bounds are trimmed.
    let file = fields[0];
    if file.is_empty() {
        return Err(malformed("empty file field".to_string()));
    }

    let parse_line = |name: &str, value: &str| {
        value
            .trim()
            .parse::<u32>()
            .map_err(|err| malformed(format!("invalid {name} '{value}': {err}")))
    };
    let line_start = parse_line("line_start", fields[1])?;
    let line_end = parse_line("line_end", fields[2])?;
    if line_end < line_start {
        return Err(malformed(format!("inverted line range {line_start}-{line_end}")));
    }

    let type_name = fields[4];
    if type_name.is_empty() {
        return Err(malformed("empty type name".to_string()));
    }

    Ok(MetadataRecord {
        line,
        file: file.to_string(),
        line_start,
        line_end,
        alloc_type: fields[3].to_string(),
        type_name: type_name.to_string(),
    })
}

/// Parse a whole table, skipping blank lines.
///
/// ## Errors
///
/// Stops at the first malformed record.
pub fn parse_table(text: &str) -> PolycheckResult<Vec<MetadataRecord>>
{
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_record(line, idx + 1))
        .collect()
}

/// Read and parse the table at `path`.
///
/// ## Errors
///
/// Returns [`PolycheckError::MetadataOpen`] if the file cannot be read, or
/// the first parse error.
pub fn read_table(path: &Path) -> PolycheckResult<Vec<MetadataRecord>>
{
    let text = fs::read_to_string(path).map_err(|err| PolycheckError::MetadataOpen {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    parse_table(&text)
}
