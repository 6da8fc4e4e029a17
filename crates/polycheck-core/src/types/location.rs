//! Source locations and the keys used to index the type map.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A contiguous, inclusive range of lines in one source file
///
/// Metadata records describe allocation sites as line ranges; the runtime
/// side reports a single line, which is a range with `line_start ==
/// line_end`.
///
/// The file name is reference counted because every record in a large
/// metadata table shares it with every key derived from that record.
///
/// ## Specificity
///
/// Overlapping ranges are ranked by [`Location::specificity_cmp`]: a
/// narrower range is more specific, and between ranges of equal width the
/// one that starts later wins (it is the innermost declaration).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location
{
    file: Arc<str>,
    line_start: u32,
    line_end: u32,
}

impl Location
{
    /// Create a location covering `line_start..=line_end`.
    ///
    /// Returns `None` if the range is inverted.
    pub fn new(file: impl Into<Arc<str>>, line_start: u32, line_end: u32) -> Option<Self>
    {
        if line_end < line_start {
            return None;
        }
        Some(Self {
            file: file.into(),
            line_start,
            line_end,
        })
    }

    /// A location covering exactly one line.
    pub fn single(file: impl Into<Arc<str>>, line: u32) -> Self
    {
        Self {
            file: file.into(),
            line_start: line,
            line_end: line,
        }
    }

    /// Source file path.
    #[must_use]
    pub fn file(&self) -> &str
    {
        &self.file
    }

    /// First line of the range.
    #[must_use]
    pub const fn line_start(&self) -> u32
    {
        self.line_start
    }

    /// Last line of the range (inclusive).
    #[must_use]
    pub const fn line_end(&self) -> u32
    {
        self.line_end
    }

    /// Number of lines spanned minus one (`line_end - line_start`).
    #[must_use]
    pub const fn span(&self) -> u32
    {
        self.line_end - self.line_start
    }

    /// Whether `line` falls inside this range.
    #[must_use]
    pub const fn covers(&self, line: u32) -> bool
    {
        line >= self.line_start && line <= self.line_end
    }

    /// Rank two locations by specificity.
    ///
    /// `Ordering::Greater` means `self` is more specific than `other`.
    /// `Ordering::Equal` only happens for identical line ranges.
    #[must_use]
    pub fn specificity_cmp(&self, other: &Self) -> Ordering
    {
        other
            .span()
            .cmp(&self.span())
            .then_with(|| self.line_start.cmp(&other.line_start))
    }

    /// Whether `self` strictly outranks `other`.
    #[must_use]
    pub fn is_more_specific(&self, other: &Self) -> bool
    {
        self.specificity_cmp(other) == Ordering::Greater
    }

    /// Key for the first line of the range.
    #[must_use]
    pub fn key(&self) -> LocationKey
    {
        LocationKey::new(&self.file, self.line_start)
    }

    /// Keys for every line the range spans, in ascending line order.
    pub fn keys(&self) -> impl Iterator<Item = LocationKey> + '_
    {
        (self.line_start..=self.line_end).map(move |line| LocationKey::new(&self.file, line))
    }

    /// The same file with a different single line.
    #[must_use]
    pub fn with_line(&self, line: u32) -> Self
    {
        Self::single(Arc::clone(&self.file), line)
    }
}

impl fmt::Display for Location
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}-{}", self.file, self.line_start, self.line_end)
    }
}

/// Canonical identity of a single `(file, line)` pair: `file:line`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationKey(String);

impl LocationKey
{
    /// Build the key for `line` in `file`.
    #[must_use]
    pub fn new(file: &str, line: u32) -> Self
    {
        LocationKey(format!("{file}:{line}"))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str
    {
        &self.0
    }
}

impl fmt::Display for LocationKey
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.0)
    }
}
