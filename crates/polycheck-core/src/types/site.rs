//! Allocation-site metadata types.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::location::Location;

/// Opaque handle to a compiled type descriptor
///
/// The value is whatever the descriptor lookup hands out (a symbol address
/// for object-file descriptors, a table index for
/// [`LayoutCatalog`](crate::containment::LayoutCatalog)). The checker never
/// interprets it; it only passes handles back to the containment oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeHandle(u64);

impl TypeHandle
{
    /// Wrap a raw descriptor value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self
    {
        Self(value)
    }

    /// Raw descriptor value.
    #[must_use]
    pub const fn raw(self) -> u64
    {
        self.0
    }
}

impl fmt::Display for TypeHandle
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "type#{:x}", self.0)
    }
}

/// Static type information recorded for one allocation site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocSiteInfo
{
    /// Resolved type descriptor
    pub type_handle: TypeHandle,
    /// Type name as written in the metadata
    pub type_name: String,
    /// Allocation kind reported by the toolchain (e.g. `heap`, `stack`, `static`)
    pub alloc_type: String,
    /// Source range of the allocation site
    pub alloc_loc: Location,
}

impl fmt::Display for AllocSiteInfo
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} ({}) at {}", self.type_name, self.alloc_type, self.alloc_loc)
    }
}

/// Candidate site infos for one location
///
/// Never empty when produced by the type map. Most locations have exactly
/// one candidate, so the first one is stored inline.
pub type Candidates = SmallVec<[Arc<AllocSiteInfo>; 1]>;

/// Allocation site as reported by the instrumentation at runtime
///
/// `file` is usually relative to the directory the program was compiled
/// in; the checker qualifies it with the configured source root before
/// building a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllocSite
{
    /// Source file of the allocating instruction
    pub file: String,
    /// Line of the allocating instruction
    pub line: u32,
}

impl AllocSite
{
    /// Create a site from a file and line.
    pub fn new(file: impl Into<String>, line: u32) -> Self
    {
        Self { file: file.into(), line }
    }
}

impl fmt::Display for AllocSite
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}", self.file, self.line)
    }
}
