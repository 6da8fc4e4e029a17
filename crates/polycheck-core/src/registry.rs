//! # Allocation Registry
//!
//! Per-context map from the base address of a live memory object to the
//! static type candidates resolved for its allocation site.
//!
//! Entries are shared (`Arc`) so that cloning the registry when a context
//! forks only copies the index, not the candidate lists. Each fork then
//! evolves independently: addresses and object lifetimes diverge per
//! branch, so nothing is shared mutably between contexts.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Address, AllocSiteInfo, Candidates};

/// Resolved type information for one registered allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationInfo
{
    address: Address,
    candidates: Candidates,
}

impl AllocationInfo
{
    /// Pair `address` with its candidates.
    ///
    /// Returns `None` if `candidates` is empty: an allocation is either
    /// resolved to at least one site or not registered at all.
    #[must_use]
    pub fn new(address: Address, candidates: Candidates) -> Option<Self>
    {
        if candidates.is_empty() {
            return None;
        }
        Some(Self { address, candidates })
    }

    /// Base address of the allocation.
    #[must_use]
    pub const fn address(&self) -> Address
    {
        self.address
    }

    /// Candidate site infos, in metadata order.
    #[must_use]
    pub fn candidates(&self) -> &[Arc<AllocSiteInfo>]
    {
        &self.candidates
    }

    /// The first candidate.
    #[must_use]
    pub fn primary(&self) -> &AllocSiteInfo
    {
        &self.candidates[0]
    }

    /// Whether the static information is ambiguous.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool
    {
        self.candidates.len() > 1
    }

    /// Candidate type names joined with `|`.
    #[must_use]
    pub fn type_names(&self) -> String
    {
        self.candidates
            .iter()
            .map(|info| info.type_name.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Address-indexed allocation registry
#[derive(Debug, Clone, Default)]
pub struct AllocationRegistry
{
    entries: HashMap<Address, Arc<AllocationInfo>>,
}

impl AllocationRegistry
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record `info`, replacing whatever was registered at the same address.
    ///
    /// Returns the replaced entry. Address reuse after a free is normal, and
    /// the new object's type has nothing to do with the old one's, so the
    /// two are never merged.
    pub fn insert(&mut self, info: Arc<AllocationInfo>) -> Option<Arc<AllocationInfo>>
    {
        self.entries.insert(info.address, info)
    }

    /// Entry registered at `address`, if any.
    ///
    /// `None` means "unknown origin" (typically a stack object, which the
    /// allocation metadata does not cover), not an error.
    #[must_use]
    pub fn lookup(&self, address: Address) -> Option<&Arc<AllocationInfo>>
    {
        self.entries.get(&address)
    }

    /// Number of registered allocations.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Iterate over all entries (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AllocationInfo>>
    {
        self.entries.values()
    }
}
