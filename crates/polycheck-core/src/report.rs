//! Results of registrations and typechecks.

use std::fmt;
use std::sync::Arc;

use crate::containment::SubobjectMatch;
use crate::host::MemoryObject;
use crate::registry::AllocationInfo;
use crate::types::{AllocSiteInfo, LocationKey};

/// Outcome of [`Polycheck::register_alloc`](crate::Polycheck::register_alloc)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration
{
    /// The site resolved and the allocation is now in the registry.
    Registered
    {
        /// The stored entry
        info: Arc<AllocationInfo>,
        /// Whether the offset oracle's retry was needed
        corrected: bool,
    },
    /// No metadata covers the site; the allocation was not registered.
    Unresolved
    {
        /// Key of the first lookup attempt
        key: LocationKey,
    },
}

impl Registration
{
    /// The stored entry, if the allocation was registered.
    #[must_use]
    pub fn info(&self) -> Option<&Arc<AllocationInfo>>
    {
        match self {
            Self::Registered { info, .. } => Some(info),
            Self::Unresolved { .. } => None,
        }
    }

    /// Whether the allocation was registered.
    #[must_use]
    pub fn is_registered(&self) -> bool
    {
        matches!(self, Self::Registered { .. })
    }
}

/// Why a combination could not be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason
{
    /// The target object was never registered (unknown origin).
    UnknownTarget,
    /// The examined object was never registered (unknown origin).
    UnknownExamined,
}

impl fmt::Display for SkipReason
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SkipReason::UnknownTarget => write!(f, "target of unknown origin"),
            SkipReason::UnknownExamined => write!(f, "examined object of unknown origin"),
        }
    }
}

/// Verdict for one target/examined object combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict
{
    /// Every target candidate occurs inside every examined candidate.
    Contained,
    /// At least one candidate pair failed: a type confusion.
    Confusion,
    /// Not evaluated.
    Skipped(SkipReason),
}

/// Containment result for one pair of candidate types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePair
{
    /// Candidate of the target allocation
    pub target: Arc<AllocSiteInfo>,
    /// Candidate of the examined allocation
    pub examined: Arc<AllocSiteInfo>,
    /// Where the target was found, or `None` if it is not contained
    pub found: Option<SubobjectMatch>,
}

impl CandidatePair
{
    /// Whether containment holds for this pair.
    #[must_use]
    pub fn holds(&self) -> bool
    {
        self.found.is_some()
    }
}

/// Outcome for one memory object the examined pointer resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome
{
    /// The examined memory object
    pub object: MemoryObject,
    /// Verdict for this object
    pub verdict: Verdict,
    /// Every evaluated candidate pair (empty when skipped)
    pub pairs: Vec<CandidatePair>,
}

impl CheckOutcome
{
    /// Candidate pairs for which containment does not hold.
    pub fn failures(&self) -> impl Iterator<Item = &CandidatePair>
    {
        self.pairs.iter().filter(|pair| !pair.holds())
    }
}

/// Everything one typecheck found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypecheckReport
{
    /// The object the target pointer resolved to
    pub target: MemoryObject,
    /// Registry entry for the target (`None`: unknown origin)
    pub target_info: Option<Arc<AllocationInfo>>,
    /// One outcome per examined object
    pub outcomes: Vec<CheckOutcome>,
}

impl TypecheckReport
{
    /// Whether any combination is a type confusion.
    #[must_use]
    pub fn has_confusion(&self) -> bool
    {
        self.outcomes.iter().any(|outcome| outcome.verdict == Verdict::Confusion)
    }

    /// Outcomes that were type confusions.
    pub fn confusions(&self) -> impl Iterator<Item = &CheckOutcome>
    {
        self.outcomes.iter().filter(|outcome| outcome.verdict == Verdict::Confusion)
    }

    /// Number of outcomes with the given verdict.
    #[must_use]
    pub fn count(&self, verdict: Verdict) -> usize
    {
        self.outcomes.iter().filter(|outcome| outcome.verdict == verdict).count()
    }
}
