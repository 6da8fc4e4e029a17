//! # Checker
//!
//! Per-context allocation tracking and type checks.
//!
//! A [`Polycheck`] belongs to exactly one analysis context (one execution
//! state of the host engine). It owns that context's allocation registry
//! and offset oracle and borrows everything else from the shared
//! [`Session`]. When the host forks a context it forks the checker with
//! [`Polycheck::fork`].
//!
//! ## Lifecycle
//!
//! 1. The host reports each allocation with [`Polycheck::register_alloc`].
//! 2. At each instrumented cast it calls [`Polycheck::handle_typecheck`]
//!    with the pointer whose static type is being asserted (the target) and
//!    the pointer being cast (the examined operand).
//!
//! ## Ambiguity policy
//!
//! An allocation may carry several candidate types. A combination passes
//! only if containment holds for *every* pair of target and examined
//! candidates. Each memory object the examined pointer may alias is judged
//! and reported on its own.

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::config::ConfusionPolicy;
use crate::error::{PolycheckError, PolycheckResult};
use crate::host::{AddressSpace, MemoryObject};
use crate::metadata::TypeMap;
use crate::oracle::OffsetOracle;
use crate::registry::{AllocationInfo, AllocationRegistry};
use crate::report::{CandidatePair, CheckOutcome, Registration, SkipReason, TypecheckReport, Verdict};
use crate::session::Session;
use crate::types::{Address, AllocSite, Candidates, Location};

/// Objects the host may announce that never carry allocation metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntrackedKind
{
    /// Object provided by the environment (external symbol)
    External,
    /// Global variable
    Global,
    /// Variadic argument area
    Vararg,
    /// Program argument vector
    Argv,
    /// Program argument count
    Argc,
}

/// Allocation checker for one analysis context
#[derive(Debug, Clone)]
pub struct Polycheck
{
    session: Arc<Session>,
    oracle: OffsetOracle,
    registry: AllocationRegistry,
}

impl Polycheck
{
    /// Fresh context state for `session`.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self
    {
        let oracle = OffsetOracle::with_threshold(session.config().offset_threshold);
        Self {
            session,
            oracle,
            registry: AllocationRegistry::new(),
        }
    }

    /// Independent copy for a forked context.
    ///
    /// The type map stays shared; the registry and the oracle are copied so
    /// the two contexts evolve separately from here on.
    #[must_use]
    pub fn fork(&self) -> Self
    {
        self.clone()
    }

    /// Shared session.
    #[must_use]
    pub fn session(&self) -> &Arc<Session>
    {
        &self.session
    }

    /// This context's offset oracle.
    #[must_use]
    pub fn oracle(&self) -> &OffsetOracle
    {
        &self.oracle
    }

    /// This context's allocation registry.
    #[must_use]
    pub fn registry(&self) -> &AllocationRegistry
    {
        &self.registry
    }

    /// The type map, loading it on first use.
    ///
    /// ## Errors
    ///
    /// The fatal load error, if building the map failed.
    pub fn type_map(&self) -> PolycheckResult<&Arc<TypeMap>>
    {
        self.session.type_map().get()
    }

    /// Candidates recorded for the first line of `loc`.
    ///
    /// Does not retry with a corrected line; that is up to the caller.
    ///
    /// ## Errors
    ///
    /// The fatal load error, if building the map failed.
    pub fn resolve(&self, loc: &Location) -> PolycheckResult<Option<Candidates>>
    {
        let map = self.type_map()?;
        let key = loc.key();
        let found = map.get(&key).cloned();
        trace!(%key, hit = found.is_some(), "Type map lookup");
        Ok(found)
    }

    /// Resolve the site of a new allocation and record it at `address`.
    ///
    /// The reported line is first corrected by the offset oracle's current
    /// mode. On a miss the oracle may flip its mode, in which case the
    /// lookup is retried once with the new correction. A hit keeps the new
    /// mode; a second miss restores the old one. An allocation that still
    /// cannot be resolved is left unregistered and leaves the oracle's mode
    /// unchanged; checks against it report an unknown origin.
    ///
    /// Registering an address that is already registered replaces the old
    /// entry.
    ///
    /// ## Errors
    ///
    /// Only the fatal type map load error. An unresolved site is reported as
    /// [`Registration::Unresolved`].
    pub fn register_alloc(&mut self, address: Address, site: &AllocSite) -> PolycheckResult<Registration>
    {
        let loc = Location::single(self.session.config().qualify(&site.file), self.oracle.add_offset(site.line));
        debug!(%address, site = %loc, mode = %self.oracle.mode(), "Registering allocation");

        if let Some(candidates) = self.resolve(&loc)? {
            self.oracle.report_result(true);
            return Ok(self.record(address, candidates, false, &loc));
        }

        debug!(key = %loc.key(), "Could not find allocation info");
        let previous = self.oracle.mode();
        if self.oracle.maybe_retry_offset() {
            let retry = loc.with_line(self.oracle.add_offset(site.line));
            if let Some(candidates) = self.resolve(&retry)? {
                self.oracle.report_result(true);
                debug!(key = %retry.key(), mode = %self.oracle.mode(), "Offset correction resolved allocation");
                return Ok(self.record(address, candidates, true, &retry));
            }
            // Missed under both corrections: the mode stays as it was.
            self.oracle.abandon_retry(previous);
        }

        warn!(
            %address,
            key = %loc.key(),
            "No allocation metadata for site, allocation left unregistered (possibly a stack object)"
        );
        Ok(Registration::Unresolved { key: loc.key() })
    }

    fn record(&mut self, address: Address, candidates: Candidates, corrected: bool, loc: &Location) -> Registration
    {
        // Type map entries are never empty.
        let Some(info) = AllocationInfo::new(address, candidates) else {
            return Registration::Unresolved { key: loc.key() };
        };
        debug!(%address, types = %info.type_names(), site = %info.primary().alloc_loc, "Allocation registered");
        let info = Arc::new(info);
        if let Some(previous) = self.registry.insert(Arc::clone(&info)) {
            debug!(%address, previous = %previous.type_names(), "Replaced stale registration");
        }
        Registration::Registered { info, corrected }
    }

    /// Note an object that is deliberately not tracked.
    ///
    /// Externals, globals, varargs and the program arguments have no entry
    /// in the allocation metadata. They stay out of the registry, so checks
    /// against them are reported as unknown origin.
    pub fn register_untracked(&self, object: &MemoryObject, kind: UntrackedKind)
    {
        trace!(address = %object.address, size = object.size, ?kind, "Ignoring untracked object");
    }

    /// Registry entry for the object at `address`.
    ///
    /// `None` means unknown origin, not an error.
    #[must_use]
    pub fn lookup_allocation(&self, address: Address) -> Option<&Arc<AllocationInfo>>
    {
        self.registry.lookup(address)
    }

    /// Check that the type allocated for `target` is a valid subobject of
    /// every object `examined` may point to.
    ///
    /// `target` must resolve to exactly one memory object. `examined` may
    /// alias several; each is judged separately and gets its own outcome in
    /// the report. Objects of unknown origin on either side are skipped with
    /// a warning.
    ///
    /// ## Errors
    ///
    /// - [`PolycheckError::UnresolvedPointer`] / [`PolycheckError::AmbiguousPointer`]
    ///   if `target` does not denote exactly one object.
    /// - [`PolycheckError::TypeConfusion`] if a confusion was found and the
    ///   policy is [`ConfusionPolicy::Abort`]. The confusion has been logged
    ///   by then, and the error carries the full report.
    pub fn handle_typecheck<S>(&self, space: &S, target: &S::Pointer, examined: &S::Pointer) -> PolycheckResult<TypecheckReport>
    where
        S: AddressSpace,
    {
        let target_object = match space.resolve(target).as_slice() {
            [object] => *object,
            [] => {
                warn!("Typecheck target pointer does not resolve to a memory object");
                return Err(PolycheckError::UnresolvedPointer);
            }
            objects => {
                warn!(count = objects.len(), "Typecheck target pointer is not concrete");
                return Err(PolycheckError::AmbiguousPointer { count: objects.len() });
            }
        };

        let examined_objects = space.resolve(examined);
        if examined_objects.is_empty() {
            warn!(target = %target_object.address, "Examined pointer does not resolve to any memory object");
        }

        let Some(target_info) = self.lookup_allocation(target_object.address).cloned() else {
            warn!(
                address = %target_object.address,
                "Looking up the target type failed, it may have been a stack allocation"
            );
            let outcomes = examined_objects
                .into_iter()
                .map(|object| CheckOutcome {
                    object,
                    verdict: Verdict::Skipped(SkipReason::UnknownTarget),
                    pairs: Vec::new(),
                })
                .collect();
            return Ok(TypecheckReport {
                target: target_object,
                target_info: None,
                outcomes,
            });
        };
        debug!(
            address = %target_object.address,
            types = %target_info.type_names(),
            site = %target_info.primary().alloc_loc,
            "Found target type"
        );

        let outcomes: Vec<CheckOutcome> = examined_objects
            .into_iter()
            .map(|object| self.check_object(&target_info, object))
            .collect();

        let report = TypecheckReport {
            target: target_object,
            target_info: Some(target_info),
            outcomes,
        };

        if self.session.config().confusion_policy == ConfusionPolicy::Abort {
            let first = report
                .confusions()
                .flat_map(CheckOutcome::failures)
                .next()
                .map(|pair| (pair.target.type_name.clone(), pair.examined.type_name.clone()));
            if let Some((target, examined)) = first {
                return Err(PolycheckError::TypeConfusion {
                    target,
                    examined,
                    report: Box::new(report),
                });
            }
        }
        Ok(report)
    }

    fn check_object(&self, target: &AllocationInfo, object: MemoryObject) -> CheckOutcome
    {
        let Some(examined) = self.lookup_allocation(object.address) else {
            warn!(
                address = %object.address,
                "Looking up the examined object failed, it may have been a stack allocation"
            );
            return CheckOutcome {
                object,
                verdict: Verdict::Skipped(SkipReason::UnknownExamined),
                pairs: Vec::new(),
            };
        };

        let containment = self.session.containment();
        let mut pairs = Vec::with_capacity(target.candidates().len() * examined.candidates().len());
        for target_site in target.candidates() {
            for examined_site in examined.candidates() {
                pairs.push(CandidatePair {
                    target: Arc::clone(target_site),
                    examined: Arc::clone(examined_site),
                    found: containment.find_subobject(target_site.type_handle, examined_site.type_handle),
                });
            }
        }

        let verdict = if pairs.iter().all(CandidatePair::holds) {
            Verdict::Contained
        } else {
            Verdict::Confusion
        };

        for pair in &pairs {
            match &pair.found {
                Some(found) => info!(
                    "Typecheck succeeded: {} ({}) is contained in {} ({}) allocated at {}, at {}",
                    pair.target.type_name,
                    pair.target.alloc_type,
                    pair.examined.type_name,
                    pair.examined.alloc_type,
                    pair.examined.alloc_loc,
                    found
                ),
                None => error!(
                    address = %object.address,
                    "Type error: {} ({}) is not contained in {} ({}) allocated at {}",
                    pair.target.type_name,
                    pair.target.alloc_type,
                    pair.examined.type_name,
                    pair.examined.alloc_type,
                    pair.examined.alloc_loc
                ),
            }
        }

        CheckOutcome { object, verdict, pairs }
    }
}
