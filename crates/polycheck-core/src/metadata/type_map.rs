//! # Type Map
//!
//! Index from [`LocationKey`] to the allocation-site candidates recorded for
//! that line.
//!
//! ## Overlapping records
//!
//! A line may be covered by several records (a macro expanding into nested
//! allocations, a multi-line expression containing another allocation).
//! For each key the map keeps only the most specific range, ranked by
//! [`Location::specificity_cmp`]. Records whose range is *identical* to the
//! winning one cannot be ranked; they are all kept, in table order, as
//! ambiguous candidates. The checker later requires containment to hold for
//! every candidate.
//!
//! ## Lifetime
//!
//! The map is built once and never mutated afterwards. [`SharedTypeMap`]
//! wraps the build in a one-time initialiser so any number of analysis
//! contexts can share it and query it concurrently.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use smallvec::smallvec;
use tracing::{debug, info};

use super::descriptors::TypeDescriptorLookup;
use super::{read_table, MetadataRecord};
use crate::error::{PolycheckError, PolycheckResult};
use crate::types::{AllocSiteInfo, Candidates, Location, LocationKey};

/// Read-only location index
#[derive(Debug, Default)]
pub struct TypeMap
{
    entries: HashMap<LocationKey, Candidates>,
    records: usize,
}

impl TypeMap
{
    /// Start building a map by hand.
    #[must_use]
    pub fn builder() -> TypeMapBuilder
    {
        TypeMapBuilder::default()
    }

    /// Build a map from parsed records, resolving every type name.
    ///
    /// ## Errors
    ///
    /// Returns [`PolycheckError::UnresolvedType`] for the first record whose
    /// type name `lookup` cannot resolve.
    pub fn from_records<I>(records: I, lookup: &dyn TypeDescriptorLookup) -> PolycheckResult<Self>
    where
        I: IntoIterator<Item = MetadataRecord>,
    {
        let mut builder = Self::builder();
        for record in records {
            let Some(type_handle) = lookup.resolve_type(&record.type_name) else {
                return Err(PolycheckError::UnresolvedType {
                    name: record.type_name,
                    line: record.line,
                });
            };
            let Some(alloc_loc) = Location::new(record.file, record.line_start, record.line_end) else {
                return Err(PolycheckError::MalformedRecord {
                    line: record.line,
                    reason: format!("inverted line range {}-{}", record.line_start, record.line_end),
                });
            };
            debug!(
                site = %alloc_loc,
                type_name = %record.type_name,
                alloc_type = %record.alloc_type,
                "Indexing allocation site"
            );
            builder.insert(AllocSiteInfo {
                type_handle,
                type_name: record.type_name,
                alloc_type: record.alloc_type,
                alloc_loc,
            });
        }
        Ok(builder.build())
    }

    /// Read the table at `path` and build the map.
    ///
    /// ## Errors
    ///
    /// Any load-time error: unreadable table, malformed record, unresolvable
    /// type name.
    pub fn load(path: &Path, lookup: &dyn TypeDescriptorLookup) -> PolycheckResult<Self>
    {
        let records = read_table(path)?;
        let map = Self::from_records(records, lookup)?;
        info!(
            path = %path.display(),
            records = map.record_count(),
            keys = map.len(),
            "Type map loaded"
        );
        Ok(map)
    }

    /// Candidates stored under `key`.
    #[must_use]
    pub fn get(&self, key: &LocationKey) -> Option<&Candidates>
    {
        self.entries.get(key)
    }

    /// Candidates for the first line of `loc`.
    #[must_use]
    pub fn resolve(&self, loc: &Location) -> Option<&Candidates>
    {
        self.get(&loc.key())
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// Whether the map has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Number of records the map was built from.
    #[must_use]
    pub fn record_count(&self) -> usize
    {
        self.records
    }

    /// Every key with its candidates, sorted by key.
    #[must_use]
    pub fn dump(&self) -> Vec<(&LocationKey, &Candidates)>
    {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Incremental [`TypeMap`] construction with specificity tie-breaking
#[derive(Debug, Default)]
pub struct TypeMapBuilder
{
    entries: HashMap<LocationKey, Candidates>,
    records: usize,
}

impl TypeMapBuilder
{
    /// Index `info` under every line its location spans.
    pub fn insert(&mut self, info: AllocSiteInfo) -> &mut Self
    {
        let info = Arc::new(info);
        for key in info.alloc_loc.keys() {
            match self.entries.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(smallvec![Arc::clone(&info)]);
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get_mut();
                    match info.alloc_loc.specificity_cmp(&current[0].alloc_loc) {
                        Ordering::Greater => *current = smallvec![Arc::clone(&info)],
                        Ordering::Equal => {
                            if !current.iter().any(|existing| **existing == *info) {
                                current.push(Arc::clone(&info));
                            }
                        }
                        Ordering::Less => {}
                    }
                }
            }
        }
        self.records += 1;
        self
    }

    /// Finish the map.
    #[must_use]
    pub fn build(self) -> TypeMap
    {
        TypeMap {
            entries: self.entries,
            records: self.records,
        }
    }
}

type Loader = Box<dyn Fn() -> PolycheckResult<TypeMap> + Send + Sync>;

/// Process-wide type map, built on first use
///
/// The build runs at most once, even under concurrent first queries. Its
/// outcome is kept either way: a failed build is returned to every later
/// caller instead of being retried against the same corrupt input.
pub struct SharedTypeMap
{
    source: String,
    loader: Loader,
    cell: OnceCell<PolycheckResult<Arc<TypeMap>>>,
}

impl SharedTypeMap
{
    /// Defer construction to `loader`. `source` is only used in diagnostics.
    pub fn lazy<F>(source: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> PolycheckResult<TypeMap> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Load the table at `path` on first use, resolving names with `lookup`.
    pub fn from_table(path: impl Into<PathBuf>, lookup: Arc<dyn TypeDescriptorLookup>) -> Self
    {
        let path = path.into();
        let source = path.display().to_string();
        Self::lazy(source, move || TypeMap::load(&path, lookup.as_ref()))
    }

    /// Wrap a map that has already been built.
    #[must_use]
    pub fn prebuilt(map: TypeMap) -> Self
    {
        let shared = Self::lazy("<prebuilt>", || Ok(TypeMap::default()));
        // A fresh cell cannot already be set.
        let _ = shared.cell.set(Ok(Arc::new(map)));
        shared
    }

    /// The map, building it if this is the first call.
    ///
    /// ## Errors
    ///
    /// Returns the (fatal) error the build produced, on this and every later
    /// call.
    pub fn get(&self) -> PolycheckResult<&Arc<TypeMap>>
    {
        self.cell
            .get_or_init(|| {
                debug!(source = %self.source, "Building type map");
                (self.loader)().map(Arc::new)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Build the map now instead of on first query.
    ///
    /// ## Errors
    ///
    /// Same as [`SharedTypeMap::get`].
    pub fn open(&self) -> PolycheckResult<()>
    {
        self.get().map(|_| ())
    }

    /// Whether the build has run (successfully or not).
    #[must_use]
    pub fn is_initialized(&self) -> bool
    {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for SharedTypeMap
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("SharedTypeMap")
            .field("source", &self.source)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
