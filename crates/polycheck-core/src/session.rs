//! # Session
//!
//! Process-wide, read-only state shared by every analysis context: the
//! configuration, the lazily built type map and the containment oracle.
//!
//! The host creates one session at startup and derives a fresh
//! [`Polycheck`] for each independent analysis run with
//! [`Session::context`]. Nothing in a session is mutated after the type map
//! has been built, so it can be shared across threads freely.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::checker::Polycheck;
use crate::config::CheckerConfig;
use crate::containment::ContainmentOracle;
use crate::error::PolycheckResult;
use crate::metadata::{SharedTypeMap, SymbolTableLookup};

/// Shared checker state
pub struct Session
{
    config: CheckerConfig,
    type_map: SharedTypeMap,
    containment: Arc<dyn ContainmentOracle>,
}

impl Session
{
    /// Assemble a session from its parts.
    #[must_use]
    pub fn new(config: CheckerConfig, type_map: SharedTypeMap, containment: Arc<dyn ContainmentOracle>) -> Self
    {
        Self {
            config,
            type_map,
            containment,
        }
    }

    /// Open the descriptor binary named by `config` and arrange for the
    /// allocation table to be loaded on first use.
    ///
    /// ## Errors
    ///
    /// Returns [`PolycheckError::DescriptorLoad`](crate::error::PolycheckError::DescriptorLoad)
    /// if the descriptor binary cannot be parsed.
    pub fn open(config: CheckerConfig, containment: Arc<dyn ContainmentOracle>) -> PolycheckResult<Self>
    {
        let lookup = SymbolTableLookup::open(&config.descriptors_path())?;
        info!(
            descriptors = %lookup.path().display(),
            symbols = lookup.len(),
            "Opened type descriptor binary"
        );
        let type_map = SharedTypeMap::from_table(config.allocs_path(), Arc::new(lookup));
        Ok(Self::new(config, type_map, containment))
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &CheckerConfig
    {
        &self.config
    }

    /// The shared type map.
    #[must_use]
    pub fn type_map(&self) -> &SharedTypeMap
    {
        &self.type_map
    }

    /// The containment oracle.
    #[must_use]
    pub fn containment(&self) -> &dyn ContainmentOracle
    {
        self.containment.as_ref()
    }

    /// A fresh analysis context with an empty registry and a new oracle.
    #[must_use]
    pub fn context(self: &Arc<Self>) -> Polycheck
    {
        Polycheck::new(Arc::clone(self))
    }
}

impl fmt::Debug for Session
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("type_map", &self.type_map)
            .finish_non_exhaustive()
    }
}
