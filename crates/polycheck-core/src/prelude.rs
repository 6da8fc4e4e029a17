//! Common module for library exports

pub use crate::checker::{Polycheck, UntrackedKind};
pub use crate::config::{CheckerConfig, ConfusionPolicy};
pub use crate::containment::{ContainmentOracle, LayoutCatalog, SubobjectMatch};
pub use crate::error::{PolycheckError, PolycheckResult};
pub use crate::host::{AddressSpace, MemoryObject};
pub use crate::metadata::{SharedTypeMap, SymbolTableLookup, TypeDescriptorLookup, TypeMap};
pub use crate::oracle::{OffsetMode, OffsetOracle};
pub use crate::registry::{AllocationInfo, AllocationRegistry};
pub use crate::report::{Registration, SkipReason, TypecheckReport, Verdict};
pub use crate::session::Session;
pub use crate::types::{Address, AllocSite, AllocSiteInfo, Candidates, Location, LocationKey, TypeHandle};
