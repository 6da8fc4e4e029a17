//! # polycheck-core
//!
//! Allocation-site type tracking and subobject type checks for symbolic
//! execution engines.
//!
//! This crate provides:
//! - Parsing of the static allocation metadata table and the location index
//!   built from it ([`metadata`])
//! - Resolution of type names to descriptors in the descriptor binary
//! - The offset oracle that compensates for off-by-one site lines ([`oracle`])
//! - A per-context registry of live allocations ([`registry`])
//! - Typecheck orchestration over possibly aliased pointers ([`checker`])
//!
//! ## Integration
//!
//! The host engine implements [`AddressSpace`] for its memory model, builds
//! one [`Session`] at startup and derives a [`Polycheck`] for every analysis
//! context. Subobject containment is answered by a [`ContainmentOracle`];
//! [`LayoutCatalog`] is a self-contained implementation over declared
//! layouts.
//!
//! ```
//! use std::sync::Arc;
//!
//! use polycheck_core::prelude::*;
//!
//! let mut layouts = LayoutCatalog::new();
//! let widget = layouts.declare_opaque("Widget");
//!
//! let file = "/src/foo.c";
//! let site = AllocSiteInfo {
//!     type_handle: widget,
//!     type_name: "Widget".to_string(),
//!     alloc_type: "heap".to_string(),
//!     alloc_loc: Location::new(file, 10, 12).unwrap(),
//! };
//! let mut builder = TypeMap::builder();
//! builder.insert(site);
//!
//! let config = CheckerConfig::new("/tmp/unused").with_source_root(None);
//! let session = Arc::new(Session::new(
//!     config,
//!     SharedTypeMap::prebuilt(builder.build()),
//!     Arc::new(layouts),
//! ));
//!
//! let mut checker = session.context();
//! let registration = checker
//!     .register_alloc(Address::new(0x1000), &AllocSite::new(file, 11))
//!     .unwrap();
//! assert!(registration.is_registered());
//! assert_eq!(checker.lookup_allocation(Address::new(0x1000)).unwrap().type_names(), "Widget");
//! ```

pub mod checker;
pub mod config;
pub mod containment;
pub mod error;
pub mod host;
pub mod metadata;
pub mod oracle;
pub mod prelude;
pub mod registry;
pub mod report;
pub mod session;
pub mod types;

pub use checker::{Polycheck, UntrackedKind};
pub use config::{CheckerConfig, ConfusionPolicy};
pub use containment::{ContainmentOracle, LayoutCatalog, SubobjectMatch};
pub use error::{PolycheckError, PolycheckResult};
pub use host::{AddressSpace, MemoryObject};
pub use oracle::{OffsetMode, OffsetOracle};
pub use registry::{AllocationInfo, AllocationRegistry};
pub use report::{CandidatePair, CheckOutcome, Registration, SkipReason, TypecheckReport, Verdict};
pub use session::Session;
pub use types::{Address, AllocSite, AllocSiteInfo, Location, LocationKey, TypeHandle};
