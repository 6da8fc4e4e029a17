//! # Types
//!
//! Plain data shared by every layer of the checker: runtime addresses,
//! source locations and their index keys, and the static allocation-site
//! information the metadata table provides.

pub mod address;
pub mod location;
pub mod site;

// Re-export all public types
pub use address::Address;
pub use location::{Location, LocationKey};
pub use site::{AllocSite, AllocSiteInfo, Candidates, TypeHandle};
