//! # Host Engine Interface
//!
//! The checker runs inside a symbolic execution engine that owns the actual
//! memory model. All it needs from the engine is the ability to map a
//! pointer value, possibly symbolic, to the concrete memory objects it may
//! point into.

use std::fmt;

use crate::types::Address;

/// A concrete memory object known to the host engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryObject
{
    /// Base address the object was allocated at
    pub address: Address,
    /// Size of the object in bytes
    pub size: u64,
}

impl MemoryObject
{
    /// Create a memory object descriptor.
    #[must_use]
    pub const fn new(address: Address, size: u64) -> Self
    {
        Self { address, size }
    }

    /// Whether `address` lies inside the object (`[base, base + size)`).
    #[must_use]
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.address
            && self
                .address
                .checked_add(self.size)
                .map_or(true, |end| address < end)
    }
}

impl fmt::Display for MemoryObject
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} (+{} bytes)", self.address, self.size)
    }
}

/// Pointer resolution capability of the host engine
///
/// `Pointer` is the engine's own representation of a pointer value (a
/// constant, an expression tree, ...).
pub trait AddressSpace
{
    /// Pointer value type.
    type Pointer;

    /// Every concrete memory object `pointer` may denote.
    ///
    /// A concrete pointer yields at most one object; a symbolic pointer may
    /// alias several. An empty result means the pointer is dangling or wild.
    fn resolve(&self, pointer: &Self::Pointer) -> Vec<MemoryObject>;
}
