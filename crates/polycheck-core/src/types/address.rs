//! Runtime address type.

use std::fmt;

/// Strongly typed address of a memory object in the analysed program
///
/// The allocation registry is keyed by this value: it is the base address
/// the host engine assigned to a memory object when the object was
/// allocated. Wrapping the raw `u64` keeps addresses from being mixed up
/// with sizes, line numbers or type handles.
///
/// ## Example
///
/// ```rust
/// use polycheck_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// assert_eq!(addr.value(), 0x1000);
/// assert_eq!(addr.checked_add(0x10), Some(Address::new(0x1010)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value (usable in const contexts).
    #[must_use]
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Raw `u64` value of this address.
    #[must_use]
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add a byte offset, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}
