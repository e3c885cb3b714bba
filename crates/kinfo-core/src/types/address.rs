//! Memory address type.

use std::fmt;

/// Strongly typed virtual address from a core file
///
/// Addresses decoded from notes are always widened to 64 bits, even for
/// 32-bit targets. `{:#x}` prints them without padding, which is what the
/// reports use.
///
/// ## Example
///
/// ```rust
/// use kinfo_core::types::Address;
///
/// let addr = Address::new(0x1000);
/// assert_eq!(addr.value(), 0x1000);
/// assert_eq!(format!("{addr:#x}"), "0x1000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Distance from `other` up to this address, or 0 if `other` is higher
    pub fn saturating_distance_from(self, other: Address) -> u64
    {
        self.0.saturating_sub(other.0)
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
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
