//! Memory map entries decoded from the VM-map note.

use std::fmt;

use super::Address;

/// `kve_protection` bits (`KVME_PROT_*` in `<sys/user.h>`)
pub const KVME_PROT_READ: u32 = 0x0000_0001;
pub const KVME_PROT_WRITE: u32 = 0x0000_0002;
pub const KVME_PROT_EXEC: u32 = 0x0000_0004;

/// `kve_flags` bits (`KVME_FLAG_*` in `<sys/user.h>`)
pub const KVME_FLAG_COW: u32 = 0x0000_0001;
pub const KVME_FLAG_NEEDS_COPY: u32 = 0x0000_0002;
pub const KVME_FLAG_NOCOREDUMP: u32 = 0x0000_0004;
pub const KVME_FLAG_SUPER: u32 = 0x0000_0008;
pub const KVME_FLAG_GROWS_UP: u32 = 0x0000_0010;
pub const KVME_FLAG_GROWS_DOWN: u32 = 0x0000_0020;

/// Access permissions of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Protection
{
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Protection
{
    pub fn from_raw(bits: u32) -> Self
    {
        Self {
            read: bits & KVME_PROT_READ != 0,
            write: bits & KVME_PROT_WRITE != 0,
            execute: bits & KVME_PROT_EXEC != 0,
        }
    }

    pub fn to_raw(self) -> u32
    {
        let mut bits = 0;
        if self.read {
            bits |= KVME_PROT_READ;
        }
        if self.write {
            bits |= KVME_PROT_WRITE;
        }
        if self.execute {
            bits |= KVME_PROT_EXEC;
        }
        bits
    }
}

impl fmt::Display for Protection
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let r = if self.read { 'r' } else { '-' };
        let w = if self.write { 'w' } else { '-' };
        let x = if self.execute { 'x' } else { '-' };
        write!(f, "{r}{w}{x}")
    }
}

/// Kernel bookkeeping flags of a mapping
///
/// `grows_up` and `grows_down` are mutually exclusive in practice. Both are
/// kept as decoded; display gives `grows_up` precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct RegionFlags
{
    pub copy_on_write: bool,
    pub needs_copy: bool,
    pub superpage: bool,
    pub grows_up: bool,
    pub grows_down: bool,
    pub no_core_dump: bool,
}

impl RegionFlags
{
    pub fn from_raw(bits: u32) -> Self
    {
        Self {
            copy_on_write: bits & KVME_FLAG_COW != 0,
            needs_copy: bits & KVME_FLAG_NEEDS_COPY != 0,
            superpage: bits & KVME_FLAG_SUPER != 0,
            grows_up: bits & KVME_FLAG_GROWS_UP != 0,
            grows_down: bits & KVME_FLAG_GROWS_DOWN != 0,
            no_core_dump: bits & KVME_FLAG_NOCOREDUMP != 0,
        }
    }

    pub fn to_raw(self) -> u32
    {
        [
            (self.copy_on_write, KVME_FLAG_COW),
            (self.needs_copy, KVME_FLAG_NEEDS_COPY),
            (self.superpage, KVME_FLAG_SUPER),
            (self.grows_up, KVME_FLAG_GROWS_UP),
            (self.grows_down, KVME_FLAG_GROWS_DOWN),
            (self.no_core_dump, KVME_FLAG_NOCOREDUMP),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |bits, (_, bit)| bits | bit)
    }
}

/// Fixed column order: superpage, copy-on-write, needs-copy, growth
/// direction, no-core-dump.
impl fmt::Display for RegionFlags
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let s = if self.superpage { 'S' } else { '-' };
        let c = if self.copy_on_write { 'C' } else { '-' };
        let n = if self.needs_copy { 'N' } else { '-' };
        let grow = if self.grows_up {
            'U'
        } else if self.grows_down {
            'D'
        } else {
            '-'
        };
        let nocore = if self.no_core_dump { 'X' } else { '-' };
        write!(f, "{s}{c}{n}{grow}{nocore}")
    }
}

/// One entry of a process's virtual memory map
///
/// Produced by [`crate::notes::vmmap`] in on-disk order (ascending by
/// convention; never re-sorted).
///
/// ```rust
/// use kinfo_core::types::{Address, MemoryRegion, Protection, RegionFlags};
///
/// let region = MemoryRegion {
///     start: Address::new(0x1000),
///     end: Address::new(0x3000),
///     offset: 0,
///     protection: Protection::from_raw(0x5),
///     flags: RegionFlags::from_raw(0x8),
///     path: String::new(),
/// };
/// assert_eq!(region.size(), 0x2000);
/// assert_eq!(region.flags_string(), "r-x S----");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion
{
    /// Start address of the mapping (inclusive)
    pub start: Address,
    /// End address of the mapping (exclusive)
    pub end: Address,
    /// Offset of the mapping within its backing object
    pub offset: u64,
    pub protection: Protection,
    pub flags: RegionFlags,
    /// Backing file path; empty for anonymous memory
    pub path: String,
}

impl MemoryRegion
{
    /// Size of the mapping in bytes, or 0 if `end <= start`
    pub fn size(&self) -> u64
    {
        self.end.saturating_distance_from(self.start)
    }

    /// Check if an address lies within this mapping
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end
    }

    /// Protection triad, a space, then the region flag columns
    pub fn flags_string(&self) -> String
    {
        format!("{} {}", self.protection, self.flags)
    }
}
