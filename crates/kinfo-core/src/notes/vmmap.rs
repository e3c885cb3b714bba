//! # VM Map Decoder
//!
//! Decodes `NT_PROCSTAT_VMMAP`, a packed array of `struct kinfo_vmentry`.
//!
//! The element layout is identical on every FreeBSD target (all fields used
//! here are fixed-width), so no ABI parameters beyond the byte order are
//! needed.
//!
//! ## Example
//!
//! ```rust
//! use kinfo_core::notes::vmmap::{decode_vm_map, KVE_PATH};
//! use object::Endianness;
//!
//! // Structure-size header, then one 0x90-byte element.
//! let mut note = vec![0u8; 4 + 0x90];
//! note[4..8].copy_from_slice(&0x90u32.to_le_bytes());
//! note[4 + 0x8..4 + 0x10].copy_from_slice(&0x1000u64.to_le_bytes());
//! note[4 + 0x10..4 + 0x18].copy_from_slice(&0x2000u64.to_le_bytes());
//! note[4 + 0x38..4 + 0x3c].copy_from_slice(&5u32.to_le_bytes());
//! note[4 + KVE_PATH..4 + KVE_PATH + 4].copy_from_slice(b"/bin");
//!
//! let regions = decode_vm_map(&note, Endianness::Little).unwrap();
//! assert_eq!(regions.len(), 1);
//! assert_eq!(regions[0].size(), 0x1000);
//! assert_eq!(regions[0].path, "/bin");
//! ```

use object::Endianness;
use tracing::debug;

use super::SizedElements;
use crate::error::KinfoResult;
use crate::reader::ByteReader;
use crate::types::{Address, MemoryRegion, Protection, RegionFlags};

/// Offsets within `struct kinfo_vmentry`
pub const KVE_STRUCTSIZE: usize = 0x0;
pub const KVE_START: usize = 0x8;
pub const KVE_END: usize = 0x10;
pub const KVE_OFFSET: usize = 0x18;
pub const KVE_FLAGS: usize = 0x2c;
pub const KVE_PROTECTION: usize = 0x38;
/// Start of `kve_path`, also the smallest acceptable element size
pub const KVE_PATH: usize = 0x88;

/// Lazy iterator over the entries of a VM-map note
///
/// Restartable: cloning the iterator (or building a new one over the same
/// bytes) replays the same sequence. Yields `Err(Malformed)` once and then
/// stops if an element declares a size below [`KVE_PATH`] or past the end of
/// the note.
#[derive(Debug, Clone)]
pub struct VmMapEntries<'a>
{
    elements: SizedElements<'a>,
    endian: Endianness,
}

impl<'a> VmMapEntries<'a>
{
    /// ## Errors
    ///
    /// `Malformed` if the note cannot hold its 4-byte structure-size header.
    pub fn new(note: &'a [u8], endian: Endianness) -> KinfoResult<Self>
    {
        Ok(Self {
            elements: SizedElements::new(note, KVE_PATH, endian, "vmmap")?,
            endian,
        })
    }
}

impl Iterator for VmMapEntries<'_>
{
    type Item = KinfoResult<MemoryRegion>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let element = self.elements.next()?;
        Some(element.and_then(|element| decode_entry(element, self.endian)))
    }
}

fn decode_entry(element: &[u8], endian: Endianness) -> KinfoResult<MemoryRegion>
{
    let reader = ByteReader::new(element, endian);
    let region = MemoryRegion {
        start: Address::new(reader.u64(KVE_START)?),
        end: Address::new(reader.u64(KVE_END)?),
        offset: reader.u64(KVE_OFFSET)?,
        protection: Protection::from_raw(reader.u32(KVE_PROTECTION)?),
        flags: RegionFlags::from_raw(reader.u32(KVE_FLAGS)?),
        path: reader.cstr(KVE_PATH, element.len() - KVE_PATH)?,
    };
    debug!(
        "vmmap entry {:#x}-{:#x} {} {}",
        region.start,
        region.end,
        region.flags_string(),
        region.path
    );
    Ok(region)
}

/// Decode every entry of a VM-map note, in on-disk order
///
/// ## Errors
///
/// `Malformed` for a truncated header or any bad element; entries decoded
/// before the bad one are discarded.
pub fn decode_vm_map(note: &[u8], endian: Endianness) -> KinfoResult<Vec<MemoryRegion>>
{
    VmMapEntries::new(note, endian)?.collect()
}
