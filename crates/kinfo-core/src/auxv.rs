//! # Auxiliary Vector
//!
//! Decoding of `NT_PROCSTAT_AUXV` and descriptions of its entries.
//!
//! FreeBSD shares tags 0 to 14 with the System V ABI and adds its own from 15
//! upward. [`describe_auxv_entry`] only knows the FreeBSD-specific ones and
//! returns `None` for the rest so a host can fall back to its generic table;
//! [`format_auxv_entry`] does that fallback with [`GENERIC_AUXV_TAGS`].

use crate::abi::AbiParams;
use crate::error::{KinfoError, KinfoResult};
use crate::notes::{check_header, STRUCTSIZE_HEADER};
use crate::reader::read_uint;

pub const AT_NULL: u64 = 0;

pub const AT_FREEBSD_EXECPATH: u64 = 15;
pub const AT_FREEBSD_CANARY: u64 = 16;
pub const AT_FREEBSD_CANARYLEN: u64 = 17;
pub const AT_FREEBSD_OSRELDATE: u64 = 18;
pub const AT_FREEBSD_NCPUS: u64 = 19;
pub const AT_FREEBSD_PAGESIZES: u64 = 20;
pub const AT_FREEBSD_PAGESIZESLEN: u64 = 21;
pub const AT_FREEBSD_TIMEKEEP: u64 = 22;
pub const AT_FREEBSD_STACKPROT: u64 = 23;

/// How an entry's value should be printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxvFormat
{
    /// Unsigned decimal
    Dec,
    /// Hexadecimal address
    Hex,
    /// Address of a NUL-terminated string in the process image
    Str,
}

/// One row of an auxv tag table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxvTag
{
    pub tag: u64,
    pub name: &'static str,
    pub description: &'static str,
    pub format: AuxvFormat,
}

const fn tag(tag: u64, name: &'static str, description: &'static str, format: AuxvFormat) -> AuxvTag
{
    AuxvTag { tag, name, description, format }
}

/// FreeBSD-specific tags
pub static FREEBSD_AUXV_TAGS: &[AuxvTag] = &[
    tag(AT_FREEBSD_EXECPATH, "AT_EXECPATH", "Executable path", AuxvFormat::Str),
    tag(AT_FREEBSD_CANARY, "AT_CANARY", "Canary for SSP", AuxvFormat::Hex),
    tag(AT_FREEBSD_CANARYLEN, "AT_CANARYLEN", "Length of the SSP canary", AuxvFormat::Dec),
    tag(AT_FREEBSD_OSRELDATE, "AT_OSRELDATE", "OSRELDATE", AuxvFormat::Dec),
    tag(AT_FREEBSD_NCPUS, "AT_NCPUS", "Number of CPUs", AuxvFormat::Dec),
    tag(AT_FREEBSD_PAGESIZES, "AT_PAGESIZES", "Pagesizes", AuxvFormat::Hex),
    tag(AT_FREEBSD_PAGESIZESLEN, "AT_PAGESIZESLEN", "Number of pagesizes", AuxvFormat::Dec),
    tag(AT_FREEBSD_TIMEKEEP, "AT_TIMEKEEP", "Pointer to timehands", AuxvFormat::Hex),
    tag(AT_FREEBSD_STACKPROT, "AT_STACKPROT", "Initial stack protection", AuxvFormat::Hex),
];

/// System V tags FreeBSD shares with every ELF platform
pub static GENERIC_AUXV_TAGS: &[AuxvTag] = &[
    tag(0, "AT_NULL", "End of vector", AuxvFormat::Hex),
    tag(1, "AT_IGNORE", "Entry should be ignored", AuxvFormat::Hex),
    tag(2, "AT_EXECFD", "File descriptor of program", AuxvFormat::Dec),
    tag(3, "AT_PHDR", "Program headers for program", AuxvFormat::Hex),
    tag(4, "AT_PHENT", "Size of program header entry", AuxvFormat::Dec),
    tag(5, "AT_PHNUM", "Number of program headers", AuxvFormat::Dec),
    tag(6, "AT_PAGESZ", "System page size", AuxvFormat::Dec),
    tag(7, "AT_BASE", "Base address of interpreter", AuxvFormat::Hex),
    tag(8, "AT_FLAGS", "Flags", AuxvFormat::Hex),
    tag(9, "AT_ENTRY", "Entry point of program", AuxvFormat::Hex),
    tag(10, "AT_NOTELF", "Program is not ELF", AuxvFormat::Dec),
    tag(11, "AT_UID", "Real user ID", AuxvFormat::Dec),
    tag(12, "AT_EUID", "Effective user ID", AuxvFormat::Dec),
    tag(13, "AT_GID", "Real group ID", AuxvFormat::Dec),
    tag(14, "AT_EGID", "Effective group ID", AuxvFormat::Dec),
];

/// One (tag, value) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxvEntry
{
    pub tag: u64,
    pub value: u64,
}

/// Decode the (type, value) pairs of an auxv note, stopping at `AT_NULL`
///
/// Both members of `Elf_Auxinfo` are `long`-sized.
///
/// ## Errors
///
/// `Malformed` if the note lacks its header or ends inside a pair.
pub fn decode_auxv(note: &[u8], params: &AbiParams) -> KinfoResult<Vec<AuxvEntry>>
{
    check_header(note)?;
    let width = params.long_bytes();
    let body = &note[STRUCTSIZE_HEADER..];
    if body.len() % (2 * width) != 0 {
        return Err(KinfoError::Malformed(format!(
            "auxv note body of {} bytes is not a whole number of entries",
            body.len()
        )));
    }

    let mut entries = Vec::with_capacity(body.len() / (2 * width));
    for pair in body.chunks_exact(2 * width) {
        let tag = read_uint(pair, 0, width, params.endian)?;
        if tag == AT_NULL {
            break;
        }
        let value = read_uint(pair, width, width, params.endian)?;
        entries.push(AuxvEntry { tag, value });
    }
    Ok(entries)
}

/// Describe a FreeBSD-specific tag, or `None` for tags the host should render
pub fn describe_auxv_entry(tag: u64) -> Option<&'static AuxvTag>
{
    FREEBSD_AUXV_TAGS.iter().find(|row| row.tag == tag)
}

/// Render one entry as `tag  NAME  description  value`
///
/// ```rust
/// use kinfo_core::auxv::{format_auxv_entry, AuxvEntry};
///
/// let line = format_auxv_entry(&AuxvEntry { tag: 19, value: 8 }, 64);
/// assert!(line.starts_with("19   AT_NCPUS"));
/// assert!(line.ends_with(" 8"));
/// ```
pub fn format_auxv_entry(entry: &AuxvEntry, address_bits: u8) -> String
{
    let row = describe_auxv_entry(entry.tag).or_else(|| GENERIC_AUXV_TAGS.iter().find(|row| row.tag == entry.tag));
    let (name, description, format) = row.map_or(("???", "", AuxvFormat::Hex), |row| {
        (row.name, row.description, row.format)
    });
    let value = match format {
        AuxvFormat::Dec => entry.value.to_string(),
        AuxvFormat::Hex | AuxvFormat::Str => {
            let digits = if address_bits == 64 { 16 } else { 8 };
            format!("0x{:0digits$x}", entry.value)
        }
    };
    format!("{:<4} {:<20} {:<30} {value}", entry.tag, name, description)
}

#[cfg(test)]
mod tests
{
    use object::Endianness;

    use super::*;
    use crate::types::Architecture;

    fn note32(pairs: &[(u32, u32)]) -> Vec<u8>
    {
        let mut note = 8u32.to_be_bytes().to_vec();
        for (tag, value) in pairs {
            note.extend(tag.to_be_bytes());
            note.extend(value.to_be_bytes());
        }
        note
    }

    #[test]
    fn test_decode_stops_at_null()
    {
        let params = AbiParams::new(32, 32, Architecture::PowerPc, Endianness::Big);
        let note = note32(&[(6, 4096), (19, 4), (0, 0), (9, 0x1000)]);
        let entries = decode_auxv(&note, &params).unwrap();
        assert_eq!(
            entries,
            vec![AuxvEntry { tag: 6, value: 4096 }, AuxvEntry { tag: 19, value: 4 }]
        );
    }

    #[test]
    fn test_partial_pair_is_malformed()
    {
        let params = AbiParams::new(64, 64, Architecture::X86_64, Endianness::Little);
        let note = vec![0u8; 4 + 12];
        assert!(decode_auxv(&note, &params).is_err());
    }

    #[test]
    fn test_describe_only_freebsd_tags()
    {
        assert_eq!(describe_auxv_entry(AT_FREEBSD_EXECPATH).map(|row| row.format), Some(AuxvFormat::Str));
        assert!(describe_auxv_entry(6).is_none());
        assert!(describe_auxv_entry(99).is_none());
    }
}
