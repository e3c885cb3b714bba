//! # Note Decoders
//!
//! One module per FreeBSD core note:
//!
//! - [`proc`]: `NT_PROCSTAT_PROC`, process identity and resource usage
//! - [`vmmap`]: `NT_PROCSTAT_VMMAP`, the virtual memory map
//! - [`files`]: `NT_PROCSTAT_FILES`, the open file table
//! - [`lwpinfo`]: `NT_PTLWPINFO` and `NT_THRMISC`, per-thread metadata
//! - [`status`]: `NT_PRSTATUS` and `NT_PRPSINFO`, the classic ELF core notes
//!
//! Every decoder takes the note descriptor bytes (the payload after the ELF
//! note header) and returns owned values. None of them depends on another.

use object::Endianness;

use crate::error::{KinfoError, KinfoResult};
use crate::reader::read_u32;

pub mod files;
pub mod lwpinfo;
pub mod proc;
pub mod status;
pub mod vmmap;

/// Owner name of every FreeBSD core note
pub const FREEBSD_NOTE_NAME: &str = "FreeBSD";

/// `EI_OSABI` value marking a FreeBSD ELF file
pub const ELFOSABI_FREEBSD: u8 = 9;

pub const NT_PRSTATUS: u32 = 1;
pub const NT_FPREGSET: u32 = 2;
pub const NT_PRPSINFO: u32 = 3;
pub const NT_THRMISC: u32 = 7;
pub const NT_PROCSTAT_PROC: u32 = 8;
pub const NT_PROCSTAT_FILES: u32 = 9;
pub const NT_PROCSTAT_VMMAP: u32 = 10;
pub const NT_PROCSTAT_GROUPS: u32 = 11;
pub const NT_PROCSTAT_UMASK: u32 = 12;
pub const NT_PROCSTAT_RLIMIT: u32 = 13;
pub const NT_PROCSTAT_OSREL: u32 = 14;
pub const NT_PROCSTAT_PSSTRINGS: u32 = 15;
pub const NT_PROCSTAT_AUXV: u32 = 16;
pub const NT_PTLWPINFO: u32 = 17;
pub const NT_PPC_VMX: u32 = 0x100;
pub const NT_X86_XSTATE: u32 = 0x202;
pub const NT_ARM_VFP: u32 = 0x400;

/// Size of the `int` structure-size header that prefixes procstat notes
pub const STRUCTSIZE_HEADER: usize = 4;

/// Short human-readable name of a note type, for logs and reports
pub fn note_type_name(n_type: u32) -> &'static str
{
    match n_type {
        NT_PRSTATUS => "NT_PRSTATUS",
        NT_FPREGSET => "NT_FPREGSET",
        NT_PRPSINFO => "NT_PRPSINFO",
        NT_THRMISC => "NT_THRMISC",
        NT_PROCSTAT_PROC => "NT_PROCSTAT_PROC",
        NT_PROCSTAT_FILES => "NT_PROCSTAT_FILES",
        NT_PROCSTAT_VMMAP => "NT_PROCSTAT_VMMAP",
        NT_PROCSTAT_GROUPS => "NT_PROCSTAT_GROUPS",
        NT_PROCSTAT_UMASK => "NT_PROCSTAT_UMASK",
        NT_PROCSTAT_RLIMIT => "NT_PROCSTAT_RLIMIT",
        NT_PROCSTAT_OSREL => "NT_PROCSTAT_OSREL",
        NT_PROCSTAT_PSSTRINGS => "NT_PROCSTAT_PSSTRINGS",
        NT_PROCSTAT_AUXV => "NT_PROCSTAT_AUXV",
        NT_PTLWPINFO => "NT_PTLWPINFO",
        NT_PPC_VMX => "NT_PPC_VMX",
        NT_X86_XSTATE => "NT_X86_XSTATE",
        NT_ARM_VFP => "NT_ARM_VFP",
        _ => "unknown",
    }
}

/// Reject a procstat note too short for its structure-size header
pub(crate) fn check_header(note: &[u8]) -> KinfoResult<()>
{
    if note.len() < STRUCTSIZE_HEADER {
        return Err(KinfoError::Malformed("too short for header".to_string()));
    }
    Ok(())
}

/// Iterator over a packed array of self-sized kernel records
///
/// `kinfo_vmentry` and `kinfo_file` both start with an `int` holding the
/// element's own size, and the kernel may grow them between releases. Each
/// step validates that size against the fixed-field footprint and against
/// the end of the note before handing out the element slice. After the first
/// malformed element the iterator is exhausted.
#[derive(Debug, Clone)]
pub(crate) struct SizedElements<'a>
{
    note: &'a [u8],
    cursor: usize,
    min_size: usize,
    endian: Endianness,
    what: &'static str,
    failed: bool,
}

impl<'a> SizedElements<'a>
{
    pub(crate) fn new(note: &'a [u8], min_size: usize, endian: Endianness, what: &'static str)
        -> KinfoResult<Self>
    {
        check_header(note)?;
        Ok(Self {
            note,
            cursor: STRUCTSIZE_HEADER,
            min_size,
            endian,
            what,
            failed: false,
        })
    }

    fn step(&mut self) -> KinfoResult<&'a [u8]>
    {
        let declared = read_u32(self.note, self.cursor, self.endian)? as usize;
        if declared < self.min_size {
            return Err(KinfoError::Malformed(format!("{} entry too small", self.what)));
        }
        let end = self
            .cursor
            .checked_add(declared)
            .filter(|&end| end <= self.note.len())
            .ok_or_else(|| KinfoError::Malformed(format!("{} entry runs past end of note", self.what)))?;
        let element = &self.note[self.cursor..end];
        self.cursor = end;
        Ok(element)
    }
}

impl<'a> Iterator for SizedElements<'a>
{
    type Item = KinfoResult<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.failed || self.cursor.saturating_add(self.min_size) > self.note.len() {
            return None;
        }
        let element = self.step();
        if element.is_err() {
            self.failed = true;
        }
        Some(element)
    }
}
