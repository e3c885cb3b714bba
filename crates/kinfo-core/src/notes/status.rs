//! # prstatus / prpsinfo
//!
//! The two classic ELF core notes, as FreeBSD lays them out in
//! `<sys/procfs.h>`. Both are written by the core-note encoder and read back
//! by the core file adapter.
//!
//! ```text
//! struct prstatus {                  struct prpsinfo {
//!     int      pr_version;               int    pr_version;
//!     size_t   pr_statussz;              size_t pr_psinfosz;
//!     size_t   pr_gregsetsz;             char   pr_fname[17];
//!     size_t   pr_fpregsetsz;            char   pr_psargs[81];
//!     int      pr_osreldate;             pid_t  pr_pid;
//!     int      pr_cursig;            };
//!     pid_t    pr_pid;
//!     gregset_t pr_reg;
//! };
//! ```
//!
//! `size_t` is address-width, so every offset after the version differs
//! between 32-bit and 64-bit targets.

use object::endian::Endian;

use crate::abi::AbiParams;
use crate::error::{KinfoError, KinfoResult};
use crate::reader::ByteReader;
use crate::types::LwpId;

/// `pr_version` of the records written here
pub const PRSTATUS_VERSION: u32 = 1;
pub const PRPSINFO_VERSION: u32 = 1;

/// Capacity of `pr_fname` without its NUL (`PRFNAMESZ`)
pub const PRFNAMESZ: usize = 16;
/// Capacity of `pr_psargs` without its NUL (`PRARGSZ`)
pub const PRARGSZ: usize = 80;

/// Field offsets of `prstatus` and `prpsinfo` for one address width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLayout
{
    pub size_t: usize,
    pub pr_statussz: usize,
    pub pr_gregsetsz: usize,
    pub pr_fpregsetsz: usize,
    pub pr_osreldate: usize,
    pub pr_cursig: usize,
    pub pr_pid: usize,
    pub pr_reg: usize,
    pub pr_psinfosz: usize,
    pub pr_fname: usize,
    pub pr_psargs: usize,
    pub psinfo_pid: usize,
    pub psinfo_size: usize,
}

const STATUS_LAYOUT_64: StatusLayout = StatusLayout {
    size_t: 8,
    pr_statussz: 8,
    pr_gregsetsz: 16,
    pr_fpregsetsz: 24,
    pr_osreldate: 32,
    pr_cursig: 36,
    pr_pid: 40,
    pr_reg: 48,
    pr_psinfosz: 8,
    pr_fname: 16,
    pr_psargs: 33,
    psinfo_pid: 116,
    psinfo_size: 120,
};

const STATUS_LAYOUT_32: StatusLayout = StatusLayout {
    size_t: 4,
    pr_statussz: 4,
    pr_gregsetsz: 8,
    pr_fpregsetsz: 12,
    pr_osreldate: 16,
    pr_cursig: 20,
    pr_pid: 24,
    pr_reg: 28,
    pr_psinfosz: 4,
    pr_fname: 8,
    pr_psargs: 25,
    psinfo_pid: 108,
    psinfo_size: 112,
};

impl StatusLayout
{
    pub fn for_params(params: &AbiParams) -> &'static StatusLayout
    {
        if params.address_bits == 64 {
            &STATUS_LAYOUT_64
        } else {
            &STATUS_LAYOUT_32
        }
    }
}

/// A decoded `NT_PRSTATUS` note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrStatus
{
    pub version: u32,
    /// FreeBSD signal number that stopped the thread
    pub cursig: i32,
    /// LWP id of the thread (FreeBSD stores it in `pr_pid`)
    pub lwp: LwpId,
    pub osreldate: i32,
    /// Raw general-purpose register set
    pub registers: Vec<u8>,
}

/// A decoded `NT_PRPSINFO` note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrPsInfo
{
    /// Base name of the executable
    pub fname: String,
    /// Command line, truncated to [`PRARGSZ`] bytes
    pub psargs: String,
    /// Process id, when the note is long enough to carry it
    pub pid: Option<u32>,
}

/// Decode a `NT_PRSTATUS` note
///
/// ## Errors
///
/// `Malformed` if the note is shorter than its fixed header.
pub fn decode_prstatus(note: &[u8], params: &AbiParams) -> KinfoResult<PrStatus>
{
    let layout = StatusLayout::for_params(params);
    if note.len() < layout.pr_reg {
        return Err(KinfoError::Malformed("prstatus note too short".to_string()));
    }
    let reader = ByteReader::new(note, params.endian);
    let gregsetsz = reader.uint(layout.pr_gregsetsz, layout.size_t)? as usize;
    let available = note.len() - layout.pr_reg;
    let registers = reader.bytes(layout.pr_reg, gregsetsz.min(available))?.to_vec();
    Ok(PrStatus {
        version: reader.u32(0)?,
        cursig: reader.i32(layout.pr_cursig)?,
        lwp: LwpId(u64::from(reader.u32(layout.pr_pid)?)),
        osreldate: reader.i32(layout.pr_osreldate)?,
        registers,
    })
}

/// Decode a `NT_PRPSINFO` note
///
/// ## Errors
///
/// `Malformed` if the note cannot hold both strings.
pub fn decode_prpsinfo(note: &[u8], params: &AbiParams) -> KinfoResult<PrPsInfo>
{
    let layout = StatusLayout::for_params(params);
    if note.len() < layout.pr_psargs + PRARGSZ + 1 {
        return Err(KinfoError::Malformed("prpsinfo note too short".to_string()));
    }
    let reader = ByteReader::new(note, params.endian);
    Ok(PrPsInfo {
        fname: reader.cstr(layout.pr_fname, PRFNAMESZ + 1)?,
        psargs: reader.cstr(layout.pr_psargs, PRARGSZ + 1)?,
        pid: reader.u32(layout.psinfo_pid).ok(),
    })
}

/// Serialize a `prstatus` record around a general register set
///
/// `fpregsetsz` is the size of the thread's floating-point set (0 if none).
pub fn encode_prstatus(params: &AbiParams, lwp: LwpId, cursig: i32, gregs: &[u8], fpregsetsz: usize) -> Vec<u8>
{
    let layout = StatusLayout::for_params(params);
    let size = align_up(layout.pr_reg + gregs.len(), layout.size_t);
    let mut out = vec![0u8; size];
    let mut writer = FieldWriter { out: &mut out, params };
    writer.u32(0, PRSTATUS_VERSION);
    writer.size_t(layout.pr_statussz, size as u64);
    writer.size_t(layout.pr_gregsetsz, gregs.len() as u64);
    writer.size_t(layout.pr_fpregsetsz, fpregsetsz as u64);
    writer.u32(layout.pr_osreldate, 0);
    writer.i32(layout.pr_cursig, cursig);
    writer.u32(layout.pr_pid, lwp.raw() as u32);
    out[layout.pr_reg..layout.pr_reg + gregs.len()].copy_from_slice(gregs);
    out
}

/// Serialize a `prpsinfo` record
///
/// Both strings are truncated to fit their fixed arrays and always keep a
/// terminating NUL.
pub fn encode_prpsinfo(params: &AbiParams, fname: &str, psargs: &str, pid: u32) -> Vec<u8>
{
    let layout = StatusLayout::for_params(params);
    let mut out = vec![0u8; layout.psinfo_size];
    let mut writer = FieldWriter { out: &mut out, params };
    writer.u32(0, PRPSINFO_VERSION);
    writer.size_t(layout.pr_psinfosz, layout.psinfo_size as u64);
    writer.u32(layout.psinfo_pid, pid);
    let fname = truncate(fname, PRFNAMESZ);
    out[layout.pr_fname..layout.pr_fname + fname.len()].copy_from_slice(fname);
    let psargs = truncate(psargs, PRARGSZ);
    out[layout.pr_psargs..layout.pr_psargs + psargs.len()].copy_from_slice(psargs);
    out
}

fn truncate(s: &str, max: usize) -> &[u8]
{
    let bytes = s.as_bytes();
    &bytes[..bytes.len().min(max)]
}

fn align_up(value: usize, align: usize) -> usize
{
    value.div_ceil(align) * align
}

/// Writes fixed-width fields into a pre-sized record
struct FieldWriter<'a>
{
    out: &'a mut [u8],
    params: &'a AbiParams,
}

impl FieldWriter<'_>
{
    fn u32(&mut self, offset: usize, value: u32)
    {
        self.out[offset..offset + 4].copy_from_slice(&self.params.endian.write_u32_bytes(value));
    }

    fn i32(&mut self, offset: usize, value: i32)
    {
        self.out[offset..offset + 4].copy_from_slice(&self.params.endian.write_i32_bytes(value));
    }

    fn size_t(&mut self, offset: usize, value: u64)
    {
        if self.params.address_bits == 64 {
            self.out[offset..offset + 8].copy_from_slice(&self.params.endian.write_u64_bytes(value));
        } else {
            self.u32(offset, value as u32);
        }
    }
}

#[cfg(test)]
mod tests
{
    use object::Endianness;

    use super::*;
    use crate::types::Architecture;

    #[test]
    fn test_prstatus_header_offsets_64()
    {
        let params = AbiParams::new(64, 64, Architecture::X86_64, Endianness::Little);
        let note = encode_prstatus(&params, LwpId(100_200), 11, &[0xaa; 12], 0);
        assert_eq!(note.len(), 64);
        assert_eq!(u32::from_le_bytes(note[36..40].try_into().unwrap()), 11);
        assert_eq!(u32::from_le_bytes(note[40..44].try_into().unwrap()), 100_200);
        assert_eq!(u64::from_le_bytes(note[16..24].try_into().unwrap()), 12);
        assert_eq!(&note[48..60], &[0xaa; 12]);
    }

    #[test]
    fn test_prpsinfo_truncates_long_strings()
    {
        let params = AbiParams::new(32, 32, Architecture::Arm, Endianness::Big);
        let long_name = "a".repeat(40);
        let long_args = "b".repeat(200);
        let note = encode_prpsinfo(&params, &long_name, &long_args, 7);
        assert_eq!(note.len(), 112);
        let decoded = decode_prpsinfo(&note, &params).unwrap();
        assert_eq!(decoded.fname.len(), PRFNAMESZ);
        assert_eq!(decoded.psargs.len(), PRARGSZ);
        assert_eq!(decoded.pid, Some(7));
    }

    #[test]
    fn test_prstatus_too_short()
    {
        let params = AbiParams::new(64, 64, Architecture::X86_64, Endianness::Little);
        assert!(decode_prstatus(&[0u8; 20], &params).is_err());
    }
}
