//! # Process Info Decoder
//!
//! Decodes `NT_PROCSTAT_PROC` into a [`ProcessSnapshot`].
//!
//! The note holds a 4-byte structure-size header and then one
//! `struct kinfo_proc` per thread. Only the first record is decoded; the
//! process-wide fields are the same in every copy.

use smallvec::SmallVec;
use tracing::{debug, warn};

use super::{check_header, STRUCTSIZE_HEADER};
use crate::abi::AbiParams;
use crate::error::{KinfoError, KinfoResult};
use crate::layout::{select_layout, Field, LayoutTable, RusageLayout, KI_COMM_SIZE};
use crate::reader::ByteReader;
use crate::types::snapshot::SIG_WORDS;
use crate::types::{ProcessSnapshot, ResourceUsage, SignalSet, Timeval};

/// Decode the first `kinfo_proc` record of a process-info note
///
/// The layout is chosen from `params` with [`select_layout`].
///
/// ## Errors
///
/// - `Malformed` if the note is shorter than the furthest field read, or its
///   group count runs past the end of the note
/// - `UnsupportedLayout` if `ki_layout` is not zero (soft: the record comes
///   from a kernel revision with a different structure)
///
/// ## Example
///
/// ```rust
/// use kinfo_core::abi::AbiParams;
/// use kinfo_core::error::KinfoError;
/// use kinfo_core::notes::proc::decode_process_info;
/// use kinfo_core::types::Architecture;
/// use object::Endianness;
///
/// let params = AbiParams::new(64, 64, Architecture::X86_64, Endianness::Little);
/// let err = decode_process_info(&[0u8; 16], &params).unwrap_err();
/// assert!(matches!(err, KinfoError::Malformed(_)));
/// ```
pub fn decode_process_info(note: &[u8], params: &AbiParams) -> KinfoResult<ProcessSnapshot>
{
    check_header(note)?;
    let layout = select_layout(params.address_bits, params.architecture);
    let required = STRUCTSIZE_HEADER + layout.required_len(params.address_bytes(), params.long_bytes());
    if note.len() < required {
        return Err(KinfoError::Malformed(format!(
            "process info note is {} bytes, {} needs at least {required}",
            note.len(),
            layout.name
        )));
    }

    let record = ProcRecord {
        reader: ByteReader::new(&note[STRUCTSIZE_HEADER..], params.endian),
        layout,
        address_bytes: params.address_bytes(),
        long_bytes: params.long_bytes(),
    };

    let version = record.u32(layout.ki_layout)?;
    if version != 0 {
        warn!("unsupported process information in core file (ki_layout = {version})");
        return Err(KinfoError::UnsupportedLayout(version));
    }
    debug!("decoding {} record", layout.name);

    let tty_device = match record.reader.u64(layout.ki_tdev.offset)? {
        0 => u64::from(record.u32(layout.ki_tdev_freebsd11)?),
        tdev => tdev,
    };

    let groups = record.groups()?;
    let effective_gid = record.u32(layout.ki_groups)?;

    Ok(ProcessSnapshot {
        pid: record.u32(layout.ki_pid)?,
        ppid: record.u32(layout.ki_ppid)?,
        pgid: record.u32(layout.ki_pgid)?,
        sid: record.u32(layout.ki_sid)?,
        tpgid: record.u32(layout.ki_tpgid)?,
        tty_device,
        real_uid: record.u32(layout.ki_ruid)?,
        effective_uid: record.u32(layout.ki_uid)?,
        saved_uid: record.u32(layout.ki_svuid)?,
        real_gid: record.u32(layout.ki_rgid)?,
        effective_gid,
        saved_gid: record.u32(layout.ki_svgid)?,
        groups,
        ignored_signals: record.sigset(layout.ki_sigignore)?,
        caught_signals: record.sigset(layout.ki_sigcatch)?,
        virtual_size: record.address(layout.ki_size)?,
        resident_size: record.address(layout.ki_rssize)?,
        text_size: record.address(layout.ki_tsize)?,
        data_size: record.address(layout.ki_dsize)?,
        stack_size: record.address(layout.ki_ssize)?,
        start_time: record.timeval(layout.ki_start.offset)?,
        nice: record.reader.i8(layout.ki_nice.offset)?,
        command: record.reader.cstr(layout.ki_comm.offset, KI_COMM_SIZE - 1)?,
        usage: record.rusage(layout.ki_rusage, &layout.rusage)?,
        children_usage: record.rusage(layout.ki_rusage_ch, &layout.rusage)?,
    })
}

/// One `kinfo_proc` record with the widths needed to read it
struct ProcRecord<'a>
{
    reader: ByteReader<'a>,
    layout: &'static LayoutTable,
    address_bytes: usize,
    long_bytes: usize,
}

impl ProcRecord<'_>
{
    fn u32(&self, field: Field) -> KinfoResult<u32>
    {
        self.reader.u32(field.offset)
    }

    fn address(&self, field: Field) -> KinfoResult<u64>
    {
        self.reader.uint(field.offset, self.address_bytes)
    }

    fn long(&self, offset: usize) -> KinfoResult<u64>
    {
        self.reader.uint(offset, self.long_bytes)
    }

    fn sigset(&self, field: Field) -> KinfoResult<SignalSet>
    {
        let mut words = [0u32; SIG_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.reader.u32(field.offset + i * 4)?;
        }
        Ok(SignalSet::new(words))
    }

    fn groups(&self) -> KinfoResult<SmallVec<[u32; 16]>>
    {
        let count = usize::from(self.reader.u16(self.layout.ki_ngroups.offset)?);
        let start = self.layout.ki_groups.offset;
        let end = start + count * 4;
        if end > self.reader.len() {
            return Err(KinfoError::Malformed(format!(
                "{count} groups run past the end of the process info note"
            )));
        }
        (0..count).map(|i| self.reader.u32(start + i * 4)).collect()
    }

    fn timeval(&self, offset: usize) -> KinfoResult<Timeval>
    {
        decode_timeval(&self.reader, offset, self.layout)
    }

    fn rusage(&self, base: usize, ru: &RusageLayout) -> KinfoResult<ResourceUsage>
    {
        Ok(ResourceUsage {
            user_time: self.timeval(base + ru.ru_utime)?,
            system_time: self.timeval(base + ru.ru_stime)?,
            max_rss: self.long(base + ru.ru_maxrss)?,
            minor_faults: self.long(base + ru.ru_minflt)?,
            major_faults: self.long(base + ru.ru_majflt)?,
        })
    }
}

/// Read a `struct timeval` with the field widths of `layout`
///
/// 64-bit targets store a signed 64-bit `tv_sec` and a 64-bit `tv_usec`;
/// i386 stores two 32-bit fields; the other 32-bit targets pair a 64-bit
/// `tv_sec` with a 32-bit `tv_usec`.
pub fn decode_timeval(reader: &ByteReader<'_>, offset: usize, layout: &LayoutTable) -> KinfoResult<Timeval>
{
    let tv = layout.timeval;
    let seconds = match tv.seconds {
        4 => i64::from(reader.i32(offset)?),
        _ => reader.i64(offset)?,
    };
    let microseconds = reader.uint(offset + tv.seconds, tv.microseconds)?;
    Ok(Timeval { seconds, microseconds })
}
