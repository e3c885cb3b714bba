//! # Layout Registry
//!
//! Offset tables for the kernel's `struct kinfo_proc`.
//!
//! FreeBSD has shipped three incompatible binary layouts of `kinfo_proc`:
//!
//! - **64-bit**: every 64-bit target (amd64, aarch64, powerpc64, riscv64, ...)
//! - **i386**: the one 32-bit target that kept a 32-bit `time_t`, which
//!   shrinks every `struct timeval` and shifts everything after `ki_start`
//! - **32-bit**: every other 32-bit target (arm, powerpc, mips32)
//!
//! The tables are immutable `static` data. [`select_layout`] picks one per
//! decode session; the process-info decoder in [`crate::notes::proc`] is the
//! only consumer.
//!
//! ## Example
//!
//! ```rust
//! use kinfo_core::layout::select_layout;
//! use kinfo_core::types::Architecture;
//!
//! let layout = select_layout(64, Architecture::X86_64);
//! assert_eq!(layout.ki_pid.offset, 0x48);
//!
//! let layout = select_layout(32, Architecture::I386);
//! assert_eq!(layout.ki_comm.offset, 0x16f);
//! ```

use crate::types::Architecture;

/// Length of `ki_comm`: `COMMLEN` (19) plus the terminating NUL
pub const KI_COMM_SIZE: usize = 20;

/// How wide a field is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width
{
    /// Fixed number of bytes on every target
    Bytes(usize),
    /// `size_t`/`vm_size_t`/`segsz_t`: the target address width
    Address,
    /// C `long`
    Long,
    /// One `struct timeval`, as described by the table's [`TimevalLayout`]
    Timeval,
}

/// Offset and width of one field of the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field
{
    pub offset: usize,
    pub width: Width,
}

impl Field
{
    const fn bytes(offset: usize, bytes: usize) -> Self
    {
        Self { offset, width: Width::Bytes(bytes) }
    }

    const fn address(offset: usize) -> Self
    {
        Self { offset, width: Width::Address }
    }

    const fn long(offset: usize) -> Self
    {
        Self { offset, width: Width::Long }
    }

    const fn timeval(offset: usize) -> Self
    {
        Self { offset, width: Width::Timeval }
    }
}

/// Field widths of `struct timeval`
///
/// Only the bytes that are read are counted; trailing alignment padding is not
/// part of the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimevalLayout
{
    /// Width of the signed `tv_sec`
    pub seconds: usize,
    /// Width of the unsigned `tv_usec`
    pub microseconds: usize,
}

impl TimevalLayout
{
    pub const fn width(&self) -> usize
    {
        self.seconds + self.microseconds
    }
}

/// Offsets within one `struct rusage`, relative to its start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RusageLayout
{
    pub ru_utime: usize,
    pub ru_stime: usize,
    pub ru_maxrss: usize,
    pub ru_minflt: usize,
    pub ru_majflt: usize,
}

/// One `kinfo_proc` layout
///
/// Offsets are measured from the start of the record, which follows the
/// 4-byte structure-size header of the note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable
{
    /// Short name used in log output
    pub name: &'static str,
    /// `sizeof(struct kinfo_proc)` documented for this layout
    pub record_size: usize,
    /// Address and `long` width (in bytes) the offsets were computed for
    pub natural_width: usize,
    pub timeval: TimevalLayout,

    pub ki_layout: Field,
    pub ki_pid: Field,
    pub ki_ppid: Field,
    pub ki_pgid: Field,
    pub ki_tpgid: Field,
    pub ki_sid: Field,
    pub ki_tdev_freebsd11: Field,
    pub ki_sigignore: Field,
    pub ki_sigcatch: Field,
    pub ki_uid: Field,
    pub ki_ruid: Field,
    pub ki_svuid: Field,
    pub ki_rgid: Field,
    pub ki_svgid: Field,
    pub ki_ngroups: Field,
    pub ki_groups: Field,
    pub ki_size: Field,
    pub ki_rssize: Field,
    pub ki_tsize: Field,
    pub ki_dsize: Field,
    pub ki_ssize: Field,
    pub ki_start: Field,
    pub ki_nice: Field,
    pub ki_comm: Field,
    pub ki_tdev: Field,
    /// Start of the process's own `struct rusage`
    pub ki_rusage: usize,
    /// Start of the reaped children's `struct rusage`
    pub ki_rusage_ch: usize,
    pub rusage: RusageLayout,
}

const SIGSET_SIZE: usize = 16;
const GROUPS_SIZE: usize = 16 * 4;

pub static KINFO_PROC_64: LayoutTable = LayoutTable {
    name: "kinfo_proc64",
    record_size: 0x440,
    natural_width: 8,
    timeval: TimevalLayout { seconds: 8, microseconds: 8 },
    ki_layout: Field::bytes(0x4, 4),
    ki_pid: Field::bytes(0x48, 4),
    ki_ppid: Field::bytes(0x4c, 4),
    ki_pgid: Field::bytes(0x50, 4),
    ki_tpgid: Field::bytes(0x54, 4),
    ki_sid: Field::bytes(0x58, 4),
    ki_tdev_freebsd11: Field::bytes(0x64, 4),
    ki_sigignore: Field::bytes(0x88, SIGSET_SIZE),
    ki_sigcatch: Field::bytes(0x98, SIGSET_SIZE),
    ki_uid: Field::bytes(0xa8, 4),
    ki_ruid: Field::bytes(0xac, 4),
    ki_svuid: Field::bytes(0xb0, 4),
    ki_rgid: Field::bytes(0xb4, 4),
    ki_svgid: Field::bytes(0xb8, 4),
    ki_ngroups: Field::bytes(0xbc, 2),
    ki_groups: Field::bytes(0xc0, GROUPS_SIZE),
    ki_size: Field::address(0x100),
    ki_rssize: Field::address(0x108),
    ki_tsize: Field::address(0x118),
    ki_dsize: Field::address(0x120),
    ki_ssize: Field::address(0x128),
    ki_start: Field::timeval(0x150),
    ki_nice: Field::bytes(0x185, 1),
    ki_comm: Field::bytes(0x1bf, KI_COMM_SIZE),
    ki_tdev: Field::bytes(0x230, 8),
    ki_rusage: 0x260,
    ki_rusage_ch: 0x2f0,
    rusage: RusageLayout {
        ru_utime: 0x0,
        ru_stime: 0x10,
        ru_maxrss: 0x20,
        ru_minflt: 0x40,
        ru_majflt: 0x48,
    },
};

pub static KINFO_PROC_I386: LayoutTable = LayoutTable {
    name: "kinfo_proc_i386",
    record_size: 0x300,
    natural_width: 4,
    timeval: TimevalLayout { seconds: 4, microseconds: 4 },
    ki_layout: Field::bytes(0x4, 4),
    ki_pid: Field::bytes(0x28, 4),
    ki_ppid: Field::bytes(0x2c, 4),
    ki_pgid: Field::bytes(0x30, 4),
    ki_tpgid: Field::bytes(0x34, 4),
    ki_sid: Field::bytes(0x38, 4),
    ki_tdev_freebsd11: Field::bytes(0x44, 4),
    ki_sigignore: Field::bytes(0x68, SIGSET_SIZE),
    ki_sigcatch: Field::bytes(0x78, SIGSET_SIZE),
    ki_uid: Field::bytes(0x88, 4),
    ki_ruid: Field::bytes(0x8c, 4),
    ki_svuid: Field::bytes(0x90, 4),
    ki_rgid: Field::bytes(0x94, 4),
    ki_svgid: Field::bytes(0x98, 4),
    ki_ngroups: Field::bytes(0x9c, 2),
    ki_groups: Field::bytes(0xa0, GROUPS_SIZE),
    ki_size: Field::address(0xe0),
    ki_rssize: Field::address(0xe4),
    ki_tsize: Field::address(0xec),
    ki_dsize: Field::address(0xf0),
    ki_ssize: Field::address(0xf4),
    ki_start: Field::timeval(0x118),
    ki_nice: Field::bytes(0x135, 1),
    ki_comm: Field::bytes(0x16f, KI_COMM_SIZE),
    ki_tdev: Field::bytes(0x1e0, 8),
    ki_rusage: 0x210,
    ki_rusage_ch: 0x258,
    rusage: RusageLayout {
        ru_utime: 0x0,
        ru_stime: 0x8,
        ru_maxrss: 0x10,
        ru_minflt: 0x20,
        ru_majflt: 0x24,
    },
};

pub static KINFO_PROC_32: LayoutTable = LayoutTable {
    name: "kinfo_proc32",
    record_size: 0x330,
    natural_width: 4,
    timeval: TimevalLayout { seconds: 8, microseconds: 4 },
    ki_layout: Field::bytes(0x4, 4),
    ki_pid: Field::bytes(0x28, 4),
    ki_ppid: Field::bytes(0x2c, 4),
    ki_pgid: Field::bytes(0x30, 4),
    ki_tpgid: Field::bytes(0x34, 4),
    ki_sid: Field::bytes(0x38, 4),
    ki_tdev_freebsd11: Field::bytes(0x44, 4),
    ki_sigignore: Field::bytes(0x68, SIGSET_SIZE),
    ki_sigcatch: Field::bytes(0x78, SIGSET_SIZE),
    ki_uid: Field::bytes(0x88, 4),
    ki_ruid: Field::bytes(0x8c, 4),
    ki_svuid: Field::bytes(0x90, 4),
    ki_rgid: Field::bytes(0x94, 4),
    ki_svgid: Field::bytes(0x98, 4),
    ki_ngroups: Field::bytes(0x9c, 2),
    ki_groups: Field::bytes(0xa0, GROUPS_SIZE),
    ki_size: Field::address(0xe0),
    ki_rssize: Field::address(0xe4),
    ki_tsize: Field::address(0xec),
    ki_dsize: Field::address(0xf0),
    ki_ssize: Field::address(0xf4),
    ki_start: Field::timeval(0x118),
    ki_nice: Field::bytes(0x145, 1),
    ki_comm: Field::bytes(0x17f, KI_COMM_SIZE),
    ki_tdev: Field::bytes(0x1f0, 8),
    ki_rusage: 0x220,
    ki_rusage_ch: 0x278,
    rusage: RusageLayout {
        ru_utime: 0x0,
        ru_stime: 0x10,
        ru_maxrss: 0x20,
        ru_minflt: 0x30,
        ru_majflt: 0x34,
    },
};

/// Pick the `kinfo_proc` layout for a target
///
/// 64-bit address width always selects the 64-bit table. Among 32-bit
/// targets, i386 has its own table and everything else shares the generic
/// 32-bit one.
pub fn select_layout(address_bits: u8, architecture: Architecture) -> &'static LayoutTable
{
    if address_bits == 64 {
        &KINFO_PROC_64
    } else if architecture.is_i386() {
        &KINFO_PROC_I386
    } else {
        &KINFO_PROC_32
    }
}

impl LayoutTable
{
    /// Every field the decoder reads, with both `rusage` copies flattened to
    /// absolute offsets
    pub fn fields(&self) -> Vec<(&'static str, Field)>
    {
        let mut fields = vec![
            ("ki_layout", self.ki_layout),
            ("ki_pid", self.ki_pid),
            ("ki_ppid", self.ki_ppid),
            ("ki_pgid", self.ki_pgid),
            ("ki_tpgid", self.ki_tpgid),
            ("ki_sid", self.ki_sid),
            ("ki_tdev_freebsd11", self.ki_tdev_freebsd11),
            ("ki_sigignore", self.ki_sigignore),
            ("ki_sigcatch", self.ki_sigcatch),
            ("ki_uid", self.ki_uid),
            ("ki_ruid", self.ki_ruid),
            ("ki_svuid", self.ki_svuid),
            ("ki_rgid", self.ki_rgid),
            ("ki_svgid", self.ki_svgid),
            ("ki_ngroups", self.ki_ngroups),
            ("ki_groups", self.ki_groups),
            ("ki_size", self.ki_size),
            ("ki_rssize", self.ki_rssize),
            ("ki_tsize", self.ki_tsize),
            ("ki_dsize", self.ki_dsize),
            ("ki_ssize", self.ki_ssize),
            ("ki_start", self.ki_start),
            ("ki_nice", self.ki_nice),
            ("ki_comm", self.ki_comm),
            ("ki_tdev", self.ki_tdev),
        ];
        for (prefix, base) in [("ki_rusage", self.ki_rusage), ("ki_rusage_ch", self.ki_rusage_ch)] {
            let ru = &self.rusage;
            fields.extend([
                (prefix, Field::timeval(base + ru.ru_utime)),
                (prefix, Field::timeval(base + ru.ru_stime)),
                (prefix, Field::long(base + ru.ru_maxrss)),
                (prefix, Field::long(base + ru.ru_minflt)),
                (prefix, Field::long(base + ru.ru_majflt)),
            ]);
        }
        fields
    }

    /// Resolve a width to bytes for a target's address and `long` widths
    pub fn width_bytes(&self, width: Width, address_bytes: usize, long_bytes: usize) -> usize
    {
        match width {
            Width::Bytes(n) => n,
            Width::Address => address_bytes,
            Width::Long => long_bytes,
            Width::Timeval => self.timeval.width(),
        }
    }

    /// End of the furthest field, i.e. the shortest record the decoder accepts
    pub fn required_len(&self, address_bytes: usize, long_bytes: usize) -> usize
    {
        self.fields()
            .into_iter()
            .map(|(_, field)| field.offset + self.width_bytes(field.width, address_bytes, long_bytes))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_every_field_fits_in_record()
    {
        for layout in [&KINFO_PROC_64, &KINFO_PROC_I386, &KINFO_PROC_32] {
            let width = layout.natural_width;
            for (name, field) in layout.fields() {
                let end = field.offset + layout.width_bytes(field.width, width, width);
                assert!(
                    end <= layout.record_size,
                    "{}: {name} ends at 0x{end:x}, past record size 0x{:x}",
                    layout.name,
                    layout.record_size
                );
            }
        }
    }

    #[test]
    fn test_select_layout()
    {
        assert_eq!(select_layout(64, Architecture::X86_64).name, "kinfo_proc64");
        assert_eq!(select_layout(64, Architecture::Arm64).name, "kinfo_proc64");
        assert_eq!(select_layout(32, Architecture::I386).name, "kinfo_proc_i386");
        assert_eq!(select_layout(32, Architecture::Arm).name, "kinfo_proc32");
        assert_eq!(select_layout(32, Architecture::PowerPc).name, "kinfo_proc32");
    }

    #[test]
    fn test_required_len_is_end_of_children_rusage()
    {
        // ki_rusage_ch + ru_majflt + sizeof(long)
        assert_eq!(KINFO_PROC_64.required_len(8, 8), 0x2f0 + 0x48 + 8);
        assert_eq!(KINFO_PROC_I386.required_len(4, 4), 0x258 + 0x24 + 4);
        assert_eq!(KINFO_PROC_32.required_len(4, 4), 0x278 + 0x34 + 4);
    }
}
