//! Tests for decoding NT_PROCSTAT_PROC across the three kinfo_proc layouts

use kinfo_core::abi::AbiParams;
use kinfo_core::error::KinfoError;
use kinfo_core::layout::{select_layout, LayoutTable};
use kinfo_core::notes::proc::decode_process_info;
use kinfo_core::types::{Architecture, Timeval};
use object::Endianness;

/// Builds a process-info note: 4-byte structure-size header then one record
struct ProcNote
{
    bytes: Vec<u8>,
    big_endian: bool,
}

impl ProcNote
{
    fn new(layout: &LayoutTable, big_endian: bool) -> Self
    {
        let mut bytes = vec![0u8; 4 + layout.record_size];
        let size = layout.record_size as u32;
        bytes[..4].copy_from_slice(&if big_endian { size.to_be_bytes() } else { size.to_le_bytes() });
        Self { bytes, big_endian }
    }

    fn put(&mut self, offset: usize, data: &[u8])
    {
        self.bytes[4 + offset..4 + offset + data.len()].copy_from_slice(data);
    }

    fn u16(&mut self, offset: usize, value: u16)
    {
        let data = if self.big_endian { value.to_be_bytes() } else { value.to_le_bytes() };
        self.put(offset, &data);
    }

    fn u32(&mut self, offset: usize, value: u32)
    {
        let data = if self.big_endian { value.to_be_bytes() } else { value.to_le_bytes() };
        self.put(offset, &data);
    }

    fn u64(&mut self, offset: usize, value: u64)
    {
        let data = if self.big_endian { value.to_be_bytes() } else { value.to_le_bytes() };
        self.put(offset, &data);
    }
}

fn amd64() -> AbiParams
{
    AbiParams::new(64, 64, Architecture::X86_64, Endianness::Little)
}

fn sample_amd64() -> ProcNote
{
    let layout = select_layout(64, Architecture::X86_64);
    let mut note = ProcNote::new(layout, false);
    note.u32(layout.ki_pid.offset, 812);
    note.u32(layout.ki_ppid.offset, 1);
    note.u32(layout.ki_pgid.offset, 812);
    note.u32(layout.ki_sid.offset, 700);
    note.u32(layout.ki_tpgid.offset, 812);
    note.u32(layout.ki_tdev_freebsd11.offset, 0x1234);
    note.u32(layout.ki_sigignore.offset, 0x0000_0004);
    note.u32(layout.ki_uid.offset, 1001);
    note.u32(layout.ki_ruid.offset, 1002);
    note.u32(layout.ki_svuid.offset, 1003);
    note.u32(layout.ki_rgid.offset, 20);
    note.u32(layout.ki_svgid.offset, 21);
    note.u16(layout.ki_ngroups.offset, 3);
    note.u32(layout.ki_groups.offset, 0);
    note.u32(layout.ki_groups.offset + 4, 5);
    note.u32(layout.ki_groups.offset + 8, 20);
    note.u64(layout.ki_size.offset, 0x0020_0000);
    note.u64(layout.ki_rssize.offset, 300);
    note.u64(layout.ki_start.offset, 1_700_000_000);
    note.u64(layout.ki_start.offset + 8, 250);
    note.put(layout.ki_nice.offset, &[(-5i8).to_ne_bytes()[0]]);
    note.put(layout.ki_comm.offset, b"sleep\0");
    note.u64(layout.ki_rusage + layout.rusage.ru_utime, 1);
    note.u64(layout.ki_rusage + layout.rusage.ru_utime + 8, 2);
    note.u64(layout.ki_rusage + layout.rusage.ru_maxrss, 4096);
    note.u64(layout.ki_rusage_ch + layout.rusage.ru_majflt, 9);
    note
}

#[test]
fn test_decode_amd64_record()
{
    let note = sample_amd64();
    let snapshot = decode_process_info(&note.bytes, &amd64()).unwrap();

    assert_eq!(snapshot.pid, 812);
    assert_eq!(snapshot.ppid, 1);
    assert_eq!(snapshot.sid, 700);
    assert_eq!(snapshot.effective_uid, 1001);
    assert_eq!(snapshot.real_uid, 1002);
    assert_eq!(snapshot.saved_uid, 1003);
    assert_eq!(snapshot.real_gid, 20);
    assert_eq!(snapshot.saved_gid, 21);
    assert_eq!(snapshot.groups.as_slice(), &[0, 5, 20]);
    assert_eq!(snapshot.effective_gid, 0);
    assert_eq!(snapshot.virtual_size, 0x0020_0000);
    assert_eq!(snapshot.resident_size, 300);
    assert_eq!(snapshot.start_time, Timeval { seconds: 1_700_000_000, microseconds: 250 });
    assert_eq!(snapshot.nice, -5);
    assert_eq!(snapshot.command, "sleep");
    assert_eq!(snapshot.usage.user_time, Timeval { seconds: 1, microseconds: 2 });
    assert_eq!(snapshot.usage.max_rss, 4096);
    assert_eq!(snapshot.children_usage.major_faults, 9);
    assert!(snapshot.ignored_signals.contains(3));
}

#[test]
fn test_tty_device_falls_back_to_freebsd11_field()
{
    let layout = select_layout(64, Architecture::X86_64);
    let mut note = sample_amd64();
    let snapshot = decode_process_info(&note.bytes, &amd64()).unwrap();
    assert_eq!(snapshot.tty_device, 0x1234);

    note.u64(layout.ki_tdev.offset, 0xdead_0000_beef);
    let snapshot = decode_process_info(&note.bytes, &amd64()).unwrap();
    assert_eq!(snapshot.tty_device, 0xdead_0000_beef);
}

#[test]
fn test_truncated_note_is_malformed()
{
    let layout = select_layout(64, Architecture::X86_64);
    let note = sample_amd64();
    let required = 4 + layout.required_len(8, 8);

    assert!(decode_process_info(&note.bytes[..required], &amd64()).is_ok());
    let err = decode_process_info(&note.bytes[..required - 1], &amd64()).unwrap_err();
    assert!(matches!(err, KinfoError::Malformed(_)));

    let err = decode_process_info(&note.bytes[..3], &amd64()).unwrap_err();
    assert!(matches!(err, KinfoError::Malformed(_)));
}

#[test]
fn test_nonzero_layout_is_unsupported()
{
    let layout = select_layout(64, Architecture::X86_64);
    let mut note = sample_amd64();
    note.u32(layout.ki_layout.offset, 1);
    let err = decode_process_info(&note.bytes, &amd64()).unwrap_err();
    assert!(matches!(err, KinfoError::UnsupportedLayout(1)));
    assert!(err.is_soft());
}

#[test]
fn test_group_count_past_end_is_malformed()
{
    let layout = select_layout(64, Architecture::X86_64);
    let mut note = sample_amd64();
    note.u16(layout.ki_ngroups.offset, 0xffff);
    let err = decode_process_info(&note.bytes, &amd64()).unwrap_err();
    assert!(matches!(err, KinfoError::Malformed(_)));
}

#[test]
fn test_decode_i386_record()
{
    let params = AbiParams::new(32, 32, Architecture::I386, Endianness::Little);
    let layout = select_layout(32, Architecture::I386);
    assert_eq!(layout.name, "kinfo_proc_i386");

    let mut note = ProcNote::new(layout, false);
    note.u32(layout.ki_pid.offset, 44);
    note.u32(layout.ki_size.offset, 0x8000);
    note.u32(layout.ki_start.offset, 1_600_000_000);
    note.u32(layout.ki_start.offset + 4, 999_999);
    note.put(layout.ki_comm.offset, b"init\0");
    note.u32(layout.ki_rusage + layout.rusage.ru_minflt, 17);

    let snapshot = decode_process_info(&note.bytes, &params).unwrap();
    assert_eq!(snapshot.pid, 44);
    assert_eq!(snapshot.virtual_size, 0x8000);
    assert_eq!(snapshot.start_time, Timeval { seconds: 1_600_000_000, microseconds: 999_999 });
    assert_eq!(snapshot.command, "init");
    assert_eq!(snapshot.usage.minor_faults, 17);
    assert!(snapshot.groups.is_empty());
}

#[test]
fn test_decode_generic_32bit_big_endian_record()
{
    let params = AbiParams::new(32, 32, Architecture::PowerPc, Endianness::Big);
    let layout = select_layout(32, Architecture::PowerPc);
    assert_eq!(layout.name, "kinfo_proc32");

    let mut note = ProcNote::new(layout, true);
    note.u32(layout.ki_pid.offset, 0x0102_0304);
    note.u64(layout.ki_start.offset, 1_650_000_000);
    note.u32(layout.ki_start.offset + 8, 42);
    note.put(layout.ki_comm.offset, b"a-command-name-that-is-too-long");
    note.u64(layout.ki_tdev.offset, 7);

    let snapshot = decode_process_info(&note.bytes, &params).unwrap();
    assert_eq!(snapshot.pid, 0x0102_0304);
    assert_eq!(snapshot.start_time, Timeval { seconds: 1_650_000_000, microseconds: 42 });
    assert_eq!(snapshot.command.len(), 19);
    assert_eq!(snapshot.tty_device, 7);
}
