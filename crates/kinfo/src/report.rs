//! Text reports for the `kinfo` subcommands.
//!
//! Every writer takes already-decoded values and an output stream, so the
//! formats can be checked without a core file.

use std::io::{self, Write};

use kinfo_core::auxv::{format_auxv_entry, AuxvEntry};
use kinfo_core::notes::files::OpenFileEntry;
use kinfo_core::siginfo::SigInfo;
use kinfo_core::types::{MemoryRegion, ProcessSnapshot, Ptid, Signal};

/// One row of the thread listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow
{
    pub ptid: Ptid,
    pub name: Option<String>,
    pub signal: Signal,
}

pub fn write_status(out: &mut impl Write, p: &ProcessSnapshot) -> io::Result<()>
{
    writeln!(out, "Name: {}", p.command)?;
    writeln!(out, "Process ID: {}", p.pid)?;
    writeln!(out, "Parent process: {}", p.ppid)?;
    writeln!(out, "Process group: {}", p.pgid)?;
    writeln!(out, "Session id: {}", p.sid)?;
    writeln!(out, "TTY: {}", p.tty_device)?;
    writeln!(out, "TTY owner process group: {}", p.tpgid)?;
    writeln!(
        out,
        "User IDs (real, effective, saved): {} {} {}",
        p.real_uid, p.effective_uid, p.saved_uid
    )?;
    writeln!(
        out,
        "Group IDs (real, effective, saved): {} {} {}",
        p.real_gid, p.effective_gid, p.saved_gid
    )?;
    let groups: Vec<String> = p.groups.iter().map(ToString::to_string).collect();
    writeln!(out, "Groups: {}", groups.join(" "))?;
    writeln!(out, "Minor faults (no memory page): {}", p.usage.minor_faults)?;
    writeln!(out, "Minor faults, children: {}", p.children_usage.minor_faults)?;
    writeln!(out, "Major faults (memory page faults): {}", p.usage.major_faults)?;
    writeln!(out, "Major faults, children: {}", p.children_usage.major_faults)?;
    writeln!(out, "utime: {}", p.usage.user_time)?;
    writeln!(out, "stime: {}", p.usage.system_time)?;
    writeln!(out, "utime, children: {}", p.children_usage.user_time)?;
    writeln!(out, "stime, children: {}", p.children_usage.system_time)?;
    writeln!(out, "'nice' value: {}", p.nice)?;
    writeln!(out, "Start time: {}", p.start_time)?;
    writeln!(out, "Virtual memory size: {} kB", p.virtual_size / 1024)?;
    writeln!(out, "Data size: {} pages", p.data_size)?;
    writeln!(out, "Stack size: {} pages", p.stack_size)?;
    writeln!(out, "Text size: {} pages", p.text_size)?;
    writeln!(out, "Resident set size: {} pages", p.resident_size)?;
    writeln!(out, "Maximum RSS: {} pages", p.usage.max_rss)?;
    writeln!(out, "Ignored Signals: {}", p.ignored_signals)?;
    writeln!(out, "Caught Signals: {}", p.caught_signals)
}

pub fn write_mappings(out: &mut impl Write, regions: &[MemoryRegion], address_bits: u8) -> io::Result<()>
{
    writeln!(out, "Mapped address spaces:")?;
    writeln!(out)?;
    let row = |out: &mut dyn Write, cols: [&str; 6]| -> io::Result<()> {
        let [start, end, size, offset, flags, path] = cols;
        if address_bits == 64 {
            writeln!(out, "  {start:>18} {end:>18} {size:>10} {offset:>10} {flags:>9} {path}")
        } else {
            writeln!(out, "\t{start:>10} {end:>10} {size:>10} {offset:>10} {flags:>9} {path}")
        }
    };
    row(out, ["Start Addr", "  End Addr", "      Size", "    Offset", "Flags  ", "File"])?;
    for region in regions {
        row(out, [
            &format!("{:#x}", region.start),
            &format!("{:#x}", region.end),
            &format!("{:#x}", region.size()),
            &format!("{:#x}", region.offset),
            &region.flags_string(),
            &region.path,
        ])?;
    }
    Ok(())
}

pub fn write_files(out: &mut impl Write, entries: &[OpenFileEntry]) -> io::Result<()>
{
    writeln!(out, "{:>6} {:<9} {}", "FD", "Type", "Path")?;
    for entry in entries {
        writeln!(out, "{:>6} {:<9} {}", entry.descriptor, entry.kind, entry.path)?;
    }
    Ok(())
}

pub fn write_threads(out: &mut impl Write, rows: &[ThreadRow]) -> io::Result<()>
{
    writeln!(out, "  {:<4} {:<20} {:<16} {}", "Id", "Target Id", "Name", "Signal")?;
    for (index, row) in rows.iter().enumerate() {
        // The kernel dumps the signalled thread first
        let marker = if index == 0 { '*' } else { ' ' };
        let signal = if row.signal.is_pending() { row.signal.to_string() } else { String::new() };
        writeln!(
            out,
            "{marker} {:<4} {:<20} {:<16} {signal}",
            index + 1,
            row.ptid.to_string(),
            row.name.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}

pub fn write_siginfo(out: &mut impl Write, ptid: Ptid, info: &SigInfo) -> io::Result<()>
{
    writeln!(out, "{ptid}:")?;
    writeln!(out, "  si_signo: {} ({})", info.signo, info.signal())?;
    writeln!(out, "  si_errno: {}", info.errno)?;
    writeln!(out, "  si_code: {}", info.code)?;
    if info.has_fault_address() {
        writeln!(out, "  si_addr: {:#x}", info.addr)?;
        writeln!(out, "  si_trapno: {}", info.trapno)
    } else {
        writeln!(out, "  si_pid: {}", info.pid)?;
        writeln!(out, "  si_uid: {}", info.uid)?;
        writeln!(out, "  si_status: {}", info.status)
    }
}

pub fn write_auxv(out: &mut impl Write, entries: &[AuxvEntry], address_bits: u8) -> io::Result<()>
{
    for entry in entries {
        writeln!(out, "{}", format_auxv_entry(entry, address_bits))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use kinfo_core::notes::files::{FileDescriptor, FileKind};
    use kinfo_core::types::{Address, LwpId, ProcessId, Protection, RegionFlags};

    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_mappings_64bit_columns()
    {
        let regions = [MemoryRegion {
            start: Address::new(0x40_0000),
            end: Address::new(0x40_4000),
            offset: 0,
            protection: Protection::from_raw(0x5),
            flags: RegionFlags::from_raw(0x8),
            path: "/bin/sh".to_string(),
        }];
        let text = render(|out| write_mappings(out, &regions, 64));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Mapped address spaces:");
        assert_eq!(lines[1], "");
        assert_eq!(
            lines[3],
            "            0x400000           0x404000     0x4000        0x0 r-x S---- /bin/sh"
        );
    }

    #[test]
    fn test_mappings_32bit_uses_tab()
    {
        let text = render(|out| write_mappings(out, &[], 32));
        assert!(text.lines().nth(2).is_some_and(|line| line.starts_with('\t')));
    }

    #[test]
    fn test_files_table()
    {
        let entries = [OpenFileEntry {
            descriptor: FileDescriptor::Cwd,
            kind: FileKind::Vnode,
            path: "/root".to_string(),
        }];
        let text = render(|out| write_files(out, &entries));
        assert_eq!(text.lines().nth(1), Some("   cwd vnode     /root"));
    }

    #[test]
    fn test_threads_mark_first()
    {
        let rows = [
            ThreadRow {
                ptid: Ptid::new(ProcessId(5), LwpId(100_100)),
                name: None,
                signal: Signal::Segv,
            },
            ThreadRow {
                ptid: Ptid::new(ProcessId(5), LwpId(100_101)),
                name: Some("io".to_string()),
                signal: Signal::None,
            },
        ];
        let text = render(|out| write_threads(out, &rows));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("* 1    LWP 100100"));
        assert!(lines[1].ends_with("SIGSEGV"));
        assert!(lines[2].starts_with("  2    LWP 100101"));
        assert!(lines[2].contains(" io "));
    }
}
