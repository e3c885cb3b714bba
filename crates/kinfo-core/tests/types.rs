//! Tests for the value types shared by decoders and reports

use kinfo_core::types::{
    Address, Architecture, LwpId, MemoryRegion, ProcessId, Protection, Ptid, RegionFlags, SignalSet, Timeval,
};

#[test]
fn test_process_id_from_u32()
{
    let pid = ProcessId::from(12345);
    assert_eq!(pid.0, 12345);
    let value: u32 = pid.into();
    assert_eq!(value, 12345);
}

#[test]
fn test_ptid_display()
{
    assert_eq!(Ptid::new(ProcessId(812), LwpId(100_042)).to_string(), "LWP 100042");
    assert_eq!(Ptid::new(ProcessId(812), LwpId(0)).to_string(), "process 812");
}

#[test]
fn test_architecture_parse()
{
    assert_eq!("amd64".parse::<Architecture>(), Ok(Architecture::X86_64));
    assert_eq!("i386".parse::<Architecture>(), Ok(Architecture::I386));
    assert_eq!("ARM64".parse::<Architecture>(), Ok(Architecture::Arm64));
    assert!("vax".parse::<Architecture>().is_err());
    assert!(Architecture::I386.is_i386());
    assert!(!Architecture::Arm.is_i386());
}

#[test]
fn test_address_formatting()
{
    let addr = Address::new(0x40_0000);
    assert_eq!(format!("{addr}"), "0x0000000000400000");
    assert_eq!(format!("{addr:x}"), "400000");
    assert_eq!(format!("{addr:#x}"), "0x400000");
    assert_eq!(u64::from(addr), 0x40_0000);
}

#[test]
fn test_region_flags_string()
{
    let region = MemoryRegion {
        start: Address::new(0x1000),
        end: Address::new(0x3000),
        offset: 0,
        protection: Protection::from_raw(0x1 | 0x4),
        flags: RegionFlags::from_raw(0x8),
        path: "/bin/sh".to_string(),
    };
    assert_eq!(region.flags_string(), "r-x S----");
    assert_eq!(region.size(), 0x2000);
    assert!(region.contains(Address::new(0x2fff)));
    assert!(!region.contains(Address::new(0x3000)));
}

#[test]
fn test_region_flags_all_set()
{
    let flags = RegionFlags::from_raw(0x1 | 0x2 | 0x4 | 0x8 | 0x20);
    assert_eq!(flags.to_string(), "SCNDX");
    assert_eq!(Protection::from_raw(0x7).to_string(), "rwx");
    assert_eq!(Protection::from_raw(0).to_string(), "---");
}

#[test]
fn test_signal_set()
{
    let set = SignalSet::new([0x0000_0401, 0, 0, 0x8000_0000]);
    assert!(set.contains(1));
    assert!(set.contains(11));
    assert!(set.contains(128));
    assert!(!set.contains(2));
    assert!(!set.is_empty());
    assert_eq!(set.to_string(), "00000401 00000000 00000000 80000000");
}

#[test]
fn test_timeval_display()
{
    let tv = Timeval { seconds: 12, microseconds: 3400 };
    assert_eq!(tv.to_string(), "12.003400");
}
