//! Tests for the NT_PROCSTAT_FILES decoder and vnode lookups

use kinfo_core::error::KinfoError;
use kinfo_core::notes::files::{
    decode_files, find_vnode_path, FileDescriptor, FileKind, KF_PATH, KINFO_FILE_FD_TYPE_CWD, KINFO_FILE_FD_TYPE_TEXT,
};
use object::Endianness;

/// Append one `kinfo_file` with room for a short path
fn push_file(note: &mut Vec<u8>, kind: u32, fd: i32, path: &str)
{
    let size = KF_PATH + 64;
    let mut element = vec![0u8; size];
    element[0x0..0x4].copy_from_slice(&(size as u32).to_be_bytes());
    element[0x4..0x8].copy_from_slice(&kind.to_be_bytes());
    element[0x8..0xc].copy_from_slice(&fd.to_be_bytes());
    element[KF_PATH..KF_PATH + path.len()].copy_from_slice(path.as_bytes());
    note.extend(element);
}

fn file_table() -> Vec<u8>
{
    let mut note = 0x570u32.to_be_bytes().to_vec();
    push_file(&mut note, 1, KINFO_FILE_FD_TYPE_TEXT, "/usr/sbin/daemon");
    push_file(&mut note, 1, KINFO_FILE_FD_TYPE_CWD, "/var/run");
    push_file(&mut note, 2, 3, "");
    push_file(&mut note, 1, 4, "/var/log/messages");
    note
}

#[test]
fn test_decode_all_entries()
{
    let entries = decode_files(&file_table(), Endianness::Big).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].descriptor, FileDescriptor::Text);
    assert_eq!(entries[1].descriptor, FileDescriptor::Cwd);
    assert_eq!(entries[2].kind, FileKind::Socket);
    assert_eq!(entries[2].descriptor, FileDescriptor::Fd(3));
    assert_eq!(entries[3].path, "/var/log/messages");
}

#[test]
fn test_find_cwd_and_exe()
{
    let note = file_table();
    assert_eq!(find_vnode_path(&note, KINFO_FILE_FD_TYPE_CWD, Endianness::Big).unwrap(), "/var/run");
    assert_eq!(
        find_vnode_path(&note, KINFO_FILE_FD_TYPE_TEXT, Endianness::Big).unwrap(),
        "/usr/sbin/daemon"
    );
    assert_eq!(find_vnode_path(&note, 4, Endianness::Big).unwrap(), "/var/log/messages");
}

#[test]
fn test_only_vnodes_match()
{
    let note = file_table();
    let err = find_vnode_path(&note, 3, Endianness::Big).unwrap_err();
    assert!(matches!(err, KinfoError::NotFound(_)));
}

#[test]
fn test_cwd_missing_is_not_found()
{
    let mut note = 0x570u32.to_be_bytes().to_vec();
    push_file(&mut note, 1, KINFO_FILE_FD_TYPE_TEXT, "/bin/cat");

    let err = find_vnode_path(&note, KINFO_FILE_FD_TYPE_CWD, Endianness::Big).unwrap_err();
    assert!(matches!(err, KinfoError::NotFound(_)));
    assert!(err.is_soft());
}

#[test]
fn test_malformed_before_match()
{
    let mut note = 0x570u32.to_be_bytes().to_vec();
    push_file(&mut note, 1, 5, "/tmp/a");
    let bad_at = note.len();
    push_file(&mut note, 1, KINFO_FILE_FD_TYPE_CWD, "/");
    note[bad_at..bad_at + 4].copy_from_slice(&0x20u32.to_be_bytes());

    assert!(matches!(
        find_vnode_path(&note, KINFO_FILE_FD_TYPE_CWD, Endianness::Big),
        Err(KinfoError::Malformed(_))
    ));
    assert_eq!(find_vnode_path(&note, 5, Endianness::Big).unwrap(), "/tmp/a");
}

#[test]
fn test_trailing_entry_of_minimum_size()
{
    let mut note = 0x570u32.to_be_bytes().to_vec();
    let mut element = vec![0u8; KF_PATH];
    element[0x0..0x4].copy_from_slice(&(KF_PATH as u32).to_be_bytes());
    element[0x4..0x8].copy_from_slice(&1u32.to_be_bytes());
    element[0x8..0xc].copy_from_slice(&KINFO_FILE_FD_TYPE_CWD.to_be_bytes());
    note.extend(element);

    let entries = decode_files(&note, Endianness::Big).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].descriptor, FileDescriptor::Cwd);
    assert_eq!(find_vnode_path(&note, KINFO_FILE_FD_TYPE_CWD, Endianness::Big).unwrap(), "");
}

#[test]
fn test_display_honors_width()
{
    assert_eq!(format!("[{:>6}]", FileDescriptor::Cwd), "[   cwd]");
    assert_eq!(format!("[{:>6}]", FileDescriptor::Fd(12)), "[    12]");
    assert_eq!(format!("[{:<9}]", FileKind::Vnode), "[vnode    ]");
    assert_eq!(format!("[{:<9}]", FileKind::Other(99)), "[type 99  ]");
}
