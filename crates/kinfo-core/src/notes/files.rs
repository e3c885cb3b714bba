//! # File Table Decoder
//!
//! Decodes `NT_PROCSTAT_FILES`, a packed array of `struct kinfo_file`.
//!
//! Only three fields of each element are read: the file kind, the descriptor
//! and the path. Their offsets are the same on every FreeBSD target.

use std::fmt;

use object::Endianness;
use tracing::debug;

use super::SizedElements;
use crate::error::{KinfoError, KinfoResult};
use crate::reader::ByteReader;

/// Offsets within `struct kinfo_file`
pub const KF_STRUCTSIZE: usize = 0x0;
pub const KF_TYPE: usize = 0x4;
pub const KF_FD: usize = 0x8;
/// Start of `kf_path`, also the smallest acceptable element size
pub const KF_PATH: usize = 0x170;

/// `kf_type` of a vnode (a filesystem object)
pub const KINFO_FILE_TYPE_VNODE: u32 = 1;

/// Kernel sentinels stored in `kf_fd` for entries that are not descriptors
pub const KINFO_FILE_FD_TYPE_CWD: i32 = -1;
pub const KINFO_FILE_FD_TYPE_ROOT: i32 = -2;
pub const KINFO_FILE_FD_TYPE_JAIL: i32 = -3;
pub const KINFO_FILE_FD_TYPE_TRACE: i32 = -4;
pub const KINFO_FILE_FD_TYPE_TEXT: i32 = -5;
pub const KINFO_FILE_FD_TYPE_CTTY: i32 = -6;

/// The `kf_fd` field: a real descriptor or one of the kernel sentinels
///
/// ```rust
/// use kinfo_core::notes::files::FileDescriptor;
///
/// assert_eq!(FileDescriptor::from_raw(-1), FileDescriptor::Cwd);
/// assert_eq!(FileDescriptor::Text.raw(), -5);
/// assert_eq!(FileDescriptor::from_raw(3).to_string(), "3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileDescriptor
{
    /// An ordinary open descriptor
    Fd(i32),
    /// Current working directory
    Cwd,
    /// Root directory
    Root,
    /// Jail root directory
    Jail,
    /// ktrace vnode
    Trace,
    /// Executable text
    Text,
    /// Controlling terminal
    Ctty,
}

impl FileDescriptor
{
    pub fn from_raw(fd: i32) -> Self
    {
        match fd {
            KINFO_FILE_FD_TYPE_CWD => FileDescriptor::Cwd,
            KINFO_FILE_FD_TYPE_ROOT => FileDescriptor::Root,
            KINFO_FILE_FD_TYPE_JAIL => FileDescriptor::Jail,
            KINFO_FILE_FD_TYPE_TRACE => FileDescriptor::Trace,
            KINFO_FILE_FD_TYPE_TEXT => FileDescriptor::Text,
            KINFO_FILE_FD_TYPE_CTTY => FileDescriptor::Ctty,
            fd => FileDescriptor::Fd(fd),
        }
    }

    pub fn raw(self) -> i32
    {
        match self {
            FileDescriptor::Fd(fd) => fd,
            FileDescriptor::Cwd => KINFO_FILE_FD_TYPE_CWD,
            FileDescriptor::Root => KINFO_FILE_FD_TYPE_ROOT,
            FileDescriptor::Jail => KINFO_FILE_FD_TYPE_JAIL,
            FileDescriptor::Trace => KINFO_FILE_FD_TYPE_TRACE,
            FileDescriptor::Text => KINFO_FILE_FD_TYPE_TEXT,
            FileDescriptor::Ctty => KINFO_FILE_FD_TYPE_CTTY,
        }
    }
}

impl fmt::Display for FileDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            FileDescriptor::Fd(fd) => f.pad(&fd.to_string()),
            FileDescriptor::Cwd => f.pad("cwd"),
            FileDescriptor::Root => f.pad("root"),
            FileDescriptor::Jail => f.pad("jail"),
            FileDescriptor::Trace => f.pad("trace"),
            FileDescriptor::Text => f.pad("text"),
            FileDescriptor::Ctty => f.pad("ctty"),
        }
    }
}

/// The `kf_type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind
{
    None,
    Vnode,
    Socket,
    Pipe,
    Fifo,
    Kqueue,
    Crypto,
    Mqueue,
    Shm,
    Sem,
    Pts,
    Procdesc,
    Dev,
    Eventfd,
    Other(u32),
}

impl FileKind
{
    pub fn from_raw(kind: u32) -> Self
    {
        match kind {
            0 => FileKind::None,
            KINFO_FILE_TYPE_VNODE => FileKind::Vnode,
            2 => FileKind::Socket,
            3 => FileKind::Pipe,
            4 => FileKind::Fifo,
            5 => FileKind::Kqueue,
            6 => FileKind::Crypto,
            7 => FileKind::Mqueue,
            8 => FileKind::Shm,
            9 => FileKind::Sem,
            10 => FileKind::Pts,
            11 => FileKind::Procdesc,
            12 => FileKind::Dev,
            13 => FileKind::Eventfd,
            other => FileKind::Other(other),
        }
    }
}

impl fmt::Display for FileKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            FileKind::None => "none",
            FileKind::Vnode => "vnode",
            FileKind::Socket => "socket",
            FileKind::Pipe => "pipe",
            FileKind::Fifo => "fifo",
            FileKind::Kqueue => "kqueue",
            FileKind::Crypto => "crypto",
            FileKind::Mqueue => "mqueue",
            FileKind::Shm => "shm",
            FileKind::Sem => "sem",
            FileKind::Pts => "pts",
            FileKind::Procdesc => "procdesc",
            FileKind::Dev => "dev",
            FileKind::Eventfd => "eventfd",
            FileKind::Other(kind) => return f.pad(&format!("type {kind}")),
        };
        f.pad(name)
    }
}

/// One element of the open-file table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFileEntry
{
    pub descriptor: FileDescriptor,
    pub kind: FileKind,
    /// Path of the file; empty for anonymous objects such as sockets
    pub path: String,
}

/// Lazy iterator over the entries of a file-table note
///
/// Same variable-stride rules as the VM map: every element's declared size
/// must cover [`KF_PATH`] and stay inside the note.
#[derive(Debug, Clone)]
pub struct FileEntries<'a>
{
    elements: SizedElements<'a>,
    endian: Endianness,
}

impl<'a> FileEntries<'a>
{
    pub fn new(note: &'a [u8], endian: Endianness) -> KinfoResult<Self>
    {
        Ok(Self {
            elements: SizedElements::new(note, KF_PATH, endian, "file table")?,
            endian,
        })
    }
}

impl Iterator for FileEntries<'_>
{
    type Item = KinfoResult<OpenFileEntry>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let element = self.elements.next()?;
        Some(element.and_then(|element| {
            let reader = ByteReader::new(element, self.endian);
            Ok(OpenFileEntry {
                descriptor: FileDescriptor::from_raw(reader.i32(KF_FD)?),
                kind: FileKind::from_raw(reader.u32(KF_TYPE)?),
                path: reader.cstr(KF_PATH, element.len() - KF_PATH)?,
            })
        }))
    }
}

/// Decode every entry of a file-table note, in on-disk order
pub fn decode_files(note: &[u8], endian: Endianness) -> KinfoResult<Vec<OpenFileEntry>>
{
    FileEntries::new(note, endian)?.collect()
}

/// Find the path of the vnode open on `descriptor`
///
/// Pass [`KINFO_FILE_FD_TYPE_CWD`] for the working directory or
/// [`KINFO_FILE_FD_TYPE_TEXT`] for the executable. Only vnode entries match;
/// the first match wins.
///
/// ## Errors
///
/// - `NotFound` if no vnode entry has that descriptor
/// - `Malformed` if an element before the match is malformed
///
/// ## Example
///
/// ```rust
/// use kinfo_core::notes::files::{find_vnode_path, KF_PATH, KINFO_FILE_FD_TYPE_CWD};
/// use object::Endianness;
///
/// let size = KF_PATH + 8;
/// let mut note = vec![0u8; 4 + size];
/// note[4..8].copy_from_slice(&(size as u32).to_le_bytes());
/// note[8..12].copy_from_slice(&1u32.to_le_bytes());
/// note[12..16].copy_from_slice(&(-1i32).to_le_bytes());
/// note[4 + KF_PATH..4 + KF_PATH + 4].copy_from_slice(b"/tmp");
///
/// let cwd = find_vnode_path(&note, KINFO_FILE_FD_TYPE_CWD, Endianness::Little).unwrap();
/// assert_eq!(cwd, "/tmp");
/// ```
pub fn find_vnode_path(note: &[u8], descriptor: i32, endian: Endianness) -> KinfoResult<String>
{
    for entry in FileEntries::new(note, endian)? {
        let entry = entry?;
        if entry.kind == FileKind::Vnode && entry.descriptor.raw() == descriptor {
            debug!("descriptor {} resolves to {}", entry.descriptor, entry.path);
            return Ok(entry.path);
        }
    }
    Err(KinfoError::NotFound(format!(
        "no vnode for descriptor {}",
        FileDescriptor::from_raw(descriptor)
    )))
}
