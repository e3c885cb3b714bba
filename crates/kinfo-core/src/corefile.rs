//! # Core File Adapter
//!
//! Locates the FreeBSD notes of an ELF core file and hands them to the
//! decoders.
//!
//! The ELF container is parsed with the `object` crate. Every `PT_NOTE`
//! segment is walked; notes whose owner is not `FreeBSD` are ignored.
//! Process-wide notes are kept by type (first occurrence wins). Per-thread
//! notes follow the kernel's dump order: a thread's `NT_PRSTATUS` comes first
//! and every per-thread note after it, up to the next prstatus, belongs to
//! the same LWP.
//!
//! ## Example
//!
//! ```rust,no_run
//! use kinfo_core::corefile::CoreFile;
//!
//! let core = CoreFile::open("prog.core")?;
//! let status = core.process_info()?;
//! println!("{} is pid {}", status.command, status.pid);
//! # Ok::<(), kinfo_core::error::KinfoError>(())
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use object::elf::{FileHeader32, FileHeader64, PT_NOTE};
use object::read::elf::{FileHeader, ProgramHeader};
use object::{Endianness, FileKind};
use tracing::{debug, info, warn};

use crate::abi::{create_abi, AbiParams, CoreAbi};
use crate::auxv::{decode_auxv, AuxvEntry};
use crate::error::{KinfoError, KinfoResult};
use crate::notes::files::{decode_files, find_vnode_path, OpenFileEntry, KINFO_FILE_FD_TYPE_CWD, KINFO_FILE_FD_TYPE_TEXT};
use crate::notes::proc::decode_process_info;
use crate::notes::status::{decode_prpsinfo, decode_prstatus, PrPsInfo, PrStatus};
use crate::notes::vmmap::decode_vm_map;
use crate::notes::{
    note_type_name, ELFOSABI_FREEBSD, FREEBSD_NOTE_NAME, NT_ARM_VFP, NT_FPREGSET, NT_PPC_VMX, NT_PROCSTAT_AUXV,
    NT_PROCSTAT_FILES, NT_PROCSTAT_PROC, NT_PROCSTAT_VMMAP, NT_PRPSINFO, NT_PRSTATUS, NT_PTLWPINFO, NT_THRMISC,
    NT_X86_XSTATE,
};
use crate::siginfo::SigInfo;
use crate::types::{Architecture, LwpId, MemoryRegion, ProcessId, ProcessSnapshot, Ptid};

/// Notes belonging to one thread of the dumped process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadNotes
{
    pub lwp: LwpId,
    /// Raw `NT_PRSTATUS` descriptor
    pub prstatus: Vec<u8>,
    pub thrmisc: Option<Vec<u8>>,
    pub lwpinfo: Option<Vec<u8>>,
    /// Every other per-thread note (register sets), by note type
    pub registers: Vec<(u32, Vec<u8>)>,
}

/// The FreeBSD notes of one core file
pub struct CoreFile
{
    abi: Box<dyn CoreAbi>,
    os_abi: u8,
    process_notes: BTreeMap<u32, Vec<u8>>,
    threads: Vec<ThreadNotes>,
}

impl std::fmt::Debug for CoreFile
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("CoreFile")
            .field("params", self.abi.params())
            .field("os_abi", &self.os_abi)
            .field("process_notes", &self.process_notes.keys().collect::<Vec<_>>())
            .field("threads", &self.threads.len())
            .finish()
    }
}

/// Notes collected from the container before ABI-aware decoding
struct RawNotes
{
    params: AbiParams,
    os_abi: u8,
    notes: Vec<(u32, Vec<u8>)>,
}

impl CoreFile
{
    /// Read and parse a core file from disk
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`CoreFile::parse`].
    pub fn open(path: impl AsRef<Path>) -> KinfoResult<Self>
    {
        let path = path.as_ref();
        info!("reading core file {}", path.display());
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Parse an in-memory ELF core file
    ///
    /// ## Errors
    ///
    /// - `Container` if the ELF structure is invalid
    /// - `InvalidArgument` if the file is not a 32- or 64-bit ELF file
    ///
    /// A thread whose prstatus note cannot be decoded is skipped with a
    /// warning, together with the per-thread notes that follow it.
    pub fn parse(data: &[u8]) -> KinfoResult<Self>
    {
        Self::parse_with(data, None)
    }

    /// Parse, overriding the architecture read from `e_machine`
    ///
    /// Useful for cores whose machine field this crate does not recognize.
    pub fn parse_with(data: &[u8], architecture: Option<Architecture>) -> KinfoResult<Self>
    {
        let raw = match FileKind::parse(data)? {
            FileKind::Elf32 => collect_notes::<FileHeader32<Endianness>>(data)?,
            FileKind::Elf64 => collect_notes::<FileHeader64<Endianness>>(data)?,
            other => {
                return Err(KinfoError::InvalidArgument(format!("not an ELF core file ({other:?})")));
            }
        };
        let params = AbiParams {
            architecture: architecture.unwrap_or(raw.params.architecture),
            ..raw.params
        };
        debug!("core ABI: {params}, {} FreeBSD notes", raw.notes.len());
        if raw.os_abi != ELFOSABI_FREEBSD {
            warn!("EI_OSABI is {}, not FreeBSD ({ELFOSABI_FREEBSD})", raw.os_abi);
        }

        let mut process_notes = BTreeMap::new();
        let mut threads: Vec<ThreadNotes> = Vec::new();
        // False after a bad prstatus, until the next one
        let mut in_thread = false;
        for (n_type, desc) in raw.notes {
            match n_type {
                NT_PRSTATUS => match decode_prstatus(&desc, &params) {
                    Ok(status) => {
                        threads.push(ThreadNotes {
                            lwp: status.lwp,
                            prstatus: desc,
                            thrmisc: None,
                            lwpinfo: None,
                            registers: Vec::new(),
                        });
                        in_thread = true;
                    }
                    Err(err) => {
                        warn!("skipping thread with unreadable prstatus note: {err}");
                        in_thread = false;
                    }
                },
                _ if is_thread_note(n_type) => match threads.last_mut().filter(|_| in_thread) {
                    Some(thread) => match n_type {
                        NT_THRMISC => thread.thrmisc = Some(desc),
                        NT_PTLWPINFO => thread.lwpinfo = Some(desc),
                        _ => thread.registers.push((n_type, desc)),
                    },
                    None => debug!("ignoring {} outside a thread", note_type_name(n_type)),
                },
                _ => {
                    process_notes.entry(n_type).or_insert(desc);
                }
            }
        }

        Ok(Self {
            abi: create_abi(params),
            os_abi: raw.os_abi,
            process_notes,
            threads,
        })
    }

    pub fn abi(&self) -> &dyn CoreAbi
    {
        self.abi.as_ref()
    }

    pub fn params(&self) -> &AbiParams
    {
        self.abi.params()
    }

    /// `EI_OSABI` of the ELF header
    pub fn os_abi(&self) -> u8
    {
        self.os_abi
    }

    /// Raw descriptor of a process-wide note
    ///
    /// ## Errors
    ///
    /// `Unavailable` if the core has no such note.
    pub fn note(&self, n_type: u32) -> KinfoResult<&[u8]>
    {
        self.process_notes
            .get(&n_type)
            .map(Vec::as_slice)
            .ok_or_else(|| KinfoError::Unavailable(format!("core file has no {} note", note_type_name(n_type))))
    }

    pub fn process_info(&self) -> KinfoResult<ProcessSnapshot>
    {
        decode_process_info(self.note(NT_PROCSTAT_PROC)?, self.params())
    }

    pub fn vm_map(&self) -> KinfoResult<Vec<MemoryRegion>>
    {
        decode_vm_map(self.note(NT_PROCSTAT_VMMAP)?, self.params().endian)
    }

    pub fn files(&self) -> KinfoResult<Vec<OpenFileEntry>>
    {
        decode_files(self.note(NT_PROCSTAT_FILES)?, self.params().endian)
    }

    /// Current working directory from the file table
    pub fn cwd(&self) -> KinfoResult<String>
    {
        find_vnode_path(self.note(NT_PROCSTAT_FILES)?, KINFO_FILE_FD_TYPE_CWD, self.params().endian)
    }

    /// Executable path from the file table
    pub fn exe(&self) -> KinfoResult<String>
    {
        find_vnode_path(self.note(NT_PROCSTAT_FILES)?, KINFO_FILE_FD_TYPE_TEXT, self.params().endian)
    }

    pub fn auxv(&self) -> KinfoResult<Vec<AuxvEntry>>
    {
        decode_auxv(self.note(NT_PROCSTAT_AUXV)?, self.params())
    }

    pub fn prpsinfo(&self) -> KinfoResult<PrPsInfo>
    {
        decode_prpsinfo(self.note(NT_PRPSINFO)?, self.params())
    }

    /// Process id, from prpsinfo when present, else the process-info note
    pub fn pid(&self) -> Option<ProcessId>
    {
        self.prpsinfo()
            .ok()
            .and_then(|info| info.pid)
            .or_else(|| self.process_info().ok().map(|snapshot| snapshot.pid))
            .map(ProcessId)
    }

    /// Threads in dump order; the first is the one the kernel considered
    /// signalled
    pub fn threads(&self) -> &[ThreadNotes]
    {
        &self.threads
    }

    /// ## Errors
    ///
    /// `NotFound` if no thread has that LWP id.
    pub fn thread(&self, lwp: LwpId) -> KinfoResult<&ThreadNotes>
    {
        self.threads
            .iter()
            .find(|thread| thread.lwp == lwp)
            .ok_or_else(|| KinfoError::NotFound(format!("no thread with LWP {}", lwp.raw())))
    }

    pub fn ptid(&self, thread: &ThreadNotes) -> Ptid
    {
        Ptid::new(self.pid().unwrap_or_default(), thread.lwp)
    }

    pub fn prstatus(&self, thread: &ThreadNotes) -> KinfoResult<PrStatus>
    {
        decode_prstatus(&thread.prstatus, self.params())
    }

    /// Thread name, or `None` if unnamed or named after the program
    pub fn thread_name(&self, thread: &ThreadNotes) -> Option<String>
    {
        let program = self.prpsinfo().map(|info| info.fname).unwrap_or_default();
        thread
            .thrmisc
            .as_deref()
            .and_then(|thrmisc| self.abi.core_thread_name(thrmisc, &program))
    }

    /// Decoded siginfo of a thread
    ///
    /// ## Errors
    ///
    /// `Unavailable` if the thread has no lwp-info note or no valid siginfo.
    pub fn siginfo(&self, thread: &ThreadNotes) -> KinfoResult<SigInfo>
    {
        let note = thread
            .lwpinfo
            .as_deref()
            .ok_or_else(|| KinfoError::Unavailable(format!("LWP {} has no lwpinfo note", thread.lwp.raw())))?;
        let bytes = self.abi.core_xfer_siginfo(note, 0, usize::MAX)?;
        SigInfo::decode(&bytes, self.abi.siginfo_type(), self.params().endian)
    }
}

/// Per-thread note types other than prstatus
///
/// Anything not listed is kept as a process-wide note.
fn is_thread_note(n_type: u32) -> bool
{
    matches!(
        n_type,
        NT_FPREGSET | NT_THRMISC | NT_PTLWPINFO | NT_X86_XSTATE | NT_PPC_VMX | NT_ARM_VFP
    )
}

fn collect_notes<Elf>(data: &[u8]) -> KinfoResult<RawNotes>
where
    Elf: FileHeader<Endian = Endianness>,
{
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let machine = header.e_machine(endian);
    let (address_bits, long_bits) = if header.is_class_64() { (64, 64) } else { (32, 32) };
    let params = AbiParams::new(address_bits, long_bits, Architecture::from_elf_machine(machine), endian);

    let mut notes = Vec::new();
    for segment in header.program_headers(endian, data)? {
        if segment.p_type(endian) != PT_NOTE {
            continue;
        }
        let Some(mut iter) = segment.notes(endian, data)? else {
            continue;
        };
        while let Some(note) = iter.next()? {
            if note.name() != FREEBSD_NOTE_NAME.as_bytes() {
                continue;
            }
            notes.push((note.n_type(endian), note.desc().to_vec()));
        }
    }

    Ok(RawNotes {
        params,
        os_abi: header.e_ident().os_abi,
        notes,
    })
}
