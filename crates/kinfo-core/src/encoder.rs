//! # Core Note Encoder
//!
//! The inverse of the note decoders: serialize a stopped live process into
//! the note payload of a FreeBSD core file.
//!
//! The live process is reached through [`LiveTarget`], which only knows how
//! to enumerate threads and hand out raw register sets. The encoder decides
//! what goes into the buffer and in which order:
//!
//! 1. one `NT_PRPSINFO` note, if the executable is known
//! 2. the notes of the signalled thread (the current thread if it has a
//!    pending signal, else the first thread that does, else the current one)
//! 3. the notes of every other thread of the same process, in enumeration
//!    order
//!
//! Each register set becomes one note. The general register set is wrapped
//! in an `NT_PRSTATUS` record carrying the LWP id and the stop signal of the
//! signalled thread. Tools infer the faulting thread from the first
//! prstatus note, so the ordering above matters.

use object::endian::{Endian, Endianness};
use tracing::{debug, warn};

use crate::abi::CoreAbi;
use crate::error::KinfoResult;
use crate::notes::status::{encode_prpsinfo, encode_prstatus};
use crate::notes::{note_type_name, FREEBSD_NOTE_NAME, NT_PRPSINFO, NT_PRSTATUS};
use crate::reader::{read_bytes, read_cstr, read_u32};
use crate::types::{ProcessId, Ptid, Signal};

/// Registers of one register set, as the target's regset collector produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSet
{
    /// Core section name: `.reg`, `.reg2`, `.reg-xstate`, ...
    pub section: String,
    pub data: Vec<u8>,
}

impl RegisterSet
{
    pub fn new(section: impl Into<String>, data: Vec<u8>) -> Self
    {
        Self {
            section: section.into(),
            data,
        }
    }
}

/// One live thread and the signal it stopped with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadState
{
    pub ptid: Ptid,
    /// `Signal::None` if the thread has no pending signal
    pub stop_signal: Signal,
}

/// A stopped live process the encoder can query
///
/// ## Lifecycle
///
/// The encoder calls [`LiveTarget::update_thread_list`] once, then reads
/// [`LiveTarget::threads`] and fetches register sets thread by thread. The
/// target is assumed to stay stopped for the whole call.
pub trait LiveTarget
{
    /// Path of the executable, if known
    fn exec_file(&self) -> Option<String>;

    /// Arguments the process was started with (without the program name)
    fn inferior_args(&self) -> Option<String>;

    fn pid(&self) -> ProcessId;

    /// The thread the user is focused on
    fn current_thread(&self) -> ThreadState;

    /// Re-enumerate the threads of the process
    ///
    /// ## Errors
    ///
    /// Any failure is logged by the encoder and treated as "no additional
    /// threads".
    fn update_thread_list(&mut self) -> KinfoResult<()>;

    /// Known threads, in enumeration order
    fn threads(&self) -> Vec<ThreadState>;

    /// Every register set of one thread
    ///
    /// ## Errors
    ///
    /// A failure skips that thread; notes of other threads are still written.
    fn register_sets(&mut self, thread: Ptid) -> KinfoResult<Vec<RegisterSet>>;
}

/// Growable buffer of ELF notes
///
/// Each note is the usual `n_namesz`/`n_descsz`/`n_type` header followed by
/// the NUL-terminated owner name and the descriptor, both padded to 4 bytes.
///
/// ```rust
/// use kinfo_core::encoder::NoteBuffer;
/// use object::Endianness;
///
/// let mut buffer = NoteBuffer::new(Endianness::Little);
/// buffer.push("FreeBSD", 7, b"worker\0");
/// assert_eq!(buffer.len(), 12 + 8 + 8);
///
/// let notes = buffer.entries().unwrap();
/// assert_eq!(notes[0].name, "FreeBSD");
/// assert_eq!(notes[0].desc, b"worker\0");
/// ```
#[derive(Debug, Clone)]
pub struct NoteBuffer
{
    endian: Endianness,
    data: Vec<u8>,
    count: usize,
}

/// A note read back out of a [`NoteBuffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry
{
    pub name: String,
    pub n_type: u32,
    pub desc: Vec<u8>,
}

const NOTE_ALIGN: usize = 4;

fn pad(len: usize) -> usize
{
    len.div_ceil(NOTE_ALIGN) * NOTE_ALIGN
}

impl NoteBuffer
{
    pub fn new(endian: Endianness) -> Self
    {
        Self {
            endian,
            data: Vec::new(),
            count: 0,
        }
    }

    /// Append one note
    pub fn push(&mut self, name: &str, n_type: u32, desc: &[u8])
    {
        let namesz = name.len() + 1;
        self.data.extend(self.endian.write_u32_bytes(namesz as u32));
        self.data.extend(self.endian.write_u32_bytes(desc.len() as u32));
        self.data.extend(self.endian.write_u32_bytes(n_type));

        let start = self.data.len();
        self.data.extend_from_slice(name.as_bytes());
        self.data.resize(start + pad(namesz), 0);

        let start = self.data.len();
        self.data.extend_from_slice(desc);
        self.data.resize(start + pad(desc.len()), 0);

        self.count += 1;
        debug!("wrote {} note ({} bytes)", note_type_name(n_type), desc.len());
    }

    pub fn len(&self) -> usize
    {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.data.is_empty()
    }

    /// Number of notes written so far
    pub fn note_count(&self) -> usize
    {
        self.count
    }

    pub fn as_bytes(&self) -> &[u8]
    {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8>
    {
        self.data
    }

    /// Parse the buffer back into notes
    ///
    /// ## Errors
    ///
    /// `OutOfRange` only if the buffer was corrupted after being written.
    pub fn entries(&self) -> KinfoResult<Vec<NoteEntry>>
    {
        let mut entries = Vec::with_capacity(self.count);
        let mut cursor = 0;
        while cursor < self.data.len() {
            let namesz = read_u32(&self.data, cursor, self.endian)? as usize;
            let descsz = read_u32(&self.data, cursor + 4, self.endian)? as usize;
            let n_type = read_u32(&self.data, cursor + 8, self.endian)?;
            let name_at = cursor + 12;
            let desc_at = name_at + pad(namesz);
            entries.push(NoteEntry {
                name: read_cstr(&self.data, name_at, namesz)?,
                n_type,
                desc: read_bytes(&self.data, desc_at, descsz)?.to_vec(),
            });
            cursor = desc_at + pad(descsz);
        }
        Ok(entries)
    }
}

/// Build the core-note payload for a stopped live process
///
/// Never fails as a whole: a thread-list refresh failure limits the output
/// to the current thread, a thread whose registers cannot be fetched is
/// skipped, and an untranslatable stop signal is written as 0. Each of these
/// is logged with `warn!`.
pub fn make_corefile_notes<A: CoreAbi + ?Sized>(abi: &A, target: &mut dyn LiveTarget) -> NoteBuffer
{
    let params = abi.params();
    let mut buffer = NoteBuffer::new(params.endian);

    if let Some(exec) = target.exec_file() {
        let fname = exec.rsplit('/').next().unwrap_or(exec.as_str());
        let psargs = match target.inferior_args() {
            Some(args) if !args.is_empty() => format!("{fname} {args}"),
            _ => fname.to_string(),
        };
        let desc = encode_prpsinfo(params, fname, &psargs, target.pid().0);
        buffer.push(FREEBSD_NOTE_NAME, NT_PRPSINFO, &desc);
    }

    let threads = match target.update_thread_list() {
        Ok(()) => target.threads(),
        Err(err) => {
            warn!("failed to refresh thread list, writing only the current thread: {err}");
            Vec::new()
        }
    };

    let current = target.current_thread();
    let signalled = if current.stop_signal.is_pending() {
        current
    } else {
        threads
            .iter()
            .find(|thread| thread.stop_signal.is_pending() && thread.ptid.pid == current.ptid.pid)
            .copied()
            .unwrap_or(current)
    };

    let cursig = abi.signal_to_target(signalled.stop_signal).unwrap_or_else(|err| {
        warn!("{err}; writing stop signal 0");
        0
    });
    debug!("signalled thread is {} ({})", signalled.ptid, signalled.stop_signal);

    write_thread(abi, target, &mut buffer, signalled.ptid, cursig);
    for thread in threads
        .iter()
        .filter(|thread| thread.ptid != signalled.ptid && thread.ptid.pid == current.ptid.pid)
    {
        write_thread(abi, target, &mut buffer, thread.ptid, cursig);
    }

    buffer
}

fn write_thread<A: CoreAbi + ?Sized>(
    abi: &A,
    target: &mut dyn LiveTarget,
    buffer: &mut NoteBuffer,
    ptid: Ptid,
    cursig: i32,
)
{
    let sets = match target.register_sets(ptid) {
        Ok(sets) => sets,
        Err(err) => {
            warn!("skipping {ptid}: cannot fetch registers: {err}");
            return;
        }
    };

    let fpregsetsz = sets
        .iter()
        .find(|set| set.section == ".reg2")
        .map_or(0, |set| set.data.len());

    for set in &sets {
        match abi.regset_note_type(&set.section) {
            Some(NT_PRSTATUS) => {
                let desc = encode_prstatus(abi.params(), ptid.lwp, cursig, &set.data, fpregsetsz);
                buffer.push(FREEBSD_NOTE_NAME, NT_PRSTATUS, &desc);
            }
            Some(n_type) => buffer.push(FREEBSD_NOTE_NAME, n_type, &set.data),
            None => warn!("no core note for register set {} of {ptid}", set.section),
        }
    }
}
