//! Process, thread, and architecture identity types.

use std::fmt;
use std::str::FromStr;

/// Process identifier (PID)
///
/// FreeBSD `pid_t` is a signed 32-bit integer, but every valid PID is
/// positive, so the newtype stores it unsigned.
///
/// ## Why wrap it in a struct?
///
/// - **Type safety**: Prevents accidentally passing an LWP id where a PID is expected
/// - **Self-documenting code**: Makes it clear what the value represents
///
/// ```rust
/// use kinfo_core::types::ProcessId;
///
/// let pid = ProcessId::from(12345);
/// assert_eq!(u32::from(pid), 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Light-weight process (kernel thread) identifier
///
/// Per-thread notes in a FreeBSD core are keyed by LWP id, which the kernel
/// stores in the `pr_pid` field of each thread's prstatus note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct LwpId(pub u64);

impl LwpId
{
    /// Get the raw `u64` representation of the LWP id
    pub fn raw(&self) -> u64
    {
        self.0
    }
}

impl From<u64> for LwpId
{
    fn from(value: u64) -> Self
    {
        Self(value)
    }
}

/// Process/thread pair identifying one thread of a (possibly dead) process
///
/// An LWP of zero means "the process as a whole", which is how a core file
/// without per-thread notes is presented.
///
/// ```rust
/// use kinfo_core::types::{LwpId, ProcessId, Ptid};
///
/// assert_eq!(Ptid::new(ProcessId(7), LwpId(100123)).to_string(), "LWP 100123");
/// assert_eq!(Ptid::new(ProcessId(7), LwpId(0)).to_string(), "process 7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ptid
{
    pub pid: ProcessId,
    pub lwp: LwpId,
}

impl Ptid
{
    pub fn new(pid: ProcessId, lwp: LwpId) -> Self
    {
        Self { pid, lwp }
    }
}

impl fmt::Display for Ptid
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.lwp.0 != 0 {
            write!(f, "LWP {}", self.lwp.0)
        } else {
            write!(f, "process {}", self.pid.0)
        }
    }
}

/// CPU architecture of the process that produced the core
///
/// Only one distinction actually changes how notes are decoded: i386 keeps a
/// 32-bit `time_t`, so its `kinfo_proc` layout and `struct timeval` differ
/// from every other 32-bit FreeBSD target. The remaining variants are carried
/// for reporting and for selecting register note names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 32-bit x86 (the legacy 32-bit `time_t` ABI)
    I386,
    /// 64-bit x86
    X86_64,
    /// 32-bit ARM
    Arm,
    /// 64-bit ARM
    Arm64,
    /// 32-bit PowerPC
    PowerPc,
    /// 64-bit PowerPC
    PowerPc64,
    /// MIPS (either width)
    Mips,
    /// 64-bit RISC-V
    RiscV64,
    /// 64-bit SPARC
    Sparc64,
    /// Any other architecture
    ///
    /// The `&'static str` contains a human readable name.
    Unknown(&'static str),
}

impl Architecture
{
    /// Map an ELF `e_machine` value to an architecture
    ///
    /// ```rust
    /// use kinfo_core::types::Architecture;
    ///
    /// assert_eq!(Architecture::from_elf_machine(object::elf::EM_386), Architecture::I386);
    /// assert_eq!(Architecture::from_elf_machine(object::elf::EM_X86_64), Architecture::X86_64);
    /// ```
    pub fn from_elf_machine(machine: u16) -> Self
    {
        match machine {
            object::elf::EM_386 => Architecture::I386,
            object::elf::EM_X86_64 => Architecture::X86_64,
            object::elf::EM_ARM => Architecture::Arm,
            object::elf::EM_AARCH64 => Architecture::Arm64,
            object::elf::EM_PPC => Architecture::PowerPc,
            object::elf::EM_PPC64 => Architecture::PowerPc64,
            object::elf::EM_MIPS => Architecture::Mips,
            object::elf::EM_RISCV => Architecture::RiscV64,
            object::elf::EM_SPARCV9 => Architecture::Sparc64,
            _ => Architecture::Unknown("unknown"),
        }
    }

    /// Whether this is the i386 target with the legacy 32-bit `time_t`
    pub fn is_i386(self) -> bool
    {
        matches!(self, Architecture::I386)
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::I386 => write!(f, "i386"),
            Architecture::X86_64 => write!(f, "amd64"),
            Architecture::Arm => write!(f, "arm"),
            Architecture::Arm64 => write!(f, "aarch64"),
            Architecture::PowerPc => write!(f, "powerpc"),
            Architecture::PowerPc64 => write!(f, "powerpc64"),
            Architecture::Mips => write!(f, "mips"),
            Architecture::RiscV64 => write!(f, "riscv64"),
            Architecture::Sparc64 => write!(f, "sparc64"),
            Architecture::Unknown(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Architecture
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "i386" | "x86" | "i686" => Ok(Architecture::I386),
            "amd64" | "x86_64" | "x86-64" => Ok(Architecture::X86_64),
            "arm" | "armv7" | "armv6" => Ok(Architecture::Arm),
            "aarch64" | "arm64" => Ok(Architecture::Arm64),
            "powerpc" | "ppc" => Ok(Architecture::PowerPc),
            "powerpc64" | "ppc64" => Ok(Architecture::PowerPc64),
            "mips" | "mips64" => Ok(Architecture::Mips),
            "riscv" | "riscv64" => Ok(Architecture::RiscV64),
            "sparc64" => Ok(Architecture::Sparc64),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}
