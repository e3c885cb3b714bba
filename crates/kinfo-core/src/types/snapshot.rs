//! Process status decoded from the process-info note.

use std::fmt;

use smallvec::SmallVec;

/// Capacity of `ki_groups` (`KI_NGROUPS` in `<sys/user.h>`)
pub const KI_NGROUPS: usize = 16;

/// Number of 32-bit words in a signal set (`_SIG_WORDS`, same on all targets)
pub const SIG_WORDS: usize = 4;

/// A `struct timeval`, normalized to 64-bit fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Timeval
{
    pub seconds: i64,
    pub microseconds: u64,
}

impl fmt::Display for Timeval
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}.{:06}", self.seconds, self.microseconds)
    }
}

/// The subset of `struct rusage` carried into reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ResourceUsage
{
    pub user_time: Timeval,
    pub system_time: Timeval,
    /// Maximum resident set size
    pub max_rss: u64,
    /// Page reclaims (no I/O)
    pub minor_faults: u64,
    /// Page faults requiring I/O
    pub major_faults: u64,
}

/// A kernel `sigset_t`: 128 signal bits in four 32-bit words
///
/// ```rust
/// use kinfo_core::types::SignalSet;
///
/// let set = SignalSet::new([0x0000_0101, 0, 0, 0]);
/// assert!(set.contains(1));
/// assert!(set.contains(9));
/// assert!(!set.contains(2));
/// assert_eq!(set.to_string(), "00000101 00000000 00000000 00000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SignalSet([u32; SIG_WORDS]);

impl SignalSet
{
    pub fn new(words: [u32; SIG_WORDS]) -> Self
    {
        Self(words)
    }

    pub fn words(&self) -> [u32; SIG_WORDS]
    {
        self.0
    }

    /// Whether target signal `signo` (1-based) is a member
    pub fn contains(&self, signo: u32) -> bool
    {
        if signo == 0 {
            return false;
        }
        let bit = signo - 1;
        self.0
            .get((bit / 32) as usize)
            .is_some_and(|word| word & (1 << (bit % 32)) != 0)
    }

    pub fn is_empty(&self) -> bool
    {
        self.0.iter().all(|&word| word == 0)
    }
}

impl fmt::Display for SignalSet
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let words: Vec<String> = self.0.iter().map(|word| format!("{word:08x}")).collect();
        f.write_str(&words.join(" "))
    }
}

/// Process identity, credentials and resource usage from one `kinfo_proc`
///
/// Built by [`crate::notes::proc::decode_process_info`]. Every field is
/// decoded or the whole decode fails; there is no partially filled snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot
{
    pub pid: u32,
    pub ppid: u32,
    pub pgid: u32,
    /// Session id
    pub sid: u32,
    /// Process group owning the controlling terminal
    pub tpgid: u32,
    /// Controlling terminal device number
    pub tty_device: u64,
    pub real_uid: u32,
    pub effective_uid: u32,
    pub saved_uid: u32,
    pub real_gid: u32,
    /// First entry of the group list
    pub effective_gid: u32,
    pub saved_gid: u32,
    pub groups: SmallVec<[u32; KI_NGROUPS]>,
    pub ignored_signals: SignalSet,
    pub caught_signals: SignalSet,
    /// Virtual memory size in bytes
    pub virtual_size: u64,
    /// Resident set size in pages
    pub resident_size: u64,
    /// Text size in pages
    pub text_size: u64,
    /// Data size in pages
    pub data_size: u64,
    /// Stack size in pages
    pub stack_size: u64,
    pub start_time: Timeval,
    pub nice: i8,
    /// Command name, at most 19 bytes
    pub command: String,
    pub usage: ResourceUsage,
    pub children_usage: ResourceUsage,
}
