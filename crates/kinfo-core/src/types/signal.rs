//! Canonical, target-independent signal enumeration.

use std::fmt;

/// Lowest real-time signal number the canonical enumeration can name
pub const REALTIME_MIN: u8 = 32;
/// Highest real-time signal number the canonical enumeration can name
pub const REALTIME_MAX: u8 = 127;

/// A signal, independent of any one kernel's numbering
///
/// Target signal numbers differ between operating systems (FreeBSD's SIGSTOP
/// is 17, Linux's is 19), so decoded notes are translated into this
/// enumeration with [`crate::signals::to_canonical`] and back with
/// [`crate::signals::from_canonical`].
///
/// Some variants have no FreeBSD equivalent (`Pwr`, `Lost`, ...). They exist so
/// the translator can report them as unrepresentable instead of guessing.
///
/// ```rust
/// use kinfo_core::types::Signal;
///
/// assert_eq!(Signal::Segv.to_string(), "SIGSEGV");
/// assert_eq!(Signal::Realtime(65).to_string(), "SIG65");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal
{
    /// No signal (signal number 0)
    None,
    Hup,
    Int,
    Quit,
    Ill,
    Trap,
    Abrt,
    Emt,
    Fpe,
    Kill,
    Bus,
    Segv,
    Sys,
    Pipe,
    Alrm,
    Term,
    Urg,
    Stop,
    Tstp,
    Cont,
    Chld,
    Ttin,
    Ttou,
    Io,
    Xcpu,
    Xfsz,
    Vtalrm,
    Prof,
    Winch,
    Info,
    Usr1,
    Usr2,
    /// Thread library signal (FreeBSD SIGTHR)
    Lwp,
    /// Real-time library signal (FreeBSD SIGLIBRT)
    Librt,
    /// Protection fault signal (FreeBSD SIGPROT)
    Prot,
    /// Power failure
    Pwr,
    /// Resource lost
    Lost,
    /// Solaris-style thread waiting signal
    Waiting,
    /// Thread cancellation signal
    Cancel,
    /// Real-time signal, carrying its canonical number
    /// ([`REALTIME_MIN`]..=[`REALTIME_MAX`])
    Realtime(u8),
    /// A target signal number no table entry covers
    Unknown,
}

impl Signal
{
    /// Conventional name of the signal (`SIGHUP`, `SIG65`, ...)
    pub fn name(self) -> String
    {
        let fixed = match self {
            Signal::None => "0",
            Signal::Hup => "SIGHUP",
            Signal::Int => "SIGINT",
            Signal::Quit => "SIGQUIT",
            Signal::Ill => "SIGILL",
            Signal::Trap => "SIGTRAP",
            Signal::Abrt => "SIGABRT",
            Signal::Emt => "SIGEMT",
            Signal::Fpe => "SIGFPE",
            Signal::Kill => "SIGKILL",
            Signal::Bus => "SIGBUS",
            Signal::Segv => "SIGSEGV",
            Signal::Sys => "SIGSYS",
            Signal::Pipe => "SIGPIPE",
            Signal::Alrm => "SIGALRM",
            Signal::Term => "SIGTERM",
            Signal::Urg => "SIGURG",
            Signal::Stop => "SIGSTOP",
            Signal::Tstp => "SIGTSTP",
            Signal::Cont => "SIGCONT",
            Signal::Chld => "SIGCHLD",
            Signal::Ttin => "SIGTTIN",
            Signal::Ttou => "SIGTTOU",
            Signal::Io => "SIGIO",
            Signal::Xcpu => "SIGXCPU",
            Signal::Xfsz => "SIGXFSZ",
            Signal::Vtalrm => "SIGVTALRM",
            Signal::Prof => "SIGPROF",
            Signal::Winch => "SIGWINCH",
            Signal::Info => "SIGINFO",
            Signal::Usr1 => "SIGUSR1",
            Signal::Usr2 => "SIGUSR2",
            Signal::Lwp => "SIGLWP",
            Signal::Librt => "SIGLIBRT",
            Signal::Prot => "SIGPROT",
            Signal::Pwr => "SIGPWR",
            Signal::Lost => "SIGLOST",
            Signal::Waiting => "SIGWAITING",
            Signal::Cancel => "SIGCANCEL",
            Signal::Realtime(n) => return format!("SIG{n}"),
            Signal::Unknown => "?",
        };
        fixed.to_string()
    }

    /// Whether a thread stopped with this signal counts as "signalled"
    pub fn is_pending(self) -> bool
    {
        self != Signal::None
    }
}

impl fmt::Display for Signal
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.name())
    }
}
