//! # Signal Number Translator
//!
//! Bidirectional mapping between FreeBSD signal numbers and [`Signal`].
//!
//! The named signals live in one constant table. The real-time band
//! (`SIGRTMIN` 65 to `SIGRTMAX` 126) is contiguous on FreeBSD, so it is
//! mapped by a constant offset instead of 62 individual rows.
//!
//! ## Example
//!
//! ```rust
//! use kinfo_core::signals::{from_canonical, to_canonical};
//! use kinfo_core::types::Signal;
//!
//! assert_eq!(to_canonical(17), Signal::Stop);
//! assert_eq!(from_canonical(Signal::Stop).unwrap(), 17);
//! assert_eq!(to_canonical(70), Signal::Realtime(70));
//! assert_eq!(to_canonical(200), Signal::Unknown);
//! assert!(from_canonical(Signal::Pwr).is_err());
//! ```

use crate::error::{KinfoError, KinfoResult};
use crate::types::Signal;

/// First FreeBSD real-time signal (`SIGRTMIN`)
pub const FREEBSD_SIGRTMIN: i32 = 65;
/// Last FreeBSD real-time signal (`SIGRTMAX`)
pub const FREEBSD_SIGRTMAX: i32 = 126;

/// Distance from a FreeBSD real-time number to the canonical one
///
/// Zero: the canonical real-time numbering matches FreeBSD's.
const REALTIME_OFFSET: i32 = 0;

/// FreeBSD signal numbers, from `<sys/signal.h>`
pub static SIGNAL_TABLE: &[(i32, Signal)] = &[
    (0, Signal::None),
    (1, Signal::Hup),
    (2, Signal::Int),
    (3, Signal::Quit),
    (4, Signal::Ill),
    (5, Signal::Trap),
    (6, Signal::Abrt),
    (7, Signal::Emt),
    (8, Signal::Fpe),
    (9, Signal::Kill),
    (10, Signal::Bus),
    (11, Signal::Segv),
    (12, Signal::Sys),
    (13, Signal::Pipe),
    (14, Signal::Alrm),
    (15, Signal::Term),
    (16, Signal::Urg),
    (17, Signal::Stop),
    (18, Signal::Tstp),
    (19, Signal::Cont),
    (20, Signal::Chld),
    (21, Signal::Ttin),
    (22, Signal::Ttou),
    (23, Signal::Io),
    (24, Signal::Xcpu),
    (25, Signal::Xfsz),
    (26, Signal::Vtalrm),
    (27, Signal::Prof),
    (28, Signal::Winch),
    (29, Signal::Info),
    (30, Signal::Usr1),
    (31, Signal::Usr2),
    (32, Signal::Lwp),
    (33, Signal::Librt),
    (34, Signal::Prot),
];

/// Translate a FreeBSD signal number to the canonical enumeration
///
/// Numbers outside the table and the real-time band give [`Signal::Unknown`].
pub fn to_canonical(target: i32) -> Signal
{
    if (FREEBSD_SIGRTMIN..=FREEBSD_SIGRTMAX).contains(&target) {
        return u8::try_from(target + REALTIME_OFFSET).map_or(Signal::Unknown, Signal::Realtime);
    }
    SIGNAL_TABLE
        .iter()
        .find(|(number, _)| *number == target)
        .map_or(Signal::Unknown, |(_, signal)| *signal)
}

/// Translate a canonical signal to its FreeBSD number
///
/// ## Errors
///
/// [`KinfoError::Unrepresentable`] for signals FreeBSD does not have, such as
/// `Pwr`, real-time numbers outside 65..=126, and `Unknown`.
pub fn from_canonical(signal: Signal) -> KinfoResult<i32>
{
    if let Signal::Realtime(n) = signal {
        let target = i32::from(n) - REALTIME_OFFSET;
        return if (FREEBSD_SIGRTMIN..=FREEBSD_SIGRTMAX).contains(&target) {
            Ok(target)
        } else {
            Err(KinfoError::Unrepresentable(signal))
        };
    }
    SIGNAL_TABLE
        .iter()
        .find(|(_, candidate)| *candidate == signal)
        .map(|(number, _)| *number)
        .ok_or(KinfoError::Unrepresentable(signal))
}
