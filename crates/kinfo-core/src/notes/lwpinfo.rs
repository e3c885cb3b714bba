//! # Per-thread Notes
//!
//! Signal context from `NT_PTLWPINFO` and the thread name from `NT_THRMISC`.
//!
//! The lwp-info note is a 4-byte structure-size header followed by the
//! `struct ptrace_lwpinfo` that `PT_LWPINFO` would return for the thread. When
//! the thread was stopped by a signal with queued information, `pl_flags`
//! carries `PL_FLAG_SI` and `pl_siginfo` holds the raw `siginfo_t`.

use object::Endianness;

use crate::error::{KinfoError, KinfoResult};
use crate::reader::{read_bytes, read_cstr, read_u32};

/// Offset of `struct ptrace_lwpinfo` within the note
pub const LWPINFO_OFFSET: usize = 0x4;
/// Offset of `pl_flags` within `struct ptrace_lwpinfo`
pub const LWPINFO_PL_FLAGS: usize = 0x8;
/// Offset of `pl_siginfo` on targets with a 64-bit `long`
pub const LWPINFO64_PL_SIGINFO: usize = 0x30;
/// Offset of `pl_siginfo` on targets with a 32-bit `long`
pub const LWPINFO32_PL_SIGINFO: usize = 0x2c;

/// `pl_flags` bit: `pl_siginfo` is valid
pub const PL_FLAG_SI: u32 = 0x20;

/// `sizeof(siginfo_t)` with a 64-bit `long`
pub const SIZE64_SIGINFO_T: usize = 80;
/// `sizeof(siginfo_t)` with a 32-bit `long`
pub const SIZE32_SIGINFO_T: usize = 64;

/// Longest thread name kept from `NT_THRMISC`
pub const THREAD_NAME_MAX: usize = 79;

/// Size of `siginfo_t` for a `long` width in bits
pub fn siginfo_size(long_bits: u8) -> usize
{
    if long_bits == 32 {
        SIZE32_SIGINFO_T
    } else {
        SIZE64_SIGINFO_T
    }
}

/// Copy a window of the raw `siginfo_t` out of an lwp-info note
///
/// `offset` and `len` select a window within the siginfo payload; the window
/// is clipped to the payload size, so asking for `(0, usize::MAX)` returns
/// the whole thing (64 or 80 bytes).
///
/// ## Errors
///
/// - `Unavailable` if `PL_FLAG_SI` is clear (common: the thread was not
///   stopped by a signal) or `offset` is past the payload
/// - `Malformed` if the note is too short for `pl_flags`
/// - `OutOfRange` if the note ends inside the requested window
///
/// ## Example
///
/// ```rust
/// use kinfo_core::notes::lwpinfo::{extract_siginfo, PL_FLAG_SI};
/// use object::Endianness;
///
/// let mut note = vec![0u8; 4 + 0x30 + 80];
/// note[4 + 0x8..4 + 0xc].copy_from_slice(&PL_FLAG_SI.to_le_bytes());
/// note[4 + 0x30] = 11;
///
/// let siginfo = extract_siginfo(&note, 64, 0, usize::MAX, Endianness::Little).unwrap();
/// assert_eq!(siginfo.len(), 80);
/// assert_eq!(siginfo[0], 11);
/// ```
pub fn extract_siginfo(note: &[u8], long_bits: u8, offset: usize, len: usize, endian: Endianness)
    -> KinfoResult<Vec<u8>>
{
    let size = siginfo_size(long_bits);
    if offset > size {
        return Err(KinfoError::Unavailable(format!(
            "siginfo offset {offset} is past the {size}-byte structure"
        )));
    }

    let flags = read_u32(note, LWPINFO_OFFSET + LWPINFO_PL_FLAGS, endian)
        .map_err(|_| KinfoError::Malformed("lwpinfo note too short for pl_flags".to_string()))?;
    if flags & PL_FLAG_SI == 0 {
        return Err(KinfoError::Unavailable("thread has no siginfo".to_string()));
    }

    let len = len.min(size - offset);
    let base = LWPINFO_OFFSET
        + if long_bits == 32 {
            LWPINFO32_PL_SIGINFO
        } else {
            LWPINFO64_PL_SIGINFO
        };
    Ok(read_bytes(note, base + offset, len)?.to_vec())
}

/// Thread name stored in a `NT_THRMISC` note
///
/// The name is the NUL-terminated first member of `struct thrmisc`, kept up
/// to [`THREAD_NAME_MAX`] bytes. The kernel reports the process command for
/// threads that never set a name, so a name equal to `program` is treated as
/// no name at all.
///
/// ```rust
/// use kinfo_core::notes::lwpinfo::thread_name;
///
/// assert_eq!(thread_name(b"worker\0\0\0", "daemon").as_deref(), Some("worker"));
/// assert_eq!(thread_name(b"daemon\0", "daemon"), None);
/// assert_eq!(thread_name(b"\0", "daemon"), None);
/// ```
pub fn thread_name(thrmisc: &[u8], program: &str) -> Option<String>
{
    let name = read_cstr(thrmisc, 0, THREAD_NAME_MAX).ok()?;
    if name.is_empty() || name == program {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn lwpinfo_note(long_bits: u8, flags: u32) -> Vec<u8>
    {
        let (at, size) = if long_bits == 32 {
            (LWPINFO32_PL_SIGINFO, SIZE32_SIGINFO_T)
        } else {
            (LWPINFO64_PL_SIGINFO, SIZE64_SIGINFO_T)
        };
        let mut note = vec![0u8; LWPINFO_OFFSET + at + size];
        note[LWPINFO_OFFSET + LWPINFO_PL_FLAGS..][..4].copy_from_slice(&flags.to_le_bytes());
        for (i, byte) in note[LWPINFO_OFFSET + at..].iter_mut().enumerate() {
            *byte = i as u8;
        }
        note
    }

    #[test]
    fn test_flag_clear_is_unavailable()
    {
        let note = lwpinfo_note(64, 0);
        assert!(matches!(
            extract_siginfo(&note, 64, 0, 80, Endianness::Little),
            Err(KinfoError::Unavailable(_))
        ));
    }

    #[test]
    fn test_window_is_clipped()
    {
        let note = lwpinfo_note(32, PL_FLAG_SI);
        let window = extract_siginfo(&note, 32, 60, 100, Endianness::Little).unwrap();
        assert_eq!(window, vec![60, 61, 62, 63]);
    }

    #[test]
    fn test_offset_past_payload_is_unavailable()
    {
        let note = lwpinfo_note(64, PL_FLAG_SI);
        assert!(matches!(
            extract_siginfo(&note, 64, 81, 1, Endianness::Little),
            Err(KinfoError::Unavailable(_))
        ));
        assert!(extract_siginfo(&note, 64, 80, 1, Endianness::Little).unwrap().is_empty());
    }

    #[test]
    fn test_thread_name_is_bounded()
    {
        let long = vec![b'a'; 200];
        assert_eq!(thread_name(&long, "prog").map(|name| name.len()), Some(THREAD_NAME_MAX));
    }
}
