//! # Error Types
//!
//! Error handling for note decoding and encoding.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::Signal;

/// Main error type for core-note operations
///
/// Every decoder in this crate returns one of these variants. They fall into
/// three severities:
///
/// 1. **Fatal to the decode call**: `OutOfRange`, `Malformed`. The note is
///    shorter than the fields about to be read, or an array element declares
///    a size below its own fixed-field footprint. No partial value is returned.
/// 2. **Soft / expected absence**: `Unavailable`, `NotFound`,
///    `UnsupportedLayout`. Callers skip that piece of a report and continue
///    with the rest. See [`KinfoError::is_soft`].
/// 3. **Caller errors**: `Unrepresentable`, `InvalidArgument`, plus wrapped
///    container and I/O failures.
#[derive(Error, Debug)]
pub enum KinfoError
{
    /// A fixed-width read would cross the end of the buffer
    ///
    /// Raised by the byte reader. Decoders that validate sizes up front never
    /// let this escape, but it is the last line of defense for every read.
    #[error("Read of {width} bytes at offset 0x{offset:x} is out of range (buffer is {len} bytes)")]
    OutOfRange
    {
        /// Offset of the attempted read
        offset: usize,
        /// Width of the attempted read in bytes
        width: usize,
        /// Length of the buffer that was read from
        len: usize,
    },

    /// The note is structurally invalid
    ///
    /// Examples:
    /// - Process-info note shorter than the last field the decoder reads
    /// - VM-map entry whose `kve_structsize` is smaller than the path offset
    /// - Group count that runs past the end of the note
    #[error("malformed core note - {0}")]
    Malformed(String),

    /// The `ki_layout` field of a process-info record is not zero
    ///
    /// The record comes from a kernel revision whose `kinfo_proc` layout we
    /// do not know. This is a soft failure.
    #[error("unsupported process information in core file (ki_layout = {0})")]
    UnsupportedLayout(u32),

    /// Requested data is absent
    ///
    /// Missing note section, or a per-thread note whose siginfo-valid flag is
    /// clear. Absence is expected and common.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// A point lookup found no matching entry
    ///
    /// Used by the file table when no vnode entry has the requested descriptor.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The canonical signal has no target signal number
    #[error("Signal {0} has no FreeBSD signal number")]
    Unrepresentable(Signal),

    /// Invalid argument passed to a codec function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The ELF container could not be parsed
    #[error("Core file error: {0}")]
    Container(#[from] object::read::Error),

    /// I/O error (for reading core files from disk)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KinfoError
{
    /// Whether callers should degrade gracefully instead of aborting
    ///
    /// Soft errors describe data that is legitimately absent from a core file
    /// (or from a kernel revision we do not understand). A report should skip
    /// the affected piece and carry on with the rest.
    ///
    /// ```rust
    /// use kinfo_core::error::KinfoError;
    ///
    /// assert!(KinfoError::UnsupportedLayout(1).is_soft());
    /// assert!(!KinfoError::Malformed("too short".into()).is_soft());
    /// ```
    #[must_use]
    pub fn is_soft(&self) -> bool
    {
        matches!(
            self,
            KinfoError::Unavailable(_) | KinfoError::NotFound(_) | KinfoError::UnsupportedLayout(_)
        )
    }
}

/// Convenience type alias for `Result<T, KinfoError>`
///
/// ```rust
/// use kinfo_core::error::KinfoResult;
/// fn foo() -> KinfoResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type KinfoResult<T> = std::result::Result<T, KinfoError>;
