//! # Core ABI
//!
//! The [`CoreAbi`] capability trait collects every operation that depends on
//! the target's ABI: which `kinfo_proc` layout applies, how wide `long` and
//! pointers are, how signals are numbered, and what a core note looks like.
//!
//! ## Why use a trait?
//!
//! Report code and the encoder only need "the operations for this core", not
//! a particular implementation. [`FreeBsdAbi`] is the implementation for
//! FreeBSD targets; [`create_abi`] builds one from the parameters read out of
//! an ELF header.
//!
//! ## Example
//!
//! ```rust
//! use kinfo_core::abi::{create_abi, AbiParams};
//! use kinfo_core::types::{Architecture, Signal};
//! use object::Endianness;
//!
//! let abi = create_abi(AbiParams::new(64, 64, Architecture::X86_64, Endianness::Little));
//! assert_eq!(abi.signal_from_target(11), Signal::Segv);
//! assert_eq!(abi.siginfo_type().size, 80);
//! ```

use std::fmt;

use object::Endianness;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::auxv::{self, AuxvTag};
use crate::encoder::{self, LiveTarget, NoteBuffer};
use crate::error::KinfoResult;
use crate::layout::{select_layout, LayoutTable};
use crate::notes::{lwpinfo, NT_ARM_VFP, NT_FPREGSET, NT_PPC_VMX, NT_PRSTATUS, NT_X86_XSTATE};
use crate::siginfo::{build_siginfo_type, TypeDesc};
use crate::signals;
use crate::types::{Architecture, Ptid, Signal};

/// Width of C `int` on every FreeBSD target
pub const INT_BITS: u8 = 32;

/// Target ABI parameters, fixed for one core file or live target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiParams
{
    /// Pointer width in bits (32 or 64)
    pub address_bits: u8,
    /// C `long` width in bits (32 or 64)
    pub long_bits: u8,
    pub architecture: Architecture,
    pub endian: Endianness,
}

impl AbiParams
{
    pub fn new(address_bits: u8, long_bits: u8, architecture: Architecture, endian: Endianness) -> Self
    {
        Self {
            address_bits,
            long_bits,
            architecture,
            endian,
        }
    }

    pub fn address_bytes(&self) -> usize
    {
        usize::from(self.address_bits / 8)
    }

    pub fn long_bytes(&self) -> usize
    {
        usize::from(self.long_bits / 8)
    }
}

impl fmt::Display for AbiParams
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let endian = match self.endian {
            Endianness::Little => "little-endian",
            Endianness::Big => "big-endian",
        };
        write!(f, "{} ({}-bit, {endian})", self.architecture, self.address_bits)
    }
}

/// ABI-dependent operations on FreeBSD core data
///
/// The provided methods cover everything that only needs [`AbiParams`];
/// implementors supply the parameters and the memoized siginfo description.
pub trait CoreAbi
{
    /// Parameters this ABI object was created for
    fn params(&self) -> &AbiParams;

    /// Description of `struct siginfo`, built on first use and cached
    fn siginfo_type(&self) -> &TypeDesc;

    /// `kinfo_proc` layout for this target
    fn layout(&self) -> &'static LayoutTable
    {
        let params = self.params();
        select_layout(params.address_bits, params.architecture)
    }

    /// Translate a target signal number
    fn signal_from_target(&self, target: i32) -> Signal
    {
        signals::to_canonical(target)
    }

    /// Translate a canonical signal to its target number
    ///
    /// ## Errors
    ///
    /// `Unrepresentable` if the target has no such signal.
    fn signal_to_target(&self, signal: Signal) -> KinfoResult<i32>
    {
        signals::from_canonical(signal)
    }

    /// Display form of a thread of a core file
    fn core_pid_to_str(&self, ptid: Ptid) -> String
    {
        ptid.to_string()
    }

    /// Name of a thread from its `NT_THRMISC` note
    fn core_thread_name(&self, thrmisc: &[u8], program: &str) -> Option<String>
    {
        lwpinfo::thread_name(thrmisc, program)
    }

    /// Read a window of a thread's raw siginfo from its lwp-info note
    ///
    /// ## Errors
    ///
    /// See [`lwpinfo::extract_siginfo`].
    fn core_xfer_siginfo(&self, lwpinfo_note: &[u8], offset: usize, len: usize) -> KinfoResult<Vec<u8>>
    {
        let params = self.params();
        lwpinfo::extract_siginfo(lwpinfo_note, params.long_bits, offset, len, params.endian)
    }

    /// Description of a FreeBSD-specific auxv tag
    fn describe_auxv_entry(&self, tag: u64) -> Option<&'static AuxvTag>
    {
        auxv::describe_auxv_entry(tag)
    }

    /// Note type a register-set section is written as
    ///
    /// `.reg` is the general register set and is wrapped in a prstatus
    /// record; the others are written raw.
    fn regset_note_type(&self, section: &str) -> Option<u32>
    {
        match section {
            ".reg" => Some(NT_PRSTATUS),
            ".reg2" => Some(NT_FPREGSET),
            ".reg-xstate" => Some(NT_X86_XSTATE),
            ".reg-ppc-vmx" => Some(NT_PPC_VMX),
            ".reg-arm-vfp" => Some(NT_ARM_VFP),
            _ => None,
        }
    }

    /// Build the note payload of a core file for a live target
    fn make_corefile_notes(&self, target: &mut dyn LiveTarget) -> NoteBuffer
    {
        encoder::make_corefile_notes(self, target)
    }
}

/// [`CoreAbi`] for FreeBSD targets
#[derive(Debug)]
pub struct FreeBsdAbi
{
    params: AbiParams,
    siginfo: OnceCell<TypeDesc>,
}

impl FreeBsdAbi
{
    pub fn new(params: AbiParams) -> Self
    {
        Self {
            params,
            siginfo: OnceCell::new(),
        }
    }
}

impl CoreAbi for FreeBsdAbi
{
    fn params(&self) -> &AbiParams
    {
        &self.params
    }

    fn siginfo_type(&self) -> &TypeDesc
    {
        self.siginfo.get_or_init(|| {
            debug!("building siginfo type for {}", self.params);
            build_siginfo_type(
                usize::from(INT_BITS / 8),
                self.params.long_bytes(),
                self.params.address_bytes(),
            )
        })
    }
}

/// Create the ABI object for a target
pub fn create_abi(params: AbiParams) -> Box<dyn CoreAbi>
{
    Box::new(FreeBsdAbi::new(params))
}
