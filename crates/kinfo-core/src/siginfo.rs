//! # siginfo Type Description
//!
//! A structural description of FreeBSD's `struct siginfo`, and a decoder that
//! reads the raw payload from an lwp-info note through it.
//!
//! ```text
//! struct siginfo {
//!     int          si_signo;
//!     int          si_errno;
//!     int          si_code;
//!     __pid_t      si_pid;
//!     __uid_t      si_uid;
//!     int          si_status;
//!     void        *si_addr;
//!     union sigval si_value;     /* { int sival_int; void *sival_ptr; } */
//!     union {
//!         struct { int si_trapno; }                   _fault;
//!         struct { int si_timerid; int si_overrun; }  _timer;
//!         struct { int si_mqd; }                      _mesgq;
//!         struct { long si_band; }                    _poll;
//!         struct { long __spare1__; int __spare2__[7]; } __spare__;
//!     } _reason;
//! };
//! ```
//!
//! Offsets follow C layout rules from the target's `int`, `long` and pointer
//! widths, which gives 80 bytes on LP64 targets and 64 bytes on ILP32 ones.
//! The description is built once per ABI object (see
//! [`crate::abi::CoreAbi::siginfo_type`]).

use object::Endianness;

use crate::error::{KinfoError, KinfoResult};
use crate::reader::ByteReader;
use crate::signals::to_canonical;
use crate::types::{Address, Signal};

/// Shape of one described type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind
{
    /// Integer of the enclosing `TypeDesc::size` bytes
    Int
    {
        signed: bool,
    },
    /// Data pointer
    Pointer,
    /// Struct or union members with resolved offsets
    Composite(Vec<FieldDesc>),
    /// Fixed-length array
    Array
    {
        element: Box<TypeDesc>,
        count: usize,
    },
}

/// A C type with its size and alignment on the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDesc
{
    pub name: Option<&'static str>,
    pub size: usize,
    pub align: usize,
    pub kind: TypeKind,
}

/// One member of a struct or union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc
{
    pub name: &'static str,
    pub offset: usize,
    pub ty: TypeDesc,
}

impl TypeDesc
{
    pub fn int(name: &'static str, bytes: usize, signed: bool) -> Self
    {
        Self {
            name: Some(name),
            size: bytes,
            align: bytes,
            kind: TypeKind::Int { signed },
        }
    }

    pub fn pointer(bytes: usize) -> Self
    {
        Self {
            name: Some("void *"),
            size: bytes,
            align: bytes,
            kind: TypeKind::Pointer,
        }
    }

    pub fn array(element: TypeDesc, count: usize) -> Self
    {
        Self {
            name: None,
            size: element.size * count,
            align: element.align,
            kind: TypeKind::Array { element: Box::new(element), count },
        }
    }

    /// Look up a nested member by path, returning its absolute offset
    ///
    /// ```rust
    /// use kinfo_core::siginfo::build_siginfo_type;
    ///
    /// let ty = build_siginfo_type(4, 8, 8);
    /// let (offset, field) = ty.field(&["_reason", "_timer", "si_overrun"]).unwrap();
    /// assert_eq!(offset, 44);
    /// assert_eq!(field.size, 4);
    /// ```
    pub fn field(&self, path: &[&str]) -> Option<(usize, &TypeDesc)>
    {
        let mut offset = 0;
        let mut current = self;
        for name in path {
            let TypeKind::Composite(fields) = &current.kind else {
                return None;
            };
            let member = fields.iter().find(|field| field.name == *name)?;
            offset += member.offset;
            current = &member.ty;
        }
        Some((offset, current))
    }
}

/// Lays out members of a struct or union using C alignment rules
#[derive(Debug)]
pub struct CompositeBuilder
{
    name: Option<&'static str>,
    union: bool,
    fields: Vec<FieldDesc>,
    size: usize,
    align: usize,
}

impl CompositeBuilder
{
    pub fn structure(name: Option<&'static str>) -> Self
    {
        Self {
            name,
            union: false,
            fields: Vec::new(),
            size: 0,
            align: 1,
        }
    }

    pub fn union(name: Option<&'static str>) -> Self
    {
        Self {
            union: true,
            ..Self::structure(name)
        }
    }

    #[must_use]
    pub fn field(mut self, name: &'static str, ty: TypeDesc) -> Self
    {
        let offset = if self.union { 0 } else { align_up(self.size, ty.align) };
        self.size = self.size.max(offset + ty.size);
        self.align = self.align.max(ty.align);
        self.fields.push(FieldDesc { name, offset, ty });
        self
    }

    pub fn build(self) -> TypeDesc
    {
        TypeDesc {
            name: self.name,
            size: align_up(self.size, self.align),
            align: self.align,
            kind: TypeKind::Composite(self.fields),
        }
    }
}

fn align_up(value: usize, align: usize) -> usize
{
    value.div_ceil(align) * align
}

/// Build the description of `struct siginfo` for the given widths in bytes
pub fn build_siginfo_type(int_bytes: usize, long_bytes: usize, pointer_bytes: usize) -> TypeDesc
{
    let int = || TypeDesc::int("int", int_bytes, true);
    let long = || TypeDesc::int("long", long_bytes, true);
    let pid_t = TypeDesc::int("__pid_t", 4, true);
    let uid_t = TypeDesc::int("__uid_t", 4, false);

    let sigval = CompositeBuilder::union(Some("sigval"))
        .field("sival_int", int())
        .field("sival_ptr", TypeDesc::pointer(pointer_bytes))
        .build();

    let reason = CompositeBuilder::union(None)
        .field("_fault", CompositeBuilder::structure(None).field("si_trapno", int()).build())
        .field(
            "_timer",
            CompositeBuilder::structure(None)
                .field("si_timerid", int())
                .field("si_overrun", int())
                .build(),
        )
        .field("_mesgq", CompositeBuilder::structure(None).field("si_mqd", int()).build())
        .field("_poll", CompositeBuilder::structure(None).field("si_band", long()).build())
        .field(
            "__spare__",
            CompositeBuilder::structure(None)
                .field("__spare1__", long())
                .field("__spare2__", TypeDesc::array(int(), 7))
                .build(),
        )
        .build();

    CompositeBuilder::structure(Some("siginfo"))
        .field("si_signo", int())
        .field("si_errno", int())
        .field("si_code", int())
        .field("si_pid", pid_t)
        .field("si_uid", uid_t)
        .field("si_status", int())
        .field("si_addr", TypeDesc::pointer(pointer_bytes))
        .field("si_value", sigval)
        .field("_reason", reason)
        .build()
}

/// A decoded `siginfo_t`
///
/// Members of `_reason` share storage; which one is meaningful depends on the
/// signal and `si_code`, so all are exposed as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigInfo
{
    pub signo: i32,
    pub errno: i32,
    pub code: i32,
    pub pid: i32,
    pub uid: u32,
    pub status: i32,
    /// Faulting address for SIGSEGV, SIGBUS, SIGILL, SIGFPE and SIGTRAP
    pub addr: Address,
    pub value_int: i32,
    pub value_ptr: Address,
    pub trapno: i32,
    pub timerid: i32,
    pub overrun: i32,
    pub mqd: i32,
    pub band: i64,
}

impl SigInfo
{
    /// Decode raw siginfo bytes through a type description
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument` if the description lacks a member
    /// - `OutOfRange` if `bytes` is shorter than a member read
    pub fn decode(bytes: &[u8], ty: &TypeDesc, endian: Endianness) -> KinfoResult<Self>
    {
        let reader = ByteReader::new(bytes, endian);
        let int = |path: &[&str]| -> KinfoResult<i64> { read_member(&reader, ty, path) };
        Ok(Self {
            signo: int(&["si_signo"])? as i32,
            errno: int(&["si_errno"])? as i32,
            code: int(&["si_code"])? as i32,
            pid: int(&["si_pid"])? as i32,
            uid: int(&["si_uid"])? as u32,
            status: int(&["si_status"])? as i32,
            addr: Address::new(int(&["si_addr"])? as u64),
            value_int: int(&["si_value", "sival_int"])? as i32,
            value_ptr: Address::new(int(&["si_value", "sival_ptr"])? as u64),
            trapno: int(&["_reason", "_fault", "si_trapno"])? as i32,
            timerid: int(&["_reason", "_timer", "si_timerid"])? as i32,
            overrun: int(&["_reason", "_timer", "si_overrun"])? as i32,
            mqd: int(&["_reason", "_mesgq", "si_mqd"])? as i32,
            band: int(&["_reason", "_poll", "si_band"])?,
        })
    }

    /// The signal in canonical form
    pub fn signal(&self) -> Signal
    {
        to_canonical(self.signo)
    }

    /// Whether `si_addr` carries a fault address for this signal
    pub fn has_fault_address(&self) -> bool
    {
        matches!(
            self.signal(),
            Signal::Segv | Signal::Bus | Signal::Ill | Signal::Fpe | Signal::Trap
        )
    }
}

/// Read an integer or pointer member, sign-extending signed integers
fn read_member(reader: &ByteReader<'_>, ty: &TypeDesc, path: &[&str]) -> KinfoResult<i64>
{
    let (offset, member) = ty
        .field(path)
        .ok_or_else(|| KinfoError::InvalidArgument(format!("siginfo has no member {}", path.join("."))))?;
    match (&member.kind, member.size) {
        (TypeKind::Int { signed: true }, 4) => Ok(i64::from(reader.i32(offset)?)),
        (TypeKind::Int { signed: true }, 8) => reader.i64(offset),
        (TypeKind::Int { signed: false } | TypeKind::Pointer, size) => {
            reader.uint(offset, size).map(|value| value as i64)
        }
        _ => Err(KinfoError::InvalidArgument(format!(
            "siginfo member {} is not an integer",
            path.join(".")
        ))),
    }
}
