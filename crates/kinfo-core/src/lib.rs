//! # kinfo-core
//!
//! Codec for the notes a FreeBSD kernel writes into ELF core dumps.
//!
//! This crate provides:
//! - Decoders for process status, the VM map, the open-file table, per-thread
//!   signal information and the auxiliary vector
//! - Signal number translation between FreeBSD and a canonical enumeration
//! - An encoder that turns a stopped live process into core-note records
//! - A thin adapter that pulls the notes out of an ELF core file
//!
//! ## Layout variants
//!
//! `struct kinfo_proc` has three binary layouts (64-bit, i386, and every other
//! 32-bit target). The right one is picked from the ELF class and machine; see
//! [`layout`]. All other notes decoded here have fixed offsets and only need
//! the byte order.
//!
//! ## Error handling
//!
//! Decoders never panic on short or corrupt input. They return a
//! [`KinfoError`], and [`KinfoError::is_soft`] separates "this piece of data is
//! simply absent" from "this note is broken".

pub mod abi;
pub mod auxv;
pub mod corefile;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod notes;
pub mod prelude;
pub mod reader;
pub mod siginfo;
pub mod signals;
pub mod types;

pub use abi::{create_abi, AbiParams, CoreAbi, FreeBsdAbi};
pub use corefile::CoreFile;
// Re-export commonly used types
pub use error::{KinfoError, KinfoResult};
pub use types::{Address, Architecture, MemoryRegion, ProcessSnapshot, Signal};
