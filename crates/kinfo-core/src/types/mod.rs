//! # Types
//!
//! Target-independent values produced by the note decoders.
//!
//! Everything here is a plain value type that copies out of the note buffer,
//! so decoded data outlives the core file it came from. Addresses and sizes
//! are widened to 64 bits regardless of the target's word size.

pub mod address;
pub mod process;
pub mod region;
pub mod signal;
pub mod snapshot;

// Re-export all public types
pub use address::Address;
pub use process::{Architecture, LwpId, ProcessId, Ptid};
pub use region::{MemoryRegion, Protection, RegionFlags};
pub use signal::Signal;
pub use snapshot::{ProcessSnapshot, ResourceUsage, SignalSet, Timeval};
