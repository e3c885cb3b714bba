//! Common module for library exports

pub use crate::abi::{create_abi, AbiParams, CoreAbi};
pub use crate::corefile::{CoreFile, ThreadNotes};
pub use crate::encoder::{make_corefile_notes, LiveTarget, NoteBuffer, RegisterSet, ThreadState};
pub use crate::error::{KinfoError, KinfoResult};
pub use crate::notes::files::{find_vnode_path, FileDescriptor};
pub use crate::notes::lwpinfo::extract_siginfo;
pub use crate::notes::proc::decode_process_info;
pub use crate::notes::vmmap::{decode_vm_map, VmMapEntries};
pub use crate::signals::{from_canonical, to_canonical};
pub use crate::types::{Address, Architecture, LwpId, MemoryRegion, ProcessId, ProcessSnapshot, Ptid, Signal};
