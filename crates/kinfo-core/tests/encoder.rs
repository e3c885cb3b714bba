//! Tests for building core notes from a mock live target

use std::collections::HashMap;

use kinfo_core::abi::{create_abi, AbiParams};
use kinfo_core::encoder::{LiveTarget, RegisterSet, ThreadState};
use kinfo_core::error::{KinfoError, KinfoResult};
use kinfo_core::notes::status::{decode_prpsinfo, decode_prstatus};
use kinfo_core::notes::{FREEBSD_NOTE_NAME, NT_FPREGSET, NT_PRPSINFO, NT_PRSTATUS, NT_X86_XSTATE};
use kinfo_core::types::{Architecture, LwpId, ProcessId, Ptid, Signal};
use object::Endianness;

struct MockTarget
{
    exec_file: Option<String>,
    args: Option<String>,
    current: ThreadState,
    threads: Vec<ThreadState>,
    refresh_fails: bool,
    failing: Vec<LwpId>,
    extra_sets: HashMap<u64, Vec<RegisterSet>>,
}

const PID: ProcessId = ProcessId(4242);

fn thread(lwp: u64, stop_signal: Signal) -> ThreadState
{
    ThreadState {
        ptid: Ptid::new(PID, LwpId(lwp)),
        stop_signal,
    }
}

impl MockTarget
{
    fn new(current: ThreadState, threads: Vec<ThreadState>) -> Self
    {
        Self {
            exec_file: Some("/usr/local/bin/worker".to_string()),
            args: Some("-v --once".to_string()),
            current,
            threads,
            refresh_fails: false,
            failing: Vec::new(),
            extra_sets: HashMap::new(),
        }
    }
}

impl LiveTarget for MockTarget
{
    fn exec_file(&self) -> Option<String>
    {
        self.exec_file.clone()
    }

    fn inferior_args(&self) -> Option<String>
    {
        self.args.clone()
    }

    fn pid(&self) -> ProcessId
    {
        PID
    }

    fn current_thread(&self) -> ThreadState
    {
        self.current
    }

    fn update_thread_list(&mut self) -> KinfoResult<()>
    {
        if self.refresh_fails {
            return Err(KinfoError::Unavailable("ptrace refused".to_string()));
        }
        Ok(())
    }

    fn threads(&self) -> Vec<ThreadState>
    {
        self.threads.clone()
    }

    fn register_sets(&mut self, thread: Ptid) -> KinfoResult<Vec<RegisterSet>>
    {
        if self.failing.contains(&thread.lwp) {
            return Err(KinfoError::Unavailable(format!("{thread} has exited")));
        }
        let mut sets = vec![
            RegisterSet::new(".reg", vec![thread.lwp.raw() as u8; 16]),
            RegisterSet::new(".reg2", vec![0xf0; 32]),
        ];
        sets.extend(self.extra_sets.get(&thread.lwp.raw()).cloned().unwrap_or_default());
        Ok(sets)
    }
}

fn amd64() -> AbiParams
{
    AbiParams::new(64, 64, Architecture::X86_64, Endianness::Little)
}

/// LWP ids of the prstatus notes, in buffer order
fn prstatus_lwps(target: &mut MockTarget) -> Vec<u64>
{
    let abi = create_abi(amd64());
    let buffer = abi.make_corefile_notes(target);
    buffer
        .entries()
        .unwrap()
        .iter()
        .filter(|note| note.n_type == NT_PRSTATUS)
        .map(|note| decode_prstatus(&note.desc, &amd64()).unwrap().lwp.raw())
        .collect()
}

#[test]
fn test_prpsinfo_comes_first()
{
    let mut target = MockTarget::new(thread(1, Signal::None), vec![thread(1, Signal::None)]);
    let abi = create_abi(amd64());
    let notes = abi.make_corefile_notes(&mut target).entries().unwrap();

    assert_eq!(notes[0].n_type, NT_PRPSINFO);
    assert!(notes.iter().all(|note| note.name == FREEBSD_NOTE_NAME));
    let info = decode_prpsinfo(&notes[0].desc, &amd64()).unwrap();
    assert_eq!(info.fname, "worker");
    assert_eq!(info.psargs, "worker -v --once");
    assert_eq!(info.pid, Some(4242));
}

#[test]
fn test_no_prpsinfo_without_executable()
{
    let mut target = MockTarget::new(thread(1, Signal::None), vec![thread(1, Signal::None)]);
    target.exec_file = None;
    let abi = create_abi(amd64());
    let notes = abi.make_corefile_notes(&mut target).entries().unwrap();
    assert!(notes.iter().all(|note| note.n_type != NT_PRPSINFO));
    assert_eq!(notes[0].n_type, NT_PRSTATUS);
}

#[test]
fn test_signalled_thread_written_first()
{
    let threads = vec![
        thread(100, Signal::None),
        thread(101, Signal::None),
        thread(102, Signal::Segv),
        thread(103, Signal::None),
    ];
    let mut target = MockTarget::new(thread(100, Signal::None), threads);
    assert_eq!(prstatus_lwps(&mut target), vec![102, 100, 101, 103]);
}

#[test]
fn test_current_thread_preferred_when_signalled()
{
    let threads = vec![thread(100, Signal::Abrt), thread(101, Signal::Segv)];
    let mut target = MockTarget::new(thread(101, Signal::Segv), threads);
    assert_eq!(prstatus_lwps(&mut target), vec![101, 100]);
}

#[test]
fn test_cursig_is_signalled_threads_signal()
{
    let threads = vec![thread(100, Signal::None), thread(101, Signal::Bus)];
    let mut target = MockTarget::new(thread(100, Signal::None), threads);
    let abi = create_abi(amd64());
    let notes = abi.make_corefile_notes(&mut target).entries().unwrap();

    let cursigs: Vec<i32> = notes
        .iter()
        .filter(|note| note.n_type == NT_PRSTATUS)
        .map(|note| decode_prstatus(&note.desc, &amd64()).unwrap().cursig)
        .collect();
    assert_eq!(cursigs, vec![10, 10]);
}

#[test]
fn test_refresh_failure_writes_current_thread_only()
{
    let threads = vec![thread(100, Signal::None), thread(101, Signal::None)];
    let mut target = MockTarget::new(thread(101, Signal::None), threads);
    target.refresh_fails = true;
    assert_eq!(prstatus_lwps(&mut target), vec![101]);
}

#[test]
fn test_thread_with_unreadable_registers_is_skipped()
{
    let threads = vec![thread(100, Signal::Segv), thread(101, Signal::None), thread(102, Signal::None)];
    let mut target = MockTarget::new(thread(100, Signal::Segv), threads);
    target.failing.push(LwpId(101));
    assert_eq!(prstatus_lwps(&mut target), vec![100, 102]);
}

#[test]
fn test_other_processes_are_ignored()
{
    let mut threads = vec![thread(100, Signal::None)];
    threads.push(ThreadState {
        ptid: Ptid::new(ProcessId(1), LwpId(900)),
        stop_signal: Signal::Kill,
    });
    let mut target = MockTarget::new(thread(100, Signal::None), threads);
    assert_eq!(prstatus_lwps(&mut target), vec![100]);
}

#[test]
fn test_unrepresentable_stop_signal_written_as_zero()
{
    let mut target = MockTarget::new(thread(100, Signal::Pwr), vec![thread(100, Signal::Pwr)]);
    let abi = create_abi(amd64());
    let notes = abi.make_corefile_notes(&mut target).entries().unwrap();
    let status = notes.iter().find(|note| note.n_type == NT_PRSTATUS).unwrap();
    assert_eq!(decode_prstatus(&status.desc, &amd64()).unwrap().cursig, 0);
}

#[test]
fn test_register_sets_become_notes()
{
    let mut target = MockTarget::new(thread(7, Signal::Trap), vec![thread(7, Signal::Trap)]);
    target.extra_sets.insert(7, vec![
        RegisterSet::new(".reg-xstate", vec![1; 64]),
        RegisterSet::new(".reg-unknown", vec![2; 8]),
    ]);
    target.exec_file = None;
    let abi = create_abi(amd64());
    let notes = abi.make_corefile_notes(&mut target).entries().unwrap();

    let types: Vec<u32> = notes.iter().map(|note| note.n_type).collect();
    assert_eq!(types, vec![NT_PRSTATUS, NT_FPREGSET, NT_X86_XSTATE]);

    let status = decode_prstatus(&notes[0].desc, &amd64()).unwrap();
    assert_eq!(status.registers, vec![7; 16]);
    assert_eq!(status.cursig, 5);
    assert_eq!(notes[1].desc, vec![0xf0; 32]);
}
