use procvmi_arch_amd64::{MsrEfer, Registers};
use procvmi_core::{MemorySegment, Va, VmiCore};

use super::mock::*;
use crate::{ProcessVmi, WindowsError};

const VAD_ROOT: u64 = 0xffffa001_40000000;
const VAD_LEFT: u64 = 0xffffa001_40001000;

fn uninitialized() -> ProcessVmi<MockDriver> {
    init_tracing();
    ProcessVmi::new(VmiCore::new(MockDriver::new()).unwrap())
}

/// Explorer running on the vCPU with two regions:
/// `[7ff6_1000_0000, 7ff6_1001_0000)` and its left child `[100000, 200000)`.
fn guest() -> ProcessVmi<MockDriver> {
    let vmi = uninitialized();

    let driver = vmi.core().driver();
    three_processes(driver);
    driver.set_current_thread(EXPLORER_THREAD);
    driver.add_thread(EXPLORER_THREAD, EXPLORER);
    driver.add_vad(VAD_ROOT, 0x7_ff61_0000, 0x7_ff61_0010, VAD_LEFT, 0);
    driver.add_vad(VAD_LEFT, 0x100, 0x200, 0, 0);
    driver.set_vad_root(EXPLORER, VAD_ROOT | 0x1);

    vmi
}

fn assert_sentinels(vmi: &ProcessVmi<MockDriver>, registers: Registers) {
    let event = event(registers);

    assert_eq!(vmi.current_thread(&event), Va(0));
    assert_eq!(vmi.current_process(&event), Va(0));
    assert_eq!(vmi.current_pid(&event), 0);
    assert_eq!(vmi.current_parent_pid(&event), 0);
    assert_eq!(vmi.current_name(&event), None);
    assert_eq!(vmi.current_vad(&event, Va(0x150000)), MemorySegment::NULL);
    assert!(vmi.current_vad_list(&event).is_empty());
}

#[test]
fn not_ready_returns_sentinels() {
    let vmi = guest();
    assert!(!vmi.is_ready());
    assert!(matches!(vmi.os(), Err(WindowsError::NotReady)));

    assert_sentinels(&vmi, registers(EXPLORER_DTB));
    assert_eq!(vmi.core().driver().reads(), 0);
}

#[test]
fn initialize_once() {
    let vmi = uninitialized();

    vmi.initialize(windows_os()).unwrap();
    assert!(vmi.is_ready());

    assert!(matches!(
        vmi.initialize(windows_os()),
        Err(WindowsError::AlreadyInitialized)
    ));
    assert!(vmi.is_ready());
}

#[test]
fn current_process_details() {
    let vmi = guest();
    vmi.initialize(windows_os()).unwrap();

    let event = event(registers(EXPLORER_DTB));

    assert_eq!(vmi.current_thread(&event), Va(EXPLORER_THREAD));
    assert_eq!(vmi.current_process(&event), Va(EXPLORER));
    assert_eq!(vmi.current_pid(&event), 4242);
    assert_eq!(vmi.current_parent_pid(&event), 4000);
    assert_eq!(vmi.current_name(&event).as_deref(), Some("explorer.exe"));
}

#[test]
fn current_vad_lookup() {
    let vmi = guest();
    vmi.initialize(windows_os()).unwrap();

    let event = event(registers(EXPLORER_DTB));

    assert_eq!(
        vmi.current_vad(&event, Va(0x1ff000)),
        MemorySegment::new(Va(0x100000), 0x100000)
    );
    assert_eq!(
        vmi.current_vad(&event, Va(0x7ff6_1000_0000)),
        MemorySegment::new(Va(0x7ff6_1000_0000), 0x10000)
    );
    assert_eq!(vmi.current_vad(&event, Va(0x200000)), MemorySegment::NULL);
}

#[test]
fn current_vad_list_in_preorder() {
    let vmi = guest();
    vmi.initialize(windows_os()).unwrap();

    let event = event(registers(EXPLORER_DTB));

    assert_eq!(
        vmi.current_vad_list(&event),
        [
            MemorySegment::new(Va(0x7ff6_1000_0000), 0x10000),
            MemorySegment::new(Va(0x100000), 0x100000),
        ]
    );
}

#[test]
fn current_vad_unreadable_tree() {
    let vmi = guest();
    vmi.initialize(windows_os()).unwrap();
    vmi.core().driver().fault_at(VAD_ROOT + MMVAD_LEFT);

    let event = event(registers(EXPLORER_DTB));

    assert_eq!(vmi.current_vad(&event, Va(0x150000)), MemorySegment::NULL);
    assert_eq!(
        vmi.current_vad_list(&event),
        [MemorySegment::new(Va(0x7ff6_1000_0000), 0x10000)]
    );
}

#[test]
fn falls_back_to_process_list() {
    let vmi = guest();
    vmi.initialize(windows_os()).unwrap();
    vmi.core().driver().set_current_thread(0);

    let event = event(registers(SMSS_DTB));

    assert_eq!(vmi.current_thread(&event), Va(0));
    assert_eq!(vmi.current_process(&event), Va(SMSS));
    assert_eq!(vmi.current_pid(&event), 388);
    assert_eq!(vmi.current_parent_pid(&event), 4);
    assert_eq!(vmi.current_name(&event).as_deref(), Some("smss.exe"));
    assert!(vmi.current_vad_list(&event).is_empty());
}

#[test]
fn unresolvable_process_returns_sentinels() {
    let vmi = guest();
    vmi.initialize(windows_os()).unwrap();
    vmi.core().driver().set_current_thread(0);

    assert_sentinels(&vmi, registers(0x7777000));
}

#[test]
fn non_long_mode_resolves_process_from_list() {
    let vmi = guest();
    vmi.initialize(windows_os()).unwrap();

    let event = event(Registers {
        msr_efer: MsrEfer(0),
        ..registers(SMSS_DTB)
    });

    vmi.core().driver().clear_log();
    assert_eq!(vmi.current_thread(&event), Va(0));
    assert_eq!(vmi.core().driver().reads(), 0);

    assert_eq!(vmi.current_process(&event), Va(SMSS));
    assert_eq!(vmi.current_pid(&event), 388);
    assert_eq!(vmi.current_name(&event).as_deref(), Some("smss.exe"));
    assert_eq!(
        vmi.core()
            .driver()
            .reads_at(KPCR + KPCR_PRCB + KPRCB_CURRENT_THREAD),
        0
    );
}

#[test]
fn state_exposes_typed_errors() {
    let vmi = guest();
    let event = event(registers(EXPLORER_DTB));

    assert!(matches!(vmi.state(&event), Err(WindowsError::NotReady)));

    vmi.initialize(windows_os()).unwrap();
    let state = vmi.state(&event).unwrap();
    assert_eq!(
        state.current_process().unwrap().map(|process| process.0),
        Some(Va(EXPLORER))
    );
}
