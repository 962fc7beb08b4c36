use procvmi_core::{Pa, ProcessId, ProcessObject, Va};

use super::mock::*;
use crate::WindowsError;

const UNMAPPED_THREAD: u64 = 0xffffa001_20000000;

fn corrupted(err: &procvmi_core::VmiError) -> bool {
    matches!(
        WindowsError::downcast(err),
        Some(WindowsError::CorruptedStruct(_))
    )
}

///////////////////////////////////////////////////////////////////////////////
// Composite resolution
///////////////////////////////////////////////////////////////////////////////

#[test]
fn fast_path_uses_thread() {
    let fx = Fixture::new();
    fx.driver().set_current_thread(EXPLORER_THREAD);
    fx.driver().add_thread(EXPLORER_THREAD, EXPLORER);

    // No process list at all: only the thread can answer.
    let regs = registers(SMSS_DTB);
    assert_eq!(
        fx.state(&regs).current_process().unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

#[test]
fn fallback_when_thread_is_null() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().set_current_thread(0);

    let regs = registers(SMSS_DTB);
    assert_eq!(
        fx.state(&regs).current_process().unwrap(),
        Some(ProcessObject(Va(SMSS)))
    );
}

#[test]
fn fallback_when_kpcr_is_unreadable() {
    let fx = Fixture::new();
    three_processes(fx.driver());

    let regs = registers(SMSS_DTB);
    assert_eq!(
        fx.state(&regs).current_process().unwrap(),
        Some(ProcessObject(Va(SMSS)))
    );
}

#[test]
fn fallback_when_thread_to_process_read_fails() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().set_current_thread(UNMAPPED_THREAD);

    let regs = registers(EXPLORER_DTB);
    let vmi = fx.state(&regs);

    assert!(vmi.current_process_from_thread().is_err());
    assert_eq!(
        vmi.current_process().unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

#[test]
fn fallback_when_thread_has_no_process() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().set_current_thread(EXPLORER_THREAD);
    fx.driver().add_thread(EXPLORER_THREAD, 0);

    let regs = registers(EXPLORER_DTB);
    assert_eq!(
        fx.state(&regs).current_process().unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

#[test]
fn fallback_ignores_pcid_bits() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().set_current_thread(0);

    let regs = registers(0x8000_0000_0000_0000 | EXPLORER_DTB | 0x2);
    assert_eq!(
        fx.state(&regs).current_process().unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

#[test]
fn fallback_matches_user_page_tables() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().set_current_thread(0);

    let regs = user_registers(EXPLORER_USER_DTB | 0x1);
    assert_eq!(
        fx.state(&regs).current_process().unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

///////////////////////////////////////////////////////////////////////////////
// Process list search
///////////////////////////////////////////////////////////////////////////////

#[test]
fn search_returns_system_process() {
    let fx = Fixture::new();
    three_processes(fx.driver());

    let regs = registers(SYSTEM_DTB);
    let vmi = fx.state(&regs);

    assert_eq!(
        vmi.find_process_by_translation_root(Pa(SYSTEM_DTB)).unwrap(),
        Some(ProcessObject(Va(SYSTEM)))
    );
    assert_eq!(fx.driver().reads_at(SMSS + KPROCESS_DIRECTORY_TABLE_BASE), 0);
}

#[test]
fn search_returns_containing_process() {
    let fx = Fixture::new();
    three_processes(fx.driver());

    let regs = registers(SYSTEM_DTB);
    let vmi = fx.state(&regs);

    assert_eq!(
        vmi.find_process_by_translation_root(Pa(EXPLORER_DTB)).unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

#[test]
fn search_compares_each_process_once() {
    let fx = Fixture::new();
    three_processes(fx.driver());

    let regs = registers(SYSTEM_DTB);
    let vmi = fx.state(&regs);

    assert_eq!(
        vmi.find_process_by_translation_root(Pa(0x7777000)).unwrap(),
        None
    );

    for process in [SYSTEM, SMSS, EXPLORER] {
        assert_eq!(
            fx.driver()
                .reads_at(process + KPROCESS_DIRECTORY_TABLE_BASE),
            1
        );
    }
}

#[test]
fn search_without_list_head_symbol() {
    let mut symbols = symbols();
    symbols.PsActiveProcessHead = None;

    let os = crate::WindowsOs::from_parts(offsets(), symbols).and_kernel_base(Va(KERNEL_BASE));
    let fx = Fixture::with_os(os);
    three_processes(fx.driver());

    let regs = registers(SYSTEM_DTB);
    let vmi = fx.state(&regs);

    // Found before the walk reaches the sentinel.
    assert_eq!(
        vmi.find_process_by_translation_root(Pa(EXPLORER_DTB)).unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

#[test]
fn search_stops_on_cycle_without_head() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().write_u64(
        EXPLORER + EPROCESS_ACTIVE_PROCESS_LINKS,
        SMSS + EPROCESS_ACTIVE_PROCESS_LINKS,
    );

    let regs = registers(SYSTEM_DTB);
    let err = fx
        .state(&regs)
        .find_process_by_translation_root(Pa(0x7777000))
        .unwrap_err();
    assert!(corrupted(&err));
}

#[test]
fn search_stops_on_null_link() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver()
        .write_u64(SMSS + EPROCESS_ACTIVE_PROCESS_LINKS, 0);

    let regs = registers(SYSTEM_DTB);
    let err = fx
        .state(&regs)
        .find_process_by_translation_root(Pa(EXPLORER_DTB))
        .unwrap_err();
    assert!(corrupted(&err));
}

#[test]
fn search_aborts_on_read_failure() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver()
        .fault_at(SMSS + KPROCESS_DIRECTORY_TABLE_BASE);

    let regs = registers(SYSTEM_DTB);
    let err = fx
        .state(&regs)
        .find_process_by_translation_root(Pa(EXPLORER_DTB))
        .unwrap_err();
    assert!(err.is_page_fault());
}

#[test]
fn processes_in_list_order() {
    let fx = Fixture::new();
    three_processes(fx.driver());

    let regs = registers(SYSTEM_DTB);
    let names = fx
        .state(&regs)
        .processes()
        .unwrap()
        .map(|process| process.and_then(|process| process.name()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(names, ["System", "smss.exe", "explorer.exe"]);
}

///////////////////////////////////////////////////////////////////////////////
// Identity
///////////////////////////////////////////////////////////////////////////////

#[test]
fn identity_fields() {
    let fx = Fixture::new();
    three_processes(fx.driver());

    let regs = registers(EXPLORER_DTB);
    let vmi = fx.state(&regs);
    let process = vmi.process(ProcessObject(Va(EXPLORER)));

    assert_eq!(process.id().unwrap(), ProcessId(4242));
    assert_eq!(process.parent_id().unwrap(), ProcessId(4000));
    assert_eq!(process.name().unwrap(), "explorer.exe");
    assert_eq!(process.translation_root().unwrap(), Pa(EXPLORER_DTB));
    assert_eq!(
        process.user_translation_root().unwrap(),
        Some(Pa(EXPLORER_USER_DTB))
    );
}

#[test]
fn name_is_limited_to_image_file_name() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().write_bytes(
        EXPLORER + EPROCESS_IMAGE_FILE_NAME,
        b"MicrosoftEdgeUpdate.exe\0",
    );

    let regs = registers(EXPLORER_DTB);
    let process = fx.state(&regs).process(ProcessObject(Va(EXPLORER)));

    assert_eq!(process.name().unwrap(), "MicrosoftEdgeUp");
}
