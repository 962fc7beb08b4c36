use procvmi_arch_amd64::{Cr0, Cr4, MsrEfer, Registers, SegmentDescriptor};
use procvmi_core::{ProcessObject, ThreadObject, Va};

use super::mock::*;
use crate::{WindowsError, WindowsOs};

#[test]
fn current_thread_from_kpcr() {
    let fx = Fixture::new();
    fx.driver().set_current_thread(EXPLORER_THREAD);

    let regs = registers(EXPLORER_DTB);
    let vmi = fx.state(&regs);

    assert_eq!(
        vmi.current_thread().unwrap(),
        Some(ThreadObject(Va(EXPLORER_THREAD)))
    );
    assert_eq!(
        fx.driver()
            .reads_at(KPCR + KPCR_PRCB + KPRCB_CURRENT_THREAD),
        1
    );
}

#[test]
fn current_thread_in_user_mode_uses_shadow_gs() {
    let fx = Fixture::new();
    fx.driver().set_current_thread(EXPLORER_THREAD);

    let regs = user_registers(EXPLORER_USER_DTB);
    let vmi = fx.state(&regs);

    assert_eq!(
        vmi.current_thread().unwrap(),
        Some(ThreadObject(Va(EXPLORER_THREAD)))
    );
}

#[test]
fn current_thread_null_is_none() {
    let fx = Fixture::new();
    fx.driver().set_current_thread(0);

    let regs = registers(EXPLORER_DTB);
    assert_eq!(fx.state(&regs).current_thread().unwrap(), None);
}

#[test]
fn current_thread_read_failure_is_error() {
    let fx = Fixture::new();

    let regs = registers(EXPLORER_DTB);
    let err = fx.state(&regs).current_thread().unwrap_err();
    assert!(err.is_page_fault());
}

fn non_long_mode_registers(cr3: u64) -> [Registers; 3] {
    let pae = Registers {
        msr_efer: MsrEfer(0),
        ..registers(cr3)
    };
    let legacy = Registers {
        cr4: Cr4(0),
        msr_efer: MsrEfer(0),
        ..registers(cr3)
    };
    let no_paging = Registers {
        cr0: Cr0(1),
        ..registers(cr3)
    };

    [pae, legacy, no_paging]
}

#[test]
fn non_long_mode_thread_is_rejected_without_reads() {
    let fx = Fixture::new();
    fx.driver().set_current_thread(EXPLORER_THREAD);

    for regs in non_long_mode_registers(EXPLORER_DTB) {
        let err = fx.state(&regs).current_thread().unwrap_err();
        assert!(matches!(
            WindowsError::downcast(&err),
            Some(WindowsError::UnsupportedPagingMode)
        ));
    }

    assert_eq!(fx.driver().reads(), 0);
}

#[test]
fn non_long_mode_process_comes_from_process_list() {
    let fx = Fixture::new();
    three_processes(fx.driver());
    fx.driver().set_current_thread(EXPLORER_THREAD);
    fx.driver().add_thread(EXPLORER_THREAD, EXPLORER);

    for regs in non_long_mode_registers(SMSS_DTB) {
        assert_eq!(
            fx.state(&regs).current_process().unwrap(),
            Some(ProcessObject(Va(SMSS)))
        );
    }

    // The thread is never consulted.
    assert_eq!(
        fx.driver()
            .reads_at(KPCR + KPCR_PRCB + KPRCB_CURRENT_THREAD),
        0
    );
    assert_eq!(fx.driver().reads_at(EXPLORER_THREAD + KTHREAD_PROCESS), 0);
}

#[test]
fn five_level_paging_is_supported() {
    let fx = Fixture::new();
    fx.driver().set_current_thread(EXPLORER_THREAD);
    fx.driver().add_thread(EXPLORER_THREAD, EXPLORER);

    let regs = Registers {
        cr4: Cr4(1 << 5 | 1 << 12),
        ..registers(EXPLORER_DTB)
    };
    let vmi = fx.state(&regs);

    assert_eq!(
        vmi.current_thread().unwrap(),
        Some(ThreadObject(Va(EXPLORER_THREAD)))
    );
    assert_eq!(
        vmi.current_process().unwrap(),
        Some(ProcessObject(Va(EXPLORER)))
    );
}

#[test]
fn five_level_paging_before_swapgs_uses_shadow_gs() {
    let fx = Fixture::new();
    fx.driver().set_current_thread(EXPLORER_THREAD);

    // Kernel CS with the user GS base still loaded. With 57-bit addresses
    // that base may have bit 47 set and still be a user address.
    let regs = Registers {
        cr4: Cr4(1 << 5 | 1 << 12),
        gs: SegmentDescriptor {
            base: 0x00ff_8000_1234_0000,
            ..Default::default()
        },
        shadow_gs: KPCR,
        ..registers(EXPLORER_DTB)
    };

    assert_eq!(
        fx.state(&regs).current_thread().unwrap(),
        Some(ThreadObject(Va(EXPLORER_THREAD)))
    );
}

#[test]
fn thread_to_process() {
    let fx = Fixture::new();
    fx.driver().add_thread(EXPLORER_THREAD, EXPLORER);

    let regs = registers(EXPLORER_DTB);
    let vmi = fx.state(&regs);

    let thread = vmi.thread(ThreadObject(Va(EXPLORER_THREAD)));
    assert_eq!(thread.process().unwrap(), Some(ProcessObject(Va(EXPLORER))));
}

#[test]
fn kernel_base_is_derived_from_lstar() {
    let fx = Fixture::with_os(WindowsOs::from_parts(offsets(), symbols()));
    three_processes(fx.driver());

    assert_eq!(fx.os.known_kernel_image_base(), None);

    let regs = registers(SYSTEM_DTB);
    let vmi = fx.state(&regs);

    assert_eq!(vmi.kernel_image_base().unwrap(), Va(KERNEL_BASE));
    assert_eq!(vmi.system_process().unwrap(), ProcessObject(Va(SYSTEM)));
    assert_eq!(fx.os.known_kernel_image_base(), Some(Va(KERNEL_BASE)));
}

#[test]
fn supplied_kernel_base_wins_over_lstar() {
    let fx = Fixture::new();

    let regs = Registers {
        msr_lstar: 0,
        ..registers(SYSTEM_DTB)
    };
    assert_eq!(fx.state(&regs).kernel_image_base().unwrap(), Va(KERNEL_BASE));
}
