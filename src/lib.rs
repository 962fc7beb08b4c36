//! Process and memory-map introspection of Windows guests.
//!
//! `procvmi` answers, for the vCPU that raised an introspection event, which
//! thread and process are running and how the process address space is laid
//! out. All answers come from guest memory, read from outside the VM through
//! a [`VmiRead`] driver and interpreted with the kernel layout from a debug
//! profile.
//!
//! The crate is split into:
//!
//! - [`procvmi_core`], re-exported at the root: addresses, the memory
//!   reader and the driver and architecture traits.
//! - [`arch::amd64`]: the x86-64 register state and paging modes.
//! - [`os::windows`]: the Windows kernel structures, current thread and
//!   process resolution, VAD lookups and the event-level [`ProcessVmi`]
//!   facade.
//!
//! [`ProcessVmi`]: os::windows::ProcessVmi

pub use procvmi_core::*;

/// Architecture definitions.
pub mod arch {
    #[cfg(feature = "arch-amd64")]
    pub use procvmi_arch_amd64 as amd64;
}

/// Operating system support.
pub mod os {
    #[cfg(feature = "os-windows")]
    pub use procvmi_os_windows as windows;
}
