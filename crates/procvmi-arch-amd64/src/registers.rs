use super::{Cr0, Cr3, Cr4, MsrEfer, SegmentDescriptor};

/// The subset of vCPU state captured with an introspection event.
#[expect(missing_docs)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub rip: u64,
    pub rsp: u64,

    pub cr0: Cr0,
    pub cr3: Cr3,
    pub cr4: Cr4,

    pub cs: SegmentDescriptor,
    pub gs: SegmentDescriptor,

    /// `IA32_KERNEL_GS_BASE`, the value `SWAPGS` exchanges with the GS base.
    pub shadow_gs: u64,

    pub msr_lstar: u64,
    pub msr_efer: MsrEfer,
}
