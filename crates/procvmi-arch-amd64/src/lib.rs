//! AMD64 architecture definitions.

mod cr;
mod efer;
mod paging;
mod registers;
mod segment;


use procvmi_core::{Architecture, Pa, Va};

pub use self::{
    cr::{Cr0, Cr3, Cr4},
    efer::MsrEfer,
    paging::PagingMode,
    registers::Registers,
    segment::{SegmentDescriptor, Selector},
};

/// AMD64 architecture.
#[derive(Debug)]
pub struct Amd64;

impl Architecture for Amd64 {
    const PAGE_SIZE: u64 = 0x1000;
    const PAGE_SHIFT: u64 = 12;
    const PAGE_MASK: u64 = 0xFFFFFFFFFFFFF000;

    type Registers = Registers;
}

impl Amd64 {
    /// Determines the paging mode from the control registers and EFER.
    ///
    /// - **Paging disabled**: CR0.PG = 0
    /// - **32-bit paging**: CR0.PG = 1 and CR4.PAE = 0
    /// - **PAE paging**: CR0.PG = 1, CR4.PAE = 1, and IA32_EFER.LME = 0
    /// - **4-level paging**: CR0.PG = 1, CR4.PAE = 1, IA32_EFER.LME = 1, and CR4.LA57 = 0
    /// - **5-level paging**: CR0.PG = 1, CR4.PAE = 1, IA32_EFER.LME = 1, and CR4.LA57 = 1
    ///
    /// If paging is disabled, the function returns `None`.
    pub fn paging_mode(registers: &Registers) -> Option<PagingMode> {
        if !registers.cr0.paging() {
            return None;
        }

        if !registers.cr4.physical_address_extension() {
            return Some(PagingMode::Legacy);
        }

        if !registers.msr_efer.long_mode_enable() {
            return Some(PagingMode::PAE);
        }

        if !registers.cr4.linear_address_57_bit() {
            return Some(PagingMode::Ia32e);
        }

        Some(PagingMode::Ia32eLA57)
    }

    /// Checks if the address lies in the upper (kernel) half of the
    /// canonical address space.
    ///
    /// Bit 63 is tested, which holds for both 48-bit and 57-bit canonical
    /// addresses.
    pub fn is_kernel_address(va: Va) -> bool {
        va.0 >> 63 != 0
    }
}

impl procvmi_core::arch::Registers for Registers {
    type Architecture = Amd64;

    fn instruction_pointer(&self) -> u64 {
        self.rip
    }

    fn stack_pointer(&self) -> u64 {
        self.rsp
    }

    fn address_width(&self) -> Option<usize> {
        Amd64::paging_mode(self).map(PagingMode::address_width)
    }

    fn translation_root(&self) -> Pa {
        self.cr3.into()
    }
}
