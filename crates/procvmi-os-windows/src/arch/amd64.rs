use procvmi_arch_amd64::{Amd64, Cr3, PagingMode};
use procvmi_core::{Pa, Va, VmiError, VmiRead};

use super::ArchAdapter;
use crate::{WindowsError, WindowsState};

#[allow(non_snake_case)]
impl<Driver> ArchAdapter<Driver> for Amd64
where
    Driver: VmiRead<Architecture = Self>,
{
    const ADDRESS_WIDTH: usize = 8;

    /// Accepts 4-level and 5-level long mode. In any other mode the GS base
    /// does not point at a 64-bit KPCR.
    fn check_paging_mode(vmi: WindowsState<Driver>) -> Result<(), WindowsError> {
        let registers = vmi.registers();

        match Amd64::paging_mode(registers) {
            Some(PagingMode::Ia32e | PagingMode::Ia32eLA57) => Ok(()),
            paging_mode => {
                tracing::warn!(?paging_mode, "unsupported paging mode");
                Err(WindowsError::UnsupportedPagingMode)
            }
        }
    }

    fn current_kpcr(vmi: WindowsState<Driver>) -> Va {
        let registers = vmi.registers();

        // SWAPGS has not run yet (or already ran) when the event was taken
        // in user mode, so the kernel GS base sits in the shadow register.
        if registers.cs.selector.request_privilege_level() != 0
            || !Amd64::is_kernel_address(Va(registers.gs.base))
        {
            Va(registers.shadow_gs)
        }
        else {
            Va(registers.gs.base)
        }
    }

    fn kernel_image_base(vmi: WindowsState<Driver>) -> Result<Va, VmiError> {
        vmi.underlying_os()
            .kernel_image_base
            .get_or_try_init(|| {
                let KiSystemCall64 = vmi.underlying_os().symbols().KiSystemCall64;

                let registers = vmi.registers();
                let base = registers
                    .msr_lstar
                    .checked_sub(KiSystemCall64)
                    .ok_or(VmiError::Other("MSR_LSTAR below KiSystemCall64"))?;

                tracing::debug!(kernel_image_base = %Va(base), "derived kernel image base");
                Ok(Va(base))
            })
            .copied()
    }

    fn translation_root_from(value: u64) -> Pa {
        Cr3(value).into()
    }
}
