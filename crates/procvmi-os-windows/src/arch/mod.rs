mod amd64;

use procvmi_core::{Architecture, Pa, Va, VmiError, VmiRead};

use crate::{WindowsError, WindowsState};

/// Architecture-specific Windows functionality.
pub trait ArchAdapter<Driver>: Architecture
where
    Driver: VmiRead<Architecture = Self>,
{
    /// Width in bytes of the pointers stored in kernel structures.
    const ADDRESS_WIDTH: usize;

    /// Fails with [`WindowsError::UnsupportedPagingMode`] unless the vCPU
    /// runs in a mode in which the per-CPU control region can be located.
    ///
    /// Reads no guest memory.
    fn check_paging_mode(vmi: WindowsState<Driver>) -> Result<(), WindowsError>;

    /// Returns the address of the processor control region of the vCPU.
    fn current_kpcr(vmi: WindowsState<Driver>) -> Va;

    /// Returns the kernel image base, deriving it from the register state
    /// on first use.
    fn kernel_image_base(vmi: WindowsState<Driver>) -> Result<Va, VmiError>;

    /// Converts a raw `DirectoryTableBase` value into a translation root
    /// comparable with [`Registers::translation_root`].
    ///
    /// [`Registers::translation_root`]: procvmi_core::Registers::translation_root
    fn translation_root_from(value: u64) -> Pa;
}
