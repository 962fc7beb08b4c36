use crate::{AccessContext, Architecture, VmiError};

/// The memory read primitive exposed by a hypervisor backend.
///
/// Implementors translate the access context (when it asks for paging) and
/// fill `buffer` from guest memory. A read either fills the whole buffer or
/// fails. [`VmiCore`] never asks for a range that crosses a page boundary.
///
/// [`VmiCore`]: crate::VmiCore
pub trait VmiRead {
    /// The architecture of the guest.
    type Architecture: Architecture + ?Sized;

    /// Reads guest memory into `buffer`.
    fn read(&self, ctx: AccessContext, buffer: &mut [u8]) -> Result<(), VmiError>;
}

impl<T> VmiRead for &T
where
    T: VmiRead + ?Sized,
{
    type Architecture = T::Architecture;

    fn read(&self, ctx: AccessContext, buffer: &mut [u8]) -> Result<(), VmiError> {
        (**self).read(ctx, buffer)
    }
}
