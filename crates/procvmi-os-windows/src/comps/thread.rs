use procvmi_core::{ProcessObject, ThreadObject, Va, VmiError, VmiRead};

use crate::{ArchAdapter, WindowsState};

/// A Windows thread.
///
/// # Implementation Details
///
/// Corresponds to `_KTHREAD`.
pub struct WindowsThread<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    vmi: WindowsState<'a, Driver>,

    /// Address of the `_KTHREAD` structure.
    va: Va,
}

#[expect(non_snake_case)]
impl<'a, Driver> WindowsThread<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    /// Creates a new Windows thread.
    pub fn new(vmi: WindowsState<'a, Driver>, va: Va) -> Self {
        Self { vmi, va }
    }

    /// Returns the thread object.
    pub fn object(&self) -> ThreadObject {
        ThreadObject(self.va)
    }

    /// Returns the process the thread belongs to.
    ///
    /// Returns `Ok(None)` if the pointer is `NULL`.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_KTHREAD.Process`.
    pub fn process(&self) -> Result<Option<ProcessObject>, VmiError> {
        let KTHREAD = &self.vmi.offsets()._KTHREAD;

        let process = self.vmi.read_va(self.va + KTHREAD.Process.offset)?;
        if process.is_null() {
            return Ok(None);
        }

        Ok(Some(ProcessObject(process)))
    }
}
