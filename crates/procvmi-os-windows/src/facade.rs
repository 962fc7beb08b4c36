use once_cell::unsync::OnceCell;
use procvmi_core::{MemorySegment, Va, VmiCore, VmiError, VmiEvent, VmiRead};

use crate::{ArchAdapter, WindowsError, WindowsOs, WindowsProcess, WindowsState};

/// Event-driven process introspection of a Windows guest.
///
/// `ProcessVmi` owns the memory reader and, once [`initialize`]d, the
/// [`WindowsOs`] describing the guest kernel. Its accessors take the
/// [`VmiEvent`] being handled and never fail: anything that goes wrong,
/// including use before initialization, is logged and reported as a
/// sentinel (`NULL` address, `0`, `None`, [`MemorySegment::NULL`] or an
/// empty list).
///
/// Callers that need to tell failures apart should go through
/// [`state`] instead.
///
/// [`initialize`]: Self::initialize
/// [`state`]: Self::state
pub struct ProcessVmi<Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    core: VmiCore<Driver>,
    os: OnceCell<WindowsOs>,
}

impl<Driver> ProcessVmi<Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    /// Creates a new, uninitialized instance.
    pub fn new(core: VmiCore<Driver>) -> Self {
        Self {
            core,
            os: OnceCell::new(),
        }
    }

    /// Creates a new instance that is ready immediately.
    pub fn with_os(core: VmiCore<Driver>, os: WindowsOs) -> Self {
        Self {
            core,
            os: OnceCell::with_value(os),
        }
    }

    /// Installs the guest kernel description.
    ///
    /// # Errors
    ///
    /// Fails with [`WindowsError::AlreadyInitialized`] if called twice; the
    /// first description stays in place.
    pub fn initialize(&self, os: WindowsOs) -> Result<(), WindowsError> {
        self.os
            .set(os)
            .map_err(|_| WindowsError::AlreadyInitialized)
    }

    /// Checks if [`initialize`] has completed.
    ///
    /// [`initialize`]: Self::initialize
    pub fn is_ready(&self) -> bool {
        self.os.get().is_some()
    }

    /// Returns the memory reader.
    pub fn core(&self) -> &VmiCore<Driver> {
        &self.core
    }

    /// Returns the guest kernel description.
    pub fn os(&self) -> Result<&WindowsOs, WindowsError> {
        self.os.get().ok_or(WindowsError::NotReady)
    }

    /// Returns the typed Windows view of the vCPU that produced `event`.
    pub fn state<'a>(
        &'a self,
        event: &'a VmiEvent<Driver::Architecture>,
    ) -> Result<WindowsState<'a, Driver>, WindowsError> {
        Ok(WindowsState::new(&self.core, self.os()?, event.registers()))
    }

    /// Returns the address of the thread running on the event's vCPU, or
    /// `NULL`.
    pub fn current_thread(&self, event: &VmiEvent<Driver::Architecture>) -> Va {
        self.resolve(event, "current_thread", |vmi| {
            Ok(vmi.current_thread()?.map(|thread| thread.0))
        })
        .flatten()
        .unwrap_or_default()
    }

    /// Returns the address of the process running on the event's vCPU, or
    /// `NULL`.
    pub fn current_process(&self, event: &VmiEvent<Driver::Architecture>) -> Va {
        self.resolve(event, "current_process", |vmi| {
            Ok(vmi.current_process()?.map(|process| process.0))
        })
        .flatten()
        .unwrap_or_default()
    }

    /// Returns the ID of the current process, or `0`.
    pub fn current_pid(&self, event: &VmiEvent<Driver::Architecture>) -> u32 {
        self.with_current_process(event, "current_pid", |process| {
            Ok(process.id()?.0)
        })
        .unwrap_or_default()
    }

    /// Returns the parent ID of the current process, or `0`.
    pub fn current_parent_pid(&self, event: &VmiEvent<Driver::Architecture>) -> u32 {
        self.with_current_process(event, "current_parent_pid", |process| {
            Ok(process.parent_id()?.0)
        })
        .unwrap_or_default()
    }

    /// Returns the image name of the current process.
    pub fn current_name(&self, event: &VmiEvent<Driver::Architecture>) -> Option<String> {
        self.with_current_process(event, "current_name", |process| process.name())
    }

    /// Returns the memory region of the current process that contains
    /// `address`, or [`MemorySegment::NULL`].
    pub fn current_vad(
        &self,
        event: &VmiEvent<Driver::Architecture>,
        address: Va,
    ) -> MemorySegment {
        self.with_current_process(event, "current_vad", |process| {
            match process.find_region(address)? {
                Some(region) => region.segment(),
                None => Ok(MemorySegment::NULL),
            }
        })
        .unwrap_or(MemorySegment::NULL)
    }

    /// Returns all plausible memory regions of the current process, in VAD
    /// tree preorder.
    pub fn current_vad_list(&self, event: &VmiEvent<Driver::Architecture>) -> Vec<MemorySegment> {
        self.with_current_process(event, "current_vad_list", |process| {
            process
                .regions()?
                .map(|region| region.segment())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Runs `f` on the current process. `None` if the process could not be
    /// resolved or `f` failed.
    fn with_current_process<T>(
        &self,
        event: &VmiEvent<Driver::Architecture>,
        operation: &'static str,
        f: impl FnOnce(WindowsProcess<'_, Driver>) -> Result<T, VmiError>,
    ) -> Option<T> {
        self.resolve(event, operation, |vmi| match vmi.current_process()? {
            Some(process) => f(vmi.process(process)).map(Some),
            None => {
                tracing::debug!(operation, "no current process");
                Ok(None)
            }
        })
        .flatten()
    }

    /// Checks readiness, then runs `f`. Failures are logged and mapped to
    /// `None`.
    fn resolve<T>(
        &self,
        event: &VmiEvent<Driver::Architecture>,
        operation: &'static str,
        f: impl FnOnce(WindowsState<'_, Driver>) -> Result<T, VmiError>,
    ) -> Option<T> {
        let vmi = match self.state(event) {
            Ok(vmi) => vmi,
            Err(err) => {
                tracing::error!(operation, %err, "not ready");
                return None;
            }
        };

        match f(vmi) {
            Ok(value) => Some(value),
            Err(err) => {
                match WindowsError::downcast(&err) {
                    Some(WindowsError::UnsupportedPagingMode) => {
                        tracing::warn!(operation, vcpu = %event.vcpu_id(), %err, "resolution failed")
                    }
                    _ => tracing::debug!(operation, vcpu = %event.vcpu_id(), %err, "resolution failed"),
                }
                None
            }
        }
    }
}
