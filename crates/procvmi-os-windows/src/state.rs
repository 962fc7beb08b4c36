use procvmi_core::{
    AccessContext, Architecture, Pa, ProcessObject, Registers as _, ThreadObject, Va, VmiCore,
    VmiError, VmiRead,
};

use crate::{
    ArchAdapter, Field, ListEntryIterator, Offsets, ProcessIterator, Symbols, WindowsError,
    WindowsOs, WindowsProcess, WindowsThread,
};

/// Upper bound on the entries visited while walking `ActiveProcessLinks`.
const MAX_PROCESS_LIST_ENTRIES: usize = 1 << 16;

/// The Windows view of a vCPU at one introspection event.
///
/// Bundles the memory reader, the kernel layout and the register snapshot.
/// Every virtual address read through it is translated with the page tables
/// that were active on the vCPU when the event fired.
pub struct WindowsState<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    core: &'a VmiCore<Driver>,
    os: &'a WindowsOs,
    registers: &'a <Driver::Architecture as Architecture>::Registers,
}

impl<Driver> Clone for WindowsState<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<Driver> Copy for WindowsState<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
}

#[expect(non_snake_case)]
impl<'a, Driver> WindowsState<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    /// Creates a new Windows state.
    pub fn new(
        core: &'a VmiCore<Driver>,
        os: &'a WindowsOs,
        registers: &'a <Driver::Architecture as Architecture>::Registers,
    ) -> Self {
        Self {
            core,
            os,
            registers,
        }
    }

    /// Returns the underlying memory reader.
    pub fn core(&self) -> &'a VmiCore<Driver> {
        self.core
    }

    /// Returns the Windows layer this state was created from.
    pub fn underlying_os(&self) -> &'a WindowsOs {
        self.os
    }

    /// Returns the register snapshot.
    pub fn registers(&self) -> &'a <Driver::Architecture as Architecture>::Registers {
        self.registers
    }

    /// Returns the kernel structure offsets.
    pub fn offsets(&self) -> &'a Offsets {
        self.os.offsets()
    }

    /// Returns the kernel symbol RVAs.
    pub fn symbols(&self) -> &'a Symbols {
        self.os.symbols()
    }

    /// Returns an access context for `va` in the active address space.
    pub fn access_context(&self, va: Va) -> AccessContext {
        self.registers.access_context(va)
    }

    /// Reads a pointer stored in a kernel structure.
    ///
    /// The width is that of the kernel build, not of the mode the vCPU
    /// happens to run in.
    pub fn read_va(&self, va: Va) -> Result<Va, VmiError> {
        self.core
            .read_va(self.access_context(va), Driver::Architecture::ADDRESS_WIDTH)
    }

    /// Reads a 32-bit unsigned integer.
    pub fn read_u32(&self, va: Va) -> Result<u32, VmiError> {
        self.core.read_u32(self.access_context(va))
    }

    /// Reads a structure field located at `base + field.offset`, widened to
    /// a [`u64`].
    pub fn read_field(&self, base: Va, field: &Field) -> Result<u64, VmiError> {
        self.core
            .read_uint(self.access_context(base + field.offset), field.size as usize)
    }

    /// Reads a null-terminated string of at most `limit` bytes.
    pub fn read_string_limited(&self, va: Va, limit: usize) -> Result<String, VmiError> {
        self.core
            .read_string_limited(self.access_context(va), limit)
    }

    /// Returns the kernel image base.
    pub fn kernel_image_base(&self) -> Result<Va, VmiError> {
        Driver::Architecture::kernel_image_base(*self)
    }

    /// Returns the object for a thread address.
    pub fn thread(&self, thread: ThreadObject) -> WindowsThread<'a, Driver> {
        WindowsThread::new(*self, thread.0)
    }

    /// Returns the object for a process address.
    pub fn process(&self, process: ProcessObject) -> WindowsProcess<'a, Driver> {
        WindowsProcess::new(*self, process.0)
    }

    /// Returns the thread executing on the vCPU.
    ///
    /// Returns `Ok(None)` if the processor control block holds no thread.
    ///
    /// # Errors
    ///
    /// Fails without touching guest memory if the vCPU is not in a supported
    /// paging mode.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `KeGetCurrentThread()`, i.e. reading
    /// `_KPCR.Prcb.CurrentThread` relative to the per-CPU segment base.
    pub fn current_thread(&self) -> Result<Option<ThreadObject>, VmiError> {
        Driver::Architecture::check_paging_mode(*self)?;

        let offsets = self.offsets();
        let KPCR = &offsets._KPCR;
        let KPRCB = &offsets._KPRCB;

        let kpcr = Driver::Architecture::current_kpcr(*self);
        let thread = self.read_va(kpcr + KPCR.Prcb.offset + KPRCB.CurrentThread.offset)?;

        if thread.is_null() {
            tracing::debug!(%kpcr, "no current thread");
            return Ok(None);
        }

        Ok(Some(ThreadObject(thread)))
    }

    /// Returns the process owning the thread executing on the vCPU.
    ///
    /// The process is taken from the current thread first. If the thread
    /// cannot be resolved (including in an unsupported paging mode), or it
    /// yields no process, the process list is searched for the owner of the
    /// active page tables instead.
    ///
    /// # Errors
    ///
    /// Failures of the thread lookup are not reported; they only trigger the
    /// process list search. Failures of the search are returned.
    pub fn current_process(&self) -> Result<Option<ProcessObject>, VmiError> {
        match self.current_process_from_thread() {
            Ok(Some(process)) => return Ok(Some(process)),
            Ok(None) => tracing::debug!("current thread has no process"),
            Err(err) => tracing::debug!(%err, "failed to resolve process from thread"),
        }

        let root = self.registers.translation_root();
        tracing::trace!(%root, "searching process list");
        self.find_process_by_translation_root(root)
    }

    /// Returns the process owning the current thread, without a fallback.
    pub fn current_process_from_thread(&self) -> Result<Option<ProcessObject>, VmiError> {
        match self.current_thread()? {
            Some(thread) => self.thread(thread).process(),
            None => Ok(None),
        }
    }

    /// Returns the System process.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `PsInitialSystemProcess`.
    pub fn system_process(&self) -> Result<ProcessObject, VmiError> {
        let PsInitialSystemProcess =
            self.kernel_image_base()? + self.symbols().PsInitialSystemProcess;

        let process = self.read_va(PsInitialSystemProcess)?;
        if process.is_null() {
            return Err(WindowsError::CorruptedStruct("PsInitialSystemProcess").into());
        }

        Ok(ProcessObject(process))
    }

    /// Returns the address of the `PsActiveProcessHead` list head, if the
    /// symbol is known.
    pub fn active_process_head(&self) -> Result<Option<Va>, VmiError> {
        match self.symbols().PsActiveProcessHead {
            Some(PsActiveProcessHead) => Ok(Some(self.kernel_image_base()? + PsActiveProcessHead)),
            None => Ok(None),
        }
    }

    /// Returns an iterator over all processes, starting with the System
    /// process.
    pub fn processes(&self) -> Result<ProcessIterator<'a, Driver>, VmiError> {
        let system = self.system_process()?;
        Ok(ProcessIterator::new(
            *self,
            system,
            self.process_list_from(system)?,
        ))
    }

    /// Finds the process whose page tables are rooted at `root`.
    ///
    /// The System process is checked first, then every other entry of its
    /// `ActiveProcessLinks` list. Returns `Ok(None)` once the walk is back at
    /// the System process.
    ///
    /// # Errors
    ///
    /// Any failed read aborts the search. A list that never returns to the
    /// System process fails with [`WindowsError::CorruptedStruct`].
    pub fn find_process_by_translation_root(
        &self,
        root: Pa,
    ) -> Result<Option<ProcessObject>, VmiError> {
        let system = self.system_process()?;
        if self.process(system).matches_translation_root(root)? {
            return Ok(Some(system));
        }

        for entry in self.process_list_from(system)? {
            let process = self.process(ProcessObject(entry?));

            if process.matches_translation_root(root)? {
                return Ok(Some(process.object()));
            }
        }

        tracing::debug!(%root, "no process owns translation root");
        Ok(None)
    }

    /// Iterates the `ActiveProcessLinks` list anchored in `anchor`, yielding
    /// every other process.
    fn process_list_from(
        &self,
        anchor: ProcessObject,
    ) -> Result<ListEntryIterator<'a, Driver>, VmiError> {
        let ActiveProcessLinks = self.offsets()._EPROCESS.ActiveProcessLinks.offset;

        Ok(
            ListEntryIterator::new(*self, anchor.0 + ActiveProcessLinks, ActiveProcessLinks)
                .with_limit(MAX_PROCESS_LIST_ENTRIES)
                .skip_entry(self.active_process_head()?),
        )
    }
}
