use procvmi_core::{Pa, ProcessId, ProcessObject, Va, VmiError, VmiRead};

use super::WindowsRegion;
use crate::{ArchAdapter, VadTreeIterator, WindowsState};

/// Reference-count bits of an `_EX_FAST_REF`.
const EX_FAST_REF_MASK: u64 = 0b111;

/// Upper bound on the depth of a VAD lookup.
const MAX_VAD_DEPTH: usize = 64;

/// Decodes the object pointer stored in an `_EX_FAST_REF`.
///
/// The low three bits of the value are an inline reference count, so the
/// pointer is recovered by clearing them.
pub fn decode_fast_ref(value: Va) -> Va {
    Va(value.0 & !EX_FAST_REF_MASK)
}

/// A Windows process.
///
/// # Implementation Details
///
/// Corresponds to `_EPROCESS`.
pub struct WindowsProcess<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    vmi: WindowsState<'a, Driver>,

    /// Address of the `_EPROCESS` structure.
    va: Va,
}

impl<Driver> std::fmt::Debug for WindowsProcess<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id();
        let name = self.name();

        f.debug_struct("WindowsProcess")
            .field("va", &self.va)
            .field("id", &id)
            .field("name", &name)
            .finish()
    }
}

#[expect(non_snake_case)]
impl<'a, Driver> WindowsProcess<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    /// Creates a new Windows process.
    pub fn new(vmi: WindowsState<'a, Driver>, va: Va) -> Self {
        Self { vmi, va }
    }

    /// Returns the process object.
    pub fn object(&self) -> ProcessObject {
        ProcessObject(self.va)
    }

    /// Returns the process ID.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.UniqueProcessId`.
    pub fn id(&self) -> Result<ProcessId, VmiError> {
        let EPROCESS = &self.vmi.offsets()._EPROCESS;

        let result = self.vmi.read_u32(self.va + EPROCESS.UniqueProcessId.offset)?;
        Ok(ProcessId(result))
    }

    /// Returns the parent process ID.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.InheritedFromUniqueProcessId`.
    pub fn parent_id(&self) -> Result<ProcessId, VmiError> {
        let EPROCESS = &self.vmi.offsets()._EPROCESS;

        let result = self
            .vmi
            .read_u32(self.va + EPROCESS.InheritedFromUniqueProcessId.offset)?;
        Ok(ProcessId(result))
    }

    /// Returns the image file name of the process.
    ///
    /// The name is truncated to the 15 bytes the kernel stores. Bytes that
    /// are not valid UTF-8 are replaced with `U+FFFD`.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_EPROCESS.ImageFileName`.
    pub fn name(&self) -> Result<String, VmiError> {
        let EPROCESS = &self.vmi.offsets()._EPROCESS;

        self.vmi.read_string_limited(
            self.va + EPROCESS.ImageFileName.offset,
            EPROCESS.ImageFileName.size as usize,
        )
    }

    /// Returns the root of the kernel page tables of the process.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_KPROCESS.DirectoryTableBase`.
    pub fn translation_root(&self) -> Result<Pa, VmiError> {
        let KPROCESS = &self.vmi.offsets()._KPROCESS;

        let value = self.vmi.read_field(self.va, &KPROCESS.DirectoryTableBase)?;
        Ok(Driver::Architecture::translation_root_from(value))
    }

    /// Returns the root of the user-mode page tables of the process.
    ///
    /// Returns `Ok(None)` if the kernel does not shadow the kernel address
    /// space, or if the process has no separate user page tables.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_KPROCESS.UserDirectoryTableBase`.
    pub fn user_translation_root(&self) -> Result<Option<Pa>, VmiError> {
        let KPROCESS = &self.vmi.offsets()._KPROCESS;

        let UserDirectoryTableBase = match &KPROCESS.UserDirectoryTableBase {
            Some(UserDirectoryTableBase) => UserDirectoryTableBase,
            None => return Ok(None),
        };

        let value = self.vmi.read_field(self.va, UserDirectoryTableBase)?;
        let root = Driver::Architecture::translation_root_from(value);
        if root.is_null() {
            return Ok(None);
        }

        Ok(Some(root))
    }

    /// Checks if the page tables rooted at `root` belong to this process.
    ///
    /// Both the kernel and, when present, the user page tables are
    /// considered.
    pub fn matches_translation_root(&self, root: Pa) -> Result<bool, VmiError> {
        if self.translation_root()? == root {
            return Ok(true);
        }

        Ok(self.user_translation_root()? == Some(root))
    }

    /// Returns the root node of the VAD tree.
    ///
    /// Returns `Ok(None)` if the process has no VADs.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to the first pointer of `_EPROCESS.VadRoot`, decoded with
    /// [`decode_fast_ref`].
    pub fn vad_root(&self) -> Result<Option<WindowsRegion<'a, Driver>>, VmiError> {
        let EPROCESS = &self.vmi.offsets()._EPROCESS;

        let value = self.vmi.read_va(self.va + EPROCESS.VadRoot.offset)?;
        let root = decode_fast_ref(value);
        if root.is_null() {
            return Ok(None);
        }

        Ok(Some(WindowsRegion::new(self.vmi, root)))
    }

    /// Finds the memory region that contains `address`.
    ///
    /// The VAD tree is a binary search tree ordered by address, so the lookup
    /// descends from the root, going left when `address` lies below a node
    /// and right when it lies at or above the node's end.
    ///
    /// Returns `Ok(None)` if no region contains the address or the descent
    /// gets deeper than any balanced tree could be.
    pub fn find_region(&self, address: Va) -> Result<Option<WindowsRegion<'a, Driver>>, VmiError> {
        let mut current = self.vad_root()?;

        for _ in 0..MAX_VAD_DEPTH {
            let region = match current {
                Some(region) => region,
                None => return Ok(None),
            };

            if address < region.start()? {
                current = region.left()?;
                continue;
            }

            if address < region.end()? {
                return Ok(Some(region));
            }

            current = region.right()?;
        }

        tracing::warn!(process = %self.va, %address, "VAD lookup exceeded maximum depth");
        Ok(None)
    }

    /// Returns an iterator over the memory regions of the process, in
    /// preorder.
    ///
    /// See [`VadTreeIterator`] for which nodes are yielded.
    pub fn regions(&self) -> Result<VadTreeIterator<'a, Driver>, VmiError> {
        match self.vad_root()? {
            Some(root) => Ok(VadTreeIterator::new(self.vmi, root.va())),
            None => Ok(VadTreeIterator::empty(self.vmi)),
        }
    }
}
