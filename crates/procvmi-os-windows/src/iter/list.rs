use std::iter::FusedIterator;

use procvmi_core::{Va, VmiError, VmiRead};

use crate::{ArchAdapter, WindowsError, WindowsState};

/// An iterator over the entries of a circular `LIST_ENTRY` list.
///
/// Yields the address of the structure containing each entry, like the
/// `CONTAINING_RECORD` macro in the Windows kernel. The walk follows `Flink`
/// and ends when it arrives back at the list head.
///
/// Guest memory can change under the walk, so a `NULL` link or more than
/// `limit` entries end the iteration with
/// [`WindowsError::CorruptedStruct`]. The iterator is fused after an error.
pub struct ListEntryIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    vmi: WindowsState<'a, Driver>,
    current: Option<Va>,

    /// Address of the list head.
    list_head: Va,

    /// Offset of the `LIST_ENTRY` within the containing structure.
    offset: u64,

    /// Offset of the forward link pointer (`LIST_ENTRY.Flink`).
    offset_flink: u64,

    /// An entry that is stepped over without being yielded.
    skip: Option<Va>,

    /// Entries left before the list is considered corrupted.
    remaining: usize,
}

impl<'a, Driver> ListEntryIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    /// Create a new list entry iterator.
    ///
    /// `list_head` itself is never yielded.
    pub fn new(vmi: WindowsState<'a, Driver>, list_head: Va, offset: u64) -> Self {
        let offset_flink = vmi.offsets()._LIST_ENTRY.Flink.offset;

        Self {
            vmi,
            current: None,
            list_head,
            offset,
            offset_flink,
            skip: None,
            remaining: usize::MAX,
        }
    }

    /// Limits the number of entries walked.
    pub fn with_limit(self, limit: usize) -> Self {
        Self {
            remaining: limit,
            ..self
        }
    }

    /// Steps over `entry` without yielding it.
    ///
    /// Used for a list head that is not embedded in a containing structure
    /// but sits in the middle of the walk.
    pub fn skip_entry(self, entry: Option<Va>) -> Self {
        Self {
            skip: entry,
            ..self
        }
    }

    fn __next(&mut self) -> Result<Option<Va>, VmiError> {
        loop {
            let entry = match self.current {
                Some(entry) => entry,
                None => {
                    let flink = self.vmi.read_va(self.list_head + self.offset_flink)?;
                    self.current = Some(flink);
                    flink
                }
            };

            if entry == self.list_head {
                return Ok(None);
            }

            if entry.is_null() {
                tracing::debug!(list_head = %self.list_head, "NULL list link");
                return Err(WindowsError::CorruptedStruct("LIST_ENTRY.Flink").into());
            }

            if self.remaining == 0 {
                tracing::debug!(list_head = %self.list_head, "list does not return to head");
                return Err(WindowsError::CorruptedStruct("LIST_ENTRY").into());
            }
            self.remaining -= 1;

            self.current = Some(self.vmi.read_va(entry + self.offset_flink)?);

            if Some(entry) == self.skip {
                continue;
            }

            return Ok(Some(entry - self.offset));
        }
    }
}

impl<Driver> Iterator for ListEntryIterator<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    type Item = Result<Va, VmiError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.__next();

        if result.is_err() {
            self.current = Some(self.list_head);
        }

        result.transpose()
    }
}

impl<Driver> FusedIterator for ListEntryIterator<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
}
