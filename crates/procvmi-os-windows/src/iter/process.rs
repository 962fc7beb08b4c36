use std::iter::FusedIterator;

use procvmi_core::{ProcessObject, VmiError, VmiRead};

use super::ListEntryIterator;
use crate::{ArchAdapter, WindowsProcess, WindowsState};

/// An iterator over all processes, starting with the one the walk is
/// anchored in.
///
/// Returned by [`WindowsState::processes`].
pub struct ProcessIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    vmi: WindowsState<'a, Driver>,
    anchor: Option<ProcessObject>,
    entries: ListEntryIterator<'a, Driver>,
}

impl<'a, Driver> ProcessIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    pub(crate) fn new(
        vmi: WindowsState<'a, Driver>,
        anchor: ProcessObject,
        entries: ListEntryIterator<'a, Driver>,
    ) -> Self {
        Self {
            vmi,
            anchor: Some(anchor),
            entries,
        }
    }
}

impl<'a, Driver> Iterator for ProcessIterator<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    type Item = Result<WindowsProcess<'a, Driver>, VmiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(anchor) = self.anchor.take() {
            return Some(Ok(self.vmi.process(anchor)));
        }

        let vmi = self.vmi;
        self.entries
            .next()
            .map(|entry| entry.map(|va| vmi.process(ProcessObject(va))))
    }
}

impl<Driver> FusedIterator for ProcessIterator<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
}
