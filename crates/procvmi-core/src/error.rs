use crate::{Pa, Va};

/// An error that can occur while reading guest state.
#[derive(thiserror::Error, Debug)]
pub enum VmiError {
    /// The backend failed to service a request.
    #[error(transparent)]
    Driver(Box<dyn std::error::Error>),

    /// An OS-specific error occurred.
    #[error(transparent)]
    Os(Box<dyn std::error::Error>),

    /// A structure layout could not be extracted from a profile.
    #[error(transparent)]
    Isr(#[from] isr_macros::Error),

    /// A page fault occurred.
    #[error("Page not present ({:?}, len: {})", .0[0], .0.len())]
    PageFault(PageFaults),

    /// The given address has invalid width.
    #[error("Invalid address width")]
    InvalidAddressWidth,

    /// Other error.
    #[error("{0}")]
    Other(&'static str),
}

/// A page fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageFault {
    /// The virtual address that could not be translated.
    pub address: Va,

    /// The root of the page table hierarchy.
    pub root: Pa,
}

/// A collection of page faults.
pub type PageFaults = smallvec::SmallVec<[PageFault; 1]>;

impl From<(Va, Pa)> for PageFault {
    fn from((address, root): (Va, Pa)) -> Self {
        Self { address, root }
    }
}

impl VmiError {
    /// Creates a new page fault error.
    pub fn page_fault(pf: impl Into<PageFault>) -> Self {
        Self::PageFault(smallvec::smallvec![pf.into()])
    }

    /// Returns `true` if the error is a page fault.
    pub fn is_page_fault(&self) -> bool {
        matches!(self, Self::PageFault(_))
    }
}
