use serde::{Deserialize, Serialize};

use crate::Va;

/// A process object within a guest.
///
/// The value is the guest virtual address of the kernel's process control
/// structure (`_EPROCESS` on Windows). It carries no ownership; it is only a
/// coordinate for field reads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessObject(pub Va);

impl ProcessObject {
    /// Checks if the process object is a null reference.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Converts the process object to a 64-bit unsigned integer.
    pub fn to_u64(&self) -> u64 {
        self.0.0
    }
}

impl From<Va> for ProcessObject {
    fn from(value: Va) -> Self {
        Self(value)
    }
}

impl From<ProcessObject> for Va {
    fn from(value: ProcessObject) -> Self {
        value.0
    }
}

impl std::fmt::Display for ProcessObject {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A thread object within a guest.
///
/// The guest virtual address of the kernel's thread control structure
/// (`_KTHREAD` on Windows).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadObject(pub Va);

impl ThreadObject {
    /// Checks if the thread object is a null reference.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Converts the thread object to a 64-bit unsigned integer.
    pub fn to_u64(&self) -> u64 {
        self.0.0
    }
}

impl From<Va> for ThreadObject {
    fn from(value: Va) -> Self {
        Self(value)
    }
}

impl From<ThreadObject> for Va {
    fn from(value: ThreadObject) -> Self {
        value.0
    }
}

impl std::fmt::Display for ThreadObject {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A process ID within a guest.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<ProcessId> for u32 {
    fn from(value: ProcessId) -> Self {
        value.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous range of guest virtual memory owned by a process.
///
/// `base` is the first byte of the range and `size` its length in bytes.
/// The all-zero value, [`MemorySegment::NULL`], stands for "no segment".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemorySegment {
    /// The first address of the segment.
    pub base: Va,

    /// The length of the segment in bytes.
    pub size: u64,
}

impl MemorySegment {
    /// The "not found" segment.
    pub const NULL: Self = Self {
        base: Va(0),
        size: 0,
    };

    /// Creates a segment spanning `[base, base + size)`.
    pub fn new(base: Va, size: u64) -> Self {
        Self { base, size }
    }

    /// Creates a segment spanning `[start, end)`.
    ///
    /// Returns `None` if `end` does not lie above `start`.
    pub fn from_bounds(start: Va, end: Va) -> Option<Self> {
        (start < end).then(|| Self::new(start, end.0 - start.0))
    }

    /// Checks if this is the "not found" segment.
    pub fn is_null(&self) -> bool {
        self.base.is_null() && self.size == 0
    }

    /// Returns the first address past the segment.
    pub fn end(&self) -> Va {
        self.base + self.size
    }

    /// Checks if `va` lies within the segment.
    pub fn contains(&self, va: Va) -> bool {
        self.base <= va && va.0 - self.base.0 < self.size
    }
}

impl std::fmt::Display for MemorySegment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.base, self.end())
    }
}
