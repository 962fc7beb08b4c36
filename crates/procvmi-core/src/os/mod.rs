//! OS-independent object handles.

mod common;

pub use self::common::{MemorySegment, ProcessId, ProcessObject, ThreadObject};
