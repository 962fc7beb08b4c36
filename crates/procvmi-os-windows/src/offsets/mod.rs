//! Kernel structure layouts and symbol addresses.
//!
//! The tables are plain data. They can be deserialized from any `serde`
//! format, filled in by hand, or extracted from an ISR profile with
//! [`Offsets::new`] and [`Symbols::new`].

#![allow(non_snake_case, non_camel_case_types)]

mod profile;

use serde::{Deserialize, Serialize};

/// Location of a field inside a kernel structure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Byte offset from the start of the structure.
    pub offset: u64,

    /// Size of the field in bytes.
    pub size: u64,
}

impl Field {
    /// Creates a new field descriptor.
    pub const fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }
}

/// `_KPCR` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct _KPCR {
    /// The embedded `_KPRCB`.
    pub Prcb: Field,
}

/// `_KPRCB` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct _KPRCB {
    /// `_KTHREAD*` of the thread running on this processor.
    pub CurrentThread: Field,
}

/// `_KTHREAD` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct _KTHREAD {
    /// `_KPROCESS*` that owns the thread.
    pub Process: Field,
}

/// `_KPROCESS` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct _KPROCESS {
    /// Kernel page-table base of the process.
    pub DirectoryTableBase: Field,

    /// User page-table base, present on kernels with KVA shadowing.
    #[serde(default)]
    pub UserDirectoryTableBase: Option<Field>,
}

/// `_EPROCESS` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct _EPROCESS {
    /// `HANDLE`
    pub UniqueProcessId: Field,

    /// `HANDLE`
    pub InheritedFromUniqueProcessId: Field,

    /// `UCHAR[15]`
    pub ImageFileName: Field,

    /// `_LIST_ENTRY`
    pub ActiveProcessLinks: Field,

    /// `_RTL_AVL_TREE` (Windows 10+) or `_MM_AVL_TABLE` (Windows 7); the
    /// first pointer is the root node.
    pub VadRoot: Field,
}

/// `_LIST_ENTRY` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct _LIST_ENTRY {
    /// `_LIST_ENTRY*`
    pub Flink: Field,
}

/// `_MMVAD_SHORT` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct _MMVAD_SHORT {
    /// Left child (`VadNode.Left`, or `LeftChild` on Windows 7).
    pub Left: Field,

    /// Right child (`VadNode.Right`, or `RightChild` on Windows 7).
    pub Right: Field,

    /// First virtual page number of the region (low part on Windows 8.1+).
    pub StartingVpn: Field,

    /// Last virtual page number of the region (low part on Windows 8.1+).
    pub EndingVpn: Field,

    /// Upper 8 bits of the starting VPN (Windows 8.1+).
    #[serde(default)]
    pub StartingVpnHigh: Option<Field>,

    /// Upper 8 bits of the ending VPN (Windows 8.1+).
    #[serde(default)]
    pub EndingVpnHigh: Option<Field>,
}

/// Kernel structure offsets used by [`WindowsOs`].
///
/// Values are only meaningful for the kernel build they were taken from.
///
/// [`WindowsOs`]: crate::WindowsOs
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offsets {
    pub _KPCR: _KPCR,
    pub _KPRCB: _KPRCB,
    pub _KTHREAD: _KTHREAD,
    pub _KPROCESS: _KPROCESS,
    pub _EPROCESS: _EPROCESS,
    pub _LIST_ENTRY: _LIST_ENTRY,
    pub _MMVAD_SHORT: _MMVAD_SHORT,
}

/// Kernel symbol RVAs used by [`WindowsOs`].
///
/// [`WindowsOs`]: crate::WindowsOs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbols {
    /// `_EPROCESS*` of the System process.
    pub PsInitialSystemProcess: u64,

    /// The 64-bit system call entry point, loaded into `MSR_LSTAR`.
    pub KiSystemCall64: u64,

    /// Head of the `ActiveProcessLinks` list.
    #[serde(default)]
    pub PsActiveProcessHead: Option<u64>,
}
