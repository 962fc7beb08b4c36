//! Windows process and memory-map introspection.
//!
//! Everything here is computed from raw guest memory: the running thread
//! from the per-CPU control region, the owning process from the thread (or,
//! failing that, from the global process list), and the process memory map
//! from its VAD tree.
//!
//! Two surfaces are exposed:
//!
//! - [`WindowsState`] and the objects it hands out ([`WindowsThread`],
//!   [`WindowsProcess`], [`WindowsRegion`]) return `Result`s and keep the
//!   full failure taxonomy.
//! - [`ProcessVmi`] wraps them into sentinel-returning accessors keyed by an
//!   introspection event, and owns the one-time initialization.

mod arch;
mod comps;
mod error;
mod facade;
mod iter;
mod offsets;
mod state;

#[cfg(test)]
mod tests;

use isr_core::Profile;
use once_cell::sync::OnceCell;
use procvmi_core::{Va, VmiError};

pub use self::{
    arch::ArchAdapter,
    comps::{WindowsProcess, WindowsRegion, WindowsThread, decode_fast_ref},
    error::WindowsError,
    facade::ProcessVmi,
    iter::{ListEntryIterator, ProcessIterator, VadTreeIterator},
    offsets::{
        _EPROCESS, _KPCR, _KPRCB, _KPROCESS, _KTHREAD, _LIST_ENTRY, _MMVAD_SHORT, Field, Offsets,
        Symbols,
    },
    state::WindowsState,
};

/// The guest-specific knowledge needed to interpret a Windows kernel.
///
/// Holds the structure offsets and symbol RVAs of the running kernel build
/// and, once known, the kernel image base. A `WindowsOs` is read-only after
/// construction; the kernel base is resolved at most once.
#[derive(Debug)]
pub struct WindowsOs {
    offsets: Offsets,
    symbols: Symbols,
    kernel_image_base: OnceCell<Va>,
}

impl WindowsOs {
    /// Creates a new `WindowsOs` instance from an ISR profile.
    ///
    /// The kernel image base is derived from `MSR_LSTAR` on first use.
    pub fn new(profile: &Profile) -> Result<Self, VmiError> {
        Ok(Self::from_parts(
            Offsets::new(profile)?,
            Symbols::new(profile)?,
        ))
    }

    /// Creates a new `WindowsOs` instance from an ISR profile, with a known
    /// kernel base address.
    pub fn with_kernel_base(profile: &Profile, kernel_base: Va) -> Result<Self, VmiError> {
        Ok(Self::from_parts(Offsets::new(profile)?, Symbols::new(profile)?)
            .and_kernel_base(kernel_base))
    }

    /// Creates a new `WindowsOs` instance from explicit tables.
    pub fn from_parts(offsets: Offsets, symbols: Symbols) -> Self {
        Self {
            offsets,
            symbols,
            kernel_image_base: OnceCell::new(),
        }
    }

    /// Sets the kernel image base instead of deriving it from `MSR_LSTAR`.
    pub fn and_kernel_base(self, kernel_base: Va) -> Self {
        Self {
            kernel_image_base: OnceCell::with_value(kernel_base),
            ..self
        }
    }

    /// Returns the kernel structure offsets.
    pub fn offsets(&self) -> &Offsets {
        &self.offsets
    }

    /// Returns the kernel symbol RVAs.
    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Returns the kernel image base, if it was supplied or already derived.
    pub fn known_kernel_image_base(&self) -> Option<Va> {
        self.kernel_image_base.get().copied()
    }
}
