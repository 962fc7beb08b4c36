//! Architecture abstractions.
//!
//! Only the parts needed to interpret a register snapshot taken at an
//! introspection event are modelled here: page geometry and the registers
//! that select an address space.

use std::fmt::Debug;

use crate::{AccessContext, AddressContext, Pa, Va};

/// CPU architecture constants and the register snapshot type.
pub trait Architecture {
    /// The size of a memory page in bytes.
    ///
    /// # Architecture-specific
    ///
    /// - **AMD64**: `0x1000` (4096 bytes)
    const PAGE_SIZE: u64;

    /// The number of bits to shift when converting between page numbers and
    /// addresses.
    ///
    /// # Architecture-specific
    ///
    /// - **AMD64**: `12`
    const PAGE_SHIFT: u64;

    /// A bitmask that keeps the page-aligned part of an address.
    ///
    /// # Architecture-specific
    ///
    /// - **AMD64**: `0xFFFFFFFFFFFFF000`
    const PAGE_MASK: u64;

    /// The CPU register snapshot delivered with an event.
    type Registers: Registers;
}

/// A register snapshot of a single virtual CPU.
pub trait Registers
where
    Self: Debug + Default + Clone + Copy,
{
    /// The specific CPU architecture implementation.
    type Architecture: Architecture + ?Sized;

    /// Returns the current value of the instruction pointer.
    ///
    /// # Architecture-specific
    ///
    /// - **AMD64**: `RIP`
    fn instruction_pointer(&self) -> u64;

    /// Returns the current value of the stack pointer.
    ///
    /// # Architecture-specific
    ///
    /// - **AMD64**: `RSP`
    fn stack_pointer(&self) -> u64;

    /// Returns the width of a pointer in the current execution mode, in
    /// bytes.
    ///
    /// Returns `None` if the mode cannot address virtual memory (paging
    /// disabled).
    fn address_width(&self) -> Option<usize>;

    /// Returns the root of the active paging hierarchy.
    ///
    /// # Architecture-specific
    ///
    /// - **AMD64**: `CR3` with the PCID and flag bits cleared
    fn translation_root(&self) -> Pa;

    /// Pairs a virtual address with the active translation root.
    fn address_context(&self, va: Va) -> AddressContext {
        AddressContext::new(va, self.translation_root())
    }

    /// Builds an access context that reads `va` through the active
    /// translation root.
    fn access_context(&self, va: Va) -> AccessContext {
        self.address_context(va).into()
    }
}
