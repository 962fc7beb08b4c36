use super::Selector;

/// The hidden part of a segment register as reported by the hypervisor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDescriptor {
    /// The linear base address of the segment.
    ///
    /// For GS in 64-bit mode this is the full 64-bit `IA32_GS_BASE`.
    pub base: u64,

    /// The selector loaded into the segment register.
    pub selector: Selector,
}
