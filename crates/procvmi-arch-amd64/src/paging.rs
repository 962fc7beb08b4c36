/// Paging modes of the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingMode {
    /// 32-bit paging.
    Legacy,

    /// 32-bit paging with Physical Address Extension.
    PAE,

    /// 64-bit long mode with 4-level paging.
    Ia32e,

    /// 64-bit long mode with 5-level paging (57-bit linear addresses).
    Ia32eLA57,
}

impl PagingMode {
    /// Returns the pointer size of the paging mode in bytes.
    pub fn address_width(self) -> usize {
        match self {
            Self::Legacy | Self::PAE => 4,
            Self::Ia32e | Self::Ia32eLA57 => 8,
        }
    }
}
