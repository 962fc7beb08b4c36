/// `CR4` control register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cr4(pub u64);

impl Cr4 {
    /// Checks if the CR4.PAE flag is set.
    ///
    /// Required for 4-level and 5-level paging.
    pub fn physical_address_extension(self) -> bool {
        self.0 >> 5 & 1 != 0
    }

    /// Checks if the CR4.LA57 flag is set (5-level paging in IA-32e mode).
    pub fn linear_address_57_bit(self) -> bool {
        self.0 >> 12 & 1 != 0
    }
}

impl From<u64> for Cr4 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Cr4> for u64 {
    fn from(value: Cr4) -> Self {
        value.0
    }
}
