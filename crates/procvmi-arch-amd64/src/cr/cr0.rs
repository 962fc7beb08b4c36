/// `CR0` control register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cr0(pub u64);

impl Cr0 {
    /// Checks if the CR0.PG flag is set.
    pub fn paging(self) -> bool {
        self.0 >> 31 & 1 != 0
    }
}

impl From<u64> for Cr0 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Cr0> for u64 {
    fn from(value: Cr0) -> Self {
        value.0
    }
}
