/// The `IA32_EFER` model-specific register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MsrEfer(pub u64);

impl MsrEfer {
    /// Checks if the LME flag is set (IA-32e mode enable).
    pub fn long_mode_enable(self) -> bool {
        self.0 >> 8 & 1 != 0
    }
}

impl From<u64> for MsrEfer {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<MsrEfer> for u64 {
    fn from(value: MsrEfer) -> Self {
        value.0
    }
}
