use zerocopy::{FromBytes, IntoBytes};

/// A 16-bit segment selector.
#[repr(C)]
#[derive(Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes)]
pub struct Selector(pub u16);

impl Selector {
    /// Returns the requested privilege level (0-3).
    ///
    /// For CS this is the current privilege level of the vCPU.
    pub fn request_privilege_level(self) -> u8 {
        (self.0 & 0b11) as _
    }

    /// Returns the descriptor table index.
    pub fn index(self) -> u16 {
        self.0 >> 3 & 0x1fff
    }
}

impl From<u16> for Selector {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Selector> for u16 {
    fn from(value: Selector) -> Self {
        value.0
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("index", &self.index())
            .field("rpl", &self.request_privilege_level())
            .finish()
    }
}
