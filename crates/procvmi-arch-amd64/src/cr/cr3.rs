use procvmi_core::Pa;

/// `CR3` control register.
///
/// Holds the physical address of the top-level page table together with the
/// PCID in the low 12 bits and, when written, the no-invalidate flag in
/// bit 63.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct Cr3(pub u64);

impl Cr3 {
    /// Returns the Process Context Identifier (PCID).
    pub fn pcid(self) -> u16 {
        (self.0 & 0xfff) as _
    }

    /// Returns the page table base page frame number.
    pub fn page_frame_number(self) -> u64 {
        (self.0 & 0x000f_ffff_ffff_f000) >> 12
    }

    /// Returns the physical address of the top-level page table.
    pub fn page_table_base(self) -> Pa {
        Pa(self.page_frame_number() << 12)
    }
}

impl std::fmt::Debug for Cr3 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Cr3")
            .field("pcid", &self.pcid())
            .field("page_frame_number", &self.page_frame_number())
            .finish()
    }
}

impl From<u64> for Cr3 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Cr3> for u64 {
    fn from(value: Cr3) -> Self {
        value.0
    }
}

impl From<Cr3> for Pa {
    fn from(value: Cr3) -> Self {
        value.page_table_base()
    }
}
