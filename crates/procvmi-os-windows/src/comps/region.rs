use once_cell::unsync::OnceCell;
use procvmi_core::{Architecture, MemorySegment, Va, VmiError, VmiRead};

use crate::{ArchAdapter, WindowsState};

/// A Windows memory region.
///
/// A memory region is a range of virtual memory allocated within a process,
/// described by a **Virtual Address Descriptor (VAD)**. VADs form a binary
/// search tree ordered by address.
///
/// # Implementation Details
///
/// Corresponds to `_MMVAD_SHORT`.
pub struct WindowsRegion<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    vmi: WindowsState<'a, Driver>,

    /// Address of the `_MMVAD_SHORT` structure.
    va: Va,

    start: OnceCell<Va>,
    end: OnceCell<Va>,
}

impl<Driver> std::fmt::Debug for WindowsRegion<'_, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let start = self.start();
        let end = self.end();

        f.debug_struct("WindowsRegion")
            .field("va", &self.va)
            .field("start", &start)
            .field("end", &end)
            .finish()
    }
}

#[expect(non_snake_case)]
impl<'a, Driver> WindowsRegion<'a, Driver>
where
    Driver: VmiRead,
    Driver::Architecture: ArchAdapter<Driver>,
{
    /// Creates a new Windows memory region.
    pub fn new(vmi: WindowsState<'a, Driver>, vad: Va) -> Self {
        Self {
            vmi,
            va: vad,
            start: OnceCell::new(),
            end: OnceCell::new(),
        }
    }

    /// Returns the address of the VAD node.
    pub fn va(&self) -> Va {
        self.va
    }

    /// Returns the starting VPN of the VAD.
    ///
    /// # Implementation Details
    ///
    /// The starting VPN is calculated from `_MMVAD_SHORT.StartingVpn` and,
    /// if present, `_MMVAD_SHORT.StartingVpnHigh` fields.
    pub fn starting_vpn(&self) -> Result<u64, VmiError> {
        let MMVAD_SHORT = &self.vmi.offsets()._MMVAD_SHORT;

        let low = self.vmi.read_field(self.va, &MMVAD_SHORT.StartingVpn)?;
        match &MMVAD_SHORT.StartingVpnHigh {
            Some(StartingVpnHigh) => {
                let high = self.vmi.read_field(self.va, StartingVpnHigh)?;
                Ok((high << 32) | (low & 0xffff_ffff))
            }
            None => Ok(low),
        }
    }

    /// Returns the ending VPN of the VAD.
    ///
    /// # Implementation Details
    ///
    /// The ending VPN is calculated from `_MMVAD_SHORT.EndingVpn` and,
    /// if present, `_MMVAD_SHORT.EndingVpnHigh` fields.
    pub fn ending_vpn(&self) -> Result<u64, VmiError> {
        let MMVAD_SHORT = &self.vmi.offsets()._MMVAD_SHORT;

        let low = self.vmi.read_field(self.va, &MMVAD_SHORT.EndingVpn)?;
        match &MMVAD_SHORT.EndingVpnHigh {
            Some(EndingVpnHigh) => {
                let high = self.vmi.read_field(self.va, EndingVpnHigh)?;
                Ok((high << 32) | (low & 0xffff_ffff))
            }
            None => Ok(low),
        }
    }

    /// Returns the first address of the region.
    ///
    /// # Notes
    ///
    /// This value is cached after the first read.
    pub fn start(&self) -> Result<Va, VmiError> {
        self.start
            .get_or_try_init(|| {
                let vpn = self.starting_vpn()?;
                Ok(Va(vpn << Driver::Architecture::PAGE_SHIFT))
            })
            .copied()
    }

    /// Returns the end address of the region, `EndingVpn` shifted to a
    /// page address.
    ///
    /// # Notes
    ///
    /// This value is cached after the first read.
    pub fn end(&self) -> Result<Va, VmiError> {
        self.end
            .get_or_try_init(|| {
                let vpn = self.ending_vpn()?;
                Ok(Va(vpn << Driver::Architecture::PAGE_SHIFT))
            })
            .copied()
    }

    /// Returns the region as a memory segment spanning `[start, end)`.
    pub fn segment(&self) -> Result<MemorySegment, VmiError> {
        let start = self.start()?;
        let end = self.end()?;

        Ok(MemorySegment::new(start, end.0.wrapping_sub(start.0)))
    }

    /// Checks if the bounds of the region look like a real user or kernel
    /// allocation.
    ///
    /// The start must be non-zero and below the end, and neither bound may
    /// have bit 63 set.
    pub fn is_plausible(&self) -> Result<bool, VmiError> {
        const BIT63: u64 = 1 << 63;

        let start = self.start()?;
        let end = self.end()?;

        Ok(!start.is_null() && start < end && start.0 & BIT63 == 0 && end.0 & BIT63 == 0)
    }

    /// Returns the left child of the VAD node.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_MMVAD_SHORT.VadNode.Left`.
    pub fn left(&self) -> Result<Option<WindowsRegion<'a, Driver>>, VmiError> {
        let MMVAD_SHORT = &self.vmi.offsets()._MMVAD_SHORT;
        self.child(MMVAD_SHORT.Left.offset)
    }

    /// Returns the right child of the VAD node.
    ///
    /// # Implementation Details
    ///
    /// Corresponds to `_MMVAD_SHORT.VadNode.Right`.
    pub fn right(&self) -> Result<Option<WindowsRegion<'a, Driver>>, VmiError> {
        let MMVAD_SHORT = &self.vmi.offsets()._MMVAD_SHORT;
        self.child(MMVAD_SHORT.Right.offset)
    }

    fn child(&self, offset: u64) -> Result<Option<WindowsRegion<'a, Driver>>, VmiError> {
        let child = self.vmi.read_va(self.va + offset)?;
        if child.is_null() {
            return Ok(None);
        }

        Ok(Some(WindowsRegion::new(self.vmi, child)))
    }
}
