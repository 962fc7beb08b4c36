//! Core guest memory access for procvmi.
//!
//! This crate defines the coordinates used to talk about guest memory
//! ([`Va`], [`Pa`], [`AccessContext`]), the [`VmiRead`] primitive a
//! hypervisor backend implements, and [`VmiCore`], which layers typed reads
//! on top of it.

pub mod arch;
mod core;
mod driver;
mod error;
mod event;
pub mod os;


pub use self::{
    arch::{Architecture, Registers},
    core::{AccessContext, AddressContext, Pa, TranslationMechanism, Va, VcpuId},
    driver::VmiRead,
    error::{PageFault, PageFaults, VmiError},
    event::VmiEvent,
    os::{MemorySegment, ProcessId, ProcessObject, ThreadObject},
};

/// Typed reads of guest memory on top of a [`VmiRead`] backend.
pub struct VmiCore<Driver>
where
    Driver: VmiRead,
{
    driver: Driver,
    read_string_length_limit: Option<usize>,
}

impl<Driver> VmiCore<Driver>
where
    Driver: VmiRead,
{
    /// Creates a new `VmiCore` instance with the given driver.
    pub fn new(driver: Driver) -> Result<Self, VmiError> {
        Ok(Self {
            driver,
            read_string_length_limit: None,
        })
    }

    /// Sets a limit on the length of strings read by the `read_string` methods.
    /// If the limit is reached, the string will be truncated.
    pub fn with_read_string_length_limit(self, limit_in_bytes: usize) -> Self {
        Self {
            read_string_length_limit: Some(limit_in_bytes),
            ..self
        }
    }

    /// Returns the current limit on the length of strings read by the
    /// `read_string` methods.
    pub fn read_string_length_limit(&self) -> Option<usize> {
        self.read_string_length_limit
    }

    /// Returns the driver used by this `VmiCore` instance.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Reads memory from the virtual machine.
    ///
    /// The request is split at page boundaries, so the driver is asked for
    /// at most one page at a time.
    pub fn read(&self, ctx: impl Into<AccessContext>, buffer: &mut [u8]) -> Result<(), VmiError> {
        let ctx = ctx.into();
        let page_size = Driver::Architecture::PAGE_SIZE as usize;
        let mut position = 0usize;
        let mut remaining = buffer.len();

        while remaining > 0 {
            let chunk = ctx + position as u64;
            let offset = (chunk.address & !Driver::Architecture::PAGE_MASK) as usize;
            let size = std::cmp::min(remaining, page_size - offset);

            self.driver
                .read(chunk, &mut buffer[position..position + size])?;

            position += size;
            remaining -= size;
        }

        Ok(())
    }

    /// Reads a single byte from the virtual machine.
    pub fn read_u8(&self, ctx: impl Into<AccessContext>) -> Result<u8, VmiError> {
        let mut buffer = [0u8; 1];
        self.read(ctx, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Reads a 16-bit unsigned integer from the virtual machine.
    pub fn read_u16(&self, ctx: impl Into<AccessContext>) -> Result<u16, VmiError> {
        let mut buffer = [0u8; 2];
        self.read(ctx, &mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    /// Reads a 32-bit unsigned integer from the virtual machine.
    pub fn read_u32(&self, ctx: impl Into<AccessContext>) -> Result<u32, VmiError> {
        let mut buffer = [0u8; 4];
        self.read(ctx, &mut buffer)?;
        Ok(u32::from_le_bytes(buffer))
    }

    /// Reads a 64-bit unsigned integer from the virtual machine.
    pub fn read_u64(&self, ctx: impl Into<AccessContext>) -> Result<u64, VmiError> {
        let mut buffer = [0u8; 8];
        self.read(ctx, &mut buffer)?;
        Ok(u64::from_le_bytes(buffer))
    }

    /// Reads an unsigned integer of `size` bytes (1, 2, 4 or 8) and widens
    /// it to a [`u64`].
    pub fn read_uint(&self, ctx: impl Into<AccessContext>, size: usize) -> Result<u64, VmiError> {
        match size {
            1 => self.read_u8(ctx).map(u64::from),
            2 => self.read_u16(ctx).map(u64::from),
            4 => self.read_u32(ctx).map(u64::from),
            8 => self.read_u64(ctx),
            _ => Err(VmiError::InvalidAddressWidth),
        }
    }

    /// Reads an address of `address_width` bytes (4 or 8).
    pub fn read_address(
        &self,
        ctx: impl Into<AccessContext>,
        address_width: usize,
    ) -> Result<u64, VmiError> {
        match address_width {
            4 => self.read_u32(ctx).map(u64::from),
            8 => self.read_u64(ctx),
            _ => Err(VmiError::InvalidAddressWidth),
        }
    }

    /// Reads a virtual address of `address_width` bytes (4 or 8).
    pub fn read_va(
        &self,
        ctx: impl Into<AccessContext>,
        address_width: usize,
    ) -> Result<Va, VmiError> {
        Ok(Va(self.read_address(ctx, address_width)?))
    }

    /// Reads a pointer-sized virtual address, with the pointer width taken
    /// from the execution mode captured in `registers`.
    pub fn read_va_native(
        &self,
        registers: &<Driver::Architecture as Architecture>::Registers,
        ctx: impl Into<AccessContext>,
    ) -> Result<Va, VmiError> {
        let address_width = registers
            .address_width()
            .ok_or(VmiError::InvalidAddressWidth)?;

        self.read_va(ctx, address_width)
    }

    /// Reads a null-terminated string of bytes, stopping after `limit` bytes
    /// if no terminator was found by then.
    ///
    /// Memory is read one page at a time and never past `limit`.
    pub fn read_string_bytes_limited(
        &self,
        ctx: impl Into<AccessContext>,
        limit: usize,
    ) -> Result<Vec<u8>, VmiError> {
        let mut ctx = ctx.into();
        let page_size = Driver::Architecture::PAGE_SIZE as usize;

        let mut result = Vec::new();
        let mut page = vec![0u8; page_size];

        while result.len() < limit {
            let offset = (ctx.address & !Driver::Architecture::PAGE_MASK) as usize;
            let size = std::cmp::min(page_size - offset, limit - result.len());

            let chunk = &mut page[..size];
            self.read(ctx, chunk)?;

            if let Some(position) = memchr::memchr(0, chunk) {
                result.extend_from_slice(&chunk[..position]);
                return Ok(result);
            }

            result.extend_from_slice(chunk);
            ctx += size as u64;
        }

        tracing::trace!(address = %Va(ctx.address), limit, "string truncated");
        Ok(result)
    }

    /// Reads a null-terminated string with a length limit. Invalid UTF-8 is
    /// replaced with `U+FFFD`.
    pub fn read_string_limited(
        &self,
        ctx: impl Into<AccessContext>,
        limit: usize,
    ) -> Result<String, VmiError> {
        Ok(String::from_utf8_lossy(&self.read_string_bytes_limited(ctx, limit)?).into())
    }

    /// Reads a null-terminated string from the virtual machine.
    pub fn read_string(&self, ctx: impl Into<AccessContext>) -> Result<String, VmiError> {
        self.read_string_limited(ctx, self.read_string_length_limit().unwrap_or(usize::MAX))
    }
}
