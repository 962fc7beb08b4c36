use crate::{Architecture, VcpuId};

/// The CPU context delivered with an introspection event.
///
/// Everything this crate resolves is relative to one event: the vCPU that
/// trapped and the register snapshot taken at that instant.
#[derive(Debug)]
pub struct VmiEvent<Arch>
where
    Arch: Architecture + ?Sized,
{
    vcpu_id: VcpuId,
    registers: Arch::Registers,
}

impl<Arch> VmiEvent<Arch>
where
    Arch: Architecture + ?Sized,
{
    /// Creates a new event context.
    pub fn new(vcpu_id: VcpuId, registers: Arch::Registers) -> Self {
        Self { vcpu_id, registers }
    }

    /// Returns the ID of the vCPU that produced the event.
    pub fn vcpu_id(&self) -> VcpuId {
        self.vcpu_id
    }

    /// Returns the register snapshot.
    pub fn registers(&self) -> &Arch::Registers {
        &self.registers
    }
}
