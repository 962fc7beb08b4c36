use super::macros::impl_ops;

impl_ops!(VcpuId, u16, "Virtual CPU identifier");

impl From<VcpuId> for usize {
    fn from(value: VcpuId) -> Self {
        value.0 as usize
    }
}
