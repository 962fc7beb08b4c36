mod access_context;
mod address_context;
mod macros;
mod vcpu_id;

pub use self::{
    access_context::{AccessContext, Pa, TranslationMechanism, Va},
    address_context::AddressContext,
    vcpu_id::VcpuId,
};
