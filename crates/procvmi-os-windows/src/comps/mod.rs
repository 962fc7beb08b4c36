mod process;
mod region;
mod thread;

pub use self::{
    process::{WindowsProcess, decode_fast_ref},
    region::WindowsRegion,
    thread::WindowsThread,
};
