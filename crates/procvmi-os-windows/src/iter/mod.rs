mod list;
mod process;
mod vad;

pub use self::{list::ListEntryIterator, process::ProcessIterator, vad::VadTreeIterator};
