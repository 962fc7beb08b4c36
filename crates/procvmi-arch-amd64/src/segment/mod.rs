mod descriptor;
pub use self::descriptor::SegmentDescriptor;

mod selector;
pub use self::selector::Selector;
