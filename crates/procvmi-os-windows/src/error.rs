/// Error types for Windows operations.
#[derive(thiserror::Error, Debug)]
pub enum WindowsError {
    /// The Windows layer has not been initialized yet.
    #[error("Windows introspection is not initialized")]
    NotReady,

    /// The Windows layer was initialized twice.
    #[error("Windows introspection is already initialized")]
    AlreadyInitialized,

    /// The vCPU is not in 64-bit long mode with 4-level paging.
    #[error("Unsupported paging mode")]
    UnsupportedPagingMode,

    /// Corrupted struct.
    #[error("Corrupted struct: {0}")]
    CorruptedStruct(&'static str),
}

impl From<WindowsError> for procvmi_core::VmiError {
    fn from(value: WindowsError) -> Self {
        procvmi_core::VmiError::Os(value.into())
    }
}

impl WindowsError {
    /// Returns the Windows error carried by `err`, if any.
    pub fn downcast(err: &procvmi_core::VmiError) -> Option<&WindowsError> {
        match err {
            procvmi_core::VmiError::Os(inner) => inner.downcast_ref(),
            _ => None,
        }
    }
}
