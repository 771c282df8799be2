//! Errors reported by GPU collaborators.

use thiserror::Error;

/// Failure reported by a [`GpuDevice`](super::GpuDevice) or command list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create heap: {0}")]
    HeapCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create view: {0}")]
    ViewCreationFailed(String),
    #[error("Failed to create fence: {0}")]
    FenceCreationFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(BackendError::OutOfMemory.to_string(), "Out of memory");
        assert_eq!(
            BackendError::HeapCreationFailed("64 MiB".to_string()).to_string(),
            "Failed to create heap: 64 MiB"
        );
    }
}
