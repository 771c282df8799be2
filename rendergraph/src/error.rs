//! Render graph error types.

use std::fmt;

use crate::backend::BackendError;

/// Errors reported by [`RenderGraph::compile`](crate::RenderGraph::compile)
/// and [`RenderGraph::execute`](crate::RenderGraph::execute).
///
/// Misuse of the declaration API (invalid handles, illegal usage flags, wrong
/// resource kinds) is not reported here; it panics at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A GPU collaborator failed to create an object.
    Backend(BackendError),
    /// A pass body reported a failure.
    PassFailed {
        /// Name of the failing pass.
        pass: String,
        /// What went wrong.
        reason: String,
    },
}

impl GraphError {
    /// Create a pass failure.
    pub fn pass_failed(pass: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PassFailed {
            pass: pass.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(err) => write!(f, "backend error: {err}"),
            Self::PassFailed { pass, reason } => write!(f, "pass '{pass}' failed: {reason}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::PassFailed { .. } => None,
        }
    }
}

impl From<BackendError> for GraphError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::from(BackendError::OutOfMemory);
        assert_eq!(err.to_string(), "backend error: Out of memory");

        let err = GraphError::pass_failed("lighting", "missing shadow map");
        assert_eq!(err.to_string(), "pass 'lighting' failed: missing shadow map");
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        assert!(GraphError::from(BackendError::DeviceLost).source().is_some());
        assert!(GraphError::pass_failed("a", "b").source().is_none());
    }
}
