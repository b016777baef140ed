//! Extension layer errors.

use thiserror::Error;

use berth_types::ErrorCode;

/// Error raised by an extension callback.
///
/// The engine treats each variant according to the operation it interrupted:
/// a failing create leaves the container failed, a failing dispose triggers
/// rollback of the already-disposed prefix, and init or destroy failures are
/// logged without stopping the engine.
#[derive(Debug, Clone, Error)]
pub enum ExtensionError {
    #[error("initialization failed: {0}")]
    Init(String),

    #[error("container create failed: {0}")]
    CreateContainer(String),

    #[error("container dispose failed: {0}")]
    DisposeContainer(String),

    #[error("container update failed: {0}")]
    UpdateContainer(String),

    #[error("destroy failed: {0}")]
    Destroy(String),
}

impl ErrorCode for ExtensionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Init(_) => "EXT_INIT_FAILED",
            Self::CreateContainer(_) => "EXT_CREATE_FAILED",
            Self::DisposeContainer(_) => "EXT_DISPOSE_FAILED",
            Self::UpdateContainer(_) => "EXT_UPDATE_FAILED",
            Self::Destroy(_) => "EXT_DESTROY_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        // A failed lifecycle callback can be retried once the extension's
        // underlying issue clears; none of these invalidate the request.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_types::assert_error_codes;

    #[test]
    fn all_codes_follow_convention() {
        assert_error_codes(
            &[
                ExtensionError::Init("x".into()),
                ExtensionError::CreateContainer("x".into()),
                ExtensionError::DisposeContainer("x".into()),
                ExtensionError::UpdateContainer("x".into()),
                ExtensionError::Destroy("x".into()),
            ],
            "EXT_",
        );
    }

    #[test]
    fn display_carries_reason() {
        let err = ExtensionError::DisposeContainer("session still open".into());
        assert!(err.to_string().contains("session still open"));
    }
}
