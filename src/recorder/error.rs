use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// A record request arrived while a session was active. No side effects
    /// were performed.
    #[error("a recording session is already running")]
    AlreadyRunning,

    /// A bounded external process step (audio sink setup, capture shutdown)
    /// exceeded its timeout or could not be started. The child is killed
    /// before this is raised.
    #[error("module setup failed: {module}")]
    Module { module: &'static str },

    /// A browser collaborator failure, carrying step context.
    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RecorderError::AlreadyRunning.to_string(),
            "a recording session is already running"
        );
        assert_eq!(
            RecorderError::Module { module: "pulse" }.to_string(),
            "module setup failed: pulse"
        );
        assert_eq!(
            RecorderError::Module { module: "ffmpeg" }.to_string(),
            "module setup failed: ffmpeg"
        );
    }

    #[test]
    fn test_browser_error_keeps_context() {
        let err: RecorderError = anyhow::anyhow!("Failed to click the join control").into();
        assert_eq!(err.to_string(), "Failed to click the join control");
    }
}
