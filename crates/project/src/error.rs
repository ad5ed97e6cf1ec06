//! Error types for the project crate (thiserror-based).

use thiserror::Error;

/// Errors that can occur during project file operations.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// File I/O error (read, write, path resolution).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Project was written by a newer format.
    #[error("Unsupported project version: {version}")]
    UnsupportedVersion { version: u32 },

    /// Project record fails structural validation.
    #[error("Invalid project file: {reason}")]
    InvalidProject { reason: String },

    /// The project file path does not exist or is not a file.
    #[error("Project file not found: {path}")]
    NotFound { path: String },
}

/// Convenience Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ProjectError::UnsupportedVersion { version: 99 };
        assert!(err.to_string().contains("99"));

        let err = ProjectError::InvalidProject {
            reason: "missing name".into(),
        };
        assert!(err.to_string().contains("missing name"));

        let err = ProjectError::NotFound {
            path: "/tmp/missing.splice".into(),
        };
        assert!(err.to_string().contains("missing.splice"));
    }

    #[test]
    fn json_error_conversion() {
        let result: Result<crate::types::ProjectRecord, _> = serde_json::from_str("not json");
        let proj_err: ProjectError = result.unwrap_err().into();
        assert!(matches!(proj_err, ProjectError::Json(_)));
    }
}
