//! Integration tests for error types

#[cfg(test)]
mod tests {
    use wheelwright_errors::*;

    #[test]
    fn test_error_conversion() {
        let iso_err = IsolationError::ProvisionFailed {
            message: "no writable temp space".into(),
        };
        let err: Error = iso_err.into();
        assert!(matches!(err, Error::Isolation(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::MissingRequiredMetadata {
            archive: "pkg-1.0-py3-none-any.whl".into(),
            entry: "pkg-1.0.dist-info/WHEEL".into(),
        };
        assert_eq!(
            err.to_string(),
            "pkg-1.0-py3-none-any.whl is missing required metadata entry: pkg-1.0.dist-info/WHEEL"
        );
    }

    #[test]
    fn test_error_clone() {
        let err = BuildError::Timeout { seconds: 120 };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_unsafe_entry_message_names_entry() {
        let err = ValidationError::UnsafeArchiveEntry {
            archive: "evil.whl".into(),
            entry: "/etc/passwd".into(),
            reason: "absolute path".into(),
        };
        assert!(err.to_string().contains("/etc/passwd"));
    }

    #[test]
    fn test_build_code_classification() {
        let err: Error = IsolationError::UnsupportedRuntime {
            version: "3.8".into(),
            supported: "3.9, 3.10, 3.11, 3.12, 3.13".into(),
        }
        .into();
        assert_eq!(err.build_code(), ErrorCode::UnsupportedEnvironment);

        let err: Error = BuildError::BackendFailed {
            exit_code: 2,
            stderr: "error: no module named build".into(),
        }
        .into();
        assert_eq!(err.build_code(), ErrorCode::BackendFailed);

        let err: Error = ValidationError::UnsafePath {
            path: "../outside".into(),
            reason: "parent traversal".into(),
        }
        .into();
        assert_eq!(err.build_code(), ErrorCode::UnsafePath);
    }

    #[test]
    fn test_user_facing_codes() {
        let err = PublishError::DangerousDestination { path: "/".into() };
        assert_eq!(err.user_code(), Some("publish.dangerous_destination"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { .. }));
    }
}
