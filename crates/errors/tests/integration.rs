//! Integration tests for error types

#[cfg(test)]
mod tests {
    use imgkit_errors::*;
    use std::error::Error as _;

    #[test]
    fn test_error_conversion() {
        let platform_err = PlatformError::UserNotFound {
            user: "uid 4242".into(),
        };
        let err: Error = platform_err.into();
        assert!(matches!(err, Error::Platform(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = PlatformError::PathNotFound {
            operation: "flock".into(),
            path: "/var/lock/img.lock".into(),
        };
        assert_eq!(
            err.to_string(),
            "flock: no such file or directory: /var/lock/img.lock"
        );
    }

    #[test]
    fn test_io_error_mapping() {
        let path = std::path::Path::new("/root/secret");
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err = PlatformError::from_io("chdir", path, &io_err);
        assert!(matches!(err, PlatformError::PermissionDenied { .. }));
        assert_eq!(err.user_code(), Some("platform.permission_denied"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        assert!(PlatformError::from_io("chdir", path, &io_err).is_not_found());
    }

    #[test]
    fn test_cleanup_chains_original_error() {
        let original: Error = PlatformError::PathNotFound {
            operation: "chdir".into(),
            path: "/nope".into(),
        }
        .into();
        let cleanup: Error = PlatformError::ProcessStateFailed {
            operation: "chdir /old".into(),
            message: "gone".into(),
        }
        .into();

        let err = original.with_cleanup("working directory", cleanup);
        let message = err.to_string();
        assert!(message.contains("/nope"));
        assert!(message.contains("restoring working directory also failed"));
        assert!(err.is_not_found());

        let source = err.source().expect("original error is the source");
        assert!(source.to_string().contains("/nope"));
        assert_eq!(err.user_code(), Some("error.cleanup"));
    }

    #[test]
    fn test_error_clone() {
        let err = ConfigError::InvalidValue {
            field: "IMGKIT_UMASK".into(),
            value: "999".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
        assert_eq!(
            err.user_hint(),
            Some("IMGKIT_UMASK must be an octal mode such as 022.")
        );
    }
}
