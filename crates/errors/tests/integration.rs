//! Integration tests for error types

#[cfg(test)]
mod tests {
    use upkeep_errors::*;

    #[test]
    fn test_error_conversion() {
        let backend_err = BackendError::Unavailable;
        let err: Error = backend_err.into();
        assert!(matches!(err, Error::Backend(_)));

        let engine_err = EngineError::UnknownDistribution;
        let err: Error = engine_err.into();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::UnknownRepository {
            id: "ppa:foo".into(),
        };
        assert_eq!(err.to_string(), "repository not found: ppa:foo");

        let err = BackendError::RequestFailed {
            request: "get-updates".into(),
            message: "busy".into(),
        };
        assert_eq!(err.to_string(), "request get-updates rejected: busy");
    }

    #[test]
    fn test_error_clone() {
        let err = BackendError::InvalidPackageId { id: ";;".into() };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_user_facing_codes_and_hints() {
        let err: Error = BackendError::Unavailable.into();
        assert_eq!(err.user_code(), Some("backend.unavailable"));
        assert!(err.user_hint().is_some());
        assert!(err.is_retryable());

        let err: Error = EngineError::UnknownChannelRole {
            role: "nightly".into(),
        }
        .into();
        assert_eq!(err.user_code(), Some("engine.unknown_channel_role"));
        assert!(!err.is_retryable());

        let err: Error = ConfigError::ParseError {
            message: "bad".into(),
        }
        .into();
        assert_eq!(err.user_code(), Some("config.parse"));
        assert_eq!(
            err.user_hint(),
            Some("Fix the configuration value and retry the command.")
        );
    }
}
