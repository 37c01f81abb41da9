//! Integration tests for types

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use upkeep_types::*;

    #[test]
    fn test_package_id_serde_as_string() {
        let id = PackageId::new("A", "1.1", "x86", "");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""A;1.1;x86;""#);

        let back: PackageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<PackageId>(r#"";1.0;;""#).is_err());
    }

    #[test]
    fn test_repository_serializes_virtual_flag() {
        let repo = Repository::placeholder("virtual_testing", "Testing");
        let json = serde_json::to_value(&repo).unwrap();
        assert_eq!(json["virtual"], serde_json::Value::Bool(true));
        assert_eq!(json["enabled"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_action_serialization() {
        let action = Action::SetRepoEnabled {
            repo_id: "main".into(),
            enabled: true,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"kind":"set_repo_enabled","repo_id":"main","enabled":true}"#);
        assert_eq!(action.name(), "repo-enable");
    }

    #[test]
    fn test_download_failure_classification() {
        assert!(TransactionErrorKind::PackageDownloadFailed.is_download_failure());
        assert!(!TransactionErrorKind::NoNetwork.is_download_failure());
        assert!(!TransactionErrorKind::PermissionDenied.is_download_failure());
    }

    #[test]
    fn test_output_format_default() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt, OutputFormat::Tty);
    }

    proptest! {
        #[test]
        fn prop_package_id_display_parse_identity(
            name in "[a-z][a-z0-9+.-]{0,20}",
            version in "[0-9][0-9a-z.~+-]{0,12}",
            arch in "(amd64|arm64|all|)",
            data in "[a-z:-]{0,16}",
        ) {
            let id = PackageId::new(name.clone(), version.clone(), arch, data);
            let parsed = PackageId::parse(&id.to_string()).unwrap();
            prop_assert_eq!(parsed.name(), name.as_str());
            prop_assert_eq!(parsed.version(), version.as_str());
            prop_assert_eq!(parsed, id);
        }
    }
}
