//! Integration tests for backend

#[cfg(test)]
mod tests {
    use std::io::Write;
    use tempfile::NamedTempFile;
    use upkeep_backend::*;
    use upkeep_errors::{BackendError, Error};
    use upkeep_types::{
        Action, ExitStatus, PackageFilter, PackageId, PackageInfo, RepoFilter,
        TransactionErrorKind, TransactionId,
    };

    const FIXTURE: &str = r#"
arch = "x86"

[[packages]]
name = "A"
installed = "1.0"
available = "1.1"
summary = "first"

[[packages]]
name = "B"
available = "2.0"

[[packages]]
name = "C"
installed = "3.0"

[[repositories]]
id = "http://repo.example.org/ stable/main"
description = "Stable"

[[repositories]]
id = "http://repo.example.org/testing stable/main"
enabled = false
"#;

    fn host() -> (MemoryBackend, BackendEventReceiver) {
        let (tx, rx) = channel();
        let fixture = HostFixture::from_toml(FIXTURE).unwrap();
        (MemoryBackend::from_fixture(&fixture, tx), rx)
    }

    /// Signals delivered for `id`, in order
    fn signals_for(rx: &mut BackendEventReceiver, id: TransactionId) -> Vec<TransactionSignal> {
        let mut signals = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BackendEvent::Transaction { id: event_id, signal } = event {
                if event_id == id {
                    signals.push(signal);
                }
            }
        }
        signals
    }

    fn package_ids(signals: &[TransactionSignal]) -> Vec<(PackageInfo, String)> {
        signals
            .iter()
            .filter_map(|signal| match signal {
                TransactionSignal::Package {
                    info, package_id, ..
                } => Some((*info, package_id.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_get_packages_all_reports_installed_and_available() {
        let (backend, mut rx) = host();
        let id = backend.get_packages(PackageFilter::All).unwrap();
        let signals = signals_for(&mut rx, id);

        assert_eq!(
            package_ids(&signals),
            vec![
                (PackageInfo::Installed, "A;1.0;x86;installed:main".to_string()),
                (PackageInfo::Available, "A;1.1;x86;main".to_string()),
                (PackageInfo::Available, "B;2.0;x86;main".to_string()),
                (PackageInfo::Installed, "C;3.0;x86;installed:main".to_string()),
            ]
        );
        assert!(matches!(
            signals.last(),
            Some(TransactionSignal::Finished {
                exit: ExitStatus::Success
            })
        ));
    }

    #[test]
    fn test_get_updates_and_arch_listing() {
        let (backend, mut rx) = host();

        let id = backend.get_updates().unwrap();
        assert_eq!(
            package_ids(&signals_for(&mut rx, id)),
            vec![(PackageInfo::Normal, "A;1.1;x86;main".to_string())]
        );

        let id = backend.get_packages(PackageFilter::Arch).unwrap();
        let names: Vec<_> = package_ids(&signals_for(&mut rx, id))
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        assert_eq!(
            names,
            vec!["A;1.1;x86;main".to_string(), "C;3.0;x86;installed:main".to_string()]
        );
    }

    #[test]
    fn test_update_action_reports_item_progress() {
        let (backend, mut rx) = host();
        let target = PackageId::parse("A;1.1;x86;main").unwrap();
        let id = backend
            .submit(Action::Update {
                packages: vec![target.clone()],
            })
            .unwrap();

        let signals = signals_for(&mut rx, id);
        assert_eq!(
            package_ids(&signals),
            vec![
                (PackageInfo::Updating, target.to_string()),
                (PackageInfo::Finished, target.to_string()),
            ]
        );
        assert_eq!(
            signals.last(),
            Some(&TransactionSignal::Finished {
                exit: ExitStatus::Success
            })
        );
        assert_eq!(backend.installed_version("A").as_deref(), Some("1.1"));
    }

    #[test]
    fn test_update_announces_catalog_change() {
        let (backend, mut rx) = host();
        backend
            .submit(Action::Remove {
                packages: vec![PackageId::parse("C;3.0;x86;installed:main").unwrap()],
            })
            .unwrap();

        let mut saw_change = false;
        while let Ok(event) = rx.try_recv() {
            saw_change |= event == BackendEvent::Daemon(DaemonEvent::UpdatesChanged);
        }
        assert!(saw_change);
        assert_eq!(backend.installed_version("C"), None);
    }

    #[test]
    fn test_unknown_package_fails_action() {
        let (backend, mut rx) = host();
        let id = backend
            .submit(Action::Update {
                packages: vec![PackageId::parse("Z;9.9").unwrap()],
            })
            .unwrap();

        let signals = signals_for(&mut rx, id);
        assert!(matches!(
            signals.first(),
            Some(TransactionSignal::Error {
                kind: TransactionErrorKind::PackageNotFound,
                ..
            })
        ));
        assert_eq!(backend.installed_version("A").as_deref(), Some("1.0"));
    }

    #[test]
    fn test_repo_list_and_enable() {
        let (backend, mut rx) = host();
        let testing = "http://repo.example.org/testing stable/main";

        let id = backend.get_repo_list(RepoFilter::All).unwrap();
        let listed: Vec<_> = signals_for(&mut rx, id)
            .into_iter()
            .filter_map(|signal| match signal {
                TransactionSignal::RepoDetail { enabled, .. } => Some(enabled),
                _ => None,
            })
            .collect();
        assert_eq!(listed, vec![true, false]);

        backend
            .submit(Action::SetRepoEnabled {
                repo_id: testing.to_string(),
                enabled: true,
            })
            .unwrap();
        assert_eq!(backend.repository_enabled(testing), Some(true));

        let id = backend.get_repo_list(RepoFilter::All).unwrap();
        let enabled: Vec<_> = signals_for(&mut rx, id)
            .into_iter()
            .filter_map(|signal| match signal {
                TransactionSignal::RepoDetail { enabled, .. } => Some(enabled),
                _ => None,
            })
            .collect();
        assert_eq!(enabled, vec![true, true]);
    }

    #[test]
    fn test_daemon_notifications() {
        let (backend, mut rx) = host();
        backend.set_running(false);
        backend.set_running(true);
        backend.quit();

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                BackendEvent::Daemon(DaemonEvent::RunningChanged { running: false }),
                BackendEvent::Daemon(DaemonEvent::RunningChanged { running: true }),
                BackendEvent::Daemon(DaemonEvent::Quit),
            ]
        );
        assert!(!backend.is_running());
    }

    #[test]
    fn test_hints_are_recorded() {
        let (backend, _rx) = host();
        backend.set_hints(&["interactive=false".to_string()]).unwrap();
        assert_eq!(backend.hints(), vec!["interactive=false".to_string()]);
    }

    #[test]
    fn test_fixture_rejects_duplicates() {
        let result = HostFixture::from_toml(
            r#"
[[packages]]
name = "A"
installed = "1.0"

[[packages]]
name = "A"
installed = "2.0"
"#,
        );
        assert!(matches!(
            result,
            Err(Error::Backend(BackendError::InvalidFixture { .. }))
        ));
    }

    #[test]
    fn test_fixture_rejects_versionless_package() {
        let result = HostFixture::from_toml("[[packages]]\nname = \"A\"\n");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fixture_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{FIXTURE}").unwrap();

        let fixture = HostFixture::load(file.path()).await.unwrap();
        assert_eq!(fixture.arch, "x86");
        assert_eq!(fixture.packages.len(), 3);
        assert!(!fixture.repositories[1].enabled);
        assert!(fixture.running);
    }
}
