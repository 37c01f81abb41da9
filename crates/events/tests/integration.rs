//! Integration tests for events

#[cfg(test)]
mod tests {
    use upkeep_events::*;
    use upkeep_types::{ActionKind, Package, Pool, Repository, TransactionId};

    #[tokio::test]
    async fn test_event_sender_emits_messages_with_meta() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_warning_with_context("test warning", "context");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event,
            AppEvent::General(GeneralEvent::Error { .. })
        ));
        assert_eq!(first.meta.level, EventLevel::Error);
        assert_eq!(first.meta.source, EventSource::GENERAL);

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second.event,
            AppEvent::General(GeneralEvent::Warning { context: Some(ref context), .. }) if context == "context"
        ));
        assert_eq!(second.meta.level, EventLevel::Warn);
        assert_ne!(first.meta.event_id, second.meta.event_id);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_error("ignored");
    }

    #[tokio::test]
    async fn test_snapshot_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_package_added(Package::new("A"));
        tx.emit_package_removed("A");
        tx.emit_repository_added(Repository::placeholder("virtual_testing", "Testing"));

        let added = rx.recv().await.unwrap();
        match added.event {
            AppEvent::Package(ref event @ PackageEvent::Added { .. }) => {
                assert_eq!(event.package_name(), "A");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(added.meta.source, EventSource::PACKAGE);

        let removed = rx.recv().await.unwrap();
        assert!(matches!(
            removed.event,
            AppEvent::Package(PackageEvent::Removed { ref name }) if name == "A"
        ));

        let repo = rx.recv().await.unwrap();
        match repo.event {
            AppEvent::Repo(event) => assert_eq!(event.repository_id(), "virtual_testing"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_log_levels() {
        let lost = AppEvent::Controller(ControllerEvent::AvailabilityChanged { available: false });
        assert_eq!(lost.log_level(), tracing::Level::WARN);

        let back = AppEvent::Controller(ControllerEvent::AvailabilityChanged { available: true });
        assert_eq!(back.log_level(), tracing::Level::INFO);

        let pool = AppEvent::Controller(ControllerEvent::PoolChanged {
            pool: Pool::Update,
            active: true,
        });
        assert_eq!(pool.log_level(), tracing::Level::DEBUG);
        assert_eq!(pool.log_target(), "upkeep::events::controller");
    }

    #[tokio::test]
    async fn test_transaction_events_are_correlated() {
        let (tx, mut rx) = channel();
        let transaction = TransactionId::new();

        tx.emit(AppEvent::Transaction(TransactionEvent::ActionSubmitted {
            transaction,
            action: ActionKind::Update,
            packages: vec!["A".into()],
        }));
        tx.emit(AppEvent::Transaction(TransactionEvent::Completed {
            transaction,
            request: "update".into(),
            success: true,
        }));
        tx.emit_package_removed("A");

        let expected = Some(transaction.to_string());
        assert_eq!(rx.recv().await.unwrap().meta.correlation_id, expected);
        assert_eq!(rx.recv().await.unwrap().meta.correlation_id, expected);
        assert_eq!(rx.recv().await.unwrap().meta.correlation_id, None);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = AppEvent::Repo(RepoEvent::Removed {
            id: "virtual_testing".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "repo");
        assert_eq!(json["event"]["type"], "Removed");
        assert_eq!(json["event"]["id"], "virtual_testing");
    }
}
