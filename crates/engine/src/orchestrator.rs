//! Update/remove orchestration
//!
//! A user request names packages; the backend needs versioned identifiers.
//! Resolution runs one or two listing queries, then a single batch action
//! is submitted and its per-item progress is folded back into the store.
//! One request runs at a time; later requests wait in a queue.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use upkeep_types::{Action, ActionKind, Package, PackageFilter, PackageId, TransactionErrorKind};

use crate::store::PackageStore;

/// A user-level request: which action, on which package names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    pub kind: ActionKind,
    /// Empty means "everything updatable" for updates
    pub targets: BTreeSet<String>,
}

impl ApplyRequest {
    pub fn new<I, S>(kind: ActionKind, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    fn wants(&self, name: &str, stage: ResolveStage) -> bool {
        if self.targets.is_empty() {
            self.kind == ActionKind::Update && stage == ResolveStage::Updates
        } else {
            self.targets.contains(name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    /// Installed packages (removal) or newest per-arch packages (update)
    Candidates,
    /// Packages with an update available
    Updates,
}

#[derive(Debug)]
enum State {
    Idle,
    Resolving {
        request: ApplyRequest,
        stage: ResolveStage,
        resolved: BTreeMap<String, PackageId>,
    },
    Running {
        kind: ActionKind,
        failure: Option<TransactionErrorKind>,
    },
}

/// Next step after a resolution query finished
#[derive(Debug, PartialEq, Eq)]
pub enum ResolveStep {
    QueryUpdates,
    Submit(Action),
    Stale,
}

#[derive(Debug)]
pub struct Orchestrator {
    state: State,
    queue: VecDeque<ApplyRequest>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            queue: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    #[must_use]
    pub fn is_resolving(&self) -> bool {
        matches!(self.state, State::Resolving { .. })
    }

    /// Kind of the action currently submitted, if any
    #[must_use]
    pub fn running(&self) -> Option<ActionKind> {
        match self.state {
            State::Running { kind, .. } => Some(kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn enqueue(&mut self, request: ApplyRequest) {
        self.queue.push_back(request);
    }

    pub fn next_queued(&mut self) -> Option<ApplyRequest> {
        self.queue.pop_front()
    }

    /// Start resolving `request`; returns the listing scope for stage one
    pub fn begin(&mut self, request: ApplyRequest) -> PackageFilter {
        let filter = match request.kind {
            ActionKind::Remove => PackageFilter::Installed,
            ActionKind::Update => PackageFilter::Arch,
        };
        self.state = State::Resolving {
            request,
            stage: ResolveStage::Candidates,
            resolved: BTreeMap::new(),
        };
        filter
    }

    /// Record a package reported during resolution; the latest id wins
    pub fn observe(&mut self, id: &PackageId) {
        if let State::Resolving {
            request,
            stage,
            resolved,
        } = &mut self.state
        {
            if request.wants(id.name(), *stage) {
                resolved.insert(id.name().to_string(), id.clone());
            }
        }
    }

    /// Move on after a resolution query finished
    pub fn advance(&mut self) -> ResolveStep {
        let State::Resolving {
            request,
            stage,
            resolved,
        } = &mut self.state
        else {
            return ResolveStep::Stale;
        };

        if request.kind == ActionKind::Update && *stage == ResolveStage::Candidates {
            *stage = ResolveStage::Updates;
            return ResolveStep::QueryUpdates;
        }

        let packages: Vec<PackageId> = std::mem::take(resolved).into_values().collect();
        let kind = request.kind;
        self.state = State::Running {
            kind,
            failure: None,
        };
        ResolveStep::Submit(match kind {
            ActionKind::Update => Action::Update { packages },
            ActionKind::Remove => Action::Remove { packages },
        })
    }

    /// Remember an error reported by the running action
    pub fn record_failure(&mut self, kind: TransactionErrorKind) {
        if let State::Running { failure, .. } = &mut self.state {
            failure.get_or_insert(kind);
        }
    }

    /// Back to idle; returns the first error the action reported
    pub fn finish(&mut self) -> Option<TransactionErrorKind> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Running { failure, .. } => failure,
            _ => None,
        }
    }

    /// Drop the current request and everything queued
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.queue.clear();
    }
}

/// Fold a per-item `Finished` report into the store
///
/// Returns the updated record, or `None` when the name is not tracked.
pub fn apply_progress(
    kind: ActionKind,
    id: &PackageId,
    store: &mut PackageStore,
) -> Option<Package> {
    let package = store.get_mut(id.name())?;
    match kind {
        ActionKind::Update => {
            let version = if package.candidate_version.is_empty() {
                id.version().to_string()
            } else {
                std::mem::take(&mut package.candidate_version)
            };
            package.set_installed(version);
            package.candidate_version.clear();
            package.update_available = false;
        }
        ActionKind::Remove => package.clear_installed(),
    }
    Some(package.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PackageId {
        PackageId::parse(s).unwrap()
    }

    #[test]
    fn test_remove_resolves_in_one_stage() {
        let mut orchestrator = Orchestrator::new();
        let filter = orchestrator.begin(ApplyRequest::new(ActionKind::Remove, ["A"]));
        assert_eq!(filter, PackageFilter::Installed);

        orchestrator.observe(&id("A;1.0;x86;installed"));
        orchestrator.observe(&id("B;1.0;x86;installed"));
        assert_eq!(
            orchestrator.advance(),
            ResolveStep::Submit(Action::Remove {
                packages: vec![id("A;1.0;x86;installed")]
            })
        );
        assert_eq!(orchestrator.running(), Some(ActionKind::Remove));
    }

    #[test]
    fn test_update_latest_id_wins() {
        let mut orchestrator = Orchestrator::new();
        assert_eq!(
            orchestrator.begin(ApplyRequest::new(ActionKind::Update, ["A"])),
            PackageFilter::Arch
        );
        orchestrator.observe(&id("A;1.0;x86;installed"));
        assert_eq!(orchestrator.advance(), ResolveStep::QueryUpdates);
        orchestrator.observe(&id("A;1.1;x86;main"));

        assert_eq!(
            orchestrator.advance(),
            ResolveStep::Submit(Action::Update {
                packages: vec![id("A;1.1;x86;main")]
            })
        );
    }

    #[test]
    fn test_update_all_uses_only_update_listing() {
        let mut orchestrator = Orchestrator::new();
        orchestrator.begin(ApplyRequest::new(ActionKind::Update, Vec::<String>::new()));
        orchestrator.observe(&id("C;3.0;x86;installed"));
        orchestrator.advance();
        orchestrator.observe(&id("A;1.1;x86;main"));
        orchestrator.observe(&id("B;2.0;x86;main"));

        let ResolveStep::Submit(Action::Update { packages }) = orchestrator.advance() else {
            panic!("expected update submission");
        };
        let names: Vec<_> = packages.iter().map(PackageId::name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_unresolved_targets_submit_empty_list() {
        let mut orchestrator = Orchestrator::new();
        orchestrator.begin(ApplyRequest::new(ActionKind::Remove, ["missing"]));
        assert_eq!(
            orchestrator.advance(),
            ResolveStep::Submit(Action::Remove { packages: vec![] })
        );
    }

    #[test]
    fn test_first_failure_is_kept() {
        let mut orchestrator = Orchestrator::new();
        orchestrator.begin(ApplyRequest::new(ActionKind::Remove, ["A"]));
        orchestrator.advance();
        orchestrator.record_failure(TransactionErrorKind::PackageDownloadFailed);
        orchestrator.record_failure(TransactionErrorKind::Internal);
        assert_eq!(
            orchestrator.finish(),
            Some(TransactionErrorKind::PackageDownloadFailed)
        );
        assert!(orchestrator.is_idle());
        assert_eq!(orchestrator.advance(), ResolveStep::Stale);
    }

    #[test]
    fn test_progress_updates_known_names_only() {
        let mut store = PackageStore::new();
        let mut a = Package::new("A");
        a.set_installed("1.0");
        a.candidate_version = "1.1".to_string();
        a.update_available = true;
        store.insert(a);

        let updated = apply_progress(ActionKind::Update, &id("A;1.1;x86"), &mut store).unwrap();
        assert_eq!(updated.installed_version, "1.1");
        assert_eq!(updated.candidate_version, "");
        assert!(!updated.update_available);

        assert!(apply_progress(ActionKind::Update, &id("Z;1.0"), &mut store).is_none());

        let removed = apply_progress(ActionKind::Remove, &id("A;1.1;x86"), &mut store).unwrap();
        assert!(!removed.is_installed());
        assert!(!removed.can_remove);
    }

    #[test]
    fn test_progress_without_candidate_uses_id_version() {
        let mut store = PackageStore::new();
        let mut a = Package::new("A");
        a.set_installed("1.0");
        store.insert(a);

        let updated = apply_progress(ActionKind::Update, &id("A;1.2;x86"), &mut store).unwrap();
        assert_eq!(updated.installed_version, "1.2");
    }
}
