//! The update controller
//!
//! `UpdateController` owns the snapshot stores and every in-flight query.
//! It is driven one input at a time: a backend notification, a consumer
//! request, or the refresh deadline. Each transaction it starts is recorded
//! with the component that owns it, and every later notification for that
//! transaction is routed back to the owner.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use upkeep_backend::{Backend, BackendEvent, ChannelWriter, DaemonEvent, TransactionSignal};
use upkeep_config::Config;
use upkeep_errors::Result;
use upkeep_events::{
    AppEvent, ControllerEvent, EventEmitter, EventSender, FailureContext, TransactionEvent,
};
use upkeep_types::{
    Action, ActionKind, ExitStatus, Package, PackageFilter, PackageId, PackageInfo, Pool,
    RepoFilter, Repository, TransactionErrorKind, TransactionId,
};

use crate::orchestrator::{apply_progress, ApplyRequest, Orchestrator, ResolveStep};
use crate::reconcile::{PassStep, ReconcilePass};
use crate::repos::{plan_enable, EnablePlan, RepoListing};
use crate::scheduler::RefreshScheduler;
use crate::store::{PackageStore, RepositoryStore};
use crate::tracker::TransactionTracker;

/// Component a transaction belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    Reconcile,
    RepoListing,
    Orchestrator,
    Refresh { rearm: bool },
    RepoEnable { repo_id: String, enabled: bool },
}

/// Work deferred until the finished transaction has been released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowUp {
    Rearm,
    Reconcile,
    Refresh,
    StartQueued,
}

pub struct UpdateController {
    backend: Arc<dyn Backend>,
    channels: Arc<dyn ChannelWriter>,
    config: Config,
    events: EventSender,
    tracker: TransactionTracker,
    packages: PackageStore,
    repositories: RepositoryStore,
    pass: ReconcilePass,
    listing: RepoListing,
    orchestrator: Orchestrator,
    scheduler: RefreshScheduler,
    owners: HashMap<TransactionId, Owner>,
    available: bool,
}

impl std::fmt::Debug for UpdateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateController")
            .field("available", &self.available)
            .field("tracker", &self.tracker)
            .field("packages", &self.packages.len())
            .field("pass", &self.pass.stage())
            .finish_non_exhaustive()
    }
}

impl UpdateController {
    /// Create a controller; nothing happens until [`start`](Self::start)
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        channels: Arc<dyn ChannelWriter>,
        config: Config,
        events: EventSender,
    ) -> Self {
        Self {
            backend,
            channels,
            tracker: TransactionTracker::new(events.clone()),
            scheduler: RefreshScheduler::new(&config.refresh),
            config,
            events,
            packages: PackageStore::new(),
            repositories: RepositoryStore::new(),
            pass: ReconcilePass::new(),
            listing: RepoListing::new(),
            orchestrator: Orchestrator::new(),
            owners: HashMap::new(),
            available: false,
        }
    }

    /// Pick up the backend if it is already running
    pub fn start(&mut self) {
        if self.backend.is_running() {
            self.become_available();
        } else {
            tracing::info!("waiting for the package management backend");
        }
    }

    // Consumer queries

    #[must_use]
    pub fn packages(&self) -> Vec<Package> {
        self.packages.snapshot()
    }

    #[must_use]
    pub fn package(&self, name: &str) -> Option<Package> {
        self.packages.get(name).cloned()
    }

    #[must_use]
    pub fn repositories(&self) -> Vec<Repository> {
        self.repositories.snapshot()
    }

    #[must_use]
    pub fn repository(&self, id: &str) -> Option<Repository> {
        self.repositories.get(id).cloned()
    }

    /// Any transaction outstanding
    #[must_use]
    pub fn busy(&self) -> bool {
        self.tracker.busy()
    }

    /// A package action (including its resolution) is outstanding
    #[must_use]
    pub fn update_running(&self) -> bool {
        self.tracker.update_running()
    }

    #[must_use]
    pub fn update_management_available(&self) -> bool {
        self.available
    }

    /// Nothing in flight and nothing queued
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.tracker.busy() && self.orchestrator.is_idle() && self.orchestrator.queued() == 0
    }

    /// When the periodic refresh is due, if armed
    #[must_use]
    pub fn next_refresh(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    // Consumer operations

    /// Start a reconciliation pass
    ///
    /// Returns `false` when the pass was dropped because the backend is
    /// unavailable or general work is still outstanding.
    pub fn check_for_updates(&mut self) -> bool {
        if !self.available {
            tracing::debug!("reconciliation skipped: backend unavailable");
            return false;
        }
        if self.tracker.is_active(Pool::General) {
            tracing::debug!("reconciliation skipped: general transactions outstanding");
            return false;
        }

        self.pass.begin();
        if self
            .launch(Pool::General, Owner::Reconcile, |backend| {
                backend.get_packages(PackageFilter::All)
            })
            .is_none()
        {
            self.pass.reset();
            return false;
        }

        self.listing.begin();
        if self
            .launch(Pool::General, Owner::RepoListing, |backend| {
                backend.get_repo_list(RepoFilter::All)
            })
            .is_none()
        {
            self.listing.reset();
        }

        tracing::debug!("reconciliation pass started");
        true
    }

    /// Update or remove the named packages
    ///
    /// An empty target set means "every updatable package" for updates and
    /// is refused for removals. A request made while another one is in
    /// flight is queued behind it.
    pub fn apply<I, S>(&mut self, kind: ActionKind, targets: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = ApplyRequest::new(kind, targets);
        if kind == ActionKind::Remove && request.targets.is_empty() {
            tracing::debug!("refusing to remove an empty package set");
            return false;
        }
        if !self.available {
            tracing::debug!(%kind, "package action refused: backend unavailable");
            return false;
        }
        if !self.orchestrator.is_idle() {
            self.orchestrator.enqueue(request);
            tracing::info!(%kind, queued = self.orchestrator.queued(), "package action queued");
            return true;
        }
        self.start_apply(request)
    }

    pub fn start_update<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(ActionKind::Update, names)
    }

    pub fn remove_packages<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(ActionKind::Remove, names)
    }

    /// Enable or disable a repository
    ///
    /// Enabling a virtual channel writes its source line for real and then
    /// refreshes so the real repository replaces the placeholder.
    pub fn enable_repository(&mut self, id: &str, enabled: bool) -> bool {
        let plan = plan_enable(
            &self.repositories,
            &self.config.repositories,
            self.config.general.distro_codename.as_deref(),
            id,
            enabled,
        );

        match plan {
            Ok(EnablePlan::Nothing) => true,
            Ok(EnablePlan::AddChannel(source)) => {
                if let Err(e) = self.channels.add_channel(&source) {
                    tracing::warn!(role = %source.role, error = %e, "failed to add channel");
                    self.events
                        .emit_warning_with_context("failed to add channel", e.to_string());
                    return false;
                }
                tracing::info!(role = %source.role, file = %source.file_name, "channel added");
                self.refresh(false);
                true
            }
            Ok(EnablePlan::Toggle) => {
                let owner = Owner::RepoEnable {
                    repo_id: id.to_string(),
                    enabled,
                };
                let action = Action::SetRepoEnabled {
                    repo_id: id.to_string(),
                    enabled,
                };
                self.available
                    && self
                        .launch(Pool::General, owner, |backend| backend.submit(action))
                        .is_some()
            }
            Err(e) => {
                tracing::debug!(repo = id, error = %e, "repository request refused");
                false
            }
        }
    }

    /// Run the periodic refresh if its deadline has passed
    pub fn on_refresh_due(&mut self) {
        if !self.scheduler.take_due(Instant::now()) {
            return;
        }
        tracing::info!("scheduled cache refresh");
        if !self.refresh(true) {
            self.scheduler.arm(Instant::now());
        }
    }

    // Backend input

    /// Process one notification from the backend
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Daemon(DaemonEvent::RunningChanged { running: true }) => {
                self.become_available();
            }
            BackendEvent::Daemon(DaemonEvent::RunningChanged { running: false } | DaemonEvent::Quit) => {
                self.become_unavailable();
            }
            BackendEvent::Daemon(DaemonEvent::UpdatesChanged) => {
                tracing::debug!("catalog changed notification");
                self.check_for_updates();
            }
            BackendEvent::Transaction { id, signal } => self.handle_signal(id, signal),
        }
    }

    fn handle_signal(&mut self, id: TransactionId, signal: TransactionSignal) {
        if !self.tracker.is_tracked(id) {
            tracing::debug!(%id, "discarding event for untracked transaction");
            return;
        }
        let Some(owner) = self.owners.get(&id).cloned() else {
            self.tracker.complete(id);
            return;
        };

        match signal {
            TransactionSignal::Package {
                info,
                package_id,
                summary,
            } => self.on_package(&owner, id, info, &package_id, &summary),
            TransactionSignal::RepoDetail {
                repo_id,
                description,
                enabled,
            } => {
                if owner == Owner::RepoListing {
                    self.listing.observe(
                        &repo_id,
                        &description,
                        enabled,
                        &self.config.repositories,
                    );
                }
            }
            // An error ends the transaction; a trailing finished signal is
            // dropped by the tracked check above.
            TransactionSignal::Error { kind, details } => {
                self.on_error(&owner, id, kind, details);
                self.release(owner, id, ExitStatus::Failed);
            }
            TransactionSignal::Finished { exit } => self.release(owner, id, exit),
        }
    }

    fn release(&mut self, owner: Owner, id: TransactionId, exit: ExitStatus) {
        self.owners.remove(&id);
        // Chained queries are started before the finished one is
        // released so the pool does not flicker between stages.
        let follow_ups = self.on_finished(owner, id, exit);
        self.tracker.complete(id);
        for follow_up in follow_ups {
            self.run_follow_up(follow_up);
        }
    }

    fn on_package(
        &mut self,
        owner: &Owner,
        id: TransactionId,
        info: PackageInfo,
        package_id: &str,
        summary: &str,
    ) {
        let parsed = match PackageId::parse(package_id) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(%id, error = %e, "skipping malformed package id");
                return;
            }
        };

        match owner {
            Owner::Reconcile => {
                self.pass
                    .observe(info, &parsed, summary, &self.config.packages);
            }
            Owner::Orchestrator => {
                if self.orchestrator.is_resolving() {
                    self.orchestrator.observe(&parsed);
                } else if let Some(kind) = self.orchestrator.running() {
                    self.events
                        .emit(AppEvent::Transaction(TransactionEvent::ItemProgress {
                            transaction: id,
                            package_id: package_id.to_string(),
                            info,
                        }));
                    if info.is_finished() {
                        if let Some(package) = apply_progress(kind, &parsed, &mut self.packages) {
                            tracing::debug!(package = %package.name, %kind, "package action finished");
                            self.events.emit_package_changed(package);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn on_error(
        &mut self,
        owner: &Owner,
        id: TransactionId,
        kind: TransactionErrorKind,
        details: String,
    ) {
        let request = self.request_name(owner);
        tracing::warn!(%id, request, %kind, details = %details, "transaction error");
        if *owner == Owner::Orchestrator {
            self.orchestrator.record_failure(kind);
        }
        let failure = FailureContext::new(
            Some(format!("transaction.{kind}")),
            details,
            None::<String>,
            kind.is_download_failure(),
        );
        self.events
            .emit(AppEvent::Transaction(TransactionEvent::Failed {
                transaction: id,
                request: request.to_string(),
                kind,
                failure,
            }));
    }

    fn on_finished(&mut self, owner: Owner, id: TransactionId, exit: ExitStatus) -> Vec<FollowUp> {
        let success = exit.is_success();
        match owner {
            Owner::Reconcile => {
                if !success {
                    tracing::warn!(%id, "package query failed, reconciliation abandoned");
                    self.pass.reset();
                    return Vec::new();
                }
                match self.pass.advance() {
                    PassStep::QueryUpdates => {
                        if self
                            .launch(Pool::General, Owner::Reconcile, |backend| {
                                backend.get_updates()
                            })
                            .is_none()
                        {
                            self.pass.reset();
                        }
                    }
                    PassStep::Commit(pending) => {
                        let changes = self.packages.commit(pending, &self.events);
                        tracing::debug!(changes, "reconciliation pass committed");
                    }
                    PassStep::Stale => {}
                }
                Vec::new()
            }
            Owner::RepoListing => {
                if success {
                    self.listing.finish(
                        &mut self.repositories,
                        &self.config.repositories,
                        &self.events,
                    );
                } else {
                    tracing::warn!(%id, "repository listing failed");
                    self.listing.reset();
                }
                Vec::new()
            }
            Owner::Orchestrator if self.orchestrator.is_resolving() => {
                self.on_resolution_finished(id, success)
            }
            Owner::Orchestrator => {
                let request = self.request_name(&owner);
                let failure = self.orchestrator.finish();
                self.emit_completed(id, request, success);

                let mut follow_ups = Vec::new();
                if failure.is_some_and(TransactionErrorKind::is_download_failure) {
                    tracing::info!("package download failed, refreshing cache");
                    follow_ups.push(FollowUp::Refresh);
                }
                follow_ups.push(FollowUp::StartQueued);
                follow_ups
            }
            Owner::Refresh { rearm } => {
                self.emit_completed(id, "refresh-cache", success);
                if rearm {
                    vec![FollowUp::Rearm, FollowUp::Reconcile]
                } else {
                    vec![FollowUp::Reconcile]
                }
            }
            Owner::RepoEnable { repo_id, enabled } => {
                self.emit_completed(id, "repo-enable", success);
                if success {
                    if let Some(repository) = self.repositories.set_enabled(&repo_id, enabled) {
                        self.events.emit_repository_changed(repository);
                    }
                }
                vec![FollowUp::Refresh]
            }
        }
    }

    fn on_resolution_finished(&mut self, id: TransactionId, success: bool) -> Vec<FollowUp> {
        if !success {
            tracing::warn!(%id, "package resolution failed, action abandoned");
            self.orchestrator.finish();
            return vec![FollowUp::StartQueued];
        }
        let started = match self.orchestrator.advance() {
            ResolveStep::QueryUpdates => self
                .launch(Pool::Update, Owner::Orchestrator, |backend| {
                    backend.get_updates()
                })
                .is_some(),
            ResolveStep::Submit(action) => self.submit_action(action),
            ResolveStep::Stale => true,
        };
        if started {
            Vec::new()
        } else {
            self.orchestrator.finish();
            vec![FollowUp::StartQueued]
        }
    }

    fn run_follow_up(&mut self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Rearm => self.scheduler.arm(Instant::now()),
            FollowUp::Reconcile => {
                self.check_for_updates();
            }
            FollowUp::Refresh => {
                self.refresh(false);
            }
            FollowUp::StartQueued => self.start_queued(),
        }
    }

    // Internals

    fn become_available(&mut self) {
        if self.available {
            self.check_for_updates();
            return;
        }
        self.available = true;

        if let Err(e) = self.backend.set_hints(&self.config.general.hints) {
            tracing::warn!(error = %e, "failed to send backend hints");
        }
        tracing::info!("package management backend available");
        self.events
            .emit(AppEvent::Controller(ControllerEvent::AvailabilityChanged {
                available: true,
            }));
        self.scheduler.arm(Instant::now());
        self.check_for_updates();
    }

    fn become_unavailable(&mut self) {
        if !self.available {
            return;
        }
        self.available = false;

        tracing::warn!("package management backend went away");
        self.events
            .emit(AppEvent::Controller(ControllerEvent::AvailabilityChanged {
                available: false,
            }));
        self.tracker.abandon_all();
        self.owners.clear();
        self.pass.reset();
        self.listing.reset();
        self.orchestrator.reset();
        self.scheduler.disarm();
    }

    fn start_apply(&mut self, request: ApplyRequest) -> bool {
        let kind = request.kind;
        let filter = self.orchestrator.begin(request);
        if self
            .launch(Pool::Update, Owner::Orchestrator, |backend| {
                backend.get_packages(filter)
            })
            .is_none()
        {
            self.orchestrator.finish();
            return false;
        }
        tracing::debug!(%kind, "resolving package action");
        true
    }

    fn start_queued(&mut self) {
        while self.orchestrator.is_idle() {
            let Some(request) = self.orchestrator.next_queued() else {
                break;
            };
            self.start_apply(request);
        }
    }

    fn submit_action(&mut self, action: Action) -> bool {
        let (kind, packages) = match &action {
            Action::Update { packages } => (ActionKind::Update, packages),
            Action::Remove { packages } => (ActionKind::Remove, packages),
            _ => return false,
        };
        let names: Vec<String> = packages.iter().map(ToString::to_string).collect();

        let Some(id) = self.launch(Pool::Update, Owner::Orchestrator, |backend| {
            backend.submit(action)
        }) else {
            return false;
        };

        tracing::info!(%id, %kind, packages = names.len(), "package action submitted");
        self.events
            .emit(AppEvent::Transaction(TransactionEvent::ActionSubmitted {
                transaction: id,
                action: kind,
                packages: names,
            }));
        true
    }

    fn refresh(&mut self, rearm: bool) -> bool {
        if !self.available {
            return false;
        }
        self.launch(Pool::General, Owner::Refresh { rearm }, |backend| {
            backend.submit(Action::RefreshCache { force: false })
        })
        .is_some()
    }

    fn launch<F>(&mut self, pool: Pool, owner: Owner, request: F) -> Option<TransactionId>
    where
        F: FnOnce(&dyn Backend) -> Result<TransactionId>,
    {
        let name = self.request_name(&owner);
        match request(self.backend.as_ref()) {
            Ok(id) => {
                if let Err(e) = self.tracker.track(id, pool) {
                    tracing::warn!(%id, error = %e, "backend reused a transaction id");
                    self.events.emit_error(format!("{name} request dropped: {e}"));
                    return None;
                }
                tracing::debug!(%id, %pool, request = name, "transaction started");
                self.owners.insert(id, owner);
                Some(id)
            }
            Err(e) => {
                tracing::warn!(request = name, error = %e, "backend request failed");
                self.events
                    .emit_warning_with_context(format!("{name} request failed"), e.to_string());
                None
            }
        }
    }

    fn request_name(&self, owner: &Owner) -> &'static str {
        match owner {
            Owner::Reconcile => "reconcile",
            Owner::RepoListing => "repo-list",
            Owner::Orchestrator => match self.orchestrator.running() {
                Some(ActionKind::Update) => "update-packages",
                Some(ActionKind::Remove) => "remove-packages",
                None => "resolve-packages",
            },
            Owner::Refresh { .. } => "refresh-cache",
            Owner::RepoEnable { .. } => "repo-enable",
        }
    }

    fn emit_completed(&self, id: TransactionId, request: &str, success: bool) {
        self.events
            .emit(AppEvent::Transaction(TransactionEvent::Completed {
                transaction: id,
                request: request.to_string(),
                success,
            }));
    }
}
