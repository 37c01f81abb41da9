//! In-process package-management service
//!
//! Every request is answered synchronously into the event channel, so the
//! caller sees the same "id now, events later" shape as with a real daemon.
//! Failures can be injected per action.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    Backend, BackendEvent, BackendEventSender, ChannelSource, ChannelWriter, DaemonEvent,
    HostFixture, TransactionSignal,
};
use upkeep_errors::{BackendError, Result};
use upkeep_types::{
    Action, ExitStatus, PackageFilter, PackageId, PackageInfo, RepoFilter, TransactionErrorKind,
    TransactionId,
};

const DEFAULT_ARCH: &str = "amd64";

#[derive(Debug, Clone)]
struct HostPackage {
    installed: Option<String>,
    available: Option<String>,
    summary: String,
    origin: String,
}

impl HostPackage {
    fn pending_update(&self) -> Option<&str> {
        match (&self.installed, &self.available) {
            (Some(installed), Some(available)) if installed != available => Some(available),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct HostRepository {
    id: String,
    description: String,
    enabled: bool,
}

#[derive(Debug)]
struct HostState {
    running: bool,
    arch: String,
    hints: Vec<String>,
    packages: BTreeMap<String, HostPackage>,
    repositories: Vec<HostRepository>,
    failures: VecDeque<(TransactionErrorKind, String)>,
    submitted: Vec<Action>,
    channels: Vec<ChannelSource>,
}

/// Simulated host with a package database and repository list
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<HostState>,
    events: BackendEventSender,
}

impl MemoryBackend {
    /// Empty, running host
    #[must_use]
    pub fn new(events: BackendEventSender) -> Self {
        Self {
            state: Mutex::new(HostState {
                running: true,
                arch: DEFAULT_ARCH.to_string(),
                hints: Vec::new(),
                packages: BTreeMap::new(),
                repositories: Vec::new(),
                failures: VecDeque::new(),
                submitted: Vec::new(),
                channels: Vec::new(),
            }),
            events,
        }
    }

    /// Host populated from a fixture
    #[must_use]
    pub fn from_fixture(fixture: &HostFixture, events: BackendEventSender) -> Self {
        let backend = Self::new(events);
        {
            let mut state = backend.lock();
            state.running = fixture.running;
            state.arch.clone_from(&fixture.arch);
            for package in &fixture.packages {
                state.packages.insert(
                    package.name.clone(),
                    HostPackage {
                        installed: package.installed.clone(),
                        available: package
                            .available
                            .clone()
                            .or_else(|| package.installed.clone()),
                        summary: package.summary.clone(),
                        origin: package.origin.clone(),
                    },
                );
            }
            for repository in &fixture.repositories {
                state.repositories.push(HostRepository {
                    id: repository.id.clone(),
                    description: repository.description.clone(),
                    enabled: repository.enabled,
                });
            }
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: BackendEvent) {
        // A closed channel means the engine is gone; nothing left to notify.
        let _ = self.events.send(event);
    }

    fn deliver(&self, id: TransactionId, signals: Vec<TransactionSignal>) {
        for signal in signals {
            self.send(BackendEvent::Transaction { id, signal });
        }
    }

    fn ensure_running(state: &HostState) -> Result<()> {
        if state.running {
            Ok(())
        } else {
            Err(BackendError::Unavailable.into())
        }
    }

    /// Bring the service up or down and announce it
    pub fn set_running(&self, running: bool) {
        self.lock().running = running;
        self.send(BackendEvent::Daemon(DaemonEvent::RunningChanged { running }));
    }

    /// Shut the service down
    pub fn quit(&self) {
        self.lock().running = false;
        self.send(BackendEvent::Daemon(DaemonEvent::Quit));
    }

    /// Announce that the package catalog changed
    pub fn announce_updates_changed(&self) {
        self.send(BackendEvent::Daemon(DaemonEvent::UpdatesChanged));
    }

    /// Make the next submitted action fail with `kind`
    pub fn fail_next_action(&self, kind: TransactionErrorKind, details: impl Into<String>) {
        self.lock().failures.push_back((kind, details.into()));
    }

    /// Publish a newer version of `name` in the repositories
    pub fn publish(&self, name: &str, version: impl Into<String>) {
        let version = version.into();
        let mut state = self.lock();
        state
            .packages
            .entry(name.to_string())
            .and_modify(|package| package.available = Some(version.clone()))
            .or_insert_with(|| HostPackage {
                installed: None,
                available: Some(version.clone()),
                summary: String::new(),
                origin: String::new(),
            });
    }

    #[must_use]
    pub fn hints(&self) -> Vec<String> {
        self.lock().hints.clone()
    }

    /// Every action submitted so far, in order
    #[must_use]
    pub fn submitted(&self) -> Vec<Action> {
        self.lock().submitted.clone()
    }

    /// Channel sources written through [`ChannelWriter`]
    #[must_use]
    pub fn channels(&self) -> Vec<ChannelSource> {
        self.lock().channels.clone()
    }

    #[must_use]
    pub fn installed_version(&self, name: &str) -> Option<String> {
        self.lock()
            .packages
            .get(name)
            .and_then(|package| package.installed.clone())
    }

    #[must_use]
    pub fn repository_enabled(&self, id: &str) -> Option<bool> {
        self.lock()
            .repositories
            .iter()
            .find(|repository| repository.id == id)
            .map(|repository| repository.enabled)
    }

    fn package_item(
        state: &HostState,
        info: PackageInfo,
        name: &str,
        version: &str,
        package: &HostPackage,
    ) -> TransactionSignal {
        let data = if info.is_installed() {
            format!("installed:{}", package.origin)
        } else {
            package.origin.clone()
        };
        TransactionSignal::Package {
            info,
            package_id: PackageId::new(name, version, state.arch.as_str(), data).to_string(),
            summary: package.summary.clone(),
        }
    }

    fn list_packages(state: &HostState, filter: PackageFilter) -> Vec<TransactionSignal> {
        let mut items = Vec::new();
        for (name, package) in &state.packages {
            match filter {
                PackageFilter::All => {
                    if let Some(installed) = &package.installed {
                        items.push(Self::package_item(
                            state,
                            PackageInfo::Installed,
                            name,
                            installed,
                            package,
                        ));
                    }
                    if let Some(available) = &package.available {
                        if package.installed.as_ref() != Some(available) {
                            items.push(Self::package_item(
                                state,
                                PackageInfo::Available,
                                name,
                                available,
                                package,
                            ));
                        }
                    }
                }
                PackageFilter::Installed => {
                    if let Some(installed) = &package.installed {
                        items.push(Self::package_item(
                            state,
                            PackageInfo::Installed,
                            name,
                            installed,
                            package,
                        ));
                    }
                }
                PackageFilter::Arch => {
                    if let Some(newer) = package.pending_update() {
                        items.push(Self::package_item(
                            state,
                            PackageInfo::Available,
                            name,
                            newer,
                            package,
                        ));
                    } else if let Some(installed) = &package.installed {
                        items.push(Self::package_item(
                            state,
                            PackageInfo::Installed,
                            name,
                            installed,
                            package,
                        ));
                    }
                }
            }
        }
        items
    }

    fn run_action(state: &mut HostState, action: &Action) -> (Vec<TransactionSignal>, bool) {
        if let Some((kind, details)) = state.failures.pop_front() {
            return (
                vec![
                    TransactionSignal::Error { kind, details },
                    TransactionSignal::Finished {
                        exit: ExitStatus::Failed,
                    },
                ],
                false,
            );
        }

        match action {
            Action::Update { packages } | Action::Remove { packages } => {
                let removing = matches!(action, Action::Remove { .. });
                if let Some(missing) = packages
                    .iter()
                    .find(|id| !state.packages.contains_key(id.name()))
                {
                    return (failed(TransactionErrorKind::PackageNotFound, missing), false);
                }

                let mut signals = Vec::new();
                for id in packages {
                    let Some(package) = state.packages.get_mut(id.name()) else {
                        continue;
                    };
                    let progress = if removing {
                        package.installed = None;
                        PackageInfo::Removing
                    } else {
                        package.installed = Some(id.version().to_string());
                        PackageInfo::Updating
                    };
                    let summary = package.summary.clone();
                    signals.push(TransactionSignal::Package {
                        info: progress,
                        package_id: id.to_string(),
                        summary: summary.clone(),
                    });
                    signals.push(TransactionSignal::Package {
                        info: PackageInfo::Finished,
                        package_id: id.to_string(),
                        summary,
                    });
                }
                if removing {
                    state.packages.retain(|_, package| {
                        package.installed.is_some() || package.available.is_some()
                    });
                }
                let changed = !packages.is_empty();
                signals.push(TransactionSignal::Finished {
                    exit: ExitStatus::Success,
                });
                (signals, changed)
            }
            Action::RefreshCache { .. } => (
                vec![TransactionSignal::Finished {
                    exit: ExitStatus::Success,
                }],
                false,
            ),
            Action::SetRepoEnabled { repo_id, enabled } => {
                let Some(repository) = state
                    .repositories
                    .iter_mut()
                    .find(|repository| &repository.id == repo_id)
                else {
                    return (
                        vec![
                            TransactionSignal::Error {
                                kind: TransactionErrorKind::Internal,
                                details: format!("repository {repo_id} not found"),
                            },
                            TransactionSignal::Finished {
                                exit: ExitStatus::Failed,
                            },
                        ],
                        false,
                    );
                };
                let changed = repository.enabled != *enabled;
                repository.enabled = *enabled;
                (
                    vec![TransactionSignal::Finished {
                        exit: ExitStatus::Success,
                    }],
                    changed,
                )
            }
        }
    }
}

fn failed(kind: TransactionErrorKind, id: &PackageId) -> Vec<TransactionSignal> {
    vec![
        TransactionSignal::Error {
            kind,
            details: format!("package {} is not known", id.name()),
        },
        TransactionSignal::Finished {
            exit: ExitStatus::Failed,
        },
    ]
}

impl Backend for MemoryBackend {
    fn is_running(&self) -> bool {
        self.lock().running
    }

    fn set_hints(&self, hints: &[String]) -> Result<()> {
        let mut state = self.lock();
        Self::ensure_running(&state)?;
        state.hints = hints.to_vec();
        Ok(())
    }

    fn get_packages(&self, filter: PackageFilter) -> Result<TransactionId> {
        let mut signals = {
            let state = self.lock();
            Self::ensure_running(&state)?;
            Self::list_packages(&state, filter)
        };
        signals.push(TransactionSignal::Finished {
            exit: ExitStatus::Success,
        });
        let id = TransactionId::new();
        self.deliver(id, signals);
        Ok(id)
    }

    fn get_updates(&self) -> Result<TransactionId> {
        let mut signals = {
            let state = self.lock();
            Self::ensure_running(&state)?;
            state
                .packages
                .iter()
                .filter_map(|(name, package)| {
                    package.pending_update().map(|newer| {
                        Self::package_item(&state, PackageInfo::Normal, name, newer, package)
                    })
                })
                .collect::<Vec<_>>()
        };
        signals.push(TransactionSignal::Finished {
            exit: ExitStatus::Success,
        });
        let id = TransactionId::new();
        self.deliver(id, signals);
        Ok(id)
    }

    fn get_repo_list(&self, _filter: RepoFilter) -> Result<TransactionId> {
        let mut signals = {
            let state = self.lock();
            Self::ensure_running(&state)?;
            state
                .repositories
                .iter()
                .map(|repository| TransactionSignal::RepoDetail {
                    repo_id: repository.id.clone(),
                    description: repository.description.clone(),
                    enabled: repository.enabled,
                })
                .collect::<Vec<_>>()
        };
        signals.push(TransactionSignal::Finished {
            exit: ExitStatus::Success,
        });
        let id = TransactionId::new();
        self.deliver(id, signals);
        Ok(id)
    }

    fn submit(&self, action: Action) -> Result<TransactionId> {
        let (signals, changed) = {
            let mut state = self.lock();
            Self::ensure_running(&state)?;
            state.submitted.push(action.clone());
            Self::run_action(&mut state, &action)
        };
        let id = TransactionId::new();
        tracing::debug!(%id, request = action.name(), "simulated action");
        self.deliver(id, signals);
        if changed {
            self.announce_updates_changed();
        }
        Ok(id)
    }
}

impl ChannelWriter for MemoryBackend {
    fn add_channel(&self, source: &ChannelSource) -> Result<()> {
        let mut state = self.lock();
        if !state
            .repositories
            .iter()
            .any(|repository| repository.id == source.line)
        {
            state.repositories.push(HostRepository {
                id: source.line.clone(),
                description: String::new(),
                enabled: true,
            });
        }
        state.channels.push(source.clone());
        Ok(())
    }
}
