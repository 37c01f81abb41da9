//! Async driver for [`UpdateController`]
//!
//! The service task owns the controller and feeds it one input at a time
//! from three sources: backend notifications, consumer commands sent through
//! a [`ControllerHandle`], and the periodic refresh deadline.

use std::future;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use upkeep_backend::BackendEventReceiver;
use upkeep_errors::{EngineError, Error};
use upkeep_types::{ActionKind, Package, Repository};

use crate::controller::UpdateController;

const COMMAND_BUFFER: usize = 64;

/// Point-in-time copy of the controller's observable state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub packages: Vec<Package>,
    pub repositories: Vec<Repository>,
    pub busy: bool,
    pub update_running: bool,
    pub available: bool,
}

#[derive(Debug)]
enum Command {
    CheckForUpdates {
        reply: oneshot::Sender<bool>,
    },
    Apply {
        kind: ActionKind,
        targets: Vec<String>,
        reply: oneshot::Sender<bool>,
    },
    EnableRepository {
        id: String,
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    WhenSettled {
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown,
}

/// Cloneable handle for talking to a running [`ControllerService`]
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
}

impl ControllerHandle {
    async fn request<T>(&self, command: Command, reply: oneshot::Receiver<T>) -> Result<T, Error> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::ServiceStopped)?;
        reply.await.map_err(|_| EngineError::ServiceStopped.into())
    }

    /// Start a reconciliation pass
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ServiceStopped` if the service has exited.
    pub async fn check_for_updates(&self) -> Result<bool, Error> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::CheckForUpdates { reply }, rx).await
    }

    /// Update or remove packages by name
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ServiceStopped` if the service has exited.
    pub async fn apply(&self, kind: ActionKind, targets: Vec<String>) -> Result<bool, Error> {
        let (reply, rx) = oneshot::channel();
        self.request(
            Command::Apply {
                kind,
                targets,
                reply,
            },
            rx,
        )
        .await
    }

    /// Enable or disable a repository
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ServiceStopped` if the service has exited.
    pub async fn enable_repository(
        &self,
        id: impl Into<String>,
        enabled: bool,
    ) -> Result<bool, Error> {
        let (reply, rx) = oneshot::channel();
        self.request(
            Command::EnableRepository {
                id: id.into(),
                enabled,
                reply,
            },
            rx,
        )
        .await
    }

    /// Current state
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ServiceStopped` if the service has exited.
    pub async fn snapshot(&self) -> Result<Snapshot, Error> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Snapshot { reply }, rx).await
    }

    /// Wait until nothing is in flight and no backend event is pending
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ServiceStopped` if the service has exited.
    pub async fn settled(&self) -> Result<Snapshot, Error> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::WhenSettled { reply }, rx).await
    }

    /// Ask the service to stop
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ServiceStopped` if the service has already exited.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| EngineError::ServiceStopped.into())
    }
}

/// Message loop owning an [`UpdateController`]
#[derive(Debug)]
pub struct ControllerService {
    controller: UpdateController,
    backend_events: BackendEventReceiver,
    commands: mpsc::Receiver<Command>,
    waiters: Vec<oneshot::Sender<Snapshot>>,
}

impl ControllerService {
    #[must_use]
    pub fn new(
        controller: UpdateController,
        backend_events: BackendEventReceiver,
    ) -> (Self, ControllerHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let service = Self {
            controller,
            backend_events,
            commands: rx,
            waiters: Vec::new(),
        };
        (service, ControllerHandle { commands: tx })
    }

    /// Run until shut down or until every handle and the backend are gone.
    /// Returns the controller so its final state can be inspected.
    pub async fn run(mut self) -> UpdateController {
        self.controller.start();

        loop {
            self.notify_waiters();
            let deadline = self.controller.next_refresh();

            tokio::select! {
                biased;

                event = self.backend_events.recv() => match event {
                    Some(event) => self.controller.handle_backend_event(event),
                    None => {
                        tracing::warn!("backend event channel closed");
                        break;
                    }
                },

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },

                () = wait_for(deadline) => self.controller.on_refresh_due(),
            }
        }

        tracing::debug!("controller service stopped");
        self.controller
    }

    fn handle_command(&mut self, command: Command) {
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::CheckForUpdates { reply } => {
                let _ = reply.send(self.controller.check_for_updates());
            }
            Command::Apply {
                kind,
                targets,
                reply,
            } => {
                let _ = reply.send(self.controller.apply(kind, targets));
            }
            Command::EnableRepository { id, enabled, reply } => {
                let _ = reply.send(self.controller.enable_repository(&id, enabled));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::WhenSettled { reply } => self.waiters.push(reply),
            Command::Shutdown => {}
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            packages: self.controller.packages(),
            repositories: self.controller.repositories(),
            busy: self.controller.busy(),
            update_running: self.controller.update_running(),
            available: self.controller.update_management_available(),
        }
    }

    fn notify_waiters(&mut self) {
        if self.waiters.is_empty()
            || !self.controller.is_settled()
            || !self.backend_events.is_empty()
        {
            return;
        }
        let snapshot = self.snapshot();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}
