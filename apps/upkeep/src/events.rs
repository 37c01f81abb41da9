//! Event handling and user feedback

use console::{style, Term};
use upkeep_events::{
    AppEvent, ControllerEvent, EventMessage, GeneralEvent, PackageEvent, RepoEvent,
    TransactionEvent,
};
use upkeep_types::{ActionKind, PackageInfo};

use crate::logging::log_event_with_tracing;

/// Turns controller events into status lines on stderr
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Suppress status lines (JSON mode)
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);
        if self.quiet {
            return;
        }

        match message.event {
            AppEvent::Package(PackageEvent::Changed { package }) if package.update_available => {
                self.show_status(&format!(
                    "{} {} -> {}",
                    self.accent("update available:"),
                    package.name,
                    package.candidate_version
                ));
            }
            AppEvent::Package(_) => {}

            AppEvent::Repo(RepoEvent::Added { repository }) if !repository.is_virtual => {
                self.show_debug(&format!("repository {} listed", repository.id));
            }
            AppEvent::Repo(RepoEvent::Changed { repository }) => {
                let state = if repository.enabled { "enabled" } else { "disabled" };
                self.show_status(&format!("repository {} {state}", repository.id));
            }
            AppEvent::Repo(RepoEvent::Removed { id }) => {
                self.show_debug(&format!("repository {id} replaced"));
            }
            AppEvent::Repo(_) => {}

            AppEvent::Controller(ControllerEvent::AvailabilityChanged { available }) => {
                if available {
                    self.show_debug("package management backend available");
                } else {
                    self.show_warning("package management backend went away");
                }
            }
            AppEvent::Controller(ControllerEvent::PoolChanged { pool, active }) => {
                self.show_debug(&format!(
                    "{pool} pool {}",
                    if active { "busy" } else { "idle" }
                ));
            }

            AppEvent::Transaction(TransactionEvent::ActionSubmitted {
                action, packages, ..
            }) => {
                let verb = match action {
                    ActionKind::Update => "Updating",
                    ActionKind::Remove => "Removing",
                };
                if packages.len() == 1 {
                    self.show_status(&format!("{verb} {}", packages[0]));
                } else {
                    self.show_status(&format!("{verb} {} packages", packages.len()));
                }
            }
            AppEvent::Transaction(TransactionEvent::ItemProgress {
                package_id, info, ..
            }) => {
                if info == PackageInfo::Finished {
                    self.show_status(&format!("{} {package_id}", self.success("done")));
                } else {
                    self.show_debug(&format!("{info} {package_id}"));
                }
            }
            AppEvent::Transaction(TransactionEvent::Failed {
                request, failure, ..
            }) => {
                self.show_error(&format!("{request} failed: {}", failure.message));
                if failure.retryable {
                    self.show_status("the package cache will be refreshed before retrying");
                }
            }
            AppEvent::Transaction(TransactionEvent::Completed { .. }) => {}

            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                match context {
                    Some(context) => self.show_warning(&format!("{message}: {context}")),
                    None => self.show_warning(&message),
                }
            }
            AppEvent::General(GeneralEvent::Error { message, details }) => match details {
                Some(details) => self.show_error(&format!("{message}: {details}")),
                None => self.show_error(&message),
            },
        }
    }

    fn accent(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn success(&self, text: &str) -> String {
        if self.colors_enabled {
            style(text).green().to_string()
        } else {
            text.to_string()
        }
    }

    fn show_status(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn show_warning(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("warning:").yellow().bold())
        } else {
            format!("warning: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_error(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("error:").red().bold())
        } else {
            format!("error: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_debug(&self, message: &str) {
        if self.debug_enabled {
            let line = if self.colors_enabled {
                style(message).dim().to_string()
            } else {
                message.to_string()
            };
            let _ = self.term.write_line(&line);
        }
    }
}
