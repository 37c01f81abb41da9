//! Repository listing and virtual channel placeholders
//!
//! Configured channel roles always have a record: either the real repository
//! once the backend reports it, or a disabled virtual placeholder with id
//! `virtual_<role>`. Listing results are buffered and applied in one step so
//! that a placeholder and its real repository are never both visible.

use std::collections::HashSet;

use upkeep_backend::ChannelSource;
use upkeep_config::RepositoryConfig;
use upkeep_errors::EngineError;
use upkeep_events::EventEmitter;
use upkeep_types::Repository;

use crate::store::RepositoryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListedRepository {
    id: String,
    description: String,
    enabled: bool,
}

/// Buffer for one repository listing
#[derive(Debug, Default)]
pub struct RepoListing {
    active: bool,
    listed: Vec<ListedRepository>,
}

impl RepoListing {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.active = true;
        self.listed.clear();
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.listed.clear();
    }

    /// Buffer a reported repository if it is managed
    pub fn observe(
        &mut self,
        repo_id: &str,
        description: &str,
        enabled: bool,
        config: &RepositoryConfig,
    ) {
        if !self.active || !config.matches(repo_id) {
            return;
        }
        tracing::debug!(repo = repo_id, enabled, "repository listed");
        self.listed.push(ListedRepository {
            id: repo_id.to_string(),
            description: description.to_string(),
            enabled,
        });
    }

    /// Apply the buffered listing to `store`
    pub fn finish(
        &mut self,
        store: &mut RepositoryStore,
        config: &RepositoryConfig,
        emitter: &impl EventEmitter,
    ) {
        if !self.active {
            return;
        }
        self.active = false;
        let listed = std::mem::take(&mut self.listed);

        let seen_roles: HashSet<&str> = config
            .channels
            .iter()
            .filter(|channel| listed.iter().any(|repo| channel.matches(&repo.id)))
            .map(|channel| channel.role.as_str())
            .collect();

        // Placeholders go first so the real record never coexists with them.
        for channel in &config.channels {
            if !seen_roles.contains(channel.role.as_str()) {
                continue;
            }
            let virtual_id = channel.virtual_id();
            if store.get(&virtual_id).is_some_and(|repo| repo.is_virtual) {
                store.remove(&virtual_id);
                tracing::info!(role = %channel.role, "virtual channel replaced by real repository");
                emitter.emit_repository_removed(virtual_id);
            }
        }

        for repo in listed {
            if store.contains(&repo.id) {
                if let Some(changed) = store.set_enabled(&repo.id, repo.enabled) {
                    emitter.emit_repository_changed(changed);
                }
                continue;
            }

            let description = match config.channel_for(&repo.id) {
                Some(channel) => channel.description.clone(),
                None if !repo.description.is_empty() => repo.description,
                None => repo.id.clone(),
            };
            let record = Repository::new(repo.id, description, repo.enabled);
            store.insert(record.clone());
            emitter.emit_repository_added(record);
        }

        for channel in &config.channels {
            if seen_roles.contains(channel.role.as_str()) {
                continue;
            }
            let virtual_id = channel.virtual_id();
            let has_record = store.contains(&virtual_id)
                || store
                    .iter()
                    .any(|repo| !repo.is_virtual && channel.matches(&repo.id));
            if has_record {
                continue;
            }
            let placeholder = Repository::placeholder(virtual_id, channel.description.clone());
            store.insert(placeholder.clone());
            emitter.emit_repository_added(placeholder);
        }
    }
}

/// How an enable/disable request is carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnablePlan {
    /// Nothing to do, report success
    Nothing,
    /// Write the channel's source line for real
    AddChannel(ChannelSource),
    /// Ask the backend to toggle a real repository
    Toggle,
}

/// Work out what `enable_repository(id, enabled)` has to do
///
/// # Errors
///
/// Fails closed when the id is unknown, or when a virtual channel cannot be
/// materialised because its role, source template or the distribution
/// codename is missing.
pub fn plan_enable(
    store: &RepositoryStore,
    config: &RepositoryConfig,
    codename: Option<&str>,
    id: &str,
    enabled: bool,
) -> Result<EnablePlan, EngineError> {
    let repository = store
        .get(id)
        .ok_or_else(|| EngineError::UnknownRepository { id: id.to_string() })?;

    if !repository.is_virtual {
        return Ok(EnablePlan::Toggle);
    }
    if !enabled {
        return Ok(EnablePlan::Nothing);
    }

    let channel = config
        .channel_by_virtual_id(id)
        .ok_or_else(|| EngineError::UnknownChannelRole {
            role: id.trim_start_matches("virtual_").to_string(),
        })?;
    let codename = codename
        .filter(|codename| !codename.is_empty())
        .ok_or(EngineError::UnknownDistribution)?;
    let line = channel
        .render_source(codename)
        .ok_or_else(|| EngineError::MissingSourceTemplate {
            role: channel.role.clone(),
        })?;

    Ok(EnablePlan::AddChannel(ChannelSource {
        role: channel.role.clone(),
        file_name: format!("upkeep-{}.list", channel.role),
        line,
    }))
}
