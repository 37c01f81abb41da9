//! Snapshot stores owned by the controller

use std::collections::BTreeMap;

use upkeep_events::EventEmitter;
use upkeep_types::{Package, Repository};

/// Name-keyed package snapshot
#[derive(Debug, Default, Clone)]
pub struct PackageStore {
    packages: BTreeMap<String, Package>,
}

impl PackageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.packages.get_mut(name)
    }

    pub fn insert(&mut self, package: Package) -> Option<Package> {
        self.packages.insert(package.name.clone(), package)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Copy of every record, ordered by name
    #[must_use]
    pub fn snapshot(&self) -> Vec<Package> {
        self.packages.values().cloned().collect()
    }

    /// Replace the store with `pending`, emitting one event per real change.
    ///
    /// Returns the number of events emitted.
    pub fn commit(
        &mut self,
        pending: BTreeMap<String, Package>,
        emitter: &impl EventEmitter,
    ) -> usize {
        let mut changes = 0;

        let gone: Vec<String> = self
            .packages
            .keys()
            .filter(|name| !pending.contains_key(*name))
            .cloned()
            .collect();
        for name in gone {
            self.packages.remove(&name);
            tracing::debug!(package = %name, "package removed");
            emitter.emit_package_removed(name);
            changes += 1;
        }

        for (name, package) in pending {
            match self.packages.get(&name) {
                None => {
                    tracing::debug!(package = %name, "package added");
                    emitter.emit_package_added(package.clone());
                }
                Some(existing) if *existing != package => {
                    tracing::debug!(package = %name, "package changed");
                    emitter.emit_package_changed(package.clone());
                }
                Some(_) => continue,
            }
            self.packages.insert(name, package);
            changes += 1;
        }

        changes
    }
}

/// Id-keyed repository snapshot
#[derive(Debug, Default, Clone)]
pub struct RepositoryStore {
    repositories: BTreeMap<String, Repository>,
}

impl RepositoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Repository> {
        self.repositories.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.repositories.contains_key(id)
    }

    pub fn insert(&mut self, repository: Repository) -> Option<Repository> {
        self.repositories.insert(repository.id.clone(), repository)
    }

    pub fn remove(&mut self, id: &str) -> Option<Repository> {
        self.repositories.remove(id)
    }

    /// Set `enabled` on a record; returns the updated copy when it changed
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Option<Repository> {
        let repository = self.repositories.get_mut(id)?;
        if repository.enabled == enabled {
            return None;
        }
        repository.enabled = enabled;
        Some(repository.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.values()
    }

    /// Copy of every record, ordered by id
    #[must_use]
    pub fn snapshot(&self) -> Vec<Repository> {
        self.repositories.values().cloned().collect()
    }
}
