//! Two-stage package reconciliation pass
//!
//! A pass first enumerates every package the backend knows about, then the
//! packages with a newer version, accumulating into a pending snapshot that
//! nobody else can see. Only after both stages finish is the pending
//! snapshot diffed into the store.

use std::collections::BTreeMap;

use upkeep_config::PackageConfig;
use upkeep_types::{Package, PackageId, PackageInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStage {
    Idle,
    QueryingInstalled,
    QueryingUpdates,
}

/// What the controller should do once the current stage's query finished
#[derive(Debug)]
pub enum PassStep {
    /// Issue the updates query
    QueryUpdates,
    /// Diff this snapshot into the store
    Commit(BTreeMap<String, Package>),
    /// No pass was running
    Stale,
}

#[derive(Debug)]
pub struct ReconcilePass {
    stage: PassStage,
    pending: BTreeMap<String, Package>,
}

impl Default for ReconcilePass {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcilePass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: PassStage::Idle,
            pending: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn stage(&self) -> PassStage {
        self.stage
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.stage == PassStage::Idle
    }

    pub fn begin(&mut self) {
        self.pending.clear();
        self.stage = PassStage::QueryingInstalled;
    }

    /// Drop the pass without committing anything
    pub fn reset(&mut self) {
        self.pending.clear();
        self.stage = PassStage::Idle;
    }

    /// Fold one reported package into the pending snapshot
    pub fn observe(
        &mut self,
        info: PackageInfo,
        id: &PackageId,
        summary: &str,
        filter: &PackageConfig,
    ) {
        if !filter.matches(id.name()) {
            return;
        }

        match self.stage {
            PassStage::Idle => {}
            PassStage::QueryingInstalled => {
                let entry = self
                    .pending
                    .entry(id.name().to_string())
                    .or_insert_with(|| {
                        let mut package = Package::new(id.name());
                        package.candidate_version = id.version().to_string();
                        package
                    });
                if info.is_installed() {
                    entry.set_installed(id.version());
                    entry.candidate_version = id.version().to_string();
                }
                if !summary.is_empty() {
                    entry.summary = summary.to_string();
                }
            }
            PassStage::QueryingUpdates => {
                let entry = self
                    .pending
                    .entry(id.name().to_string())
                    .or_insert_with(|| Package::new(id.name()));
                entry.candidate_version = id.version().to_string();
                entry.update_available = true;
                if !summary.is_empty() {
                    entry.summary = summary.to_string();
                }
            }
        }
    }

    /// Move to the next stage after the current query finished
    pub fn advance(&mut self) -> PassStep {
        match self.stage {
            PassStage::Idle => PassStep::Stale,
            PassStage::QueryingInstalled => {
                self.stage = PassStage::QueryingUpdates;
                PassStep::QueryUpdates
            }
            PassStage::QueryingUpdates => {
                self.stage = PassStage::Idle;
                PassStep::Commit(std::mem::take(&mut self.pending))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PackageId {
        PackageId::parse(s).unwrap()
    }

    fn commit(pass: &mut ReconcilePass) -> BTreeMap<String, Package> {
        match pass.advance() {
            PassStep::Commit(pending) => pending,
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn test_two_versions_collapse_into_one_record() {
        let filter = PackageConfig::default();
        let mut pass = ReconcilePass::new();
        pass.begin();
        pass.observe(PackageInfo::Installed, &id("A;1.0;x86;installed"), "", &filter);
        pass.observe(PackageInfo::Available, &id("A;1.1;x86;main"), "tool", &filter);
        assert!(matches!(pass.advance(), PassStep::QueryUpdates));
        pass.observe(PackageInfo::Normal, &id("A;1.1;x86;main"), "", &filter);

        let pending = commit(&mut pass);
        assert_eq!(pending.len(), 1);
        let a = &pending["A"];
        assert_eq!(a.installed_version, "1.0");
        assert_eq!(a.candidate_version, "1.1");
        assert!(a.update_available);
        assert!(a.can_remove);
        assert_eq!(a.summary, "tool");
        assert!(pass.is_idle());
    }

    #[test]
    fn test_installed_after_available_wins() {
        let filter = PackageConfig::default();
        let mut pass = ReconcilePass::new();
        pass.begin();
        pass.observe(PackageInfo::Available, &id("A;1.1"), "", &filter);
        pass.observe(PackageInfo::Installed, &id("A;1.0"), "", &filter);
        pass.advance();

        let a = &commit(&mut pass)["A"];
        assert_eq!(a.installed_version, "1.0");
        assert_eq!(a.candidate_version, "1.0");
        assert!(!a.update_available);
    }

    #[test]
    fn test_namespace_filter_applies_to_both_stages() {
        let filter = PackageConfig {
            filter: "acme".to_string(),
        };
        let mut pass = ReconcilePass::new();
        pass.begin();
        pass.observe(PackageInfo::Installed, &id("curl;8.0"), "", &filter);
        pass.observe(PackageInfo::Installed, &id("acme-daemon;1.0"), "", &filter);
        pass.advance();
        pass.observe(PackageInfo::Normal, &id("bash;5.2"), "", &filter);

        let pending = commit(&mut pass);
        assert_eq!(pending.keys().collect::<Vec<_>>(), vec!["acme-daemon"]);
    }

    #[test]
    fn test_update_only_package_is_synthesised() {
        let filter = PackageConfig::default();
        let mut pass = ReconcilePass::new();
        pass.begin();
        pass.advance();
        pass.observe(PackageInfo::Normal, &id("B;2.0"), "new", &filter);

        let b = &commit(&mut pass)["B"];
        assert!(!b.is_installed());
        assert!(!b.can_remove);
        assert_eq!(b.candidate_version, "2.0");
        assert!(b.update_available);
    }

    #[test]
    fn test_idle_pass_ignores_items() {
        let mut pass = ReconcilePass::new();
        pass.observe(PackageInfo::Installed, &id("A;1.0"), "", &PackageConfig::default());
        assert!(matches!(pass.advance(), PassStep::Stale));
    }
}
