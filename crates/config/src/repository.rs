use serde::{Deserialize, Serialize};

/// Which repositories the engine manages, and which channels it always
/// offers a toggle for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Substring a repository id must contain to be managed (empty = all)
    #[serde(default)]
    pub namespace: String,
    /// Substrings that exclude an otherwise managed repository id
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
}

/// A channel role (e.g. "testing") that gets a virtual placeholder until the
/// real repository is discovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub role: String,
    /// Substring identifying the real repository id for this role
    pub pattern: String,
    pub description: String,
    /// Source line written when the channel is added for real;
    /// `{codename}` is replaced by the distribution codename.
    #[serde(default)]
    pub source: Option<String>,
}

impl ChannelConfig {
    /// Id of the placeholder record for this role
    #[must_use]
    pub fn virtual_id(&self) -> String {
        format!("virtual_{}", self.role)
    }

    /// Whether a backend repository id belongs to this role
    #[must_use]
    pub fn matches(&self, repo_id: &str) -> bool {
        !self.pattern.is_empty() && repo_id.contains(&self.pattern)
    }

    /// Render the source line for `codename`, if a template is configured
    #[must_use]
    pub fn render_source(&self, codename: &str) -> Option<String> {
        self.source
            .as_ref()
            .map(|template| template.replace("{codename}", codename))
    }
}

impl RepositoryConfig {
    /// Whether a repository id reported by the backend is managed
    #[must_use]
    pub fn matches(&self, repo_id: &str) -> bool {
        repo_id.contains(&self.namespace)
            && !self
                .exclude
                .iter()
                .any(|pattern| !pattern.is_empty() && repo_id.contains(pattern.as_str()))
    }

    /// Channel role a repository id belongs to
    #[must_use]
    pub fn channel_for(&self, repo_id: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|channel| channel.matches(repo_id))
    }

    /// Channel whose placeholder carries `virtual_id`
    #[must_use]
    pub fn channel_by_virtual_id(&self, virtual_id: &str) -> Option<&ChannelConfig> {
        self.channels
            .iter()
            .find(|channel| channel.virtual_id() == virtual_id)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            exclude: default_exclude(),
            channels: default_channels(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    vec!["deb-src".to_string()]
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            role: "testing".to_string(),
            pattern: "testing".to_string(),
            description: "Testing".to_string(),
            source: None,
        },
        ChannelConfig {
            role: "experimental".to_string(),
            pattern: "experimental".to_string(),
            description: "Experimental".to_string(),
            source: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_and_exclusions() {
        let config = RepositoryConfig {
            namespace: "repo.example.org/".to_string(),
            ..RepositoryConfig::default()
        };
        assert!(config.matches("http://repo.example.org/ stable/main"));
        assert!(!config.matches("deb-src http://repo.example.org/ stable/main"));
        assert!(!config.matches("http://mirror.other.net/ stable/main"));
    }

    #[test]
    fn test_channel_lookup() {
        let config = RepositoryConfig::default();
        let channel = config
            .channel_for("http://repo.example.org/testing bookworm/main")
            .unwrap();
        assert_eq!(channel.role, "testing");
        assert_eq!(channel.virtual_id(), "virtual_testing");
        assert_eq!(
            config.channel_by_virtual_id("virtual_experimental").map(|c| c.role.as_str()),
            Some("experimental")
        );
        assert!(config.channel_for("http://repo.example.org/ stable/main").is_none());
    }

    #[test]
    fn test_render_source() {
        let channel = ChannelConfig {
            role: "testing".to_string(),
            pattern: "testing".to_string(),
            description: "Testing".to_string(),
            source: Some("deb http://repo.example.org/testing {codename} main".to_string()),
        };
        assert_eq!(
            channel.render_source("bookworm").as_deref(),
            Some("deb http://repo.example.org/testing bookworm main")
        );
    }
}
