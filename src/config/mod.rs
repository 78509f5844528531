/// Configuration management for Kubetweak
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::k8s::ClientSource;
use crate::mutator::RetryPolicy;
use crate::utils::BackoffConfig;

/// Namespace used for namespaced kinds when none is given
pub const DEFAULT_NAMESPACE: &str = "default";

/// Main tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Namespace for deployments and pods
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// How to reach the cluster
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Conflict retry behaviour
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Cluster credential source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CredentialsConfig {
    /// Kubeconfig file (defaults to ~/.kube/config)
    External {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kubeconfig: Option<PathBuf>,
    },
    /// Service account of the pod this process runs in
    InCluster,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        CredentialsConfig::External { kubeconfig: None }
    }
}

/// Retry bounds for optimistic updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total write attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first conflict
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Growth factor applied after each conflict
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Upper bound on a single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random extra delay as a fraction of the base delay
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            factor: default_factor(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Build the mutator's retry policy
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            BackoffConfig::new(
                Duration::from_millis(self.initial_delay_ms),
                self.factor,
                Duration::from_millis(self.max_delay_ms),
            )
            .with_jitter(self.jitter),
        )
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    10
}

fn default_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    1000
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            credentials: CredentialsConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Command line settings that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub in_cluster: bool,
    pub max_attempts: Option<u32>,
}

impl ToolConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: ToolConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.is_empty() {
            anyhow::bail!("namespace cannot be empty");
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        if !(retry.factor >= 1.0 && retry.factor.is_finite()) {
            anyhow::bail!("retry.factor must be a finite number >= 1.0");
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            anyhow::bail!(
                "retry.initial_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                retry.initial_delay_ms,
                retry.max_delay_ms
            );
        }
        if !(0.0..=1.0).contains(&retry.jitter) {
            anyhow::bail!("retry.jitter must be between 0.0 and 1.0");
        }

        Ok(())
    }

    /// Apply command line overrides and re-validate
    pub fn with_overrides(mut self, overrides: Overrides) -> anyhow::Result<Self> {
        if overrides.in_cluster && overrides.kubeconfig.is_some() {
            anyhow::bail!("--kubeconfig and --in-cluster are mutually exclusive");
        }

        if let Some(namespace) = overrides.namespace {
            self.namespace = namespace;
        }
        if overrides.in_cluster {
            self.credentials = CredentialsConfig::InCluster;
        } else if let Some(path) = overrides.kubeconfig {
            self.credentials = CredentialsConfig::External {
                kubeconfig: Some(path),
            };
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.retry.max_attempts = max_attempts;
        }

        self.validate()?;
        Ok(self)
    }

    /// Resolve the credential source, filling in the default kubeconfig path
    pub fn client_source(&self) -> anyhow::Result<ClientSource> {
        match &self.credentials {
            CredentialsConfig::InCluster => Ok(ClientSource::InCluster),
            CredentialsConfig::External {
                kubeconfig: Some(path),
            } => Ok(ClientSource::External(path.clone())),
            CredentialsConfig::External { kubeconfig: None } => {
                Ok(ClientSource::default_external()?)
            }
        }
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            credentials: CredentialsConfig::External { kubeconfig: None },
            retry: RetryConfig {
                max_attempts: 8,
                ..RetryConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = ToolConfig::example();
        assert!(config.validate().is_ok());

        config.namespace = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_validation() {
        let mut config = ToolConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ToolConfig::default();
        config.retry.factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = ToolConfig::default();
        config.retry.initial_delay_ms = 5000;
        assert!(config.validate().is_err());

        let mut config = ToolConfig::default();
        config.retry.jitter = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = ToolConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.namespace, "default");
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_parse_in_cluster() {
        let yaml = "namespace: apps\ncredentials:\n  mode: in_cluster\nretry:\n  max_attempts: 8\n";
        let config = ToolConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.namespace, "apps");
        assert_eq!(config.credentials, CredentialsConfig::InCluster);
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.retry.initial_delay_ms, 10);
        assert_eq!(config.client_source().unwrap(), ClientSource::InCluster);
    }

    #[test]
    fn test_parse_external_with_path() {
        let yaml = "credentials:\n  mode: external\n  kubeconfig: /etc/kube/admin.conf\n";
        let config = ToolConfig::from_yaml(yaml).unwrap();

        assert_eq!(
            config.client_source().unwrap(),
            ClientSource::External(PathBuf::from("/etc/kube/admin.conf"))
        );
    }

    #[test]
    fn test_example_round_trips() {
        let yaml = serde_yaml::to_string(&ToolConfig::example()).unwrap();
        assert_eq!(ToolConfig::from_yaml(&yaml).unwrap(), ToolConfig::example());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = ToolConfig::default()
            .with_overrides(Overrides {
                namespace: Some("staging".to_string()),
                in_cluster: true,
                max_attempts: Some(2),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.namespace, "staging");
        assert_eq!(config.credentials, CredentialsConfig::InCluster);
        assert_eq!(config.retry.policy().max_attempts, 2);
    }

    #[test]
    fn test_overrides_reject_conflicting_credentials() {
        let result = ToolConfig::default().with_overrides(Overrides {
            kubeconfig: Some(PathBuf::from("/tmp/kubeconfig")),
            in_cluster: true,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_override_with_zero_attempts_is_invalid() {
        let result = ToolConfig::default().with_overrides(Overrides {
            max_attempts: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ToolConfig::load_or_default("/nonexistent/kubetweak.yaml").unwrap();
        assert_eq!(config, ToolConfig::default());
    }
}
