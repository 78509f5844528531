/// Kubernetes client construction
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::MutateError;

/// Where cluster credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSource {
    /// A kubeconfig file on disk
    External(PathBuf),
    /// The service account mounted into the running pod
    InCluster,
}

impl ClientSource {
    /// External source using the kubeconfig under the user's home directory
    pub fn default_external() -> Result<Self, MutateError> {
        default_kubeconfig_path(std::env::var_os("HOME"))
            .map(ClientSource::External)
            .ok_or_else(|| {
                MutateError::Transport(
                    "HOME is not set; pass --kubeconfig or use --in-cluster".to_string(),
                )
            })
    }

    /// Build a Kubernetes client from this source
    pub async fn connect(&self) -> Result<Client, MutateError> {
        let config = match self {
            ClientSource::External(path) => {
                info!("Loading kubeconfig from {}", path.display());
                load_kubeconfig(path).await?
            }
            ClientSource::InCluster => {
                info!("Using in-cluster service account credentials");
                Config::incluster().map_err(|e| {
                    MutateError::Transport(format!("in-cluster configuration unavailable: {}", e))
                })?
            }
        };

        debug!("Cluster API endpoint: {}", config.cluster_url);

        Client::try_from(config).map_err(|e| MutateError::Transport(e.to_string()))
    }
}

/// `$HOME/.kube/config`, if a home directory is known
pub fn default_kubeconfig_path(home: Option<OsString>) -> Option<PathBuf> {
    home.filter(|h| !h.is_empty())
        .map(|h| PathBuf::from(h).join(".kube").join("config"))
}

async fn load_kubeconfig(path: &Path) -> Result<Config, MutateError> {
    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        MutateError::Transport(format!(
            "failed to read kubeconfig {}: {}",
            path.display(),
            e
        ))
    })?;

    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| {
            MutateError::Transport(format!(
                "invalid kubeconfig {}: {}",
                path.display(),
                e
            ))
        })
}
