/// Kubetweak - one-shot Kubernetes object mutations
///
/// Scales deployments, labels nodes, pins deployments to nodes and deletes
/// nodes. Every update is a read-modify-write that retries on version
/// conflicts with other writers.
mod config;
mod error;
mod k8s;
mod mutations;
mod mutator;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Node;
use kube::Client;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Overrides, ToolConfig};
use crate::k8s::{DeploymentManager, KubeStore, NodeManager, PodManager};
use crate::mutator::OptimisticMutator;

const DEFAULT_CONFIG_FILE: &str = "kubetweak.yaml";

#[derive(Parser)]
#[command(name = "kubetweak")]
#[command(about = "Apply one-shot mutations to Kubernetes objects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path [default: kubetweak.yaml, optional]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Namespace for deployments and pods
    #[arg(short, long)]
    namespace: Option<String>,

    /// Kubeconfig file to load credentials from
    #[arg(long, conflicts_with = "in_cluster")]
    kubeconfig: Option<PathBuf>,

    /// Use the service account of the pod this runs in
    #[arg(long)]
    in_cluster: bool,

    /// Write attempts before giving up on conflicts
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Change a deployment's replica count by a signed delta (never below 1)
    Scale {
        /// Deployment name
        deployment: String,

        /// Signed delta, e.g. 2 or -1
        #[arg(allow_hyphen_values = true)]
        delta: String,
    },

    /// Set a label on a node
    LabelNode {
        /// Node name
        node: String,
        key: String,
        value: String,
    },

    /// Set a node selector on a deployment's pod template
    NodeSelector {
        /// Deployment name
        deployment: String,
        key: String,
        value: String,
    },

    /// Set a node selector on a single pod (not supported)
    PodNodeSelector {
        /// Pod name
        pod: String,
        key: String,
        value: String,
    },

    /// Delete a node
    DeleteNode {
        /// Node name
        node: String,
    },

    /// Generate example configuration file
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kubetweak={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(&cli).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    if let Commands::Init = cli.command {
        return init_config(cli).await;
    }

    let config = load_config(cli)?;

    match &cli.command {
        Commands::Scale { deployment, delta } => {
            let client = connect(&config).await?;
            let manager = DeploymentManager::new(
                KubeStore::<Deployment>::namespaced(client, &config.namespace),
                mutator(&config),
            );
            manager
                .scale_replicas(deployment, delta)
                .await
                .context("Update failed")?;
        }
        Commands::LabelNode { node, key, value } => {
            let client = connect(&config).await?;
            let manager = NodeManager::new(KubeStore::<Node>::cluster(client), mutator(&config));
            manager
                .label_node(node, key, value)
                .await
                .context("Labelling failed")?;
        }
        Commands::NodeSelector {
            deployment,
            key,
            value,
        } => {
            let client = connect(&config).await?;
            let manager = DeploymentManager::new(
                KubeStore::<Deployment>::namespaced(client, &config.namespace),
                mutator(&config),
            );
            manager
                .set_node_selector(deployment, key, value)
                .await
                .context("Update failed")?;
        }
        Commands::PodNodeSelector { pod, key, value } => {
            PodManager::set_node_selector(pod, key, value)?;
        }
        Commands::DeleteNode { node } => {
            let client = connect(&config).await?;
            let manager = NodeManager::new(KubeStore::<Node>::cluster(client), mutator(&config));
            manager.delete_node(node).await.context("Deletion failed")?;
        }
        Commands::Init => {}
    }

    Ok(())
}

/// Load the config file and apply command line overrides
fn load_config(cli: &Cli) -> Result<ToolConfig> {
    let config = match &cli.config {
        Some(path) => ToolConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ToolConfig::load_or_default(DEFAULT_CONFIG_FILE)
            .context("Failed to load configuration")?,
    };

    config.with_overrides(Overrides {
        namespace: cli.namespace.clone(),
        kubeconfig: cli.kubeconfig.clone(),
        in_cluster: cli.in_cluster,
        max_attempts: cli.max_attempts,
    })
}

async fn connect(config: &ToolConfig) -> Result<Client> {
    let source = config.client_source()?;
    let client = source
        .connect()
        .await
        .context("Failed to connect to cluster")?;
    Ok(client)
}

fn mutator(config: &ToolConfig) -> OptimisticMutator {
    OptimisticMutator::new(config.retry.policy())
}

/// Initialize example configuration file
async fn init_config(cli: &Cli) -> Result<()> {
    let path = cli
        .config
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

    if path.exists() {
        anyhow::bail!("Configuration file already exists: {}", path.display());
    }

    let example_config = ToolConfig::example();
    let yaml = serde_yaml::to_string(&example_config)?;

    tokio::fs::write(path, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", path.display());
    info!("");
    info!("Next steps:");
    info!("  1. Edit the namespace, credentials and retry settings");
    info!("  2. Run an operation, e.g.:");
    info!("     kubetweak scale my-deployment -1");

    Ok(())
}
