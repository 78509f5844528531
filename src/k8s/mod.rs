/// Kubernetes cluster operations
pub mod client;
pub mod deployments;
pub mod nodes;
pub mod pods;
pub mod store;

pub use client::ClientSource;
pub use deployments::DeploymentManager;
pub use nodes::NodeManager;
pub use pods::PodManager;
pub use store::KubeStore;
