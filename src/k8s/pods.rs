/// Pod operations
use tracing::warn;

use crate::error::MutateError;

/// Pod-level operations
pub struct PodManager;

impl PodManager {
    /// Per-pod node selectors are not supported
    ///
    /// A running pod's scheduling constraints cannot be changed in place, and
    /// pinning one replica of a deployment drifts from its template. Use
    /// [`crate::k8s::DeploymentManager::set_node_selector`] instead. Nothing is
    /// sent to the cluster.
    pub fn set_node_selector(pod_name: &str, key: &str, value: &str) -> Result<(), MutateError> {
        warn!(
            "Refusing to set node selector {}={} on pod {}",
            key, value, pod_name
        );
        Err(MutateError::Unsupported(format!(
            "node selector on pod {}; set it on the owning deployment's pod template \
             with `node-selector <deployment> {} {}`",
            pod_name, key, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_node_selector_is_unsupported() {
        let err = PodManager::set_node_selector("web-7d9f", "disk", "ssd").unwrap_err();

        assert!(matches!(err, MutateError::Unsupported(_)));
        assert!(err.to_string().contains("node-selector <deployment> disk ssd"));
    }
}
