/// Kubernetes node operations
use k8s_openapi::api::core::v1::Node;
use tracing::info;

use super::store::ObjectStore;
use crate::error::MutateError;
use crate::mutations;
use crate::mutator::OptimisticMutator;

/// Kubernetes node management operations
pub struct NodeManager<S> {
    nodes: S,
    mutator: OptimisticMutator,
}

impl<S> NodeManager<S>
where
    S: ObjectStore<Object = Node>,
{
    pub fn new(nodes: S, mutator: OptimisticMutator) -> Self {
        Self { nodes, mutator }
    }

    /// Set a label on a node, keeping the labels it already has
    pub async fn label_node(
        &self,
        node_name: &str,
        key: &str,
        value: &str,
    ) -> Result<Node, MutateError> {
        info!("Labelling node {} with {}={}", node_name, key, value);

        let (node, previous) = self
            .mutator
            .mutate(&self.nodes, node_name, |node| {
                Ok(mutations::set_node_label(node, key, value))
            })
            .await?;

        match previous {
            Some(old) if old != value => info!(
                "✓ Node {} label {} changed from {} to {}",
                node_name, key, old, value
            ),
            _ => info!("✓ Node {} labelled {}={}", node_name, key, value),
        }

        Ok(node)
    }

    /// Delete a Kubernetes node
    pub async fn delete_node(&self, node_name: &str) -> Result<(), MutateError> {
        info!("Deleting Kubernetes node: {}", node_name);

        self.nodes.delete(node_name).await?;

        info!("Kubernetes node {} deleted successfully", node_name);

        Ok(())
    }
}
