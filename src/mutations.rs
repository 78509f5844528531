/// Pure object transforms applied inside the optimistic retry loop
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, PodSpec};
use std::collections::BTreeMap;

use crate::error::MutateError;

/// Replica count Kubernetes assumes when `spec.replicas` is unset
pub const DEFAULT_REPLICAS: i32 = 1;

/// Lowest replica count a delta may bring a deployment down to
pub const MIN_REPLICAS: i32 = 1;

/// Parse a signed replica delta such as "3", "+2" or "-1"
pub fn parse_delta(input: &str) -> Result<i32, MutateError> {
    input
        .parse::<i32>()
        .map_err(|e| MutateError::MalformedInput {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

/// New replica count for `current + delta`, never below [`MIN_REPLICAS`]
pub fn scaled_replicas(current: i32, delta: i32) -> i32 {
    current.saturating_add(delta).max(MIN_REPLICAS)
}

/// Replica count before and after a scale operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaChange {
    pub from: i32,
    pub to: i32,
}

/// Apply a replica delta to a deployment in place
pub fn apply_replica_delta(
    deployment: &mut Deployment,
    name: &str,
    delta: i32,
) -> Result<ReplicaChange, MutateError> {
    let spec = deployment
        .spec
        .as_mut()
        .ok_or_else(|| MutateError::MissingField {
            kind: "Deployment".to_string(),
            name: name.to_string(),
            field: "spec",
        })?;

    let from = spec.replicas.unwrap_or(DEFAULT_REPLICAS);
    let to = scaled_replicas(from, delta);
    spec.replicas = Some(to);

    Ok(ReplicaChange { from, to })
}

/// Insert one entry into an optional string map, creating it if absent
pub fn insert_entry(
    map: &mut Option<BTreeMap<String, String>>,
    key: &str,
    value: &str,
) -> Option<String> {
    map.get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string())
}

/// Set a label on a node, keeping its other labels
pub fn set_node_label(node: &mut Node, key: &str, value: &str) -> Option<String> {
    insert_entry(&mut node.metadata.labels, key, value)
}

/// Set a node-selector entry on a deployment's pod template
///
/// Every replica created from the template inherits the selector.
pub fn set_template_node_selector(
    deployment: &mut Deployment,
    name: &str,
    key: &str,
    value: &str,
) -> Result<Option<String>, MutateError> {
    let spec = deployment
        .spec
        .as_mut()
        .ok_or_else(|| MutateError::MissingField {
            kind: "Deployment".to_string(),
            name: name.to_string(),
            field: "spec",
        })?;

    let pod_spec = spec.template.spec.get_or_insert_with(PodSpec::default);
    Ok(insert_entry(&mut pod_spec.node_selector, key, value))
}
