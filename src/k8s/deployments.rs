/// Deployment operations: replica scaling and pod template node selectors
use k8s_openapi::api::apps::v1::Deployment;
use tracing::info;

use super::store::ObjectStore;
use crate::error::MutateError;
use crate::mutations::{self, ReplicaChange};
use crate::mutator::OptimisticMutator;

/// Deployment management within one namespace
pub struct DeploymentManager<S> {
    deployments: S,
    mutator: OptimisticMutator,
}

impl<S> DeploymentManager<S>
where
    S: ObjectStore<Object = Deployment>,
{
    pub fn new(deployments: S, mutator: OptimisticMutator) -> Self {
        Self {
            deployments,
            mutator,
        }
    }

    /// Change the replica count of a deployment by a signed delta
    ///
    /// `delta` is parsed before anything is read, so malformed input never
    /// reaches the cluster. The resulting count is never below one.
    pub async fn scale_replicas(
        &self,
        name: &str,
        delta: &str,
    ) -> Result<ReplicaChange, MutateError> {
        let delta = mutations::parse_delta(delta)?;

        info!("Updating replica count of {} by {}", name, delta);

        let (_, change) = self
            .mutator
            .mutate(&self.deployments, name, |deployment| {
                mutations::apply_replica_delta(deployment, name, delta)
            })
            .await?;

        info!(
            "✓ Updated replica count of Deployment {} from {} to {}",
            name, change.from, change.to
        );

        Ok(change)
    }

    /// Constrain every replica of a deployment to nodes matching `key=value`
    pub async fn set_node_selector(
        &self,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<Deployment, MutateError> {
        info!(
            "Setting node selector {}={} on Deployment {} pod template",
            key, value, name
        );

        let (deployment, _) = self
            .mutator
            .mutate(&self.deployments, name, |deployment| {
                mutations::set_template_node_selector(deployment, name, key, value)
            })
            .await?;

        info!(
            "✓ Deployment {} now schedules pods onto nodes with {}={}",
            name, key, value
        );

        Ok(deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::store::fake::FakeStore;
    use crate::mutator::RetryPolicy;
    use k8s_openapi::api::apps::v1::DeploymentSpec;

    fn deployment(replicas: i32) -> Deployment {
        let mut d = Deployment {
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            ..Default::default()
        };
        d.metadata.name = Some("web".to_string());
        d.metadata.namespace = Some("default".to_string());
        d
    }

    fn manager(store: FakeStore<Deployment>) -> DeploymentManager<FakeStore<Deployment>> {
        DeploymentManager::new(store, OptimisticMutator::new(RetryPolicy::immediate(5)))
    }

    fn stored_replicas(manager: &DeploymentManager<FakeStore<Deployment>>) -> Option<i32> {
        manager
            .deployments
            .object()
            .and_then(|d| d.spec)
            .and_then(|s| s.replicas)
    }

    #[tokio::test]
    async fn test_scale_down_by_one() {
        let deployments = manager(FakeStore::new("Deployment", Some(deployment(3))));

        let change = deployments.scale_replicas("web", "-1").await.unwrap();

        assert_eq!(change, ReplicaChange { from: 3, to: 2 });
        assert_eq!(stored_replicas(&deployments), Some(2));
    }

    #[tokio::test]
    async fn test_scale_never_reaches_zero() {
        let deployments = manager(FakeStore::new("Deployment", Some(deployment(1))));

        let change = deployments.scale_replicas("web", "-5").await.unwrap();

        assert_eq!(change.to, 1);
        assert_eq!(stored_replicas(&deployments), Some(1));
    }

    #[tokio::test]
    async fn test_scale_up_after_conflict() {
        let store = FakeStore::new("Deployment", Some(deployment(2))).with_conflicts(1);
        let deployments = manager(store);

        let change = deployments.scale_replicas("web", "+3").await.unwrap();

        assert_eq!(change, ReplicaChange { from: 2, to: 5 });
        assert_eq!(deployments.deployments.gets(), 2);
    }

    #[tokio::test]
    async fn test_scale_reports_change_from_last_read() {
        let deployments = manager(FakeStore::new("Deployment", Some(deployment(4))));
        deployments.scale_replicas("web", "+2").await.unwrap();

        let change = deployments.scale_replicas("web", "-1").await.unwrap();

        assert_eq!(change, ReplicaChange { from: 6, to: 5 });
        assert_eq!(stored_replicas(&deployments), Some(5));
    }

    #[tokio::test]
    async fn test_malformed_delta_never_reads() {
        let deployments = manager(FakeStore::new("Deployment", Some(deployment(3))));

        let err = deployments.scale_replicas("web", "two").await.unwrap_err();

        assert!(matches!(err, MutateError::MalformedInput { .. }));
        assert_eq!(deployments.deployments.gets(), 0);
        assert_eq!(stored_replicas(&deployments), Some(3));
    }

    #[tokio::test]
    async fn test_scale_missing_deployment() {
        let deployments = manager(FakeStore::new("Deployment", None));

        let err = deployments.scale_replicas("web", "1").await.unwrap_err();

        assert!(matches!(err, MutateError::NotFound { .. }));
        assert_eq!(deployments.deployments.replaces(), 0);
    }

    #[tokio::test]
    async fn test_scale_gives_up_under_constant_contention() {
        let store = FakeStore::new("Deployment", Some(deployment(3))).with_conflicts(u32::MAX);
        let deployments = DeploymentManager::new(
            store,
            OptimisticMutator::new(RetryPolicy::immediate(3)),
        );

        let err = deployments.scale_replicas("web", "1").await.unwrap_err();

        assert!(matches!(err, MutateError::ExhaustedRetries { attempts: 3, .. }));
        assert_eq!(deployments.deployments.replaces(), 3);
        assert_eq!(stored_replicas(&deployments), Some(3));
    }

    #[tokio::test]
    async fn test_set_node_selector() {
        let deployments = manager(FakeStore::new("Deployment", Some(deployment(2))));

        let updated = deployments
            .set_node_selector("web", "disk", "ssd")
            .await
            .unwrap();

        let selector = updated
            .spec
            .and_then(|s| s.template.spec)
            .and_then(|p| p.node_selector)
            .unwrap();
        assert_eq!(selector.get("disk").map(String::as_str), Some("ssd"));
        // replicas untouched
        assert_eq!(stored_replicas(&deployments), Some(2));
    }

    #[tokio::test]
    async fn test_set_node_selector_without_spec() {
        let deployments = manager(FakeStore::new("Deployment", Some(Deployment::default())));

        let err = deployments
            .set_node_selector("web", "disk", "ssd")
            .await
            .unwrap_err();

        assert!(matches!(err, MutateError::MissingField { field: "spec", .. }));
        assert_eq!(deployments.deployments.replaces(), 0);
    }
}
