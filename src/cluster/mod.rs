#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use kube::{
    api::{Api, ObjectMeta, Patch, PatchParams, PostParams},
    Client,
};

/// Cluster operations needed for pull secret reconciliation
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<Option<ServiceAccount>>;

    /// Fails with 409 if `account` is older than stored version
    async fn replace_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> kube::Result<ServiceAccount>;

    /// Server-side apply, creating secret if it is missing
    async fn apply_secret(
        &self,
        namespace: &str,
        secret: &Secret,
        field_manager: &str,
    ) -> kube::Result<Secret>;
}

/// Write was rejected because object was changed since it was read
pub fn is_conflict(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(apierror) if apierror.code == 409)
}

fn object_name(metadata: &ObjectMeta) -> &str {
    metadata.name.as_deref().unwrap_or_default()
}

pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<Option<ServiceAccount>> {
        Api::<ServiceAccount>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
    }

    async fn replace_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> kube::Result<ServiceAccount> {
        Api::<ServiceAccount>::namespaced(self.client.clone(), namespace)
            .replace(object_name(&account.metadata), &PostParams::default(), account)
            .await
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        secret: &Secret,
        field_manager: &str,
    ) -> kube::Result<Secret> {
        Api::<Secret>::namespaced(self.client.clone(), namespace)
            .patch(
                object_name(&secret.metadata),
                &PatchParams::apply(field_manager).force(),
                &Patch::Apply(secret),
            )
            .await
    }
}

#[async_trait]
impl<C: Cluster + ?Sized> Cluster for &C {
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<Option<ServiceAccount>> {
        (**self).get_service_account(namespace, name).await
    }

    async fn replace_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> kube::Result<ServiceAccount> {
        (**self).replace_service_account(namespace, account).await
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        secret: &Secret,
        field_manager: &str,
    ) -> kube::Result<Secret> {
        (**self).apply_secret(namespace, secret, field_manager).await
    }
}

/// Reads from wrapped cluster, but only logs writes
pub struct DryRun<C> {
    inner: C,
}

impl<C> DryRun<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Cluster> Cluster for DryRun<C> {
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<Option<ServiceAccount>> {
        self.inner.get_service_account(namespace, name).await
    }

    async fn replace_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> kube::Result<ServiceAccount> {
        let secrets = account
            .image_pull_secrets
            .iter()
            .flatten()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>();
        log::info!(
            "(dry-run) would update service account {}/{} with image pull secrets {:?}",
            namespace,
            object_name(&account.metadata),
            secrets
        );
        Ok(account.clone())
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        secret: &Secret,
        field_manager: &str,
    ) -> kube::Result<Secret> {
        log::info!(
            "(dry-run) would apply secret {}/{} as {}",
            namespace,
            object_name(&secret.metadata),
            field_manager
        );
        Ok(secret.clone())
    }
}
