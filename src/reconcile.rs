use imageref::RegistryHost;
use std::collections::BTreeSet;

use crate::{
    cluster::Cluster,
    config::{DeploymentConfig, ImageConfig, ReconcileConfig},
    credentials::CredentialProvider,
    identity::{IdentityOutcome, IdentityPatcher},
    secret::{Credentials, SecretSynthesizer},
    Error, Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
    pub host: RegistryHost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NoCredentials,
    NoDeployments,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skipped {
    pub host: RegistryHost,
    pub reason: SkipReason,
}

/// Result of a successful run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Namespace whose service account was reconciled
    pub namespace: String,
    pub secrets: Vec<SecretRef>,
    pub skipped: Vec<Skipped>,
    pub identity: IdentityOutcome,
}

impl ReconcileReport {
    /// Distinct secret names, in creation order
    pub fn secret_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for secret in &self.secrets {
            if !names.contains(&secret.name) {
                names.push(secret.name.clone());
            }
        }
        names
    }
}

/// Distinct registries of images which want a pull secret
pub fn registries(images: &[ImageConfig]) -> Result<BTreeSet<RegistryHost>> {
    let mut out = BTreeSet::new();
    for image in images.iter().filter(|i| i.creates_pull_secret()) {
        out.insert(imageref::resolve(&image.image)?);
    }
    Ok(out)
}

pub struct Reconciler<'a, C: ?Sized, P: ?Sized> {
    cluster: &'a C,
    provider: &'a P,
    config: &'a ReconcileConfig,
    namespace: &'a str,
}

impl<'a, C, P> Reconciler<'a, C, P>
where
    C: Cluster + ?Sized,
    P: CredentialProvider + ?Sized,
{
    /// `namespace` is the active namespace
    pub fn new(
        cluster: &'a C,
        provider: &'a P,
        config: &'a ReconcileConfig,
        namespace: &'a str,
    ) -> Self {
        Self {
            cluster,
            provider,
            config,
            namespace,
        }
    }

    async fn credentials(&self, host: &RegistryHost) -> Result<Option<Credentials>> {
        let found = self
            .provider
            .lookup(host, self.config.interactive)
            .await
            .map_err(|e| Error::Credentials {
                host: host.display_name().to_owned(),
                source: Box::new(e),
            })?;
        Ok(found
            .filter(|(username, password)| !username.is_empty() && !password.is_empty())
            .map(|(username, password)| Credentials {
                host: host.clone(),
                username,
                password,
                email: self.config.default_email.clone(),
            }))
    }

    /// Apply pull secrets for every registry, then reference them from service account.
    ///
    /// Stops at the first failure, secrets applied before it are kept.
    pub async fn reconcile_pull_secrets(
        &self,
        images: &[ImageConfig],
        deployments: &[DeploymentConfig],
    ) -> Result<ReconcileReport> {
        let synthesizer = SecretSynthesizer::new(self.cluster, &self.config.field_manager);
        let mut report = ReconcileReport {
            namespace: self.namespace.to_owned(),
            secrets: Vec::new(),
            skipped: Vec::new(),
            identity: IdentityOutcome::NotRequested,
        };

        for host in registries(images)? {
            if deployments.is_empty() {
                report.skipped.push(Skipped {
                    host,
                    reason: SkipReason::NoDeployments,
                });
                continue;
            }

            let credentials = match self.credentials(&host).await? {
                Some(credentials) => credentials,
                None => {
                    log::warn!(
                        "No credentials found for registry {}, skipping pull secret",
                        host
                    );
                    report.skipped.push(Skipped {
                        host,
                        reason: SkipReason::NoCredentials,
                    });
                    continue;
                }
            };

            log::info!("Creating image pull secret for registry: {}", host);
            let mut done = BTreeSet::new();
            for deployment in deployments {
                let namespace = deployment.namespace_or(self.namespace);
                if !done.insert(namespace) {
                    continue;
                }
                let name = synthesizer.upsert(namespace, &credentials).await?;
                report.secrets.push(SecretRef {
                    namespace: namespace.to_owned(),
                    name,
                    host: host.clone(),
                });
            }
        }

        let names = report.secret_names();
        if !names.is_empty() {
            report.identity = IdentityPatcher::new(self.cluster, self.config)
                .reconcile(self.namespace, &names)
                .await?;
        }
        Ok(report)
    }
}
