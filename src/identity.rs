use k8s_openapi::api::core::v1::{LocalObjectReference, ServiceAccount};
use std::time::Duration;

use crate::{
    cluster::{is_conflict, Cluster},
    config::ReconcileConfig,
    Error, Result,
};

const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// What happened to the service account
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityOutcome {
    /// No pull secrets were produced, service account was not touched
    NotRequested,
    /// Service account does not exist
    NotFound,
    /// Every secret was already referenced
    Unchanged,
    Updated { added: Vec<String>, attempts: u32 },
}

/// Desired names not yet referenced by account, in desired order
pub fn missing_references(account: &ServiceAccount, desired: &[String]) -> Vec<String> {
    let existing = account.image_pull_secrets.as_deref().unwrap_or_default();
    let mut missing: Vec<String> = Vec::new();
    for name in desired {
        if existing.iter().any(|r| &r.name == name) || missing.contains(name) {
            continue;
        }
        missing.push(name.clone());
    }
    missing
}

/// Adds image pull secrets to a service account
pub struct IdentityPatcher<'a, C: ?Sized> {
    cluster: &'a C,
    config: &'a ReconcileConfig,
}

impl<'a, C: Cluster + ?Sized> IdentityPatcher<'a, C> {
    pub fn new(cluster: &'a C, config: &'a ReconcileConfig) -> Self {
        Self { cluster, config }
    }

    /// Fetch, diff and write until write succeeds without conflict
    pub async fn reconcile(&self, namespace: &str, desired: &[String]) -> Result<IdentityOutcome> {
        let name = self.config.default_identity_name.as_str();
        let target = format!("{}/{}", namespace, name);
        let max_attempts = self.config.max_conflict_retries;
        let mut delay = self.config.conflict_backoff.min(MAX_BACKOFF);
        let mut attempts = 0;

        loop {
            let account = self
                .cluster
                .get_service_account(namespace, name)
                .await
                .map_err(|source| Error::Remote {
                    action: "get service account",
                    target: target.clone(),
                    source,
                })?;
            let Some(mut account) = account else {
                log::warn!(
                    "Couldn't find service account {}, image pull secrets were not added",
                    target
                );
                return Ok(IdentityOutcome::NotFound);
            };

            let missing = missing_references(&account, desired);
            if missing.is_empty() {
                log::trace!("Service account {} already has all pull secrets", target);
                return Ok(IdentityOutcome::Unchanged);
            }
            account
                .image_pull_secrets
                .get_or_insert_with(Vec::new)
                .extend(missing.iter().map(|name| LocalObjectReference {
                    name: name.clone(),
                }));

            attempts += 1;
            match self.cluster.replace_service_account(namespace, &account).await {
                Ok(_) => {
                    log::info!(
                        "Added image pull secrets {:?} to service account {}",
                        missing,
                        target
                    );
                    return Ok(IdentityOutcome::Updated {
                        added: missing,
                        attempts,
                    });
                }
                Err(e) if is_conflict(&e) => {
                    if max_attempts > 0 && attempts >= max_attempts {
                        return Err(Error::ConflictRetriesExhausted { target, attempts });
                    }
                    log::info!("Reapplying image pull secrets to service account {}", target);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
                Err(source) => {
                    return Err(Error::Remote {
                        action: "update service account",
                        target,
                        source,
                    })
                }
            }
        }
    }
}
