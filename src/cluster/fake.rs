//! In-memory cluster with resource version checks

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{LocalObjectReference, Secret, ServiceAccount};
use kube::{api::ObjectMeta, core::ErrorResponse};

use super::Cluster;

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_owned(),
        message: format!("{} (fake)", reason),
        reason: reason.to_owned(),
        code,
    })
}

type Key = (String, String);

#[derive(Default)]
pub struct FakeCluster {
    accounts: Mutex<BTreeMap<Key, ServiceAccount>>,
    secrets: Mutex<BTreeMap<Key, Secret>>,
    /// Number of next replace calls which race with another writer
    interfering_writes: AtomicU32,
    /// Error code returned by every next replace call
    replace_failure: Mutex<Option<u16>>,
    /// Error code returned by apply of secrets in given namespace
    apply_failures: Mutex<BTreeMap<String, u16>>,
    replace_calls: AtomicU32,
    applied: Mutex<Vec<Key>>,
}

impl FakeCluster {
    pub fn with_account(self, namespace: &str, name: &str, secrets: &[&str]) -> Self {
        let account = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                resource_version: Some("1".to_owned()),
                ..Default::default()
            },
            image_pull_secrets: if secrets.is_empty() {
                None
            } else {
                Some(
                    secrets
                        .iter()
                        .map(|s| LocalObjectReference {
                            name: (*s).to_owned(),
                        })
                        .collect(),
                )
            },
            ..Default::default()
        };
        self.accounts
            .lock()
            .unwrap()
            .insert((namespace.to_owned(), name.to_owned()), account);
        self
    }

    pub fn interfere(&self, writes: u32) {
        self.interfering_writes.store(writes, Ordering::SeqCst);
    }

    pub fn fail_replace(&self, code: u16) {
        *self.replace_failure.lock().unwrap() = Some(code);
    }

    pub fn fail_apply_in(&self, namespace: &str, code: u16) {
        self.apply_failures
            .lock()
            .unwrap()
            .insert(namespace.to_owned(), code);
    }

    pub fn replace_calls(&self) -> u32 {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// (namespace, name) of every apply call, in call order
    pub fn applied(&self) -> Vec<Key> {
        self.applied.lock().unwrap().clone()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
    }

    pub fn secret_count(&self) -> usize {
        self.secrets.lock().unwrap().len()
    }

    pub fn pull_secrets(&self, namespace: &str, name: &str) -> Vec<String> {
        self.accounts
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .and_then(|a| a.image_pull_secrets.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.name)
            .collect()
    }
}

fn bump_version(meta: &mut ObjectMeta) {
    let version = meta
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    meta.resource_version = Some((version + 1).to_string());
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<Option<ServiceAccount>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned())
    }

    async fn replace_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> kube::Result<ServiceAccount> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = *self.replace_failure.lock().unwrap() {
            return Err(api_error(code, "Forbidden"));
        }

        let name = account.metadata.name.clone().unwrap_or_default();
        let mut accounts = self.accounts.lock().unwrap();
        let stored = accounts
            .get_mut(&(namespace.to_owned(), name.clone()))
            .ok_or_else(|| api_error(404, "NotFound"))?;

        let pending = self.interfering_writes.load(Ordering::SeqCst);
        if pending > 0 {
            self.interfering_writes.store(pending - 1, Ordering::SeqCst);
            stored
                .image_pull_secrets
                .get_or_insert_with(Vec::new)
                .push(LocalObjectReference {
                    name: format!("other-writer-{}", pending),
                });
            bump_version(&mut stored.metadata);
        }

        if stored.metadata.resource_version != account.metadata.resource_version {
            return Err(api_error(409, "Conflict"));
        }
        let mut updated = account.clone();
        bump_version(&mut updated.metadata);
        *stored = updated.clone();
        Ok(updated)
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        secret: &Secret,
        _field_manager: &str,
    ) -> kube::Result<Secret> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.applied
            .lock()
            .unwrap()
            .push((namespace.to_owned(), name.clone()));
        if let Some(code) = self.apply_failures.lock().unwrap().get(namespace) {
            return Err(api_error(*code, "Forbidden"));
        }
        let mut stored = secret.clone();
        stored.metadata.namespace = Some(namespace.to_owned());
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_owned(), name), stored.clone());
        Ok(stored)
    }
}
