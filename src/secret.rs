use base64::Engine;
use blake2::{Blake2s256, Digest};
use imageref::RegistryHost;
use k8s_openapi::{api::core::v1::Secret, ByteString};
use kube::api::ObjectMeta;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::{cluster::Cluster, Error, Result};

pub const SECRET_NAME_PREFIX: &str = "pullsecret-";
pub const DOCKER_CONFIG_TYPE: &str = "kubernetes.io/dockerconfigjson";
pub const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Longest name which is still a valid DNS label
const MAX_NAME_LEN: usize = 63;
const HASH_SUFFIX_LEN: usize = 16;

/// Credentials of one registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub host: RegistryHost,
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Name of pull secret for registry, same for every namespace
///
/// Hosts made only of `[a-z0-9.-]` are used as is. Anything else (ports,
/// ipv6 literals, overlong hosts) gets a digest of the host appended, so two
/// hosts never share a name.
pub fn secret_name(host: &RegistryHost) -> String {
    if host.is_default() {
        return format!("{}docker", SECRET_NAME_PREFIX);
    }
    let sanitized = host
        .as_str()
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '-' | '.') => c,
            _ => '-',
        })
        .collect::<String>();
    let trimmed = sanitized.trim_matches(|c: char| c == '-' || c == '.');
    let name = format!("{}{}", SECRET_NAME_PREFIX, trimmed);
    if trimmed == host.as_str() && name.len() <= MAX_NAME_LEN {
        return name;
    }

    let hash = hex::encode(Blake2s256::digest(host.as_str().as_bytes()));
    // name is ascii, any byte index is a char boundary
    let head = &name[..name.len().min(MAX_NAME_LEN - HASH_SUFFIX_LEN - 1)];
    let head = head.trim_end_matches(|c: char| c == '-' || c == '.');
    format!("{}-{}", head, &hash[..HASH_SUFFIX_LEN])
}

/// `.dockerconfigjson` payload with single registry entry
pub fn docker_config_json(credentials: &Credentials) -> Value {
    let auth = base64::engine::general_purpose::STANDARD.encode(format!(
        "{}:{}",
        credentials.username, credentials.password
    ));
    json!({
        "auths": {
            credentials.host.server_address(): {
                "username": credentials.username,
                "password": credentials.password,
                "email": credentials.email,
                "auth": auth,
            }
        }
    })
}

pub fn build_secret(
    namespace: &str,
    credentials: &Credentials,
    field_manager: &str,
) -> Result<Secret> {
    let payload = serde_json::to_vec(&docker_config_json(credentials))?;
    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(secret_name(&credentials.host)),
            namespace: Some(namespace.to_owned()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_owned(),
                field_manager.to_owned(),
            )])),
            ..Default::default()
        },
        type_: Some(DOCKER_CONFIG_TYPE.to_owned()),
        data: Some(BTreeMap::from([(
            DOCKER_CONFIG_KEY.to_owned(),
            ByteString(payload),
        )])),
        ..Default::default()
    })
}

/// Creates or replaces pull secrets
pub struct SecretSynthesizer<'a, C: ?Sized> {
    cluster: &'a C,
    field_manager: &'a str,
}

impl<'a, C: Cluster + ?Sized> SecretSynthesizer<'a, C> {
    pub fn new(cluster: &'a C, field_manager: &'a str) -> Self {
        Self {
            cluster,
            field_manager,
        }
    }

    /// Returns name of applied secret
    pub async fn upsert(&self, namespace: &str, credentials: &Credentials) -> Result<String> {
        let secret = build_secret(namespace, credentials, self.field_manager)?;
        let name = secret_name(&credentials.host);

        log::trace!(
            "Applying pull secret {}/{} for {}",
            namespace,
            name,
            credentials.host
        );
        self.cluster
            .apply_secret(namespace, &secret, self.field_manager)
            .await
            .map_err(|source| Error::Remote {
                action: "apply secret",
                target: format!("{}/{}", namespace, name),
                source,
            })?;
        Ok(name)
    }
}
