mod docker;

use async_trait::async_trait;
use imageref::RegistryHost;
#[cfg(test)]
use mockall::automock;
use std::collections::BTreeMap;

use crate::Result;

pub use docker::DockerConfigProvider;

/// Source of registry credentials
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// `None` when nothing usable is known for this registry.
    /// Interactive lookups may ask a human, e.g. through a credential helper.
    async fn lookup(
        &self,
        host: &RegistryHost,
        interactive: bool,
    ) -> Result<Option<(String, String)>>;
}

/// Fixed set of credentials
#[derive(Clone, Debug, Default)]
pub struct StaticProvider {
    credentials: BTreeMap<RegistryHost, (String, String)>,
}

impl StaticProvider {
    pub fn with(mut self, host: &str, username: &str, password: &str) -> Self {
        self.credentials.insert(
            RegistryHost::new(host),
            (username.to_owned(), password.to_owned()),
        );
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticProvider {
    async fn lookup(
        &self,
        host: &RegistryHost,
        _interactive: bool,
    ) -> Result<Option<(String, String)>> {
        Ok(self.credentials.get(host).cloned())
    }
}
