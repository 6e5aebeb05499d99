use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Hosts which all mean the default public registry
const DEFAULT_REGISTRY_ALIASES: &[&str] = &["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Normalized registry hostname, empty for the default public registry
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RegistryHost(String);

impl RegistryHost {
    pub fn new(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        if DEFAULT_REGISTRY_ALIASES.contains(&host.as_str()) {
            return Self::default_registry();
        }
        Self(host)
    }

    pub fn default_registry() -> Self {
        Self(String::new())
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human readable name, used in log lines
    pub fn display_name(&self) -> &str {
        if self.is_default() {
            "hub.docker.com"
        } else {
            &self.0
        }
    }

    /// Key of this registry in docker config `auths` maps
    pub fn server_address(&self) -> &str {
        if self.is_default() {
            "https://index.docker.io/v1/"
        } else {
            &self.0
        }
    }
}

impl From<String> for RegistryHost {
    fn from(host: String) -> Self {
        Self::new(&host)
    }
}

impl From<&str> for RegistryHost {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}

impl From<RegistryHost> for String {
    fn from(host: RegistryHost) -> Self {
        host.0
    }
}

impl Display for RegistryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
