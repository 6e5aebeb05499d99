use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use crate::{Error, Result};

pub const DEFAULT_EMAIL: &str = "noreply@pullsecrets.local";
pub const DEFAULT_IDENTITY_NAME: &str = "default";
pub const DEFAULT_FIELD_MANAGER: &str = "pullsecrets";

/// Knobs of a single reconciliation run
#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    /// Contact email written into every registry auth entry
    pub default_email: String,
    /// Service account which receives image pull secrets
    pub default_identity_name: String,
    /// Overrides namespace of the kube context
    pub default_namespace: Option<String>,
    /// Server-side apply field manager, also used as `managed-by` label
    pub field_manager: String,
    /// Whether credential lookup may consult credential helpers
    pub interactive: bool,
    /// Service account update attempts on conflict, 0 = unbounded
    pub max_conflict_retries: u32,
    /// Delay before first retry, doubled on every next conflict
    pub conflict_backoff: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            default_email: DEFAULT_EMAIL.to_owned(),
            default_identity_name: DEFAULT_IDENTITY_NAME.to_owned(),
            default_namespace: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_owned(),
            interactive: true,
            max_conflict_retries: 10,
            conflict_backoff: Duration::from_millis(50),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub image: String,
    #[serde(default)]
    pub create_pull_secret: Option<bool>,
}

impl ImageConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            create_pull_secret: None,
        }
    }

    /// Unset flag means pull secret is wanted
    pub fn creates_pull_secret(&self) -> bool {
        self.create_pull_secret.unwrap_or(true)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub name: String,
    /// Empty means active namespace
    #[serde(default)]
    pub namespace: String,
}

impl DeploymentConfig {
    pub fn namespace_or<'a>(&'a self, active: &'a str) -> &'a str {
        if self.namespace.is_empty() {
            active
        } else {
            &self.namespace
        }
    }
}

/// Project file, `pullsecrets.yaml`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub images: BTreeMap<String, ImageConfig>,
    #[serde(default)]
    pub deployments: Vec<DeploymentConfig>,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| Error::ProjectConfig {
            path: path.to_owned(),
            source,
        })
    }

    pub fn image_list(&self) -> Vec<ImageConfig> {
        self.images.values().cloned().collect()
    }
}
