//! Keeps registry pull secrets of a project in sync with the cluster.
//!
//! For every registry referenced by project images a
//! `kubernetes.io/dockerconfigjson` secret is applied into each deployment
//! namespace, and the default service account of the active namespace gets
//! those secrets added to its `imagePullSecrets`.

pub mod cluster;
pub mod config;
pub mod credentials;
mod error;
pub mod identity;
pub mod reconcile;
pub mod secret;

pub use error::{Error, Result};
pub use imageref::RegistryHost;
