use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Reference(#[from] imageref::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse project config {path}: {source}")]
    ProjectConfig {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to parse docker config {path}: {source}")]
    DockerConfig {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("malformed auth entry for {0} in docker config")]
    MalformedAuth(String),
    #[error("credential helper {helper} failed: {message}")]
    CredentialHelper { helper: String, message: String },
    #[error("failed to get credentials for registry {host}: {source}")]
    Credentials { host: String, source: Box<Error> },
    #[error("failed to {action} {target}: {source}")]
    Remote {
        action: &'static str,
        target: String,
        source: kube::Error,
    },
    #[error("service account {target} is still conflicting after {attempts} update attempts")]
    ConflictRetriesExhausted { target: String, attempts: u32 },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, Error>;
