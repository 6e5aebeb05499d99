//! Credentials from docker cli configuration

use async_trait::async_trait;
use base64::Engine;
use imageref::RegistryHost;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
};
use subprocess::{Exec, PopenError};

use super::CredentialProvider;
use crate::{Error, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfig {
    #[serde(default)]
    auths: BTreeMap<String, AuthEntry>,
    creds_store: Option<String>,
    #[serde(default)]
    cred_helpers: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
    identitytoken: Option<String>,
}

/// Output of `docker-credential-* get`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

/// Keys under which registry may be stored in config
fn server_candidates(host: &RegistryHost) -> Vec<String> {
    if host.is_default() {
        return vec![
            host.server_address().to_owned(),
            "index.docker.io".to_owned(),
            "docker.io".to_owned(),
            "https://index.docker.io/v1".to_owned(),
        ];
    }
    vec![
        host.as_str().to_owned(),
        format!("https://{}", host.as_str()),
        format!("http://{}", host.as_str()),
    ]
}

impl AuthEntry {
    fn credentials(&self, key: &str) -> Result<Option<(String, String)>> {
        if let Some(token) = self.identitytoken.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Some(("<token>".to_owned(), token.to_owned())));
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Ok(Some((username.clone(), password.clone())));
        }
        let auth = match self.auth.as_deref() {
            Some(auth) if !auth.is_empty() => auth,
            _ => return Ok(None),
        };
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(auth.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| Error::MalformedAuth(key.to_owned()))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| Error::MalformedAuth(key.to_owned()))?;
        Ok(Some((username.to_owned(), password.to_owned())))
    }
}

fn run_helper(program: &Path, server: &str) -> Result<Option<(String, String)>> {
    log::trace!("Asking {} for {} credentials", program.display(), server);

    let helper = program.display().to_string();
    let capture = Exec::cmd(program)
        .arg("get")
        .stdin(server)
        .capture()
        .map_err(|e| Error::CredentialHelper {
            helper: helper.clone(),
            message: match e {
                PopenError::IoError(io) => format!("failed to spawn: {}", io),
                e => e.to_string(),
            },
        })?;

    if !capture.success() {
        let output = format!("{}{}", capture.stdout_str(), capture.stderr_str());
        if output.contains("credentials not found") {
            return Ok(None);
        }
        return Err(Error::CredentialHelper {
            helper,
            message: output.trim().to_owned(),
        });
    }

    let response: HelperResponse =
        serde_json::from_str(&capture.stdout_str()).map_err(|e| Error::CredentialHelper {
            helper,
            message: format!("unexpected output: {}", e),
        })?;
    Ok(Some((response.username, response.secret)))
}

/// Reads `config.json` of docker cli, optionally calling credential helpers
pub struct DockerConfigProvider {
    path: PathBuf,
    /// Where `docker-credential-*` programs live, `PATH` lookup if unset
    helper_dir: Option<PathBuf>,
}

impl DockerConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            helper_dir: None,
        }
    }

    pub fn with_helper_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.helper_dir = Some(dir.into());
        self
    }

    fn helper_program(&self, helper: &str) -> PathBuf {
        let program = format!("docker-credential-{}", helper);
        match &self.helper_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }

    /// `$DOCKER_CONFIG/config.json`, falling back to `~/.docker/config.json`
    pub fn from_env() -> Self {
        let dir = env::var_os("DOCKER_CONFIG")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".docker")))
            .unwrap_or_else(|| PathBuf::from(".docker"));
        Self::new(dir.join("config.json"))
    }

    fn load(&self) -> Result<Option<DockerConfig>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| Error::DockerConfig {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl CredentialProvider for DockerConfigProvider {
    async fn lookup(
        &self,
        host: &RegistryHost,
        interactive: bool,
    ) -> Result<Option<(String, String)>> {
        let config = match self.load()? {
            Some(config) => config,
            None => {
                log::trace!("No docker config at {}", self.path.display());
                return Ok(None);
            }
        };
        let candidates = server_candidates(host);

        if interactive {
            for server in &candidates {
                if let Some(helper) = config.cred_helpers.get(server) {
                    return run_helper(&self.helper_program(helper), server);
                }
            }
            if let Some(store) = config.creds_store.as_deref().filter(|s| !s.is_empty()) {
                let program = self.helper_program(store);
                if let Some(found) = run_helper(&program, host.server_address())? {
                    return Ok(Some(found));
                }
            }
        }

        for server in &candidates {
            if let Some(entry) = config.auths.get(server) {
                if let Some(found) = entry.credentials(server)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }
}
