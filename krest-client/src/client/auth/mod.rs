//! Credential resolution from the loaded [`AuthInfo`].
//!
//! The kubeconfig can say who you are in several ways; they resolve in a
//! fixed priority order into an [`Auth`] value: basic auth, an inline
//! bearer token, a token file (re-read as it ages), or an exec plugin.
//! Client certificates are not handled here at all; they ride on the TLS
//! handshake and produce no header.
use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
};

use chrono::{DateTime, TimeDelta, Utc};
use http::{header::InvalidHeaderValue, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::config::{AuthInfo, ExecAuthCluster, ExecConfig, ExecInteractiveMode};

#[cfg(target_os = "windows")] use std::os::windows::process::CommandExt;

#[derive(Error, Debug)]
/// Client auth errors
pub enum Error {
    /// Invalid basic auth
    #[error("invalid basic auth: {0}")]
    InvalidBasicAuth(#[source] InvalidHeaderValue),

    /// Invalid bearer token
    #[error("invalid bearer token: {0}")]
    InvalidBearerToken(#[source] InvalidHeaderValue),

    /// Tried to refresh a token and got a non-refreshable token response
    #[error("tried to refresh a token and got a non-refreshable token response")]
    UnrefreshableTokenResponse,

    /// Exec plugin response did not contain a status
    #[error("exec-plugin response did not contain a status")]
    ExecPluginFailed,

    /// Malformed token expiration date
    #[error("malformed token expiration date: {0}")]
    MalformedTokenExpirationDate(#[source] chrono::ParseError),

    /// Failed to start auth exec
    #[error("unable to run auth exec: {0}")]
    AuthExecStart(#[source] std::io::Error),

    /// Failed to run auth exec command
    #[error("auth exec command '{cmd}' failed with status {status}: {out:?}")]
    AuthExecRun {
        /// The failed command
        cmd: String,
        /// The exit status of the failed command
        status: std::process::ExitStatus,
        /// Stdout/Stderr of the failed command
        out: std::process::Output,
    },

    /// Failed to parse auth exec output
    #[error("failed to parse auth exec output: {0}")]
    AuthExecParse(#[source] serde_json::Error),

    /// Failed to serialize exec info
    #[error("failed to serialize exec info: {0}")]
    AuthExecSerialize(#[source] serde_json::Error),

    /// Command was missing from exec config
    #[error("command must be specified to use exec authentication plugin")]
    MissingCommand,

    /// Cluster spec missing while `provideClusterInfo` is true
    #[error("cluster spec must be populated when `provideClusterInfo` is true")]
    ExecMissingClusterInfo,

    /// Failed to read a token file
    #[error("failed to read token file '{1:?}': {0}")]
    ReadTokenFile(#[source] std::io::Error, PathBuf),

    /// Cloud auth-provider plugins are not supported
    #[error("auth-provider {0:?} is not supported")]
    UnsupportedAuthProvider(String),
}

// How early before its deadline a credential counts as expiring, and how
// long a re-read token file stays cached.
const EXPIRY_SLACK: TimeDelta = delta_seconds(10);
const RELOAD_INTERVAL: TimeDelta = delta_seconds(60);

// TimeDelta's const constructors are fallible; 10s and 60s are not edge cases.
const fn delta_seconds(secs: i64) -> TimeDelta {
    match TimeDelta::try_seconds(secs) {
        Some(delta) => delta,
        None => panic!(),
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Auth {
    None,
    Basic(String, SecretString),
    Bearer(SecretString),
    RefreshableToken(RefreshableToken),
    // An exec plugin handed back a client identity; TLS carries it, no header
    Certificate(String, SecretString),
}

/// A bearer token read from a file, re-read at least once a minute.
#[derive(Debug)]
pub struct TokenFile {
    path: PathBuf,
    token: SecretString,
    reload_at: DateTime<Utc>,
}

impl TokenFile {
    fn open<P: AsRef<Path>>(path: P) -> Result<TokenFile, Error> {
        let token = std::fs::read_to_string(&path)
            .map_err(|e| Error::ReadTokenFile(e, path.as_ref().to_owned()))?;
        Ok(Self {
            path: path.as_ref().to_owned(),
            token: SecretString::new(token),
            reload_at: Utc::now() + RELOAD_INTERVAL,
        })
    }

    fn is_stale(&self) -> bool {
        Utc::now() + EXPIRY_SLACK > self.reload_at
    }

    /// The cached token, or `None` once it has gone stale.
    fn cached(&self) -> Option<&str> {
        if self.is_stale() {
            return None;
        }
        Some(self.token.expose_secret())
    }

    /// The current token, re-reading the file when the cache is stale.
    ///
    /// A failed re-read keeps the previous token: deployments commonly
    /// provide the file at startup and delete it afterwards to limit
    /// credential exposure (kubernetes#68164).
    fn refresh(&mut self) -> &str {
        if self.is_stale() {
            if let Ok(token) = std::fs::read_to_string(&self.path) {
                self.token = SecretString::new(token);
            }
            self.reload_at = Utc::now() + RELOAD_INTERVAL;
        }
        self.token.expose_secret()
    }
}

/// A bearer credential that must be re-resolved as it nears expiry.
///
/// `pub` only for the refresh middleware's sake; not exported from the crate.
#[derive(Debug, Clone)]
pub enum RefreshableToken {
    /// Exec plugin output with its expiry and the config to re-run it
    Exec(Arc<Mutex<(SecretString, DateTime<Utc>, AuthInfo)>>),
    /// A token file reference
    File(Arc<RwLock<TokenFile>>),
}

impl RefreshableToken {
    pub(crate) async fn to_header(&self) -> Result<HeaderValue, Error> {
        match self {
            RefreshableToken::Exec(state) => {
                let mut state = state.lock().await;
                // refresh ahead of the deadline so the token cannot lapse
                // between here and the server
                if Utc::now() + RELOAD_INTERVAL >= state.1 {
                    let rerun = Auth::try_from(&state.2)?;
                    let Auth::RefreshableToken(RefreshableToken::Exec(next)) = rerun else {
                        // the plugin switched credential shapes on us
                        return Err(Error::UnrefreshableTokenResponse);
                    };
                    *state = next.lock().await.clone();
                }
                bearer_header(state.0.expose_secret())
            }

            RefreshableToken::File(file) => {
                if let Some(header) = file.read().await.cached().map(bearer_header) {
                    return header;
                }
                // the read guard is gone; take the write lock and re-read
                bearer_header(file.write().await.refresh())
            }
        }
    }
}

fn bearer_header(token: &str) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::try_from(format!("Bearer {token}")).map_err(Error::InvalidBearerToken)?;
    value.set_sensitive(true);
    Ok(value)
}

impl TryFrom<&AuthInfo> for Auth {
    type Error = Error;

    /// Resolve the highest-priority credential the kubeconfig user carries.
    fn try_from(auth_info: &AuthInfo) -> Result<Self, Self::Error> {
        if let Some(provider) = &auth_info.auth_provider {
            return Err(Error::UnsupportedAuthProvider(provider.name.clone()));
        }

        if let (Some(user), Some(pass)) = (&auth_info.username, &auth_info.password) {
            return Ok(Self::Basic(user.clone(), pass.clone()));
        }

        if let Some(token) = &auth_info.token {
            return Ok(Self::Bearer(token.clone()));
        }

        if let Some(path) = &auth_info.token_file {
            let file = TokenFile::open(path)?;
            return Ok(Self::RefreshableToken(RefreshableToken::File(Arc::new(
                RwLock::new(file),
            ))));
        }

        let Some(exec) = &auth_info.exec else {
            return Ok(Self::None);
        };
        let status = run_exec_plugin(exec)?.status.ok_or(Error::ExecPluginFailed)?;

        if let (Some(cert), Some(key)) = (status.client_certificate_data, status.client_key_data) {
            return Ok(Self::Certificate(cert, SecretString::new(key)));
        }
        let Some(token) = status.token.map(SecretString::new) else {
            return Ok(Self::None);
        };
        match status.expiration_timestamp {
            Some(raw) => {
                let expiry = raw.parse().map_err(Error::MalformedTokenExpirationDate)?;
                Ok(Self::RefreshableToken(RefreshableToken::Exec(Arc::new(
                    Mutex::new((token, expiry, auth_info.clone())),
                ))))
            }
            None => Ok(Self::Bearer(token)),
        }
    }
}

/// The document an exec plugin reads on stdin-adjacent env and answers on stdout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecCredential {
    /// TypeMeta kind
    pub kind: Option<String>,
    /// TypeMeta apiVersion
    #[serde(rename = "apiVersion")]
    pub api_version: Option<String>,
    /// Request-time information passed to the plugin
    pub spec: Option<ExecCredentialSpec>,
    /// The credential the plugin produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecCredentialStatus>,
}

/// Request-side half of an [`ExecCredential`].
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ExecCredentialSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    interactive: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    cluster: Option<ExecAuthCluster>,
}

/// Credential half of an [`ExecCredential`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecCredentialStatus {
    /// Expiry of the token below
    #[serde(rename = "expirationTimestamp")]
    pub expiration_timestamp: Option<String>,
    /// A bearer token
    pub token: Option<String>,
    /// PEM client certificate data
    #[serde(rename = "clientCertificateData")]
    pub client_certificate_data: Option<String>,
    /// PEM client key data
    #[serde(rename = "clientKeyData")]
    pub client_key_data: Option<String>,
}

fn run_exec_plugin(config: &ExecConfig) -> Result<ExecCredential, Error> {
    let program = config.command.as_deref().ok_or(Error::MissingCommand)?;
    let mut cmd = Command::new(program);
    cmd.args(config.args.iter().flatten());

    for pair in config.env.iter().flatten() {
        if let (Some(name), Some(value)) = (pair.get("name"), pair.get("value")) {
            cmd.env(name, value);
        }
    }
    for var in config.drop_env.iter().flatten() {
        cmd.env_remove(var);
    }

    let interactive = config.interactive_mode != Some(ExecInteractiveMode::Never);
    cmd.stdin(if interactive { Stdio::inherit() } else { Stdio::piped() });

    let cluster = config
        .provide_cluster_info
        .then(|| config.cluster.clone().ok_or(Error::ExecMissingClusterInfo))
        .transpose()?;
    let input = ExecCredential {
        kind: Some("ExecCredential".into()),
        api_version: config.api_version.clone(),
        spec: Some(ExecCredentialSpec {
            interactive: Some(interactive),
            cluster,
        }),
        status: None,
    };
    cmd.env(
        "KUBERNETES_EXEC_INFO",
        serde_json::to_string(&input).map_err(Error::AuthExecSerialize)?,
    );

    #[cfg(target_os = "windows")]
    {
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let out = cmd.output().map_err(Error::AuthExecStart)?;
    if !out.status.success() {
        return Err(Error::AuthExecRun {
            cmd: program.to_string(),
            status: out.status,
            out,
        });
    }
    serde_json::from_slice(&out.stdout).map_err(Error::AuthExecParse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_has_priority_over_token() {
        let info = AuthInfo {
            username: Some("u".into()),
            password: Some(SecretString::new("p".into())),
            token: Some(SecretString::new("t".into())),
            ..Default::default()
        };
        assert!(matches!(Auth::try_from(&info).unwrap(), Auth::Basic(..)));
    }

    #[test]
    fn inline_token_resolves_to_bearer() {
        let info = AuthInfo {
            token: Some(SecretString::new("t".into())),
            ..Default::default()
        };
        match Auth::try_from(&info).unwrap() {
            Auth::Bearer(token) => assert_eq!(token.expose_secret(), "t"),
            other => panic!("unexpected auth {other:?}"),
        }
    }

    #[test]
    fn token_file_resolves_to_refreshable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "file-token").unwrap();
        let info = AuthInfo {
            token_file: Some(file.path().to_str().unwrap().into()),
            ..Default::default()
        };
        match Auth::try_from(&info).unwrap() {
            Auth::RefreshableToken(RefreshableToken::File(tf)) => {
                let token = tf.try_read().unwrap().cached().unwrap().to_string();
                assert_eq!(token, "file-token");
            }
            other => panic!("unexpected auth {other:?}"),
        }
    }

    #[test]
    fn no_credentials_resolves_to_none() {
        assert!(matches!(Auth::try_from(&AuthInfo::default()).unwrap(), Auth::None));
    }

    #[test]
    fn auth_provider_is_rejected() {
        let info = AuthInfo {
            auth_provider: Some(crate::config::AuthProviderConfig {
                name: "gcp".into(),
                config: Default::default(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            Auth::try_from(&info).unwrap_err(),
            Error::UnsupportedAuthProvider(name) if name == "gcp"
        ));
    }

    #[tokio::test]
    async fn exec_auth_command() {
        let expiry = (Utc::now() + RELOAD_INTERVAL).to_rfc3339();
        // Use a plain `echo` of a pre-baked credential as the plugin
        let credential = serde_json::json!({
            "apiVersion": "client.authentication.k8s.io/v1beta1",
            "kind": "ExecCredential",
            "status": { "token": "exec-token", "expirationTimestamp": expiry }
        });
        let info = AuthInfo {
            exec: Some(ExecConfig {
                api_version: Some("client.authentication.k8s.io/v1beta1".into()),
                command: Some("echo".into()),
                args: Some(vec![credential.to_string()]),
                env: None,
                drop_env: None,
                interactive_mode: Some(ExecInteractiveMode::Never),
                provide_cluster_info: false,
                cluster: None,
            }),
            ..Default::default()
        };
        match Auth::try_from(&info).unwrap() {
            Auth::RefreshableToken(refreshable) => {
                let header = refreshable.to_header().await.unwrap();
                assert_eq!(header, HeaderValue::from_static("Bearer exec-token"));
            }
            other => panic!("unexpected auth {other:?}"),
        }
    }
}
