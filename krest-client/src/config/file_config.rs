//! The on-disk kubeconfig document.
//!
//! Field names and renames follow the canonical client-go schema so any
//! kubeconfig a cluster tool writes parses here. [`Kubeconfig`] is the raw
//! document; [`Config`][crate::Config] is the resolved form the client
//! actually consumes.
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Name of the reserved cluster extension carrying exec plugin configuration.
const CLUSTER_EXTENSION_KEY: &str = "client.authentication.k8s.io/exec";

const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// A parsed kubeconfig document (usually `~/.kube/config`).
///
/// Multiple documents and multiple files merge with first-wins semantics;
/// see [`Kubeconfig::merge`].
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Kubeconfig {
    /// The context selected when the caller names none
    #[serde(rename = "current-context", skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,
    /// Named tuples of cluster and user
    #[serde(default, deserialize_with = "null_to_default")]
    pub contexts: Vec<NamedContext>,
    /// Named connection targets
    #[serde(default, deserialize_with = "null_to_default")]
    pub clusters: Vec<NamedCluster>,
    /// Named credential sets
    #[serde(rename = "users", default, deserialize_with = "null_to_default")]
    pub auth_infos: Vec<NamedAuthInfo>,
    /// Opaque data other tooling stores alongside the config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<NamedExtension>>,
    /// Cli preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    /// Legacy TypeMeta kind (always `Config` when present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Legacy TypeMeta apiVersion
    #[serde(rename = "apiVersion", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Cli preferences stored in the kubeconfig.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Preferences {
    /// Enable colors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<bool>,
    /// Opaque extension data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<NamedExtension>>,
}

/// An extension blob with its registered name.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct NamedExtension {
    /// Registered name of the extension
    pub name: String,
    /// Arbitrary payload
    pub extension: serde_json::Value,
}

/// A [`Context`] with its name.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct NamedContext {
    /// Name the context is referenced by
    pub name: String,
    /// The context itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

/// A cluster/user pairing with an optional default namespace.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Context {
    /// Name of the cluster to talk to
    pub cluster: String,
    /// Name of the credential set to use
    pub user: String,
    /// Namespace applied to requests that name none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Opaque extension data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<NamedExtension>>,
}

/// A [`Cluster`] with its name.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct NamedCluster {
    /// Name the cluster is referenced by
    pub name: String,
    /// The connection details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Cluster>,
}

/// How to reach (and trust) one api server.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Cluster {
    /// Address of the api server (`https://host:port`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Turn off server certificate verification (insecure!)
    #[serde(rename = "insecure-skip-tls-verify", skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,
    /// Path of a PEM file holding the trust roots
    #[serde(rename = "certificate-authority", skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,
    /// Base64 inline trust roots; wins over the path
    #[serde(rename = "certificate-authority-data", skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    /// Proxy to route every request through
    #[serde(rename = "proxy-url", skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Expected name on the server certificate, when it differs from the host
    #[serde(rename = "tls-server-name", skip_serializing_if = "Option::is_none")]
    pub tls_server_name: Option<String>,
    /// Opaque extension data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<NamedExtension>>,
}

/// An [`AuthInfo`] with its name.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct NamedAuthInfo {
    /// Name the credential set is referenced by
    pub name: String,
    /// The credentials themselves
    #[serde(rename = "user", skip_serializing_if = "Option::is_none")]
    pub auth_info: Option<AuthInfo>,
}

/// One credential set; secret-bearing fields redact their `Debug` output.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AuthInfo {
    /// Basic-auth username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic-auth password
    #[serde(default, with = "secret", skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretString>,

    /// Inline bearer token; wins over `token_file`
    #[serde(default, with = "secret", skip_serializing_if = "Option::is_none")]
    pub token: Option<SecretString>,
    /// Path of a file holding a bearer token, re-read as it ages
    #[serde(rename = "tokenFile", skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,

    /// Path of a PEM client certificate
    #[serde(rename = "client-certificate", skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<String>,
    /// Base64 inline client certificate; wins over the path
    #[serde(rename = "client-certificate-data", skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,

    /// Path of a PEM client key
    #[serde(rename = "client-key", skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Base64 inline client key; wins over the path
    #[serde(rename = "client-key-data", default, with = "secret", skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<SecretString>,

    /// User to impersonate on every request
    #[serde(rename = "as", skip_serializing_if = "Option::is_none")]
    pub impersonate: Option<String>,
    /// Groups to impersonate on every request
    #[serde(rename = "as-groups", skip_serializing_if = "Option::is_none")]
    pub impersonate_groups: Option<Vec<String>>,

    /// Cloud auth-provider configuration (parsed, not supported at auth time)
    #[serde(rename = "auth-provider", skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<AuthProviderConfig>,

    /// Exec-based credential plugin configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecConfig>,
}

#[cfg(test)]
impl PartialEq for AuthInfo {
    fn eq(&self, other: &Self) -> bool {
        serde_json::to_value(self).unwrap() == serde_json::to_value(other).unwrap()
    }
}

/// Configuration of a named cloud auth provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct AuthProviderConfig {
    /// Provider name (`gcp`, `oidc`, ...)
    pub name: String,
    /// Provider-specific key/value settings
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// Configuration of an exec credential plugin.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct ExecConfig {
    /// ExecCredential input version the plugin speaks
    #[serde(rename = "apiVersion", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Binary to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Arguments for the binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Extra environment (`name`/`value` maps) exposed to the plugin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<HashMap<String, String>>>,
    /// Host environment variables withheld from the plugin
    ///
    /// Not part of the on-disk schema.
    #[serde(skip)]
    pub drop_env: Option<Vec<String>>,
    /// Whether the plugin may prompt on the terminal
    #[serde(rename = "interactiveMode", skip_serializing_if = "Option::is_none")]
    pub interactive_mode: Option<ExecInteractiveMode>,
    /// Pass cluster information (address, trust roots) to the plugin
    #[serde(default, rename = "provideClusterInfo")]
    pub provide_cluster_info: bool,
    /// The cluster information passed when `provide_cluster_info` is set
    ///
    /// Resolved at load time, never read from disk.
    #[serde(skip)]
    pub cluster: Option<ExecAuthCluster>,
}

/// How interactive an exec plugin may get.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(test, derive(Eq))]
pub enum ExecInteractiveMode {
    /// Never prompt
    Never,
    /// Prompt when a terminal is available
    IfAvailable,
    /// Always prompt
    Always,
}

/// Cluster information serialized into `KUBERNETES_EXEC_INFO` for plugins
/// with `provideClusterInfo` enabled; trust roots travel as bytes here.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct ExecAuthCluster {
    /// Address of the api server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Turn off server certificate verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,
    /// PEM trust roots
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<Vec<u8>>,
    /// Proxy to route requests through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Expected name on the server certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_server_name: Option<String>,
    /// The reserved exec extension payload, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl Kubeconfig {
    /// Load the kubeconfig the environment points at: every path in
    /// `KUBECONFIG` merged in order, or the default `~/.kube/config`.
    pub fn read() -> Result<Kubeconfig, ConfigError> {
        if let Some(merged) = Self::from_env()? {
            return Ok(merged);
        }
        Self::read_from(default_kube_path().ok_or(ConfigError::NoKubeconfigPath)?)
    }

    /// Merge every (non-empty) path listed in `KUBECONFIG`, first file wins.
    ///
    /// `Ok(None)` when the variable is unset or names nothing.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(value) = std::env::var_os(KUBECONFIG_ENV) else {
            return Ok(None);
        };
        let mut merged: Option<Kubeconfig> = None;
        for path in std::env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()) {
            let next = Kubeconfig::read_from(path)?;
            merged = Some(match merged {
                Some(acc) => acc.merge(next)?,
                None => next,
            });
        }
        Ok(merged)
    }

    /// Read one kubeconfig file, resolving its relative file references
    /// against the file's own directory.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Kubeconfig, ConfigError> {
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.as_ref().into(),
            source,
        })?;
        let mut config = Kubeconfig::from_yaml(&text)?;
        if let Some(dir) = path.as_ref().parent() {
            config.anchor_relative_paths(dir);
        }
        Ok(config)
    }

    /// Parse a YAML string, merging multi-document streams into one config.
    ///
    /// An empty string yields an empty `Kubeconfig`.
    pub fn from_yaml(text: &str) -> Result<Kubeconfig, ConfigError> {
        let mut merged = Kubeconfig::default();
        for document in serde_yaml::Deserializer::from_str(text) {
            let next = Kubeconfig::deserialize(document).map_err(ConfigError::ParseYaml)?;
            merged = merged.merge(next)?;
        }
        Ok(merged)
    }

    /// Combine two configs under the [kubeconfig merge rules](https://kubernetes.io/docs/concepts/configuration/organize-cluster-access-kubeconfig/#merging-kubeconfig-files):
    /// scalar values keep the first occurrence, named list entries are
    /// appended only when their name is new. A later `red-user` never
    /// amends an earlier one, even on disjoint fields.
    pub fn merge(mut self, next: Kubeconfig) -> Result<Self, ConfigError> {
        if conflicting(&self.kind, &next.kind) {
            return Err(ConfigError::KindMismatch);
        }
        if conflicting(&self.api_version, &next.api_version) {
            return Err(ConfigError::ApiVersionMismatch);
        }

        self.kind = self.kind.take().or(next.kind);
        self.api_version = self.api_version.take().or(next.api_version);
        self.current_context = self.current_context.take().or(next.current_context);
        self.preferences = self.preferences.take().or(next.preferences);
        self.extensions = self.extensions.take().or(next.extensions);
        merge_named(&mut self.contexts, next.contexts, |c| &c.name);
        merge_named(&mut self.clusters, next.clusters, |c| &c.name);
        merge_named(&mut self.auth_infos, next.auth_infos, |a| &a.name);
        Ok(self)
    }

    // kubeconfig file references are relative to the file declaring them
    fn anchor_relative_paths(&mut self, dir: &Path) {
        let anchor = |slot: &mut Option<String>| {
            let resolved = slot.as_deref().and_then(|current| {
                let path = Path::new(current);
                path.is_relative().then(|| dir.join(path))
            });
            if let Some(abs) = resolved.as_ref().and_then(|p| p.to_str()) {
                *slot = Some(abs.to_owned());
            }
        };
        for cluster in self.clusters.iter_mut().filter_map(|c| c.cluster.as_mut()) {
            anchor(&mut cluster.certificate_authority);
        }
        for user in self.auth_infos.iter_mut().filter_map(|u| u.auth_info.as_mut()) {
            anchor(&mut user.client_certificate);
            anchor(&mut user.client_key);
            anchor(&mut user.token_file);
        }
    }
}

fn conflicting(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(left), Some(right)) if left != right)
}

fn merge_named<T>(base: &mut Vec<T>, incoming: Vec<T>, name: impl Fn(&T) -> &String) {
    for item in incoming {
        if !base.iter().any(|existing| name(existing) == name(&item)) {
            base.push(item);
        }
    }
}

impl Cluster {
    pub(crate) fn load_certificate_authority(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        if self.certificate_authority_data.is_none() && self.certificate_authority.is_none() {
            return Ok(None);
        }
        material(
            self.certificate_authority_data.as_deref(),
            self.certificate_authority.as_ref(),
        )
        .map(Some)
    }

    fn exec_extension(&self) -> Option<&serde_json::Value> {
        self.extensions
            .as_ref()?
            .iter()
            .find(|e| e.name == CLUSTER_EXTENSION_KEY)
            .map(|e| &e.extension)
    }
}

impl AuthInfo {
    /// The client certificate chain and key as one PEM blob for the TLS layer.
    pub(crate) fn identity_pem(&self) -> Result<Vec<u8>, ConfigError> {
        use secrecy::ExposeSecret;
        let mut bundle = material(
            self.client_certificate_data.as_deref(),
            self.client_certificate.as_ref(),
        )?;
        let key = material(
            self.client_key_data.as_ref().map(|s| s.expose_secret().as_str()),
            self.client_key.as_ref(),
        )?;
        bundle.extend(key);
        Ok(bundle)
    }
}

impl TryFrom<&Cluster> for ExecAuthCluster {
    type Error = ConfigError;

    fn try_from(cluster: &Cluster) -> Result<Self, ConfigError> {
        Ok(Self {
            server: cluster.server.clone(),
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
            certificate_authority_data: cluster.load_certificate_authority()?,
            proxy_url: cluster.proxy_url.clone(),
            tls_server_name: cluster.tls_server_name.clone(),
            config: cluster.exec_extension().cloned(),
        })
    }
}

// Inline base64 data wins over a file path; the loaded blob gets a trailing
// newline so concatenated PEM sections stay well-formed.
fn material<P: AsRef<Path>>(inline: Option<&str>, file: Option<&P>) -> Result<Vec<u8>, ConfigError> {
    let mut data = match (inline, file) {
        (Some(b64), _) => base64::decode(b64).map_err(ConfigError::Base64Decode)?,
        (None, Some(path)) => fs::read(path).map_err(|source| ConfigError::ReadFile {
            path: path.as_ref().into(),
            source,
        })?,
        (None, None) => return Err(ConfigError::NoBase64FileOrData),
    };
    if !data.is_empty() && !data.ends_with(b"\n") {
        data.push(b'\n');
    }
    Ok(data)
}

/// Returns the default kubeconfig path, `$HOME/.kube/config`.
pub(crate) fn default_kube_path() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".kube").join("config"))
}

fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// `Option<SecretString>` fields: plain strings on the wire, redacted in Debug.
mod secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<SecretString>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(secret) => s.serialize_str(secret.expose_secret()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
        Ok(Option::<String>::deserialize(d)?.map(SecretString::new))
    }
}

// `Option<Vec<u8>>` fields carried as base64 strings on the wire.
mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_str(&base64::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|b64| base64::decode(b64).map_err(serde::de::Error::custom))
            .transpose()
    }
}
