//! Client configuration from kubeconfig files or the pod environment.
//!
//! [`Config`] is the resolved, immutable input the [`Client`][crate::Client]
//! is built from: where the api server is, which namespace is the default,
//! what to trust, and who we are. [`Config::infer`] resolves it from the
//! environment; the `from_*` constructors pick one source explicitly.
mod file_config;
mod file_loader;
mod incluster_config;
mod utils;

use std::time::Duration;

use crate::{
    error::{ConfigError, Error},
    Result,
};
use file_loader::ConfigLoader;
pub use file_loader::KubeConfigOptions;

/// Read deadline applied to unary calls unless overridden.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved connection parameters: cluster url, default namespace, trust
/// material, credentials, and deadlines.
///
/// Construct via [`Config::infer`] (or one of the explicit sources) and
/// hand it to a [`Client`][crate::Client]; it is never mutated afterwards
/// and safe to share. Parse-level access to the kubeconfig document itself
/// goes through [`Kubeconfig`] instead.
#[derive(Debug, Clone)]
pub struct Config {
    /// The configured cluster url
    pub cluster_url: http::Uri,
    /// The configured default namespace
    pub default_namespace: String,
    /// The configured root certificates, as DER
    pub root_cert: Option<Vec<Vec<u8>>>,
    /// Read/connect deadline for calls to the Kubernetes API.
    ///
    /// A value of `None` means no timeout. Streaming calls (watch, log
    /// follow) treat an expired read deadline as end-of-stream rather than
    /// an error.
    pub timeout: Option<Duration>,
    /// Whether to accept invalid certificates
    pub accept_invalid_certs: bool,
    /// Client certificate and private key in PEM.
    pub(crate) identity_pem: Option<Vec<u8>>,
    /// Stores information to tell the cluster who you are.
    pub(crate) auth_info: AuthInfo,
    // TODO: plug proxy_url into the connector stack
    /// Optional proxy URL.
    pub proxy_url: Option<http::Uri>,
}

impl Config {
    /// A bare config pointing at `cluster_url` with every other field at
    /// its default: namespace `default`, native trust, no credentials.
    ///
    /// Mostly useful against local proxies; real clusters are better served
    /// by [`Config::infer`].
    pub fn new(cluster_url: http::Uri) -> Self {
        Self {
            cluster_url,
            default_namespace: "default".into(),
            root_cert: None,
            timeout: Some(DEFAULT_READ_TIMEOUT),
            accept_invalid_certs: false,
            identity_pem: None,
            auth_info: AuthInfo::default(),
            proxy_url: None,
        }
    }

    /// Resolve configuration from the environment.
    ///
    /// The local kubeconfig is tried first (the `KUBECONFIG` path list when
    /// set, `~/.kube/config` otherwise); when that fails, the in-cluster
    /// service account. Fails only when both sources do.
    pub async fn infer() -> Result<Self> {
        match Self::from_kubeconfig(&KubeConfigOptions::default()).await {
            Ok(config) => Ok(config),
            Err(kubeconfig_err) => {
                tracing::trace!("no usable kubeconfig: {kubeconfig_err}");
                Self::from_cluster_env().map_err(|cluster_env_err| {
                    Error::Kubeconfig(ConfigError::ConfigInferenceExhausted {
                        kubeconfig: Box::new(kubeconfig_err),
                        cluster_env: Box::new(cluster_env_err),
                    })
                })
            }
        }
    }

    /// Configuration from the pod environment of a running cluster.
    ///
    /// Needs the `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT`
    /// variables and the service account's token/namespace/trust-bundle
    /// mount. What the token is allowed to do is the cluster's rbac call.
    pub fn from_cluster_env() -> Result<Self> {
        let server = incluster_config::kube_server().map_err(Error::Kubeconfig)?;
        let token = incluster_config::load_token().map_err(Error::Kubeconfig)?;
        Ok(Self {
            cluster_url: server.parse::<http::Uri>().map_err(Error::InvalidUri)?,
            default_namespace: incluster_config::load_default_ns().map_err(Error::Kubeconfig)?,
            root_cert: Some(incluster_config::load_cert().map_err(Error::Kubeconfig)?),
            timeout: Some(DEFAULT_READ_TIMEOUT),
            accept_invalid_certs: false,
            identity_pem: None,
            auth_info: AuthInfo {
                token: Some(secrecy::SecretString::new(token)),
                ..Default::default()
            },
            proxy_url: None,
        })
    }

    /// Configuration from the local kubeconfig paths.
    ///
    /// Respects `KUBECONFIG`, defaults to `~/.kube/config`, and follows the
    /// document's `current-context` unless `options` overrides it.
    pub async fn from_kubeconfig(options: &KubeConfigOptions) -> Result<Self> {
        let loader = ConfigLoader::new_from_options(options)
            .await
            .map_err(Error::Kubeconfig)?;
        Self::new_from_loader(loader).await
    }

    /// Configuration from an already-parsed [`Kubeconfig`] document.
    pub async fn from_custom_kubeconfig(kubeconfig: Kubeconfig, options: &KubeConfigOptions) -> Result<Self> {
        let loader = ConfigLoader::new_from_kubeconfig(kubeconfig, options)
            .await
            .map_err(Error::Kubeconfig)?;
        Self::new_from_loader(loader).await
    }

    async fn new_from_loader(loader: ConfigLoader) -> Result<Self> {
        let cluster_url = loader
            .cluster
            .server
            .clone()
            .unwrap_or_default()
            .parse::<http::Uri>()
            .map_err(Error::InvalidUri)?;

        let default_namespace = loader
            .current_context
            .namespace
            .clone()
            .unwrap_or_else(|| "default".into());

        let root_cert = loader.ca_bundle().map_err(Error::Kubeconfig)?;

        let identity_pem = match loader.identity_pem() {
            Ok(pem) => Some(pem),
            Err(e) => {
                tracing::debug!("no client identity in kubeconfig: {}", e);
                None
            }
        };

        // The insecure flag wins when set; an absent flag only disables
        // verification when no trust roots are configured either.
        let accept_invalid_certs = loader
            .cluster
            .insecure_skip_tls_verify
            .unwrap_or(root_cert.is_none());

        Ok(Self {
            cluster_url,
            default_namespace,
            root_cert,
            timeout: Some(DEFAULT_READ_TIMEOUT),
            accept_invalid_certs,
            identity_pem,
            proxy_url: loader.proxy_url().map_err(Error::Kubeconfig)?,
            auth_info: loader.user,
        })
    }

    pub(crate) fn identity_pem(&self) -> Option<&[u8]> {
        self.identity_pem.as_deref()
    }
}

// Expose raw config structs
pub use file_config::{
    AuthInfo, AuthProviderConfig, Cluster, Context, ExecAuthCluster, ExecConfig, ExecInteractiveMode,
    Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext, NamedExtension, Preferences,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_loading_from_kubeconfig_path() {
        let cfgraw = r#"
        apiVersion: v1
        clusters:
        - cluster:
            certificate-authority-data: aGVsbG8K
            server: https://0.0.0.0:6443
          name: k3d-test
        contexts:
        - context:
            cluster: k3d-test
            user: admin@k3d-test
            namespace: prod
          name: k3d-test
        current-context: k3d-test
        kind: Config
        preferences: {}
        users:
        - name: admin@k3d-test
          user:
            token: secret-token
        "#;
        let file = tempfile::NamedTempFile::new().expect("create config tempfile");
        std::fs::write(file.path(), cfgraw).unwrap();
        std::env::set_var("KUBECONFIG", file.path());
        let config = Config::infer().await.unwrap();
        std::env::remove_var("KUBECONFIG");
        assert_eq!(config.cluster_url, "https://0.0.0.0:6443/");
        assert_eq!(config.default_namespace, "prod");
        // ca data present (even if it holds no certificate blocks), so
        // verification stays on
        assert!(!config.accept_invalid_certs);
        assert!(config.root_cert.is_some());
    }

    #[tokio::test]
    async fn insecure_default_depends_on_trust_roots() {
        let cfgraw = r#"
        apiVersion: v1
        clusters:
        - cluster:
            server: https://0.0.0.0:6443
          name: bare
        contexts:
        - context:
            cluster: bare
            user: u
          name: bare
        current-context: bare
        kind: Config
        users:
        - name: u
          user:
            token: t
        "#;
        let kubeconfig = Kubeconfig::from_yaml(cfgraw).unwrap();
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .unwrap();
        // no CA and no explicit flag: verification cannot succeed, so it is off
        assert!(config.accept_invalid_certs);
    }
}
