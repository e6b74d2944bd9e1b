//! Resolution of one context out of a parsed kubeconfig.
use super::file_config::{AuthInfo, Cluster, Context, Kubeconfig};
use crate::error::ConfigError;

/// Overrides for which kubeconfig entries to resolve.
///
/// Every unset field falls back to what the document's `current-context`
/// names.
#[derive(Default, Clone)]
pub struct KubeConfigOptions {
    /// The named context to load
    pub context: Option<String>,
    /// The cluster to load
    pub cluster: Option<String>,
    /// The user to load
    pub user: Option<String>,
}

/// One fully resolved kubeconfig triple: the chosen context with its
/// cluster and credentials looked up and cloned out of the document.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    pub current_context: Context,
    pub cluster: Cluster,
    pub user: AuthInfo,
}

impl ConfigLoader {
    /// Resolve against the kubeconfig the environment points at.
    pub async fn new_from_options(options: &KubeConfigOptions) -> Result<Self, ConfigError> {
        Self::new_from_kubeconfig(Kubeconfig::read()?, options).await
    }

    /// Resolve against an already-parsed kubeconfig document.
    pub async fn new_from_kubeconfig(
        config: Kubeconfig,
        options: &KubeConfigOptions,
    ) -> Result<Self, ConfigError> {
        Self::load(
            config,
            options.context.as_ref(),
            options.cluster.as_ref(),
            options.user.as_ref(),
        )
        .await
    }

    /// Look up context, cluster, and user, each overridable by name.
    pub async fn load(
        config: Kubeconfig,
        context: Option<&String>,
        cluster: Option<&String>,
        user: Option<&String>,
    ) -> Result<Self, ConfigError> {
        let context_name = context
            .or(config.current_context.as_ref())
            .ok_or(ConfigError::CurrentContextNotSet)?;

        let current_context = config
            .contexts
            .iter()
            .filter(|named| named.name == *context_name)
            .find_map(|named| named.context.clone())
            .ok_or_else(|| ConfigError::LoadContext {
                context_name: context_name.clone(),
            })?;

        let cluster_name = cluster.unwrap_or(&current_context.cluster);
        let cluster = config
            .clusters
            .iter()
            .filter(|named| named.name == *cluster_name)
            .find_map(|named| named.cluster.clone())
            .ok_or_else(|| ConfigError::LoadClusterOfContext {
                cluster_name: cluster_name.clone(),
            })?;

        let user_name = user.unwrap_or(&current_context.user);
        let mut user = config
            .auth_infos
            .iter()
            .filter(|named| named.name == *user_name)
            .find_map(|named| named.auth_info.clone())
            .ok_or_else(|| ConfigError::FindUser {
                user_name: user_name.clone(),
            })?;

        // exec plugins asking for cluster info get it resolved here, once
        if let Some(exec) = user.exec.as_mut().filter(|e| e.provide_cluster_info) {
            exec.cluster = Some((&cluster).try_into()?);
        }

        Ok(ConfigLoader {
            current_context,
            cluster,
            user,
        })
    }

    /// The cluster's trust roots as DER, when any are configured.
    pub fn ca_bundle(&self) -> Result<Option<Vec<Vec<u8>>>, ConfigError> {
        self.cluster
            .load_certificate_authority()?
            .map(|pem| super::utils::certs(&pem).map_err(ConfigError::ParseCertificates))
            .transpose()
    }

    /// The user's client certificate and key as one PEM blob.
    pub fn identity_pem(&self) -> Result<Vec<u8>, ConfigError> {
        self.user.identity_pem()
    }

    /// The proxy to use: the cluster's `proxy-url`, then the conventional
    /// environment variables.
    pub fn proxy_url(&self) -> Result<Option<http::Uri>, ConfigError> {
        fn nonempty(s: String) -> Option<String> {
            (!s.is_empty()).then_some(s)
        }
        let from_env = || {
            ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy"]
                .into_iter()
                .find_map(|var| std::env::var(var).ok().and_then(nonempty))
        };

        self.cluster
            .proxy_url
            .clone()
            .and_then(nonempty)
            .or_else(from_env)
            .map(|raw| raw.parse::<http::Uri>().map_err(ConfigError::ParseProxyUrl))
            .transpose()
    }
}
