use std::{env, path::Path};

use crate::error::ConfigError;

// Environment the apiserver address is published through
pub(crate) const SERVICE_HOSTENV: &str = "KUBERNETES_SERVICE_HOST";
pub(crate) const SERVICE_PORTENV: &str = "KUBERNETES_SERVICE_PORT";
// Mounted credential files
const SERVICE_TOKENFILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_CERTFILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const SERVICE_DEFAULT_NS: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Returns the Kubernetes address from the specified environment variables.
pub fn kube_server() -> Result<String, ConfigError> {
    let host = env::var(SERVICE_HOSTENV).ok().filter(|s| !s.is_empty());
    let port = env::var(SERVICE_PORTENV).ok().filter(|s| !s.is_empty());
    match (host, port) {
        (Some(host), Some(port)) => Ok(format!("https://{host}:{port}")),
        _ => Err(ConfigError::MissingInClusterVariables {
            hostenv: SERVICE_HOSTENV,
            portenv: SERVICE_PORTENV,
        }),
    }
}

/// Returns the service account token from its mounted path in cluster.
pub fn load_token() -> Result<String, ConfigError> {
    read_string(SERVICE_TOKENFILE)
}

/// Returns the trust roots from the mounted bundle in cluster.
pub fn load_cert() -> Result<Vec<Vec<u8>>, ConfigError> {
    let certs = std::fs::read(SERVICE_CERTFILE).map_err(|source| ConfigError::ReadFile {
        path: SERVICE_CERTFILE.into(),
        source,
    })?;
    super::utils::certs(&certs).map_err(ConfigError::ParseCertificates)
}

/// Returns the default namespace from its mounted path in cluster.
pub fn load_default_ns() -> Result<String, ConfigError> {
    read_string(SERVICE_DEFAULT_NS)
}

fn read_string(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::ReadFile {
        path: path.into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kube_server_from_env() {
        env::set_var(SERVICE_HOSTENV, "fake.io");
        env::set_var(SERVICE_PORTENV, "8080");
        assert_eq!(kube_server().unwrap(), "https://fake.io:8080");
    }
}
