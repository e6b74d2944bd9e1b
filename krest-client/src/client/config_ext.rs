use tower::util::Either;

use super::{
    auth::Auth,
    middleware::{AddAuthorizationLayer, AuthLayer, BaseUriLayer, ImpersonateLayer, RefreshTokenLayer},
    tls,
};
use crate::{error::ConfigError, Config, Error, Result};

use secrecy::ExposeSecret;

/// Extensions on [`Config`] producing the layers of a client stack.
///
/// [`Client::try_from`](crate::Client) assembles the default stack from
/// these; callers with custom needs compose them around their own
/// connector via [`ClientBuilder`](crate::client::ClientBuilder). The trait
/// is sealed and cannot be implemented.
pub trait ConfigExt: private::Sealed {
    /// Layer rewriting request URIs onto the configured cluster URL.
    fn base_uri_layer(&self) -> BaseUriLayer;

    /// Optional layer producing the `Authorization` header.
    ///
    /// `None` when the config carries no header-borne credential (no
    /// credentials at all, or an X509 identity that rides on TLS instead).
    fn auth_layer(&self) -> Result<Option<AuthLayer>>;

    /// Layer adding the config's impersonation headers.
    fn impersonate_layer(&self) -> Result<ImpersonateLayer>;

    /// A `rustls::ClientConfig` carrying the config's trust roots, client
    /// identity, and insecure flag.
    fn rustls_client_config(&self) -> Result<rustls::ClientConfig>;

    /// An HTTPS connector over [`ConfigExt::rustls_client_config`].
    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Config {}
}

impl ConfigExt for Config {
    fn base_uri_layer(&self) -> BaseUriLayer {
        BaseUriLayer::new(self.cluster_url.clone())
    }

    fn auth_layer(&self) -> Result<Option<AuthLayer>> {
        Ok(match Auth::try_from(&self.auth_info).map_err(Error::Auth)? {
            // X509 identities ride on the TLS handshake; no header
            Auth::None | Auth::Certificate(_, _) => None,
            Auth::Basic(user, pass) => Some(AuthLayer(Either::A(
                AddAuthorizationLayer::basic(&user, pass.expose_secret()).as_sensitive(true),
            ))),
            Auth::Bearer(token) => Some(AuthLayer(Either::A(
                AddAuthorizationLayer::bearer(token.expose_secret()).as_sensitive(true),
            ))),
            Auth::RefreshableToken(refreshable) => {
                Some(AuthLayer(Either::B(RefreshTokenLayer::new(refreshable))))
            }
        })
    }

    fn impersonate_layer(&self) -> Result<ImpersonateLayer> {
        let groups = self.auth_info.impersonate_groups.as_deref().unwrap_or_default();
        ImpersonateLayer::new(self.auth_info.impersonate.as_deref(), groups)
            .map_err(|e| Error::Kubeconfig(ConfigError::InvalidImpersonationHeader(e)))
    }

    fn rustls_client_config(&self) -> Result<rustls::ClientConfig> {
        tls::client_config(
            self.identity_pem(),
            self.root_cert.as_deref(),
            self.accept_invalid_certs,
        )
        .map_err(Error::TlsError)
    }

    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>> {
        let mut http = hyper::client::HttpConnector::new();
        http.enforce_http(false);
        Ok(hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(self.rustls_client_config()?)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http))
    }
}
