//! Middleware layers the client stack is assembled from.
//!
//! [`ConfigExt`](crate::client::ConfigExt) hands these out pre-configured;
//! they are exposed for callers wiring a custom stack through
//! [`ClientBuilder`](crate::client::ClientBuilder).
use tower::{util::Either, Layer};
pub(crate) use tower_http::auth::AddAuthorizationLayer;

mod base_uri;
mod impersonate;
mod refresh_token;

pub use base_uri::{BaseUri, BaseUriLayer};
pub use impersonate::{Impersonate, ImpersonateLayer};
pub use refresh_token::{RefreshToken, RefreshTokenLayer};

/// Layer to set up the `Authorization` header depending on the config.
///
/// Static credentials (basic and inline bearer) use the tower-http layer;
/// refreshable credentials (token files, exec plugins) go through the
/// refresh middleware. X509 identities need no header at all and never
/// produce this layer.
pub struct AuthLayer(pub(crate) Either<AddAuthorizationLayer, RefreshTokenLayer>);

impl<S> Layer<S> for AuthLayer {
    type Service = Either<
        <AddAuthorizationLayer as Layer<S>>::Service,
        <RefreshTokenLayer as Layer<S>>::Service,
    >;

    fn layer(&self, inner: S) -> Self::Service {
        match &self.0 {
            Either::A(layer) => Either::A(layer.layer(inner)),
            Either::B(layer) => Either::B(layer.layer(inner)),
        }
    }
}
