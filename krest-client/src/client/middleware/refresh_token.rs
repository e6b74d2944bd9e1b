//! Middleware that re-resolves near-expiry bearer credentials per request.
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::{header::AUTHORIZATION, Request, Response};
use tower::{BoxError, Layer, Service};

use crate::client::auth::RefreshableToken;

/// Layer that stamps a refreshable `Authorization` bearer header.
///
/// Token files and exec plugins hand out credentials with a shelf life;
/// every request first asks the [`RefreshableToken`] for a current header,
/// which re-reads the file or re-runs the plugin only when the cached value
/// is close to expiry.
pub struct RefreshTokenLayer {
    refreshable: RefreshableToken,
}

impl RefreshTokenLayer {
    pub(crate) fn new(refreshable: RefreshableToken) -> Self {
        Self { refreshable }
    }
}

impl<S> Layer<S> for RefreshTokenLayer {
    type Service = RefreshToken<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RefreshToken {
            refreshable: self.refreshable.clone(),
            inner,
        }
    }
}

/// Service produced by [`RefreshTokenLayer`].
pub struct RefreshToken<S> {
    refreshable: RefreshableToken,
    inner: S,
}

impl<S, ReqB, ResB> Service<Request<ReqB>> for RefreshToken<S>
where
    S: Service<Request<ReqB>, Response = Response<ResB>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    ReqB: Send + 'static,
    ResB: http_body::Body,
{
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, BoxError>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<ReqB>) -> Self::Future {
        // The instance we drove to readiness goes into the future; a fresh
        // clone stays behind for the next caller. Readiness is per-instance
        // for services like Buffer, so the two must not be swapped.
        let fresh = self.inner.clone();
        let mut readied = std::mem::replace(&mut self.inner, fresh);
        let token = self.refreshable.clone();

        Box::pin(async move {
            let header = token.to_header().await.map_err(BoxError::from)?;
            req.headers_mut().insert(AUTHORIZATION, header);
            readied.call(req).await.map_err(Into::into)
        })
    }
}
