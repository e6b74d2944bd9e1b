//! Impersonation headers from the kubeconfig `as`/`as-groups` user fields.
use std::{
    sync::Arc,
    task::{Context, Poll},
};

use http::{
    header::{HeaderName, InvalidHeaderValue},
    HeaderValue, Request,
};
use tower::{Layer, Service};

const USER_HEADER: &str = "impersonate-user";
const GROUP_HEADER: &str = "impersonate-group";

/// Layer that stamps `Impersonate-User`/`Impersonate-Group` onto every request.
///
/// Built once from the kubeconfig's `as` and `as-groups` fields; a request
/// may carry several group headers, so values are appended rather than
/// inserted.
#[derive(Clone, Default)]
pub struct ImpersonateLayer {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl ImpersonateLayer {
    pub(crate) fn new(user: Option<&str>, groups: &[String]) -> Result<Self, InvalidHeaderValue> {
        let mut headers = Vec::new();
        if let Some(user) = user {
            headers.push((
                HeaderName::from_static(USER_HEADER),
                HeaderValue::from_str(user)?,
            ));
        }
        for group in groups {
            headers.push((
                HeaderName::from_static(GROUP_HEADER),
                HeaderValue::from_str(group)?,
            ));
        }
        Ok(Self {
            headers: Arc::new(headers),
        })
    }
}

impl<S> Layer<S> for ImpersonateLayer {
    type Service = Impersonate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Impersonate {
            headers: self.headers.clone(),
            inner,
        }
    }
}

/// Service produced by [`ImpersonateLayer`].
#[derive(Clone)]
pub struct Impersonate<S> {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
    inner: S,
}

impl<S, B> Service<Request<B>> for Impersonate<S>
where
    S: Service<Request<B>>,
{
    type Error = S::Error;
    type Future = S::Future;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        for (name, value) in self.headers.iter() {
            req.headers_mut().append(name.clone(), value.clone());
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_header_per_identity() {
        let layer = ImpersonateLayer::new(Some("admin"), &["ops".into(), "dev".into()]).unwrap();
        assert_eq!(layer.headers.len(), 3);
        assert_eq!(layer.headers[0].0.as_str(), USER_HEADER);
        assert_eq!(layer.headers[1].0.as_str(), GROUP_HEADER);
        assert_eq!(layer.headers[2].1, HeaderValue::from_static("dev"));
    }

    #[test]
    fn rejects_unprintable_identities() {
        assert!(ImpersonateLayer::new(Some("line\nbreak"), &[]).is_err());
    }
}
