use http::{uri, Request, Uri};
use tower::{Layer, Service};

/// Layer that rewrites request URIs onto the configured cluster URL.
///
/// The scheme, authority, and any path prefix of the base URI are prepended
/// to the per-request path and query produced by the request builder.
#[derive(Debug, Clone)]
pub struct BaseUriLayer {
    base_uri: Uri,
}

impl BaseUriLayer {
    /// Set the base URI requests are joined onto
    pub fn new(base_uri: Uri) -> Self {
        Self { base_uri }
    }
}

impl<S> Layer<S> for BaseUriLayer {
    type Service = BaseUri<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BaseUri {
            base_uri: self.base_uri.clone(),
            inner,
        }
    }
}

/// Service that rewrites request URIs onto the configured cluster URL.
#[derive(Debug, Clone)]
pub struct BaseUri<S> {
    base_uri: Uri,
    inner: S,
}

impl<S, ReqBody> Service<Request<ReqBody>> for BaseUri<S>
where
    S: Service<Request<ReqBody>>,
{
    type Error = S::Error;
    type Future = S::Future;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (mut parts, body) = req.into_parts();
        parts.uri = set_base_uri(&self.base_uri, parts.uri);
        self.inner.call(Request::from_parts(parts, body))
    }
}

// Substitutes scheme/authority and prepends the base path.
// Request paths are generated and the base was parsed at config time, so
// reassembly cannot produce an invalid uri.
fn set_base_uri(base_uri: &Uri, request_uri: Uri) -> Uri {
    let mut builder = uri::Builder::new();
    if let Some(scheme) = base_uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = base_uri.authority() {
        builder = builder.authority(authority.clone());
    }
    let base_path = base_uri.path().trim_end_matches('/');
    let path_and_query = match request_uri.path_and_query() {
        Some(pq) => format!("{base_path}{pq}"),
        None => base_path.to_string(),
    };
    builder
        .path_and_query(path_and_query)
        .build()
        .expect("a valid scheme/authority and a generated path always reassemble")
}

#[cfg(test)]
mod tests {
    use super::set_base_uri;
    use http::Uri;

    #[test]
    fn joins_scheme_authority_and_path() {
        let base = Uri::from_static("https://kubernetesmaster");
        let apipath = Uri::from_static("/api/v1/pods?watch=true");
        let joined = set_base_uri(&base, apipath);
        assert_eq!(joined.to_string(), "https://kubernetesmaster/api/v1/pods?watch=true");
    }

    #[test]
    fn preserves_base_path_prefix() {
        // some ingresses serve the apiserver under a path prefix
        let base = Uri::from_static("https://example.com/k8s/clusters/c-1/");
        let apipath = Uri::from_static("/api/v1/namespaces/kube-system/pods/x");
        let joined = set_base_uri(&base, apipath);
        assert_eq!(
            joined.to_string(),
            "https://example.com/k8s/clusters/c-1/api/v1/namespaces/kube-system/pods/x"
        );
    }
}
