//! Assembly of the default client service stack.
use bytes::Bytes;
use http::{Request, Response};
use hyper::client::HttpConnector;
use hyper_timeout::TimeoutConnector;
use tower::{util::BoxService, BoxError, Layer, Service, ServiceBuilder};
use tower_http::{
    classify::ServerErrorsFailureClass, map_response_body::MapResponseBodyLayer, trace::TraceLayer,
};
use tracing::Span;

use crate::{client::ConfigExt, Client, Config, Error, Result};

/// HTTP body of a dynamic backing type.
///
/// The suggested implementation type is [`hyper::Body`].
pub type DynBody = dyn http_body::Body<Data = Bytes, Error = BoxError> + Send + Unpin;

type HttpsStack = TimeoutConnector<hyper_rustls::HttpsConnector<HttpConnector>>;

/// Staged construction of a [`Client`] around a custom middleware stack.
///
/// `TryFrom<Config>` yields a builder already holding the default stack;
/// wrap further layers with [`ClientBuilder::with_layer`] before calling
/// [`ClientBuilder::build`].
pub struct ClientBuilder<Svc> {
    stack: Svc,
    default_ns: String,
}

impl<Svc> ClientBuilder<Svc> {
    /// Wrap an arbitrary [`Service`] stack into a builder.
    ///
    /// Escape hatch for fully custom transports; most callers start from
    /// `ClientBuilder::try_from(config)` instead.
    pub fn new(stack: Svc, default_namespace: impl Into<String>) -> Self
    where
        Svc: Service<Request<hyper::Body>>,
    {
        Self {
            stack,
            default_ns: default_namespace.into(),
        }
    }

    /// Wrap the current stack in one more [`Layer`].
    pub fn with_layer<L: Layer<Svc>>(self, layer: &L) -> ClientBuilder<L::Service> {
        ClientBuilder {
            stack: layer.layer(self.stack),
            default_ns: self.default_ns,
        }
    }

    /// Finish the stack into a [`Client`].
    pub fn build<B>(self) -> Client
    where
        Svc: Service<Request<hyper::Body>, Response = Response<B>> + Send + 'static,
        Svc::Future: Send + 'static,
        Svc::Error: Into<BoxError>,
        B: http_body::Body<Data = bytes::Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Client::new(self.stack, self.default_ns)
    }
}

// The innermost piece: a hyper client over the rustls connector, with the
// configured deadline applied to both the dial and each body read.
fn base_client(config: &Config) -> Result<hyper::Client<HttpsStack, hyper::Body>> {
    let https = config.rustls_https_connector()?;
    let mut timed = TimeoutConnector::new(https);
    timed.set_connect_timeout(config.timeout);
    timed.set_read_timeout(config.timeout);
    Ok(hyper::Client::builder().build(timed))
}

// Per-request span carrying method, url, status, and latency; the operation
// name is planted into request extensions by the Api layer.
fn request_span(req: &Request<hyper::Body>) -> Span {
    let operation = req.extensions().get::<&'static str>().copied().unwrap_or("http");
    tracing::debug_span!(
        "request",
        http.method = %req.method(),
        http.url = %req.uri(),
        http.status_code = tracing::field::Empty,
        operation,
    )
}

impl TryFrom<Config> for ClientBuilder<BoxService<Request<hyper::Body>, Response<Box<DynBody>>, BoxError>> {
    type Error = Error;

    /// Build the default stack for a configuration:
    /// base-uri rewrite → authorization → impersonation →
    /// (gzip decompression →) tracing → hyper.
    fn try_from(config: Config) -> Result<Self> {
        use std::time::Duration;

        let default_ns = config.default_namespace.clone();

        let inner = base_client(&config)?;

        let trace = TraceLayer::new_for_http()
            .make_span_with(request_span)
            .on_request(())
            .on_response(|res: &Response<hyper::Body>, latency: Duration, span: &Span| {
                let status = res.status().as_u16();
                span.record("http.status_code", status);
                tracing::debug!(parent: span, status, latency = ?latency, "completed");
            })
            .on_body_chunk(())
            .on_eos(())
            .on_failure(|class: ServerErrorsFailureClass, latency: Duration, span: &Span| {
                // 5xx responses, transport errors, and broken streams all land here
                match class {
                    ServerErrorsFailureClass::StatusCode(code) => {
                        span.record("http.status_code", code.as_u16());
                        tracing::warn!(parent: span, status = code.as_u16(), latency = ?latency, "failed");
                    }
                    ServerErrorsFailureClass::Error(err) => {
                        tracing::warn!(parent: span, %err, latency = ?latency, "failed");
                    }
                }
            });

        // trace sits directly over hyper so its hooks see the raw response
        let traced = ServiceBuilder::new().layer(trace).service(inner);
        #[cfg(feature = "gzip")]
        let traced = tower_http::decompression::Decompression::new(traced);

        let stack = ServiceBuilder::new()
            .layer(config.base_uri_layer())
            .option_layer(config.auth_layer()?)
            .layer(config.impersonate_layer()?)
            .service(traced);

        let erased = MapResponseBodyLayer::new(|body| {
            Box::new(http_body::Body::map_err(body, BoxError::from)) as Box<DynBody>
        })
        .layer(stack);

        Ok(Self::new(BoxService::new(erased), default_ns))
    }
}
