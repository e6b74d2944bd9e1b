//! The HTTP dispatch and streaming engine.
//!
//! [`Client`] executes built requests against the api server: it
//! authenticates through its middleware stack, bounds body collection,
//! decodes typed responses, and surfaces every failure through the crate's
//! [`Error`] taxonomy. The [`Api`][crate::api::Api] type layers per-kind
//! operations on top of it.
use std::any::TypeId;

use bytes::Bytes;
use either::{Either, Left, Right};
use futures::{Stream, StreamExt, TryStream, TryStreamExt};
use http::{self, header::CONTENT_LENGTH, HeaderMap, Request, Response, StatusCode};
use hyper::Body;
use krest_core::{response::Status, watch::WatchEvent};
use serde::de::DeserializeOwned;
use serde_json::{self, Value};
use tokio_util::{
    codec::{FramedRead, LinesCodec, LinesCodecError},
    io::StreamReader,
};
use tower::{buffer::Buffer, util::BoxService, BoxError, Layer, Service, ServiceExt};
use tower_http::map_response_body::MapResponseBodyLayer;

use crate::{Config, Error, Result};

mod auth;
mod body;
mod builder;
// Add `into_stream()` to `http_body::Body`
use body::BodyStreamExt;
mod config_ext;
pub use auth::Error as AuthError;
pub use config_ext::ConfigExt;
pub mod middleware;
pub mod retry;
mod tls;
pub use tls::Error as TlsError;

pub use builder::{ClientBuilder, DynBody};

// Collection caps. JSON payloads are bounded outright; plain-text log reads
// trust a Content-Length when the server sends one.
const MAX_JSON_BODY: u64 = 16 * 1024 * 1024;
const MAX_TEXT_BODY: u64 = 10 * 1024 * 1024;

/// Client for connecting with a Kubernetes cluster.
///
/// Holds one buffered, type-erased service stack shared by every per-kind
/// handle cloned off it. Instantiate via [`Client::try_default`] (inferred
/// config) or [`Client::try_from`] (explicit [`Config`]).
#[derive(Clone)]
pub struct Client {
    inner: Buffer<BoxService<Request<Body>, Response<Body>, BoxError>, Request<Body>>,
    default_ns: String,
}

impl Client {
    /// Create a [`Client`] from a custom [`Service`] stack.
    ///
    /// [`ConfigExt`] provides the layers to assemble one; [`Client::try_from`]
    /// builds the default stack.
    pub fn new<S, B, T>(service: S, default_namespace: T) -> Self
    where
        S: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = bytes::Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
        T: Into<String>,
    {
        // Erase the stack's body and error generics so `Client` stays a plain
        // struct; `Buffer` then makes it cheap to clone.
        let erased = MapResponseBodyLayer::new(|b: B| Body::wrap_stream(b.into_stream()))
            .layer(service)
            .map_err(Into::into);
        Self {
            inner: Buffer::new(BoxService::new(erased), 1024),
            default_ns: default_namespace.into(),
        }
    }

    /// Create and initialize a [`Client`] using the inferred configuration.
    ///
    /// Uses [`Config::infer`]: the local kubeconfig paths first, the
    /// in-cluster environment after that. Fails when neither source yields
    /// a configuration.
    pub async fn try_default() -> Result<Self> {
        Self::try_from(Config::infer().await?)
    }

    pub(crate) fn default_ns(&self) -> &str {
        &self.default_ns
    }

    /// Execute a raw HTTP request and return the raw response.
    ///
    /// Escape hatch for callers that need untyped access (proxies,
    /// gateways); the typed `request_*` methods below are built on it.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let mut service = self.inner.clone();
        let response = service
            .ready()
            .await
            .map_err(Error::Service)?
            .call(request)
            .await
            .map_err(downcast_send_error)?;
        Ok(response)
    }

    // Unary dispatch: collect the whole (capped) body as text and fail on
    // error statuses. Returns the status code for callers that still need it.
    async fn dispatch(&self, request: Request<Vec<u8>>, trust_content_length: bool) -> Result<(StatusCode, String)> {
        let response = self.send(request.map(Body::from)).await?;
        let code = response.status();
        let cap = if trust_content_length {
            body_cap(response.headers(), MAX_TEXT_BODY)
        } else {
            MAX_JSON_BODY
        };
        let bytes = collect_body(response.into_body(), cap).await?;
        let text = String::from_utf8(bytes.to_vec()).map_err(Error::FromUtf8)?;
        if text.is_empty() {
            return Err(Error::EmptyResponse);
        }
        fail_on_status(&text, code)?;
        Ok((code, text))
    }

    /// Execute a request and deserialize the JSON response into `T`.
    pub async fn request<T>(&self, request: Request<Vec<u8>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("{}, {:?}", text, e);
            Error::SerdeError(e)
        })
    }

    /// Execute a request and return the response body as a string.
    pub async fn request_text(&self, request: Request<Vec<u8>>) -> Result<String> {
        let (_, text) = self.dispatch(request, false).await?;
        Ok(text)
    }

    /// Execute a request and collect the plain-text response (log snapshots).
    ///
    /// Text bodies are capped at the response's `Content-Length`, falling
    /// back to 10 MiB when the server does not send one.
    pub async fn request_plaintext(&self, request: Request<Vec<u8>>) -> Result<String> {
        let (_, text) = self.dispatch(request, true).await?;
        Ok(text)
    }

    /// Execute a request and return the response body as a stream of bytes.
    pub async fn request_text_stream(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        let res = self.send(request.map(Body::from)).await?;
        Ok(res.into_body().map_err(Error::HyperError))
    }

    /// Execute a request and decode either the expected object or the
    /// server's [`Status`] envelope; deletions answer with both shapes.
    ///
    /// One compatibility carve-out applies when `T` is [`Status`] itself:
    /// some delete calls (`core.v1.Service` among them) answer a success
    /// with the deleted object instead of an envelope, so a caller that can
    /// only receive a `Status` gets one synthesized from the HTTP code
    /// rather than a decode error. For any other `T`, a body that decodes
    /// as neither shape is a real [`Error::SerdeError`].
    pub async fn request_status<T>(&self, request: Request<Vec<u8>>) -> Result<Either<T, Status>>
    where
        T: DeserializeOwned + 'static,
    {
        let (code, text) = self.dispatch(request, false).await?;

        let v: Value = serde_json::from_str(&text).map_err(Error::SerdeError)?;
        if v["kind"] == "Status" {
            tracing::trace!("Status from {}", text);
            return serde_json::from_value::<Status>(v)
                .map(Right)
                .map_err(Error::SerdeError);
        }
        match serde_json::from_value::<T>(v) {
            Ok(obj) => Ok(Left(obj)),
            Err(_) if TypeId::of::<T>() == TypeId::of::<Status>() => {
                tracing::debug!("substituting a Status for a {code} response carrying an object");
                Ok(Right(Status::success_with_code(code.as_u16())))
            }
            Err(e) => {
                tracing::warn!("{}, {:?}", text, e);
                Err(Error::SerdeError(e))
            }
        }
    }

    /// Open a watch connection and stream its decoded [`WatchEvent`]s.
    pub async fn request_events<T>(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl TryStream<Item = Result<WatchEvent<T>>>>
    where
        T: Clone + DeserializeOwned,
    {
        let res = self.send(request.map(Body::from)).await?;
        tracing::trace!("headers: {:?}", res.headers());

        Ok(line_frames(res.into_body()).filter_map(|frame| async move {
            match frame {
                Ok(line) if line.is_empty() => None,
                Ok(line) => decode_watch_line(&line),
                Err(err) => classify_stream_error(err),
            }
        }))
    }

    /// Open a log connection and stream its lines.
    ///
    /// Each `\n`-terminated record of the text response is one item; blank
    /// records are skipped.
    pub async fn request_log_lines(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl TryStream<Item = Result<String>>> {
        let res = self.send(request.map(Body::from)).await?;

        Ok(line_frames(res.into_body()).filter_map(|frame| async move {
            match frame {
                Ok(line) if line.is_empty() => None,
                Ok(line) => Some(Ok(line)),
                Err(err) => classify_stream_error(err),
            }
        }))
    }
}

// `Buffer` erases everything to a BoxError; pull our own and hyper's types
// back out before giving up and reporting a generic middleware failure.
fn downcast_send_error(err: BoxError) -> Error {
    match err.downcast::<Error>() {
        Ok(own) => *own,
        Err(err) => match err.downcast::<hyper::Error>() {
            Ok(transport) => Error::HyperError(*transport),
            Err(other) => Error::Service(other),
        },
    }
}

// Line framing over the chunked response body: bytes buffer until the next
// newline, whatever the chunk boundaries were; leftovers wait in the codec
// for the next chunk.
fn line_frames(body: Body) -> FramedRead<impl tokio::io::AsyncRead, LinesCodec> {
    let reader = StreamReader::new(body.map_err(|e| {
        // Our own read deadline. Ends the stream quietly.
        if e.is_timeout() {
            return std::io::Error::new(std::io::ErrorKind::TimedOut, e);
        }
        // The chunked decoder hits this on long-lived watches when the server
        // walks away mid-chunk. Also ends the stream quietly.
        if e.to_string().contains("unexpected EOF during chunk") {
            return std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e);
        }
        std::io::Error::new(std::io::ErrorKind::Other, e)
    }));
    FramedRead::new(reader, LinesCodec::new())
}

fn decode_watch_line<T: DeserializeOwned>(line: &str) -> Option<Result<WatchEvent<T>>> {
    match serde_json::from_str::<WatchEvent<T>>(line) {
        Ok(event) => Some(Ok(event)),
        // An incomplete trailing line surfaces as an eof from `decode_eof`.
        Err(e) if e.is_eof() => None,
        Err(e) => {
            // Servers occasionally write a naked error envelope into the stream
            if let Some(status) = decode_status_value(line) {
                return Some(Err(Error::Api(status)));
            }
            Some(Err(Error::SerdeError(e)))
        }
    }
}

// A `Status`, if that is what the payload is; anything else is None.
fn decode_status_value(text: &str) -> Option<Status> {
    let v: Value = serde_json::from_str(text).ok()?;
    if v["kind"] != "Status" {
        return None;
    }
    serde_json::from_value(v).ok()
}

// Read deadlines and mid-chunk disconnects end a stream without an error so
// reconnecting tasks can take over; every other I/O failure surfaces.
fn classify_stream_error<T>(err: LinesCodecError) -> Option<Result<T>> {
    match err {
        LinesCodecError::Io(e) => match e.kind() {
            std::io::ErrorKind::TimedOut => {
                tracing::warn!("timeout in poll: {}", e);
                None
            }
            std::io::ErrorKind::UnexpectedEof => {
                tracing::warn!("eof in poll: {}", e);
                None
            }
            _ => Some(Err(Error::ReadEvents(e))),
        },

        // Unreachable with the default line cap of `usize::MAX`.
        LinesCodecError::MaxLineLengthExceeded => Some(Err(Error::LinesCodecMaxLineLengthExceeded)),
    }
}

fn body_cap(headers: &HeaderMap, fallback: u64) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(fallback)
}

async fn collect_body(mut body: Body, cap: u64) -> Result<Bytes> {
    use http_body::Body as HttpBody;
    let mut buf = Vec::new();
    while let Some(chunk) = HttpBody::data(&mut body).await {
        let chunk = chunk.map_err(Error::HyperError)?;
        if (buf.len() + chunk.len()) as u64 > cap {
            return Err(Error::ResponseTooLarge { limit: cap });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

// Error statuses become `Error::Api` when the body holds the server's
// envelope, `Error::UnexpectedResponse` (raw body preserved) when it does not.
fn fail_on_status(text: &str, code: StatusCode) -> Result<()> {
    if !(code.is_client_error() || code.is_server_error()) {
        return Ok(());
    }
    match decode_status_value(text) {
        Some(status) => {
            tracing::debug!("unsuccessful: {:?}", status);
            Err(Error::Api(status))
        }
        None => {
            tracing::warn!("unsuccessful response was not a Status: {}", text);
            Err(Error::UnexpectedResponse {
                code: code.as_u16(),
                body: text.to_string(),
            })
        }
    }
}

impl TryFrom<Config> for Client {
    type Error = Error;

    /// Builds a default [`Client`] from a [`Config`], see [`ClientBuilder`] if more customization is required
    fn try_from(config: Config) -> Result<Self> {
        Ok(ClientBuilder::try_from(config)?.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Api;
    use krest_core::{
        params::{DeleteParams, ListParams},
        ApiResource, DynamicObject, GroupVersionKind,
    };

    use futures::pin_mut;
    use http::{Request, Response};
    use hyper::Body;
    use tower_test::mock;

    fn pod_resource() -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true)
    }

    #[tokio::test]
    async fn get_decodes_a_typed_resource() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            // Receive a request for pod and respond with some data
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(request.uri().to_string(), "/api/v1/namespaces/default/pods/test");
            let pod = serde_json::json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": {
                    "name": "test",
                    "annotations": { "krest": "test" },
                },
                "spec": {
                    "containers": [{ "name": "test", "image": "test-image" }],
                }
            });
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&pod).unwrap()))
                    .unwrap(),
            );
        });

        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let pod = pods.get("test").await.unwrap();
        assert_eq!(
            pod.metadata.annotations.unwrap().get("krest").unwrap(),
            "test"
        );
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn not_found_surfaces_the_status_envelope() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.uri().to_string(), "/api/v1/namespaces/default/pods/x");
            let status = serde_json::json!({
                "kind": "Status", "apiVersion": "v1", "metadata": {},
                "status": "Failure", "message": "pods \"x\" not found",
                "reason": "NotFound", "details": { "name": "x", "kind": "pods" },
                "code": 404
            });
            send.send_response(
                Response::builder()
                    .status(404)
                    .body(Body::from(serde_json::to_vec(&status).unwrap()))
                    .unwrap(),
            );
        });

        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let err = pods.get("x").await.unwrap_err();
        match err {
            Error::Api(status) => {
                assert_eq!(status.code, 404);
                assert_eq!(status.reason, "NotFound");
            }
            other => panic!("unexpected error {other:?}"),
        }
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn empty_bodies_are_rejected() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (_request, send) = handle.next_request().await.expect("service not called");
            send.send_response(Response::builder().body(Body::empty()).unwrap());
        });

        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let err = pods.get("x").await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn unexpected_error_bodies_are_preserved() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (_request, send) = handle.next_request().await.expect("service not called");
            send.send_response(
                Response::builder()
                    .status(502)
                    .body(Body::from("<html>bad gateway</html>"))
                    .unwrap(),
            );
        });

        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let err = pods.get("x").await.unwrap_err();
        match err {
            Error::UnexpectedResponse { code, body } => {
                assert_eq!(code, 502);
                assert!(body.contains("bad gateway"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn status_callers_get_a_substitute_for_deleted_objects() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::DELETE);
            // services return the deleted object rather than a Status
            let svc = serde_json::json!({
                "apiVersion": "v1", "kind": "Service",
                "metadata": { "name": "web" },
                "spec": { "clusterIP": "10.0.0.1" }
            });
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&svc).unwrap()))
                    .unwrap(),
            );
        });

        // A caller that expects only a Status envelope still succeeds
        let client = Client::new(mock_service, "default");
        let req = Request::builder()
            .method("DELETE")
            .uri("/api/v1/namespaces/default/services/web")
            .body(Vec::new())
            .unwrap();
        let res = client.request_status::<Status>(req).await.unwrap();
        match res {
            Right(status) => {
                assert!(status.is_success());
                assert_eq!(status.code, 200);
            }
            Left(_) => panic!("expected a substituted Status"),
        }
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn typed_deletes_do_not_mask_decode_failures() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::DELETE);
            // a 2xx body that is neither a Status nor a decodable object
            send.send_response(
                Response::builder()
                    .body(Body::from(r#"{"kind":"Pod","metadata":5}"#))
                    .unwrap(),
            );
        });

        // The substitute Status is reserved for `Status` callers; a typed
        // resource delete must surface the broken body.
        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let err = pods.delete("x", &DeleteParams::default()).await.unwrap_err();
        assert!(matches!(err, Error::SerdeError(_)));
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn dynamic_kinds_without_a_verb_fail_with_405() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        // discovery said this kind only serves reads
        let ar = pod_resource().verbs(&["get", "list"]);
        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &ar);
        let err = pods.delete("x", &DeleteParams::default()).await.unwrap_err();
        match err {
            Error::Api(status) => {
                assert_eq!(status.code, 405);
                assert_eq!(status.reason, "MethodNotAllowed");
                assert!(status.message.contains("delete"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn dynamic_kinds_without_a_subresource_fail_with_405() {
        let (mock_service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let ar = pod_resource().subresources(&["status"]);
        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &ar);
        let err = pods.get_scale("x").await.unwrap_err();
        match err {
            Error::Api(status) => assert_eq!(status.code, 405),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn watch_events_split_on_newlines_across_chunks() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(
                request.uri().to_string(),
                "/api/v1/namespaces/default/pods?watch=true"
            );
            let (mut tx, body) = Body::channel();
            send.send_response(Response::builder().body(body).unwrap());
            let ev1 = r#"{"type":"ADDED","object":{"apiVersion":"v1","kind":"Pod","metadata":{"name":"a","resourceVersion":"1"}}}"#;
            let ev2 = r#"{"type":"DELETED","object":{"apiVersion":"v1","kind":"Pod","metadata":{"name":"a","resourceVersion":"2"}}}"#;
            let payload = format!("{ev1}\n\n{ev2}\n");
            // split at an arbitrary byte boundary to exercise re-framing
            let (first, second) = payload.split_at(40);
            tx.send_data(Bytes::from(first.to_string())).await.unwrap();
            tx.send_data(Bytes::from(second.to_string())).await.unwrap();
        });

        let pods: Api<DynamicObject> =
            Api::default_namespaced_with(Client::new(mock_service, "default"), &pod_resource());
        let stream = pods.watch(&ListParams::default()).await.unwrap();
        pin_mut!(stream);

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, WatchEvent::Added(_)));
        let second = stream.next().await.unwrap().unwrap();
        assert!(matches!(second, WatchEvent::Deleted(_)));
        assert!(stream.next().await.is_none());
        spawned.await.unwrap();
    }

    #[tokio::test]
    async fn log_lines_skip_blanks_and_keep_order() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(
                request.uri().to_string(),
                "/api/v1/namespaces/default/pods/web/log?follow=true"
            );
            let (mut tx, body) = Body::channel();
            send.send_response(Response::builder().body(body).unwrap());
            tx.send_data(Bytes::from("first li")).await.unwrap();
            tx.send_data(Bytes::from("ne\n\nsecond line\ntrail")).await.unwrap();
            tx.send_data(Bytes::from("ing\n")).await.unwrap();
        });

        let client = Client::new(mock_service, "default");
        let req = Request::builder()
            .uri("/api/v1/namespaces/default/pods/web/log?follow=true")
            .body(Vec::new())
            .unwrap();
        let lines = client.request_log_lines(req).await.unwrap();
        pin_mut!(lines);
        let collected: Vec<String> = lines.map(|l| l.unwrap()).collect().await;
        assert_eq!(collected, vec!["first line", "second line", "trailing"]);
        spawned.await.unwrap();
    }
}
