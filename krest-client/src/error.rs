//! Error handling in [`krest_client`][crate]
use std::path::PathBuf;

pub use krest_core::response::Status;
use thiserror::Error;

pub use crate::client::AuthError;

/// Possible errors at the API boundary
///
/// Every user-visible failure arrives as one variant of this enum.
#[derive(Error, Debug)]
pub enum Error {
    /// The server returned a non-success code with a valid `Status` envelope
    ///
    /// The envelope is preserved in full; a `410 Gone` here commonly means
    /// the supplied `resourceVersion` was too old.
    #[error("ApiError: {0} ({0:?})")]
    Api(#[source] Status),

    /// The server returned a non-success code and a body that is not a `Status`
    #[error("unexpected response (status {code})")]
    UnexpectedResponse {
        /// The HTTP status code of the response
        code: u16,
        /// The raw response body
        body: String,
    },

    /// A response body was required but empty
    #[error("empty response body")]
    EmptyResponse,

    /// A collected response body exceeded the dispatch cap
    #[error("response body exceeded the {limit} byte limit")]
    ResponseTooLarge {
        /// The maximum number of bytes the dispatcher collects
        limit: u64,
    },

    /// Hyper error
    #[error("HyperError: {0}")]
    HyperError(#[from] hyper::Error),

    /// Service error
    #[error("ServiceError: {0}")]
    Service(tower::BoxError),

    /// UTF-8 Error
    #[error("UTF-8 Error: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),

    /// Returned when failed to find a newline character within max length.
    ///
    /// Only returned by streaming calls and should never happen as
    /// the max is `usize::MAX`.
    #[error("error finding newline character")]
    LinesCodecMaxLineLengthExceeded,

    /// Returned on `std::io::Error` when reading an event stream
    #[error("error reading events stream: {0}")]
    ReadEvents(std::io::Error),

    /// Http based error
    #[error("HttpError: {0}")]
    HttpError(#[from] http::Error),

    /// Failed to construct a URI
    #[error(transparent)]
    InvalidUri(#[from] http::uri::InvalidUri),

    /// Common error case when requesting parsing into own structs
    #[error("error deserializing response")]
    SerdeError(#[from] serde_json::Error),

    /// Error building a request
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] krest_core::request::Error),

    /// A request validation failed
    #[error("request validation failed with {0}")]
    RequestValidation(String),

    /// A watch or log-follow task exhausted its retry budget
    #[error("retries exhausted after {attempts} attempts for {path}")]
    RetriesExhausted {
        /// Reconnect attempts performed before giving up
        attempts: u32,
        /// The url path of the streaming request
        path: String,
    },

    /// Configuration error
    #[error("error loading kubeconfig: {0}")]
    Kubeconfig(#[from] ConfigError),

    /// Failed to resolve credentials from the loaded config
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// An error with configuring TLS occured
    #[error("TlsError: {0}")]
    TlsError(#[from] crate::client::TlsError),
}

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when loading config
pub enum ConfigError {
    #[error("failed to infer config.. kubeconfig: ({kubeconfig}), cluster env: ({cluster_env})")]
    ConfigInferenceExhausted {
        // We can only pick one source, but the kubeconfig failure is more likely to be a user error
        #[source]
        kubeconfig: Box<Error>,
        cluster_env: Box<Error>,
    },

    #[error("failed to determine current context")]
    CurrentContextNotSet,

    #[error("merging kubeconfig with mismatching kind")]
    KindMismatch,
    #[error("merging kubeconfig with mismatching apiVersion")]
    ApiVersionMismatch,

    #[error("unable to load in cluster config, {hostenv} and {portenv} must be defined")]
    /// One or more required in-cluster config options are missing
    MissingInClusterVariables {
        hostenv: &'static str,
        portenv: &'static str,
    },

    #[error("unable to load current context: {context_name}")]
    LoadContext { context_name: String },
    #[error("unable to load cluster of context: {cluster_name}")]
    LoadClusterOfContext { cluster_name: String },
    #[error("unable to find named user: {user_name}")]
    FindUser { user_name: String },

    #[error("unable to find path of kubeconfig")]
    NoKubeconfigPath,

    #[error("failed to decode base64: {0}")]
    Base64Decode(#[source] base64::DecodeError),
    #[error("failed to read '{path:?}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to get data/file with base64 format")]
    NoBase64FileOrData,

    #[error("failed to parse Kubeconfig YAML: {0}")]
    ParseYaml(#[source] serde_yaml::Error),

    #[error("failed to parse PEM-encoded certificates: {0}")]
    ParseCertificates(#[source] pem::PemError),

    #[error("failed to parse proxy url: {0}")]
    ParseProxyUrl(#[source] http::uri::InvalidUri),

    #[error("invalid impersonation header value: {0}")]
    InvalidImpersonationHeader(#[source] http::header::InvalidHeaderValue),
}
