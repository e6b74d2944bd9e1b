//! Crate for interacting with the Kubernetes API
//!
//! This crate ties together [`krest_core`] (resource identifiers, the
//! request builder, response envelopes) and [`krest_client`] (config
//! loading, the dispatch and streaming engines, the generic [`Api`]) into
//! one surface.
//!
//! # Example
//!
//! The following example will create a `Pod` through the dynamic api and
//! then watch its collection for changes with a managed re-connecting
//! watch:
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use krest::{
//!     api::{Api, ListParams, PostParams, RetryStrategy, WatchEvent},
//!     core::{ApiResource, DynamicObject, GroupVersionKind},
//!     Client,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads the environment to find config for the client: the
//!     // kubeconfig paths first, then the in-cluster service account.
//!     let client = Client::try_default().await?;
//!
//!     let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true);
//!     let pods: Api<DynamicObject> = Api::default_namespaced_with(client, &ar);
//!
//!     let pod = DynamicObject::new("my-pod", &ar).data(serde_json::json!({
//!         "spec": {
//!             "containers": [{ "name": "main", "image": "registry.local/hello:v1" }],
//!         }
//!     }));
//!     pods.create(&PostParams::default(), &pod).await?;
//!
//!     let task = pods.watch_task(&ListParams::default(), RetryStrategy::default());
//!     let mut events = task.start().boxed();
//!     while let Some(event) = events.next().await {
//!         match event? {
//!             WatchEvent::Added(o) | WatchEvent::Modified(o) => {
//!                 println!("saw {:?}", o.metadata.name)
//!             }
//!             WatchEvent::Deleted(o) => println!("gone {:?}", o.metadata.name),
//!             WatchEvent::Error(status) => println!("watch error: {status}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! For details, see:
//!
//! - [`Client`] for the extensible Kubernetes client
//! - [`Config`] for the Kubernetes config abstraction
//! - [`Api`] for the generic api methods available on Kubernetes resources

/// Generic api methods and request parameters
pub mod api {
    pub use krest_client::api::{
        verbs, Api, ApiResource, DeleteParams, DynamicObject, Expression, FieldExpression,
        FieldSelector, GetParams, ListParams, Log, LogParams, LogTask, NamespaceSelector, ObjectList,
        Patch, PatchParams, PostParams, Preconditions, PropagationPolicy, Request, Resource,
        ResourceExt, Scale, ScaleSpec, ScaleStatus, Selector, Status, WatchEvent, WatchTask,
    };
    pub use krest_client::client::retry::{Backoff, RetryAttempt, RetryPolicy, RetrySchedule, RetryStrategy};
}

/// Client and service-stack building blocks
pub mod client {
    pub use krest_client::client::{
        middleware, retry, AuthError, Client, ClientBuilder, ConfigExt, DynBody, TlsError,
    };
}

/// Kubernetes configuration handling
pub mod config {
    pub use krest_client::config::{
        AuthInfo, AuthProviderConfig, Cluster, Config, Context, ExecConfig, KubeConfigOptions,
        Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
    };
}

/// Error variants surfaced at the api boundary
pub mod error {
    pub use krest_client::error::{ConfigError, Error, Status};
}

#[doc(inline)] pub use api::Api;
#[doc(inline)] pub use krest_client::Client;
#[doc(inline)] pub use krest_client::Config;
#[doc(inline)] pub use krest_client::Error;
/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub use krest_core as core;
