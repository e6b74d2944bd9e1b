//! A typed generic client for the Kubernetes API
//!
//! This crate provides the HTTP half of krest: configuration loading, the
//! dispatch engine, the line-framed streaming engine, and the generic
//! [`Api`] over any [`Resource`](krest_core::Resource).
//!
//! # Example
//!
//! Fetch a custom resource in the configured namespace:
//!
//! ```rust,no_run
//! use krest_client::{api::Api, Client};
//! use krest_core::{ApiResource, DynamicObject, GroupVersionKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads `KUBECONFIG`/`~/.kube/config`, falling back to the
//!     // in-cluster service account.
//!     let client = Client::try_default().await?;
//!
//!     let gvk = GroupVersionKind::gvk("", "v1", "Pod");
//!     let ar = ApiResource::from_gvk(&gvk).namespaced(true);
//!     let pods: Api<DynamicObject> = Api::default_namespaced_with(client, &ar);
//!     let pod = pods.get("blog").await?;
//!     println!("found {:?}", pod.metadata.name);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;

#[doc(inline)] pub use api::Api;
#[doc(inline)] pub use client::Client;
#[doc(inline)] pub use config::Config;
#[doc(inline)] pub use error::Error;

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub use krest_core as core;
