//! Core traits and types for interacting with the Kubernetes API
//!
//! This crate provides the transport-neutral half of the krest client:
//! resource identifiers, selectors, request parameters, the URL/request
//! builder, and the response envelopes shared by every API call. It contains
//! no HTTP machinery; [`Request`] methods produce plain [`http::Request`]
//! values that the client crate dispatches.

pub mod api_resource;
pub use api_resource::{verbs, ApiResource};

pub mod dynamic;
pub use dynamic::DynamicObject;

pub mod gvk;
pub use gvk::{GroupVersion, GroupVersionKind, GroupVersionResource};

pub mod metadata;
pub use metadata::{ListMeta, ObjectMeta, TypeMeta};

pub mod namespace;
pub use namespace::NamespaceSelector;

pub mod object;
pub use object::ObjectList;

pub mod params;

pub mod request;
pub use request::Request;

mod resource;
pub use resource::{Resource, ResourceExt};

pub mod response;
pub use response::{Status, StatusCause, StatusDetails};

pub mod scope;
pub use scope::{ClusterResourceScope, DynamicResourceScope, NamespaceResourceScope, Scope};

pub mod selector;
pub use selector::{Expression, FieldExpression, FieldSelector, Selector};

pub mod subresource;
pub use subresource::{LogParams, Scale, ScaleSpec, ScaleStatus};

pub mod watch;
pub use watch::WatchEvent;
