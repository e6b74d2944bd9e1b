//! API helpers for structured interaction with the Kubernetes API

mod core_methods;
mod subresource;
mod task;

use std::fmt::Debug;

pub use subresource::Log;
pub use task::{LogTask, WatchTask};

// Re-exports from krest-core
pub use krest_core::{
    api_resource::{verbs, ApiResource},
    dynamic::DynamicObject,
    gvk::{GroupVersion, GroupVersionKind, GroupVersionResource},
    metadata::{ListMeta, ObjectMeta, TypeMeta},
    namespace::NamespaceSelector,
    object::ObjectList,
    params::{
        DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, Preconditions,
        PropagationPolicy,
    },
    request::Request,
    response::Status,
    selector::{Expression, FieldExpression, FieldSelector, Selector},
    subresource::{LogParams, Scale, ScaleSpec, ScaleStatus},
    watch::WatchEvent,
    ClusterResourceScope, DynamicResourceScope, NamespaceResourceScope, Resource, ResourceExt,
};

use crate::{Client, Error, Result};

/// The generic Api abstraction
///
/// This abstracts over a [`Request`] and a type `K` so that
/// we get automatic serialization/deserialization on the api calls
/// implemented by the dynamic [`Resource`].
///
/// The scope-constrained constructors double as the namespace facades: a
/// cluster handle always targets the bare collection path, a namespaced
/// handle pins its namespace at construction.
pub struct Api<K> {
    /// The request builder object with its resource dependent url
    pub(crate) request: Request,
    /// The client to use (from this library)
    pub(crate) client: Client,
    namespace: Option<String>,
    /// Capability descriptor consulted before dispatch for dynamic kinds
    pub(crate) capabilities: Option<ApiResource>,
    /// `iter::Empty` rather than `PhantomData`: no `K` is ever stored, and
    /// `Empty<K>` stays `Send` whether or not `K` is.
    pub(crate) _phantom: std::iter::Empty<K>,
}

// Manual impl instead of `#[derive(Clone)]`: a derive would add an implicit
// `K: Clone` bound even though `Empty<K>` is `Clone` regardless of `K`.
impl<K> Clone for Api<K> {
    fn clone(&self) -> Self {
        Self {
            request: self.request.clone(),
            client: self.client.clone(),
            namespace: self.namespace.clone(),
            capabilities: self.capabilities.clone(),
            _phantom: self._phantom.clone(),
        }
    }
}

impl<K> Api<K> {
    // every constructor funnels through here
    fn pinned(client: Client, url: String, namespace: Option<&str>, capabilities: Option<&ApiResource>) -> Self {
        Self {
            request: Request::new(url),
            client,
            namespace: namespace.map(str::to_string),
            capabilities: capabilities.cloned(),
            _phantom: std::iter::empty(),
        }
    }
}

/// Constructors for statically typed resources (`DynamicType = ()`-style).
///
/// The scope bound on each constructor is the facade: cluster kinds cannot
/// be namespaced, namespaced kinds pick their namespace dimension here.
impl<K: Resource> Api<K>
where
    <K as Resource>::DynamicType: Default,
{
    /// Handle on a cluster-level resource collection
    pub fn cluster(client: Client) -> Self
    where
        K: Resource<Scope = ClusterResourceScope>,
    {
        Self::pinned(client, K::url_path(&Default::default(), None), None, None)
    }

    /// Handle on a namespaced resource across every namespace
    pub fn all(client: Client) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Self::pinned(client, K::url_path(&Default::default(), None), None, None)
    }

    /// Handle on a namespaced resource pinned to one namespace
    pub fn namespaced(client: Client, ns: &str) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Self::pinned(client, K::url_path(&Default::default(), Some(ns)), Some(ns), None)
    }

    /// Handle pinned to the client's default namespace
    ///
    /// That is `default` when loaded from a kubeconfig without a context
    /// namespace, or the service account's namespace in cluster.
    pub fn default_namespaced(client: Client) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        let ns = client.default_ns().to_string();
        Self::namespaced(client, &ns)
    }

    /// Handle addressed through a [`NamespaceSelector`]
    ///
    /// `All` targets every namespace (the url carries no `namespaces/`
    /// segment); everything else resolves to its namespace name.
    pub fn within(client: Client, ns: &NamespaceSelector) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        match ns.name() {
            Some(name) => Self::namespaced(client, name),
            None => Self::all(client),
        }
    }
}

/// Constructors for runtime-typed resources ([`DynamicObject`]).
///
/// The [`ApiResource`] supplies identity, scope, and the capability lists
/// consulted before dispatch.
impl<K> Api<K>
where
    K: Resource<DynamicType = ApiResource, Scope = DynamicResourceScope>,
{
    /// Handle on a cluster-level resource collection
    pub fn cluster_with(client: Client, dyntype: &ApiResource) -> Self {
        Self::pinned(client, K::url_path(dyntype, None), None, Some(dyntype))
    }

    /// Handle on a namespaced resource across every namespace
    pub fn all_with(client: Client, dyntype: &ApiResource) -> Self {
        Self::pinned(client, K::url_path(dyntype, None), None, Some(dyntype))
    }

    /// Handle on a namespaced resource pinned to one namespace
    pub fn namespaced_with(client: Client, ns: &str, dyntype: &ApiResource) -> Self {
        Self::pinned(client, K::url_path(dyntype, Some(ns)), Some(ns), Some(dyntype))
    }

    /// Handle pinned to the client's default namespace
    pub fn default_namespaced_with(client: Client, dyntype: &ApiResource) -> Self {
        let ns = client.default_ns().to_string();
        Self::namespaced_with(client, &ns, dyntype)
    }

    /// Handle addressed through a [`NamespaceSelector`]
    pub fn within_with(client: Client, ns: &NamespaceSelector, dyntype: &ApiResource) -> Self {
        match ns.name() {
            Some(name) => Self::namespaced_with(client, name, dyntype),
            None => Self::all_with(client, dyntype),
        }
    }
}

impl<K> Api<K> {
    /// Consume self and return the [`Client`]
    pub fn into_client(self) -> Client {
        self.into()
    }

    /// Return a reference to the current resource url path
    pub fn resource_url(&self) -> &str {
        &self.request.url_path
    }

    // Dynamic kinds carry a capability descriptor; a verb the descriptor
    // rules out fails before dispatch with the server's 405 shape.
    pub(crate) fn check_verb(&self, verb: &'static str) -> Result<()> {
        if let Some(ar) = &self.capabilities {
            if !ar.supports(verb) {
                return Err(Error::Api(Status::method_not_allowed(verb)));
            }
        }
        Ok(())
    }

    pub(crate) fn check_subresource(&self, name: &'static str) -> Result<()> {
        if let Some(ar) = &self.capabilities {
            if !ar.supports_subresource(name) {
                return Err(Error::Api(Status::method_not_allowed(name)));
            }
        }
        Ok(())
    }
}

impl<K> From<Api<K>> for Client {
    fn from(api: Api<K>) -> Self {
        api.client
    }
}

impl<K> Debug for Api<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("request", &self.request)
            .field("client", &"...")
            .field("namespace", &self.namespace)
            .finish()
    }
}
