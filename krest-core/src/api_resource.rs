//! Value-level descriptors for resource kinds not known at compile time.
use serde::{Deserialize, Serialize};

use crate::{
    gvk::{GroupVersionKind, GroupVersionResource},
    resource::Resource,
};

/// Canonical verb names used in capability checks.
pub mod verbs {
    /// Fetch a single object
    pub const GET: &str = "get";
    /// List a collection
    pub const LIST: &str = "list";
    /// Create an object
    pub const CREATE: &str = "create";
    /// Replace an object
    pub const UPDATE: &str = "update";
    /// Delete a single object
    pub const DELETE: &str = "delete";
    /// Delete a whole collection
    pub const DELETE_COLLECTION: &str = "deletecollection";
    /// Patch an object
    pub const PATCH: &str = "patch";
    /// Watch a collection for changes
    pub const WATCH: &str = "watch";
}

/// Information about a Kubernetes API resource kind, enough to work with it.
///
/// Used as the dynamic type for [`DynamicObject`](crate::DynamicObject) so
/// custom kinds can be queried without static bindings. The `verbs` and
/// `subresources` lists describe what the server supports for the kind; the
/// generic client consults them before dispatching and an empty list means
/// unrestricted (the minimal constructors cannot know better).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ApiResource {
    /// Resource group, empty for core group.
    pub group: String,
    /// group version
    pub version: String,
    /// apiVersion of the resource (v1 for core group,
    /// group/version for other).
    pub api_version: String,
    /// Singular PascalCase name of the kind
    pub kind: String,
    /// Plural name of the resource
    pub plural: String,
    /// Whether the resource is namespaced or not
    pub namespaced: bool,
    /// Verbs the server supports for the resource; empty means unrestricted
    pub verbs: Vec<String>,
    /// Subresources served under items (`status`, `scale`, `log`); empty means unrestricted
    pub subresources: Vec<String>,
}

impl ApiResource {
    /// Descriptor for a statically typed resource, by erasing its trait identity
    pub fn erase<K: Resource>(dt: &K::DynamicType) -> Self {
        ApiResource {
            group: K::group(dt).to_string(),
            version: K::version(dt).to_string(),
            api_version: K::api_version(dt).to_string(),
            kind: K::kind(dt).to_string(),
            plural: K::plural(dt).to_string(),
            namespaced: false,
            verbs: vec![],
            subresources: vec![],
        }
    }

    /// Descriptor from an explicit GVK, plural name, and scope
    pub fn new(gvk: &GroupVersionKind, plural: &str, namespaced: bool) -> Self {
        ApiResource {
            api_version: gvk.api_version(),
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            kind: gvk.kind.clone(),
            plural: plural.to_string(),
            namespaced,
            verbs: vec![],
            subresources: vec![],
        }
    }

    /// Descriptor from a GVK alone, with a guessed plural name
    ///
    /// The guess can miss on custom kinds with irregular pluralization;
    /// prefer [`ApiResource::new`] when the plural is known. Scope starts
    /// as cluster until [`ApiResource::namespaced`] says otherwise.
    pub fn from_gvk(gvk: &GroupVersionKind) -> Self {
        ApiResource::new(gvk, &crate::resource::to_plural(&gvk.kind.to_ascii_lowercase()), false)
    }

    /// Set whether the resource is namespace scoped
    #[must_use]
    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    /// Restrict the verbs the resource supports
    #[must_use]
    pub fn verbs(mut self, verbs: &[&str]) -> Self {
        self.verbs = verbs.iter().map(|x| x.to_string()).collect();
        self
    }

    /// Restrict the subresources the resource serves
    #[must_use]
    pub fn subresources(mut self, subresources: &[&str]) -> Self {
        self.subresources = subresources.iter().map(|x| x.to_string()).collect();
        self
    }

    /// Whether the resource supports a verb; unrestricted when no verbs were set
    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.is_empty() || self.verbs.iter().any(|v| v == verb)
    }

    /// Whether the resource serves a subresource; unrestricted when none were set
    pub fn supports_subresource(&self, name: &str) -> bool {
        self.subresources.is_empty() || self.subresources.iter().any(|s| s == name)
    }
}

impl From<&ApiResource> for GroupVersionKind {
    fn from(ar: &ApiResource) -> Self {
        GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind)
    }
}

impl From<&ApiResource> for GroupVersionResource {
    fn from(ar: &ApiResource) -> Self {
        GroupVersionResource::gvr(&ar.group, &ar.version, &ar.plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvk::GroupVersionKind;

    #[test]
    fn plural_guessing() {
        let gvk = GroupVersionKind::gvk("clux.dev", "v1", "Foo");
        let ar = ApiResource::from_gvk(&gvk);
        assert_eq!(ar.plural, "foos");
        assert_eq!(ar.api_version, "clux.dev/v1");
    }

    #[test]
    fn identifier_conversions() {
        let gvk = GroupVersionKind::gvk("apps", "v1", "Deployment");
        let ar = ApiResource::new(&gvk, "deployments", true);
        assert_eq!(crate::GroupVersionKind::from(&ar), gvk);
        let gvr = crate::GroupVersionResource::from(&ar);
        assert_eq!(gvr.resource, "deployments");
        assert_eq!(gvr.url_path(Some("ns")), "/apis/apps/v1/namespaces/ns/deployments");
    }

    #[test]
    fn capability_checks() {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let ar = ApiResource::new(&gvk, "pods", true).verbs(&["get", "list"]);
        assert!(ar.supports(verbs::GET));
        assert!(ar.supports(verbs::LIST));
        assert!(!ar.supports(verbs::DELETE));

        let unrestricted = ApiResource::new(&gvk, "pods", true);
        assert!(unrestricted.supports(verbs::DELETE));
        assert!(unrestricted.supports_subresource("status"));
    }
}
