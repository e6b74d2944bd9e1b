use std::{borrow::Cow, collections::BTreeMap, sync::OnceLock};

use crate::{metadata::ObjectMeta, scope::ResourceScope};

/// An accessor trait for a kubernetes Resource.
///
/// This is the registry mapping a Rust type to its API identity: group,
/// version, kind, plural resource name, and scope. Types that know their
/// identity at compile time select `DynamicType = ()`; runtime-typed kinds
/// (see [`DynamicObject`](crate::DynamicObject)) carry an
/// [`ApiResource`](crate::ApiResource) instead.
pub trait Resource {
    /// Type information for types that do not know their resource information at compile time.
    type DynamicType: Send + Sync + 'static;

    /// Whether the resource is cluster-scoped, namespaced, or dynamic.
    type Scope: ResourceScope;

    /// Returns kind of this object
    fn kind(dt: &Self::DynamicType) -> Cow<'_, str>;
    /// Returns group of this object
    fn group(dt: &Self::DynamicType) -> Cow<'_, str>;
    /// Returns version of this object
    fn version(dt: &Self::DynamicType) -> Cow<'_, str>;

    /// Returns apiVersion of this object
    fn api_version(dt: &Self::DynamicType) -> Cow<'_, str> {
        let group = Self::group(dt);
        let version = Self::version(dt);
        if group.is_empty() {
            version
        } else {
            format!("{group}/{version}").into()
        }
    }

    /// Returns the plural name of the kind
    ///
    /// Known as the resource in apimachinery; renamed here for
    /// disambiguation. Inferred by pluralization by default, which covers
    /// the builtin kinds; dynamic kinds override this with the discovered
    /// value.
    fn plural(dt: &Self::DynamicType) -> Cow<'_, str> {
        to_plural(&Self::kind(dt).to_ascii_lowercase()).into()
    }

    /// Creates a url path for http requests for this resource
    ///
    /// `/api/<version>` for the core group, `/apis/<group>/<version>`
    /// otherwise, with an optional `namespaces/<ns>/` segment in between.
    fn url_path(dt: &Self::DynamicType, namespace: Option<&str>) -> String {
        let prefix = if Self::group(dt).is_empty() { "/api" } else { "/apis" };
        let mut path = format!("{prefix}/{}", Self::api_version(dt));
        if let Some(ns) = namespace {
            path.push_str("/namespaces/");
            path.push_str(ns);
        }
        path.push('/');
        path.push_str(&Self::plural(dt));
        path
    }

    /// Metadata that all persisted resources must have
    fn meta(&self) -> &ObjectMeta;
    /// Metadata that all persisted resources must have
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

/// Helper methods for resources.
pub trait ResourceExt: Resource {
    /// The name of the resource, or an empty string when it is not yet set
    fn name_any(&self) -> String;
    /// The namespace the resource is in
    fn namespace(&self) -> Option<String>;
    /// The resource version
    fn resource_version(&self) -> Option<String>;
    /// Unique ID for the object's lifetime
    fn uid(&self) -> Option<String>;
    /// Returns resource labels
    fn labels(&self) -> &BTreeMap<String, String>;
    /// Provides mutable access to the labels
    fn labels_mut(&mut self) -> &mut BTreeMap<String, String>;
    /// Returns resource annotations
    fn annotations(&self) -> &BTreeMap<String, String>;
    /// Provides mutable access to the annotations
    fn annotations_mut(&mut self) -> &mut BTreeMap<String, String>;
    /// Returns resource finalizers
    fn finalizers(&self) -> &[String];
    /// Provides mutable access to the finalizers
    fn finalizers_mut(&mut self) -> &mut Vec<String>;
}

// shared empty map so the borrowing accessors have something to return
fn empty_map() -> &'static BTreeMap<String, String> {
    static EMPTY: OnceLock<BTreeMap<String, String>> = OnceLock::new();
    EMPTY.get_or_init(BTreeMap::new)
}

impl<K: Resource> ResourceExt for K {
    fn name_any(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    fn namespace(&self) -> Option<String> {
        self.meta().namespace.clone()
    }

    fn resource_version(&self) -> Option<String> {
        self.meta().resource_version.clone()
    }

    fn uid(&self) -> Option<String> {
        self.meta().uid.clone()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        self.meta().labels.as_ref().unwrap_or_else(|| empty_map())
    }

    fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().labels.get_or_insert_with(BTreeMap::new)
    }

    fn annotations(&self) -> &BTreeMap<String, String> {
        self.meta().annotations.as_ref().unwrap_or_else(|| empty_map())
    }

    fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().annotations.get_or_insert_with(BTreeMap::new)
    }

    fn finalizers(&self) -> &[String] {
        self.meta().finalizers.as_deref().unwrap_or_default()
    }

    fn finalizers_mut(&mut self) -> &mut Vec<String> {
        self.meta_mut().finalizers.get_or_insert_with(Vec::new)
    }
}

// Lowercase kind to conventional resource name. English pluralization plus
// the kinds that break it.
pub(crate) fn to_plural(word: &str) -> String {
    match word {
        "endpoints" | "endpointslices" => return word.into(),
        "nodemetrics" => return "nodes".into(),
        "podmetrics" => return "pods".into(),
        _ => {}
    }

    // sibilant endings take -es
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{word}es");
    }

    // consonant + y becomes -ies
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.is_empty() && !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }

    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::NamespaceResourceScope;

    #[derive(Clone, Default)]
    struct ConfigMap {
        metadata: ObjectMeta,
    }

    impl Resource for ConfigMap {
        type DynamicType = ();
        type Scope = NamespaceResourceScope;

        fn kind(_: &()) -> Cow<'_, str> {
            "ConfigMap".into()
        }

        fn group(_: &()) -> Cow<'_, str> {
            "".into()
        }

        fn version(_: &()) -> Cow<'_, str> {
            "v1".into()
        }

        fn meta(&self) -> &ObjectMeta {
            &self.metadata
        }

        fn meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.metadata
        }
    }

    #[test]
    fn static_types_register_their_identity() {
        assert_eq!(ConfigMap::api_version(&()), "v1");
        assert_eq!(ConfigMap::plural(&()), "configmaps");
        assert_eq!(
            ConfigMap::url_path(&(), Some("kube-system")),
            "/api/v1/namespaces/kube-system/configmaps"
        );
        assert_eq!(ConfigMap::url_path(&(), None), "/api/v1/configmaps");
    }

    #[test]
    fn resource_ext_accessors() {
        let mut cm = ConfigMap::default();
        assert_eq!(cm.name_any(), "");
        cm.meta_mut().name = Some("settings".into());
        cm.labels_mut().insert("app".into(), "web".into());
        assert_eq!(cm.name_any(), "settings");
        assert_eq!(cm.labels().get("app").map(String::as_str), Some("web"));
        assert!(cm.annotations().is_empty());
        assert!(cm.finalizers().is_empty());
    }

    #[test]
    fn pluralization_of_builtin_kinds() {
        #[rustfmt::skip]
        let native_kinds = vec![
            ("ClusterRole", "clusterroles"),
            ("ComponentStatus", "componentstatuses"),
            ("CronJob", "cronjobs"),
            ("CustomResourceDefinition", "customresourcedefinitions"),
            ("Deployment", "deployments"),
            ("Endpoints", "endpoints"), ("EndpointSlice", "endpointslices"),
            ("Ingress", "ingresses"), ("IngressClass", "ingressclasses"),
            ("Lease", "leases"),
            ("Namespace", "namespaces"),
            ("NetworkPolicy", "networkpolicies"),
            ("Node", "nodes"),
            ("PersistentVolumeClaim", "persistentvolumeclaims"),
            ("Pod", "pods"),
            ("PriorityClass", "priorityclasses"),
            ("ReplicaSet", "replicasets"),
            ("ResourceQuota", "resourcequotas"),
            ("Secret", "secrets"),
            ("Service", "services"),
            ("StatefulSet", "statefulsets"),
            ("StorageClass", "storageclasses"),
            ("VolumeAttachment", "volumeattachments"),
        ];
        for (kind, plural) in native_kinds {
            assert_eq!(to_plural(&kind.to_ascii_lowercase()), plural, "{kind}");
        }
    }
}
