//! Runtime-typed objects for kinds without static bindings.
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{
    api_resource::ApiResource,
    metadata::{ObjectMeta, TypeMeta},
    resource::Resource,
    scope::DynamicResourceScope,
};

/// An object of a kind only known at runtime
///
/// Metadata and type fields are structured; everything else rides in
/// `data` as raw JSON. Identity and scope travel separately in the
/// [`ApiResource`] handed to the `Api` constructors.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DynamicObject {
    /// The type fields, not always present
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    /// Object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// All other keys
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl DynamicObject {
    /// A named, otherwise empty object of the descriptor's kind.
    #[must_use]
    pub fn new(name: &str, resource: &ApiResource) -> Self {
        DynamicObject {
            types: Some(TypeMeta {
                api_version: resource.api_version.clone(),
                kind: resource.kind.clone(),
            }),
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..ObjectMeta::default()
            },
            data: serde_json::Value::Null,
        }
    }

    /// Set the unstructured payload (spec, status, whatever the kind holds)
    #[must_use]
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Place the object in a namespace
    #[must_use]
    pub fn within(mut self, ns: &str) -> Self {
        self.metadata.namespace = Some(ns.into());
        self
    }
}

impl Resource for DynamicObject {
    type DynamicType = ApiResource;
    type Scope = DynamicResourceScope;

    fn group(dt: &ApiResource) -> Cow<'_, str> {
        dt.group.as_str().into()
    }

    fn version(dt: &ApiResource) -> Cow<'_, str> {
        dt.version.as_str().into()
    }

    fn kind(dt: &ApiResource) -> Cow<'_, str> {
        dt.kind.as_str().into()
    }

    fn api_version(dt: &ApiResource) -> Cow<'_, str> {
        dt.api_version.as_str().into()
    }

    fn plural(dt: &ApiResource) -> Cow<'_, str> {
        dt.plural.as_str().into()
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        api_resource::ApiResource,
        dynamic::DynamicObject,
        gvk::GroupVersionKind,
        params::{ListParams, PostParams},
        request::Request,
        resource::Resource,
    };

    #[test]
    fn custom_kind_paths_come_from_the_descriptor() {
        let descriptor = ApiResource::from_gvk(&GroupVersionKind::gvk("example.net", "v1alpha1", "Widget"))
            .namespaced(true);

        let collection = DynamicObject::url_path(&descriptor, Some("factory"));
        let req = Request::new(&collection)
            .create(&PostParams::default(), vec![])
            .unwrap();
        assert_eq!(req.uri(), "/apis/example.net/v1alpha1/namespaces/factory/widgets");

        // core-group kinds route through /api
        let services = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Service"));
        let req = Request::new(DynamicObject::url_path(&services, None))
            .list(&ListParams::default())
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/services");
    }

    #[test]
    fn payload_round_trips_through_flatten() {
        let descriptor =
            ApiResource::from_gvk(&GroupVersionKind::gvk("example.net", "v1alpha1", "Widget")).namespaced(true);
        let widget = DynamicObject::new("gear", &descriptor)
            .within("factory")
            .data(serde_json::json!({ "spec": { "teeth": 12 } }));

        let encoded = serde_json::to_value(&widget).unwrap();
        assert_eq!(encoded["apiVersion"], "example.net/v1alpha1");
        assert_eq!(encoded["kind"], "Widget");
        assert_eq!(encoded["metadata"]["namespace"], "factory");
        assert_eq!(encoded["spec"]["teeth"], 12);

        let decoded: DynamicObject = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, widget);
    }
}
