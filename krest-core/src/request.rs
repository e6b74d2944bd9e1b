//! Request builder type for arbitrary api types
use thiserror::Error;

use crate::params::{DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams};

pub(crate) const JSON_MIME: &str = "application/json";

/// Possible errors when building a request.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to build a request.
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] http::Error),
    /// Failed to serialize body.
    #[error("failed to serialize body: {0}")]
    SerializeBody(#[source] serde_json::Error),
    /// Failed to validate request.
    #[error("failed to validate request: {0}")]
    Validation(String),
}

/// A Kubernetes request builder
///
/// Holds a resource's collection url path and builds one [`http::Request`]
/// per api convention. Query parameters assemble deterministically:
/// read/list options first, the special flags (`watch`, `follow`,
/// `previous`, `timestamps`, `container`) last, and a request without
/// parameters carries no `?` at all.
#[derive(Debug, Clone)]
pub struct Request {
    /// The path component of a url
    pub url_path: String,
}

impl Request {
    /// New request with a resource's url path
    pub fn new<S: Into<String>>(url_path: S) -> Self {
        Self {
            url_path: url_path.into(),
        }
    }

    fn item_path(&self, name: &str) -> String {
        format!("{}/{name}", self.url_path)
    }

    fn subresource_path(&self, name: &str, subresource: &str) -> String {
        format!("{}/{name}/{subresource}", self.url_path)
    }
}

// Render `path` plus whatever query pairs `fill` appends; the `?` only
// appears when at least one pair was appended.
pub(crate) fn with_query(path: String, fill: impl FnOnce(&mut form_urlencoded::Serializer<String>)) -> String {
    let mut qp = form_urlencoded::Serializer::new(String::new());
    fill(&mut qp);
    let query = qp.finish();
    if query.is_empty() {
        path
    } else {
        format!("{path}?{query}")
    }
}

/// Convenience methods found from API conventions
impl Request {
    /// List a collection of a resource
    pub fn list(&self, lp: &ListParams) -> Result<http::Request<Vec<u8>>, Error> {
        lp.validate()?;
        let url = with_query(self.url_path.clone(), |qp| lp.populate_qp(qp));
        http::Request::get(url).body(vec![]).map_err(Error::BuildRequest)
    }

    /// Watch a collection for changes
    ///
    /// Callers wanting to resume from a known point set
    /// [`ListParams::at`]; nothing is tracked implicitly.
    pub fn watch(&self, lp: &ListParams) -> Result<http::Request<Vec<u8>>, Error> {
        lp.validate()?;
        let url = with_query(self.url_path.clone(), |qp| {
            lp.populate_qp(qp);
            qp.append_pair("watch", "true");
        });
        http::Request::get(url).body(vec![]).map_err(Error::BuildRequest)
    }

    /// Get a single instance
    pub fn get(&self, name: &str, gp: &GetParams) -> Result<http::Request<Vec<u8>>, Error> {
        let url = with_query(self.item_path(name), |qp| gp.populate_qp(qp));
        http::Request::get(url).body(vec![]).map_err(Error::BuildRequest)
    }

    /// Create an instance of a resource
    pub fn create(&self, pp: &PostParams, data: Vec<u8>) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate()?;
        let url = with_query(self.url_path.clone(), |qp| pp.populate_qp(qp));
        http::Request::post(url)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }

    /// Replace an instance of a resource
    ///
    /// Requires `metadata.resourceVersion` set in data
    pub fn replace(&self, name: &str, pp: &PostParams, data: Vec<u8>) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate()?;
        let url = with_query(self.item_path(name), |qp| pp.populate_qp(qp));
        http::Request::put(url)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }

    /// Delete an instance of a resource
    ///
    /// The request body carries only the `DeleteOptions` serialization of
    /// `dp`.
    pub fn delete(&self, name: &str, dp: &DeleteParams) -> Result<http::Request<Vec<u8>>, Error> {
        let body = serde_json::to_vec(&dp).map_err(Error::SerializeBody)?;
        http::Request::delete(self.item_path(name))
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(body)
            .map_err(Error::BuildRequest)
    }

    /// Delete a collection of a resource, restricted by list selectors
    pub fn delete_collection(
        &self,
        dp: &DeleteParams,
        lp: &ListParams,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        lp.validate()?;
        let url = with_query(self.url_path.clone(), |qp| lp.populate_qp(qp));
        // default options stay off the wire entirely
        let body = if dp.is_default() {
            vec![]
        } else {
            serde_json::to_vec(&dp).map_err(Error::SerializeBody)?
        };
        http::Request::delete(url)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(body)
            .map_err(Error::BuildRequest)
    }

    /// Patch an instance of a resource with a pre-built patch body
    pub fn patch<P: serde::Serialize>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate()?;
        let url = with_query(self.item_path(name), |qp| pp.populate_qp(qp));
        http::Request::patch(url)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, patch.content_type())
            .body(patch.serialize().map_err(Error::SerializeBody)?)
            .map_err(Error::BuildRequest)
    }
}

/// Subresources
impl Request {
    /// Get an instance of the subresource
    pub fn get_subresource(
        &self,
        subresource_name: &str,
        name: &str,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        http::Request::get(self.subresource_path(name, subresource_name))
            .body(vec![])
            .map_err(Error::BuildRequest)
    }

    /// Replace an instance of the subresource
    pub fn replace_subresource(
        &self,
        subresource_name: &str,
        name: &str,
        pp: &PostParams,
        data: Vec<u8>,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate()?;
        let url = with_query(self.subresource_path(name, subresource_name), |qp| pp.populate_qp(qp));
        http::Request::put(url)
            .header(http::header::CONTENT_TYPE, JSON_MIME)
            .body(data)
            .map_err(Error::BuildRequest)
    }

    /// Patch an instance of the subresource with a pre-built patch body
    pub fn patch_subresource<P: serde::Serialize>(
        &self,
        subresource_name: &str,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<http::Request<Vec<u8>>, Error> {
        pp.validate()?;
        let url = with_query(self.subresource_path(name, subresource_name), |qp| pp.populate_qp(qp));
        http::Request::patch(url)
            .header(http::header::ACCEPT, JSON_MIME)
            .header(http::header::CONTENT_TYPE, patch.content_type())
            .body(patch.serialize().map_err(Error::SerializeBody)?)
            .map_err(Error::BuildRequest)
    }
}

/// Sanity checks for the request builder against hand-rolled resource paths
#[cfg(test)]
mod tests {
    use crate::{
        params::{DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams},
        request::Request,
        resource::Resource,
        selector::Expression,
        ApiResource, DynamicObject, GroupVersionKind, NamespaceSelector,
    };
    use http::header;

    fn pods(ns: &NamespaceSelector) -> Request {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true);
        Request::new(DynamicObject::url_path(&ar, ns.name()))
    }

    fn deployments(ns: Option<&str>) -> Request {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("apps", "v1", "Deployment")).namespaced(true);
        Request::new(DynamicObject::url_path(&ar, ns))
    }

    #[test]
    fn list_all_namespaces_path() {
        let req = pods(&NamespaceSelector::All).list(&ListParams::default()).unwrap();
        assert_eq!(req.uri(), "/api/v1/pods");
        assert_eq!(req.method(), "GET");
    }

    #[test]
    fn get_in_system_namespace_path() {
        let req = pods(&NamespaceSelector::System)
            .get("x", &GetParams::default())
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/kube-system/pods/x");
    }

    #[test]
    fn label_selector_is_percent_encoded() {
        let lp = ListParams::default().labels(Expression::Equal("app".into(), "nginx".into()));
        let req = pods(&NamespaceSelector::Default).list(&lp).unwrap();
        assert_eq!(req.uri().query().unwrap(), "labelSelector=app%3Dnginx");
    }

    #[test]
    fn watch_appends_flag_last() {
        let lp = ListParams::default().at("0").timeout(290);
        let req = pods(&NamespaceSelector::Default).watch(&lp).unwrap();
        assert_eq!(
            req.uri(),
            "/api/v1/namespaces/default/pods?resourceVersion=0&timeoutSeconds=290&watch=true"
        );
    }

    #[test]
    fn watch_timeout_error() {
        let lp = ListParams::default().timeout(100000);
        let err = pods(&NamespaceSelector::Default).watch(&lp).unwrap_err();
        assert!(format!("{err}").contains("timeout must be < 295s"));
    }

    #[test]
    fn create_path() {
        let req = deployments(Some("ns"))
            .create(&PostParams::default(), vec![])
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments");
        assert_eq!(req.method(), "POST");
        assert_eq!(req.headers().get(header::CONTENT_TYPE).unwrap(), super::JSON_MIME);
    }

    #[test]
    fn replace_path_with_dry_run() {
        let pp = PostParams {
            dry_run: true,
            ..Default::default()
        };
        let req = deployments(None).replace("myds", &pp, vec![]).unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/deployments/myds?dryRun=All");
        assert_eq!(req.method(), "PUT");
    }

    #[test]
    fn delete_path() {
        let dp = DeleteParams::default();
        let req = deployments(Some("ns")).delete("myrs", &dp).unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/myrs");
        assert_eq!(req.method(), "DELETE");
        assert_eq!(req.body(), &serde_json::to_vec(&dp).unwrap());
    }

    #[test]
    fn delete_collection_path() {
        let lp = ListParams::default().labels(Expression::Equal("app".into(), "myapp".into()));
        let dp = DeleteParams::default();
        let req = deployments(Some("ns")).delete_collection(&dp, &lp).unwrap();
        assert_eq!(
            req.uri(),
            "/apis/apps/v1/namespaces/ns/deployments?labelSelector=app%3Dmyapp"
        );
        assert_eq!(req.method(), "DELETE");
        assert!(req.body().is_empty());
    }

    #[test]
    fn patch_path_sets_content_type() {
        let pp = PatchParams::default();
        let req = deployments(Some("ns"))
            .patch("baz", &pp, &Patch::Merge(serde_json::json!({"spec": {"replicas": 2}})))
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/baz");
        assert_eq!(req.method(), "PATCH");
        assert_eq!(
            req.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/merge-patch+json"
        );
    }

    #[test]
    fn status_subresource_paths() {
        let req = deployments(Some("ns"))
            .get_subresource("status", "mydeploy")
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/mydeploy/status");
        assert_eq!(req.method(), "GET");

        let req = deployments(Some("ns"))
            .replace_subresource("status", "mydeploy", &PostParams::default(), vec![])
            .unwrap();
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/ns/deployments/mydeploy/status");
        assert_eq!(req.method(), "PUT");
    }

    #[test]
    fn scale_subresource_paths() {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Node"));
        let nodes = Request::new(DynamicObject::url_path(&ar, None));
        let req = nodes.get_subresource("scale", "mynode").unwrap();
        assert_eq!(req.uri(), "/api/v1/nodes/mynode/scale");

        let req = nodes
            .patch_subresource("scale", "mynode", &PatchParams::default(), &Patch::Merge(()))
            .unwrap();
        assert_eq!(req.uri(), "/api/v1/nodes/mynode/scale");
        assert_eq!(req.method(), "PATCH");
    }
}
