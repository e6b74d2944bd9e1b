//! A port of the request parameter *Optionals from apimachinery/types.go
use serde::Serialize;

use crate::{
    request::Error,
    selector::{FieldSelector, Selector},
};

/// Common query parameters used in list/watch/delete-collection calls
#[derive(Clone, Debug, Default)]
pub struct ListParams {
    /// A selector to restrict the list of returned objects by their labels.
    ///
    /// Defaults to everything when empty. All requirements serialize into
    /// one comma-joined `labelSelector` query value.
    pub label_selector: Selector,

    /// A selector to restrict the list of returned objects by their fields.
    ///
    /// Defaults to everything when empty.
    pub field_selector: FieldSelector,

    /// Cap on the number of returned items.
    ///
    /// A capped response carries a continue token in its `ListMeta` for
    /// fetching the next page.
    pub limit: Option<u32>,

    /// Continue token from a previous capped list, for the next page.
    pub continue_token: Option<String>,

    /// The version of the collection to list or watch from.
    ///
    /// Watches do not track this across reconnects; callers wishing to
    /// resume must set it themselves from the last event they observed.
    pub resource_version: Option<String>,

    /// Server-side deadline for the list/watch call, active or idle.
    ///
    /// Bounded below 295s because of [inherent watch limitations](https://github.com/kubernetes/kubernetes/issues/6513).
    pub timeout: Option<u32>,

    /// Pretty-print the response.
    pub pretty: bool,
}

impl ListParams {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(to) = &self.timeout {
            // https://github.com/kubernetes/kubernetes/issues/6513
            if *to >= 295 {
                return Err(Error::Validation("ListParams::timeout must be < 295s".into()));
            }
        }
        Ok(())
    }

    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if !self.label_selector.selects_all() {
            qp.append_pair("labelSelector", &self.label_selector.to_string());
        }
        if !self.field_selector.selects_all() {
            qp.append_pair("fieldSelector", &self.field_selector.to_string());
        }
        if let Some(limit) = &self.limit {
            qp.append_pair("limit", &limit.to_string());
        }
        if let Some(token) = &self.continue_token {
            qp.append_pair("continue", token);
        }
        if let Some(rv) = &self.resource_version {
            qp.append_pair("resourceVersion", rv);
        }
        if let Some(to) = &self.timeout {
            qp.append_pair("timeoutSeconds", &to.to_string());
        }
        if self.pretty {
            qp.append_pair("pretty", "true");
        }
    }
}

/// Chainable setters
///
/// ```
/// use krest_core::params::ListParams;
/// use krest_core::selector::Expression;
/// let lp = ListParams::default()
///     .timeout(60)
///     .labels(Expression::Equal("kubernetes.io/lifecycle".into(), "spot".into()));
/// ```
impl ListParams {
    /// Bound the call's duration server-side
    #[must_use]
    pub fn timeout(mut self, secs: u32) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Restrict the returned objects by their labels
    ///
    /// Repeated calls append requirements; everything serializes into a
    /// single comma-joined selector.
    #[must_use]
    pub fn labels(mut self, selector: impl Into<Selector>) -> Self {
        self.label_selector.extend(selector.into());
        self
    }

    /// Restrict the returned objects by their fields
    ///
    /// The server only supports a limited number of field queries per type.
    #[must_use]
    pub fn fields(mut self, selector: impl Into<FieldSelector>) -> Self {
        self.field_selector.extend(selector.into());
        self
    }

    /// Sets a result limit
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets a continue token
    #[must_use]
    pub fn continue_token(mut self, token: &str) -> Self {
        self.continue_token = Some(token.to_string());
        self
    }

    /// Sets the resource version to list or watch from
    #[must_use]
    pub fn at(mut self, resource_version: &str) -> Self {
        self.resource_version = Some(resource_version.to_string());
        self
    }

    /// Pretty-print the response
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

/// Common query parameters for single-object reads
#[derive(Default, Clone, Debug)]
pub struct GetParams {
    /// Pretty-print the response.
    pub pretty: bool,
    /// Strip cluster-specific fields from the returned object.
    ///
    /// Deprecated server-side since 1.14; serialized only when set.
    pub export: bool,
    /// Only applicable together with `export`; return the exact object.
    ///
    /// Deprecated server-side since 1.14; serialized only when set.
    pub exact: bool,
}

impl GetParams {
    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.pretty {
            qp.append_pair("pretty", "true");
        }
        if self.export {
            qp.append_pair("export", "true");
        }
        if self.exact {
            qp.append_pair("exact", "true");
        }
    }

    /// Pretty-print the response
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

/// Common query parameters for put/post calls
#[derive(Default, Clone, Debug)]
pub struct PostParams {
    /// Whether to run this as a dry run
    pub dry_run: bool,
    /// fieldManager is a name of the actor that is making changes
    pub field_manager: Option<String>,
}

impl PostParams {
    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.dry_run {
            qp.append_pair("dryRun", "All");
        }
        if let Some(ref fm) = self.field_manager {
            qp.append_pair("fieldManager", fm);
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(field_manager) = &self.field_manager {
            // The apiserver enforces the rest of the validation rules
            if field_manager.len() > 128 {
                return Err(Error::Validation(
                    "PostParams::field_manager must be 128 characters or fewer".into(),
                ));
            }
        }
        Ok(())
    }
}

/// A pre-built patch body to apply to a resource
///
/// Only carries bodies the caller has already constructed; this library has
/// no diffing or server-side-apply machinery.
#[non_exhaustive]
#[derive(Debug, PartialEq, Clone)]
pub enum Patch<T: Serialize> {
    /// [JSON Merge patch](https://tools.ietf.org/html/rfc7386)
    Merge(T),
    /// [Strategic JSON Merge patch](https://kubernetes.io/docs/tasks/manage-kubernetes-objects/update-api-object-kubectl-patch/)
    ///
    /// Not supported for custom resources.
    Strategic(T),
}

impl<T: Serialize> Patch<T> {
    pub(crate) fn content_type(&self) -> &'static str {
        match &self {
            Self::Merge(_) => "application/merge-patch+json",
            Self::Strategic(_) => "application/strategic-merge-patch+json",
        }
    }

    pub(crate) fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Merge(p) => serde_json::to_vec(p),
            Self::Strategic(p) => serde_json::to_vec(p),
        }
    }
}

/// Common query parameters for patch calls
#[derive(Default, Clone, Debug)]
pub struct PatchParams {
    /// Whether to run this as a dry run
    pub dry_run: bool,
    /// fieldManager is a name of the actor that is making changes
    pub field_manager: Option<String>,
}

impl PatchParams {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(field_manager) = &self.field_manager {
            if field_manager.len() > 128 {
                return Err(Error::Validation(
                    "PatchParams::field_manager must be 128 characters or fewer".into(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.dry_run {
            qp.append_pair("dryRun", "All");
        }
        if let Some(ref fm) = self.field_manager {
            qp.append_pair("fieldManager", fm);
        }
    }

    /// Perform a dryRun only
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Common query parameters for delete calls
///
/// Serializes to the `meta.v1.DeleteOptions` body of DELETE requests.
#[derive(Default, Clone, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    /// Evaluate the delete server-side without persisting it.
    #[serde(
        serialize_with = "dry_run_all_ser",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub dry_run: bool,

    /// Seconds the object gets to terminate before it is removed.
    ///
    /// Zero removes it immediately; `None` leaves the kind's default grace
    /// period in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<u32>,

    /// What happens to the object's dependents.
    ///
    /// Unset defers to the finalizers already on the object and the kind's
    /// own default policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_policy: Option<PropagationPolicy>,

    /// Guards the delete must satisfy, answered with `409 Conflict` when
    /// they do not hold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Preconditions>,
}

impl DeleteParams {
    fn with_policy(policy: PropagationPolicy) -> Self {
        Self {
            propagation_policy: Some(policy),
            ..Self::default()
        }
    }

    /// Delete with dependents collected in the background
    pub fn background() -> Self {
        Self::with_policy(PropagationPolicy::Background)
    }

    /// Delete with dependents removed first, cascading
    pub fn foreground() -> Self {
        Self::with_policy(PropagationPolicy::Foreground)
    }

    /// Delete leaving dependents behind
    pub fn orphan() -> Self {
        Self::with_policy(PropagationPolicy::Orphan)
    }

    /// Perform a dryRun only
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Set the duration in seconds before the object should be deleted.
    #[must_use]
    pub fn grace_period(mut self, secs: u32) -> Self {
        self.grace_period_seconds = Some(secs);
        self
    }

    /// Set the conditions that must be fulfilled before a deletion is carried out.
    #[must_use]
    pub fn preconditions(mut self, preconditions: Preconditions) -> Self {
        self.preconditions = Some(preconditions);
        self
    }

    pub(crate) fn is_default(&self) -> bool {
        !self.dry_run
            && self.grace_period_seconds.is_none()
            && self.propagation_policy.is_none()
            && self.preconditions.is_none()
    }
}

// dryRun is `true`/`false` in query strings but `["All"]` (or absent) in a
// DeleteOptions body; the plain bool hides that asymmetry.
fn dry_run_all_ser<S: serde::Serializer>(enabled: &bool, s: S) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    if *enabled {
        let mut seq = s.serialize_seq(Some(1))?;
        seq.serialize_element("All")?;
        seq.end()
    } else {
        s.serialize_none()
    }
}

/// Guards checked server-side before a write or delete goes through.
#[derive(Default, Clone, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Preconditions {
    /// The resourceVersion the live object must still have
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// The uid the live object must still have
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Propagation policy when deleting single objects
#[derive(Clone, Debug, Serialize)]
pub enum PropagationPolicy {
    /// Orphan dependents
    Orphan,
    /// Allow the garbage collector to delete the dependents in the background
    Background,
    /// A cascading policy that deletes all dependents in the foreground
    Foreground,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{Expression, FieldExpression};

    #[test]
    fn delete_param_serialize() {
        let mut dp = DeleteParams::default();
        let emptyser = serde_json::to_string(&dp).unwrap();
        assert_eq!(emptyser, "{}");

        dp.dry_run = true;
        let ser = serde_json::to_string(&dp).unwrap();
        assert_eq!(ser, "{\"dryRun\":[\"All\"]}");
    }

    #[test]
    fn delete_param_constructors() {
        let dp_background = DeleteParams::background();
        let ser = serde_json::to_value(&dp_background).unwrap();
        assert_eq!(ser, serde_json::json!({"propagationPolicy": "Background"}));

        let dp_foreground = DeleteParams::foreground();
        let ser = serde_json::to_value(&dp_foreground).unwrap();
        assert_eq!(ser, serde_json::json!({"propagationPolicy": "Foreground"}));

        let dp_orphan = DeleteParams::orphan();
        let ser = serde_json::to_value(&dp_orphan).unwrap();
        assert_eq!(ser, serde_json::json!({"propagationPolicy": "Orphan"}));
    }

    #[test]
    fn list_params_merge_selectors() {
        let lp = ListParams::default()
            .labels(Expression::Equal("app".into(), "nginx".into()))
            .labels(Expression::Exists("release".into()))
            .fields(FieldExpression::Equal("status.phase".into(), "Running".into()));
        let mut qp = form_urlencoded::Serializer::new(String::new());
        lp.populate_qp(&mut qp);
        assert_eq!(
            qp.finish(),
            "labelSelector=app%3Dnginx%2Crelease&fieldSelector=status.phase%3DRunning"
        );
    }

    #[test]
    fn list_params_deterministic_order() {
        let lp = ListParams::default().pretty().limit(5).at("10").timeout(30);
        let mut qp = form_urlencoded::Serializer::new(String::new());
        lp.populate_qp(&mut qp);
        assert_eq!(qp.finish(), "limit=5&resourceVersion=10&timeoutSeconds=30&pretty=true");
    }

    #[test]
    fn list_params_timeout_validation() {
        let lp = ListParams::default().timeout(295);
        assert!(lp.validate().is_err());
        assert!(ListParams::default().timeout(294).validate().is_ok());
    }

    #[test]
    fn get_params_deprecated_flags() {
        let gp = GetParams {
            export: true,
            exact: true,
            ..GetParams::default()
        };
        let mut qp = form_urlencoded::Serializer::new(String::new());
        gp.populate_qp(&mut qp);
        assert_eq!(qp.finish(), "export=true&exact=true");
    }
}
