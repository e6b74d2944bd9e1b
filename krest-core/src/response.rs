//! The `Status` envelope returned by the api server.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A Kubernetes `meta.v1.Status` object
///
/// Returned by the server for most failures and for some non-error
/// operations (deletions in particular). All fields are defaulted so
/// partial envelopes still decode.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Error)]
#[error("{message}: {reason}")]
pub struct Status {
    /// Suggested HTTP return code (0 if unset)
    #[serde(default)]
    pub code: u16,

    /// Status of the operation
    ///
    /// One of: `Success` or `Failure`. Required on decode: this is what
    /// tells an envelope apart from a resource whose fields happen to be
    /// absent.
    pub status: String,

    /// A human-readable description of the status of this operation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// A machine-readable description of why this operation is in the
    /// "Failure" status
    ///
    /// A Reason clarifies an HTTP status code but does not override it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Extended data associated with the reason
    ///
    /// Each reason may define its own extended details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

impl Status {
    /// Whether the operation is reported as successful
    pub fn is_success(&self) -> bool {
        self.status == "Success"
    }

    /// The 405 envelope returned when a verb is not supported for a resource
    pub fn method_not_allowed(verb: &str) -> Self {
        Status {
            code: 405,
            status: "Failure".into(),
            message: format!("{verb} is not supported for this resource"),
            reason: "MethodNotAllowed".into(),
            details: None,
        }
    }

    /// A minimal success envelope carrying only an HTTP code
    ///
    /// Some delete calls return the deleted object instead of a `Status`;
    /// the dispatch layer substitutes this value so such calls still
    /// succeed.
    pub fn success_with_code(code: u16) -> Self {
        Status {
            code,
            status: "Success".into(),
            message: String::new(),
            reason: String::new(),
            details: None,
        }
    }
}

/// Status details object on the [`Status`] object
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    /// The name attribute of the resource associated with the status
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The group attribute of the resource associated with the status
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    /// The kind attribute of the resource associated with the status
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// UID of the resource (when there is a single resource which can be described)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// The Causes vector includes more details associated with the failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,

    /// If specified, the time in seconds before the operation should be retried
    #[serde(default)]
    pub retry_after_seconds: u32,
}

/// Status cause object on the [`StatusDetails`] object
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct StatusCause {
    /// A machine-readable description of the cause of the error
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// A human-readable description of the cause of the error
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// The field of the resource that has caused this error, as named by its JSON serialization
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn partial_envelopes_decode_with_defaults() {
        // a delete confirmation: no code, no message, sparse details
        let confirmation = r#"{
            "kind": "Status", "apiVersion": "v1", "metadata": {},
            "status": "Success",
            "details": { "name": "web", "kind": "services", "uid": "0000-1111" }
        }"#;
        let s: Status = serde_json::from_str(confirmation).unwrap();
        assert!(s.is_success());
        assert_eq!(s.code, 0);
        assert_eq!(s.details.unwrap().name, "web");

        // details may omit the name entirely
        let nameless = r#"{"kind":"Status","status":"Success","details":{"kind":"services"}}"#;
        let s: Status = serde_json::from_str(nameless).unwrap();
        assert_eq!(s.details.unwrap().name, "");
    }

    #[test]
    fn objects_do_not_decode_as_envelopes() {
        // `status` is required precisely so resources cannot masquerade
        let pod = r#"{"kind":"Pod","metadata":{"name":"x"}}"#;
        assert!(serde_json::from_str::<Status>(pod).is_err());
    }

    #[test]
    fn not_found_has_retryable_details() {
        let resp = r#"{
            "kind": "Status", "apiVersion": "v1", "metadata": {},
            "status": "Failure", "message": "pods \"x\" not found",
            "reason": "NotFound",
            "details": { "name": "x", "kind": "pods", "retryAfterSeconds": 5,
                         "causes": [{"reason": "y", "message": "z", "field": "f"}] },
            "code": 404
        }"#;
        let s: Status = serde_json::from_str(resp).unwrap();
        assert_eq!(s.code, 404);
        assert_eq!(s.reason, "NotFound");
        let details = s.details.unwrap();
        assert_eq!(details.retry_after_seconds, 5);
        assert_eq!(details.causes.len(), 1);
    }

    #[test]
    fn method_not_allowed_shape() {
        let s = Status::method_not_allowed("deletecollection");
        assert_eq!(s.code, 405);
        assert_eq!(s.reason, "MethodNotAllowed");
        assert!(s.message.contains("deletecollection"));
    }
}
