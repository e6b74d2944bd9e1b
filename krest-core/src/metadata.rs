//! Metadata structs used in traits, lists, and dynamic objects.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type information that is flattened into every kubernetes object
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// The version of the API
    pub api_version: String,

    /// The name of the API
    pub kind: String,
}

/// Standard object metadata.
///
/// This carries the subset of `meta.v1.ObjectMeta` the client surface
/// touches. Timestamps deserialize from RFC 3339 in both second and
/// fractional-second precision; the api server emits both.
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// The unique name of this object within its namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Prefix the server uses to generate a unique name when `name` is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,

    /// The namespace the object lives in (unset for cluster-scoped objects)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Unique id of the object for its whole lifetime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Opaque version identifier, changed by the server on every write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    /// Sequence number of the desired state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,

    /// When the object was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    /// When the object was marked for deletion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,

    /// Key/value pairs used by selectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// Unstructured key/value data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    /// Identifiers that must be removed before the object can be deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalizers: Option<Vec<String>>,
}

/// Metadata of collection responses
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// The collection's resource version at the time of the list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    /// Opaque token for fetching the next page of a limited list
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,

    /// Items left when paginating with a limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_item_count: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // the api server emits both timestamp precisions
    #[test]
    fn timestamps_decode_in_both_precisions() {
        let whole: ObjectMeta =
            serde_json::from_str(r#"{"name":"a","creationTimestamp":"2021-04-08T19:04:22Z"}"#).unwrap();
        assert!(whole.creation_timestamp.is_some());

        let fractional: ObjectMeta =
            serde_json::from_str(r#"{"name":"b","creationTimestamp":"2021-04-08T19:04:22.512345Z"}"#)
                .unwrap();
        assert!(fractional.creation_timestamp.is_some());
    }

    #[test]
    fn list_meta_continue_field() {
        let lm: ListMeta = serde_json::from_str(r#"{"resourceVersion":"10","continue":"tok"}"#).unwrap();
        assert_eq!(lm.continue_token.as_deref(), Some("tok"));
    }
}
