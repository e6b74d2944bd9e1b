//! Types for the watch api
//!
//! A watch response body is a chunked stream of newline-separated JSON
//! events in this envelope.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::response::Status;

/// A raw event returned from a watch query
///
/// Note that a watch query returns many of these as newline separated JSON.
#[derive(Deserialize, Serialize, Clone)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent<K> {
    /// Resource was added
    Added(K),
    /// Resource was modified
    Modified(K),
    /// Resource was deleted
    Deleted(K),
    /// The server failed the watch; carries its `Status` envelope
    Error(Status),
}

impl<K> Debug for WatchEvent<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self {
            WatchEvent::Added(_) => write!(f, "Added event"),
            WatchEvent::Modified(_) => write!(f, "Modified event"),
            WatchEvent::Deleted(_) => write!(f, "Deleted event"),
            WatchEvent::Error(e) => write!(f, "Error event: {e:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ObjectMeta;

    #[derive(Deserialize, Serialize, Clone, Debug)]
    struct Minimal {
        metadata: ObjectMeta,
    }

    #[test]
    fn events_decode_by_type_tag() {
        let line = r#"{"type":"ADDED","object":{"metadata":{"name":"a","resourceVersion":"1"}}}"#;
        let ev: WatchEvent<Minimal> = serde_json::from_str(line).unwrap();
        assert!(matches!(ev, WatchEvent::Added(_)));

        let line = r#"{"type":"MODIFIED","object":{"metadata":{"name":"a","resourceVersion":"2"}}}"#;
        let ev: WatchEvent<Minimal> = serde_json::from_str(line).unwrap();
        assert!(matches!(ev, WatchEvent::Modified(_)));

        let line =
            r#"{"type":"ERROR","object":{"kind":"Status","status":"Failure","code":410,"reason":"Expired"}}"#;
        let ev: WatchEvent<Minimal> = serde_json::from_str(line).unwrap();
        match ev {
            WatchEvent::Error(status) => assert_eq!(status.code, 410),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_event_type_is_a_decode_error() {
        let line = r#"{"type":"BOOKMARK","object":{"metadata":{"resourceVersion":"3"}}}"#;
        assert!(serde_json::from_str::<WatchEvent<Minimal>>(line).is_err());
    }
}
