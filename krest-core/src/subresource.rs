//! Request builder types and parameters for subresources
use serde::{Deserialize, Serialize};

use crate::{
    metadata::ObjectMeta,
    request::{with_query, Error, Request},
};

// ----------------------------------------------------------------------------
// Log subresource
// ----------------------------------------------------------------------------

/// Params for logging
#[derive(Default, Clone, Debug)]
pub struct LogParams {
    /// The container for which to stream logs. Defaults to only container if there is one container in the pod.
    pub container: Option<String>,
    /// Follow the log stream of the pod. Defaults to `false`.
    pub follow: bool,
    /// Return previous terminated container logs. Defaults to `false`.
    pub previous: bool,
    /// If `true`, add an RFC3339 or RFC3339Nano timestamp at the beginning of every line of log output. Defaults to `false`.
    pub timestamps: bool,
    /// A relative time in seconds before the current time from which to show logs.
    ///
    /// If this value precedes the time a pod was started, only logs since the pod start will be returned.
    pub since_seconds: Option<i64>,
    /// If set, the number of lines from the end of the logs to show.
    pub tail_lines: Option<i64>,
    /// If set, the number of bytes to read from the server before terminating the log output.
    ///
    /// This may not display a complete final line of logging.
    pub limit_bytes: Option<i64>,
    /// If `true`, then the output is pretty printed.
    pub pretty: bool,
}

impl LogParams {
    /// Stream the log instead of returning a snapshot
    #[must_use]
    pub fn follow(mut self) -> Self {
        self.follow = true;
        self
    }

    /// Select the container to read logs from
    #[must_use]
    pub fn container(mut self, name: &str) -> Self {
        self.container = Some(name.to_string());
        self
    }

    /// Prefix every line with its timestamp
    #[must_use]
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Read the previous terminated container's logs
    #[must_use]
    pub fn previous(mut self) -> Self {
        self.previous = true;
        self
    }
}

impl Request {
    /// Get pod logs
    ///
    /// Options serialize first, the special flags (`follow`, `previous`,
    /// `timestamps`, `container`) last.
    pub fn logs(&self, name: &str, lp: &LogParams) -> Result<http::Request<Vec<u8>>, Error> {
        let url = with_query(format!("{}/{name}/log", self.url_path), |qp| {
            if let Some(ss) = &lp.since_seconds {
                qp.append_pair("sinceSeconds", &ss.to_string());
            }
            if let Some(tl) = &lp.tail_lines {
                qp.append_pair("tailLines", &tl.to_string());
            }
            if let Some(lb) = &lp.limit_bytes {
                qp.append_pair("limitBytes", &lb.to_string());
            }
            if lp.pretty {
                qp.append_pair("pretty", "true");
            }
            if lp.follow {
                qp.append_pair("follow", "true");
            }
            if lp.previous {
                qp.append_pair("previous", "true");
            }
            if lp.timestamps {
                qp.append_pair("timestamps", "true");
            }
            if let Some(container) = &lp.container {
                qp.append_pair("container", container);
            }
        });
        http::Request::get(url).body(vec![]).map_err(Error::BuildRequest)
    }
}

// ----------------------------------------------------------------------------
// Scale subresource
// ----------------------------------------------------------------------------

/// The `autoscaling.v1.Scale` representation of a scalable resource
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Scale {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// The desired scale
    #[serde(default)]
    pub spec: ScaleSpec,
    /// The current scale as observed by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ScaleStatus>,
}

/// Desired scale of a scalable resource
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ScaleSpec {
    /// The desired number of instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

/// Observed scale of a scalable resource
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ScaleStatus {
    /// The actual number of instances
    #[serde(default)]
    pub replicas: i32,
    /// Label query for the pods counted, in selector string form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::LogParams;
    use crate::{request::Request, ApiResource, DynamicObject, GroupVersionKind, Resource};

    fn pods_in(ns: &str) -> Request {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true);
        Request::new(DynamicObject::url_path(&ar, Some(ns)))
    }

    #[test]
    fn log_path_with_container() {
        let lp = LogParams {
            container: Some("blah".into()),
            ..LogParams::default()
        };
        let req = pods_in("ns").logs("foo", &lp).unwrap();
        assert_eq!(req.uri(), "/api/v1/namespaces/ns/pods/foo/log?container=blah");
    }

    #[test]
    fn follow_flags_precede_container() {
        let lp = LogParams::default().follow().timestamps().container("container");
        let req = pods_in("kube-system").logs("pod", &lp).unwrap();
        assert_eq!(
            req.uri(),
            "/api/v1/namespaces/kube-system/pods/pod/log?follow=true&timestamps=true&container=container"
        );
    }

    #[test]
    fn log_options_serialize_before_flags() {
        let lp = LogParams {
            tail_lines: Some(10),
            previous: true,
            ..LogParams::default()
        };
        let req = pods_in("ns").logs("foo", &lp).unwrap();
        assert_eq!(
            req.uri(),
            "/api/v1/namespaces/ns/pods/foo/log?tailLines=10&previous=true"
        );
    }

    #[test]
    fn scale_roundtrip() {
        let data = r#"{"metadata":{"name":"web"},"spec":{"replicas":3},"status":{"replicas":2,"selector":"app=web"}}"#;
        let scale: super::Scale = serde_json::from_str(data).unwrap();
        assert_eq!(scale.spec.replicas, Some(3));
        assert_eq!(scale.status.as_ref().unwrap().replicas, 2);
        let out = serde_json::to_value(&scale).unwrap();
        assert_eq!(out["spec"]["replicas"], 3);
    }
}
