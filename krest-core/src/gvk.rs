//! Group/version identifiers for API resources and kinds.
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::TypeMeta;

#[derive(Debug, Error)]
#[error("failed to parse group version: {0}")]
/// Failed to parse a `group/version` string
pub struct ParseGroupVersionError(pub String);

/// A family of API resources: group plus version.
///
/// The group is empty for the legacy core API (`v1`).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    /// API group
    pub group: String,
    /// Version
    pub version: String,
}

impl GroupVersion {
    /// Construct from explicit group and version
    pub fn gv(group: &str, version: &str) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// Upgrade a GroupVersion to a GroupVersionKind
    pub fn with_kind(self, kind: &str) -> GroupVersionKind {
        GroupVersionKind {
            group: self.group,
            version: self.version,
            kind: kind.into(),
        }
    }

    /// The `apiVersion` rendering: `v1` for core, `group/version` otherwise
    pub fn api_version(&self) -> String {
        match self.group.as_str() {
            "" => self.version.clone(),
            group => format!("{group}/{}", self.version),
        }
    }

    /// The url prefix of the group version: `/api/v1` for the core group,
    /// `/apis/<group>/<version>` for everything else.
    pub fn api_path(&self) -> String {
        match self.group.as_str() {
            "" => format!("/api/{}", self.version),
            group => format!("/apis/{group}/{}", self.version),
        }
    }
}

impl FromStr for GroupVersion {
    type Err = ParseGroupVersionError;

    fn from_str(gv: &str) -> Result<Self, Self::Err> {
        // one optional `/` separates group from version; the core group
        // writes its version bare
        let (group, version) = gv.split_once('/').unwrap_or(("", gv));
        if version.is_empty() || version.contains('/') {
            return Err(ParseGroupVersionError(gv.into()));
        }
        Ok(Self::gv(group, version))
    }
}

/// An API kind: group, version, and the CamelCase singular name (`Pod`).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersionKind {
    /// API group
    pub group: String,
    /// Version
    pub version: String,
    /// Kind
    pub kind: String,
}

impl GroupVersionKind {
    /// Construct from explicit group, version, and kind
    pub fn gvk(group: &str, version: &str, kind: &str) -> Self {
        GroupVersion::gv(group, version).with_kind(kind)
    }

    /// The `apiVersion` rendering for this kind
    pub fn api_version(&self) -> String {
        GroupVersion::gv(&self.group, &self.version).api_version()
    }
}

impl TryFrom<&TypeMeta> for GroupVersionKind {
    type Error = ParseGroupVersionError;

    fn try_from(tm: &TypeMeta) -> Result<Self, Self::Error> {
        Ok(tm.api_version.parse::<GroupVersion>()?.with_kind(&tm.kind))
    }
}

impl TryFrom<TypeMeta> for GroupVersionKind {
    type Error = ParseGroupVersionError;

    fn try_from(tm: TypeMeta) -> Result<Self, Self::Error> {
        GroupVersionKind::try_from(&tm)
    }
}

/// A type-erased resource identifier: group, version, and the lowercase
/// plural resource name (`pods`).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersionResource {
    /// API group
    pub group: String,
    /// Version
    pub version: String,
    /// Lowercase plural resource name
    pub resource: String,
}

impl GroupVersionResource {
    /// Construct from explicit group, version, and plural resource name
    pub fn gvr(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// The `apiVersion` rendering for this resource's group version
    pub fn api_version(&self) -> String {
        GroupVersion::gv(&self.group, &self.version).api_version()
    }

    /// Collection url path, cluster-level or within a namespace.
    pub fn url_path(&self, namespace: Option<&str>) -> String {
        let prefix = GroupVersion::gv(&self.group, &self.version).api_path();
        match namespace {
            Some(ns) => format!("{prefix}/namespaces/{ns}/{}", self.resource),
            None => format!("{prefix}/{}", self.resource),
        }
    }
}
