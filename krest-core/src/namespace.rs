//! Namespace selection for API calls.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Selects the namespace dimension of an API call.
///
/// The well-known variants resolve to the namespaces every cluster ships
/// with; [`NamespaceSelector::All`] targets the cluster-level collection
/// path (no `namespaces/` segment in the url).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NamespaceSelector {
    /// A namespace given by name
    Named(String),
    /// The `default` namespace
    Default,
    /// The `kube-public` namespace
    Public,
    /// The `kube-system` namespace
    System,
    /// The `kube-node-lease` namespace
    NodeLease,
    /// Every namespace: list/watch at cluster level
    All,
}

impl NamespaceSelector {
    /// The namespace path segment, or `None` for [`NamespaceSelector::All`]
    pub fn name(&self) -> Option<&str> {
        match self {
            NamespaceSelector::Named(name) => Some(name),
            NamespaceSelector::Default => Some("default"),
            NamespaceSelector::Public => Some("kube-public"),
            NamespaceSelector::System => Some("kube-system"),
            NamespaceSelector::NodeLease => Some("kube-node-lease"),
            NamespaceSelector::All => None,
        }
    }
}

impl fmt::Display for NamespaceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "*"),
        }
    }
}

impl From<&str> for NamespaceSelector {
    fn from(name: &str) -> Self {
        NamespaceSelector::Named(name.to_string())
    }
}

impl From<String> for NamespaceSelector {
    fn from(name: String) -> Self {
        NamespaceSelector::Named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_names() {
        assert_eq!(NamespaceSelector::Default.name(), Some("default"));
        assert_eq!(NamespaceSelector::Public.name(), Some("kube-public"));
        assert_eq!(NamespaceSelector::System.name(), Some("kube-system"));
        assert_eq!(NamespaceSelector::NodeLease.name(), Some("kube-node-lease"));
        assert_eq!(NamespaceSelector::All.name(), None);
        assert_eq!(NamespaceSelector::from("team-a").name(), Some("team-a"));
    }
}
