//! Generic object list wrapper.
use serde::Deserialize;

use crate::metadata::ListMeta;

/// The list envelope every collection response arrives in.
///
/// The api server wraps every `list` and delete-collection answer in the
/// same shape (`PodList`, `DeploymentList`, ...); this single generic type
/// stands in for all of them. The interesting part is `items`; `metadata`
/// mostly matters for its `resourceVersion` and continue token.
#[derive(Deserialize, Debug)]
pub struct ObjectList<T>
where
    T: Clone,
{
    /// Collection-level metadata of the response
    #[serde(default)]
    pub metadata: ListMeta,

    /// The listed objects
    #[serde(bound(deserialize = "Vec<T>: Deserialize<'de>"), default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T: Clone> ObjectList<T> {
    /// Iterate the listed objects by reference
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterate the listed objects mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<T: Clone> IntoIterator for ObjectList<T> {
    type IntoIter = std::vec::IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: Clone> IntoIterator for &'a ObjectList<T> {
    type IntoIter = std::slice::Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a, T: Clone> IntoIterator for &'a mut ObjectList<T> {
    type IntoIter = std::slice::IterMut<'a, T>;
    type Item = &'a mut T;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectList;

    #[test]
    fn list_deserialize() {
        let data = r#"{
            "metadata": { "resourceVersion": "2563" },
            "items": [ 1, 2, 3 ]
        }"#;
        let list: ObjectList<u32> = serde_json::from_str(data).unwrap();
        assert_eq!(list.metadata.resource_version.as_deref(), Some("2563"));
        assert_eq!(list.iter().count(), 3);
        let doubled: Vec<u32> = list.into_iter().map(|x| x * 2).collect();
        assert_eq!(doubled, vec![2, 4, 6]);
    }

    #[test]
    fn missing_items_deserialize_empty() {
        let list: ObjectList<u32> = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.metadata.resource_version, None);
    }
}
