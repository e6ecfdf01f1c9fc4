//! Zarr hierarchy nodes.
//!
//! A [`Node`] is an array or group at a [`NodePath`], with group children discovered by listing
//! the store.

mod node_name;
mod node_path;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};

use crate::{
    metadata::{ArrayMetadata, GroupMetadata},
    storage::{
        get_child_nodes, meta_key, ListableStorageTraits, ReadableStorageTraits, StorageError,
    },
};

/// The metadata of a hierarchy node: an array or a group.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum NodeMetadata {
    /// Array metadata.
    Array(ArrayMetadata),
    /// Group metadata.
    Group(GroupMetadata),
}

/// A hierarchy node with its children.
#[derive(Clone, Debug)]
pub struct Node {
    path: NodePath,
    metadata: NodeMetadata,
    children: Vec<Node>,
}

impl Node {
    /// Create a node from its `path`, `metadata`, and `children`.
    #[must_use]
    pub fn new_with_metadata(path: NodePath, metadata: NodeMetadata, children: Vec<Self>) -> Self {
        Self {
            path,
            metadata,
            children,
        }
    }

    /// Open the node at `path` of `storage`, discovering group children recursively.
    ///
    /// A path without `zarr.json` metadata is interpreted as a group with default metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying error with the store or any
    /// metadata cannot be parsed.
    pub fn open<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits>(
        storage: &Arc<TStorage>,
        path: &str,
    ) -> Result<Self, StorageError> {
        let path: NodePath = path
            .try_into()
            .map_err(|err: NodePathError| StorageError::Other(err.to_string()))?;
        let key = meta_key(&path);
        let metadata = match storage.get(&key)? {
            Some(metadata) => serde_json::from_slice::<NodeMetadata>(&metadata)
                .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?,
            None => NodeMetadata::Group(GroupMetadata::default()),
        };
        let children = match metadata {
            NodeMetadata::Array(_) => Vec::default(),
            NodeMetadata::Group(_) => get_child_nodes(storage, &path)?,
        };
        Ok(Self {
            path,
            metadata,
            children,
        })
    }

    /// The path of the node.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// The name of the node (the last component of its path).
    #[must_use]
    pub fn name(&self) -> NodeName {
        let name = self.path.as_str().split('/').last().unwrap_or_default();
        unsafe { NodeName::new_unchecked(name) }
    }

    /// The metadata of the node.
    #[must_use]
    pub const fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    /// The children of the node.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Returns true if the node is a group.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.metadata, NodeMetadata::Group(_))
    }

    /// Return a string of the hierarchy below the node, one node per line.
    #[must_use]
    pub fn hierarchy_tree(&self) -> String {
        fn print_node(node: &Node, depth: usize, output: &mut String) {
            let name = if depth == 0 {
                node.path.to_string()
            } else {
                node.name().to_string()
            };
            output.push_str(&format!("{}{}\n", "  ".repeat(depth), name));
            for child in &node.children {
                print_node(child, depth + 1, output);
            }
        }
        let mut output = String::new();
        print_node(self, 0, &mut output);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_metadata_untagged() {
        let group: NodeMetadata =
            serde_json::from_str(r#"{"zarr_format": 3, "node_type": "group"}"#).unwrap();
        assert!(matches!(group, NodeMetadata::Group(_)));

        let array: NodeMetadata = serde_json::from_str(
            r#"{
                "zarr_format": 3,
                "node_type": "array",
                "shape": [4],
                "data_type": "uint8",
                "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2]}},
                "chunk_key_encoding": "default",
                "fill_value": 0,
                "codecs": ["bytes"]
            }"#,
        )
        .unwrap();
        assert!(matches!(array, NodeMetadata::Array(_)));

        assert!(
            serde_json::from_str::<NodeMetadata>(r#"{"zarr_format": 2, "node_type": "group"}"#)
                .is_err()
        );
    }

    #[test]
    fn node_name_from_path() {
        let node = Node::new_with_metadata(
            NodePath::new("/a/b").unwrap(),
            NodeMetadata::Group(GroupMetadata::default()),
            vec![],
        );
        assert_eq!(node.name().as_str(), "b");
        assert!(node.is_group());
    }
}
