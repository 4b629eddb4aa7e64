//! In-memory model of an opened container.
//!
//! The tree is an arena: nodes live in a flat `Vec`, the owning
//! parent→child relation is a list of [`NodeId`]s per node, and the
//! child→parent back-reference is a plain index. Back-references never
//! own anything, so cloning or filtering the tree cannot create
//! ownership cycles.
//!
//! Stream payloads are read once while the tree is built and stored as
//! [`Bytes`], which makes a deep clone of the whole tree cheap (buffer
//! refcount bumps, no byte copies). The tree is immutable after
//! construction.

use bytes::Bytes;

/// Handle to a node inside a [`ContainerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Whether a node is a sub-container or a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Storage,
    Stream,
}

/// A named entry in the container tree.
///
/// Invariants: a `Stream` node has no children and a `Storage` node has
/// no payload. The constructors on [`ContainerTree`] are the only way to
/// create nodes, so the invariants hold by construction.
#[derive(Debug, Clone)]
pub struct ContainerNode {
    name: String,
    kind: NodeKind,
    data: Option<Bytes>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ContainerNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_stream(&self) -> bool {
        self.kind == NodeKind::Stream
    }

    pub fn is_storage(&self) -> bool {
        self.kind == NodeKind::Storage
    }

    /// Stream payload bytes; `None` for storages.
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }
}

/// Arena-based tree of storages and streams.
#[derive(Debug, Clone)]
pub struct ContainerTree {
    nodes: Vec<ContainerNode>,
}

impl ContainerTree {
    /// Create a tree holding only a root storage.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![ContainerNode {
                name: root_name.into(),
                kind: NodeKind::Storage,
                data: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ContainerNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Child ids of a node, in insertion order (empty for streams).
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a storage node under `parent`.
    ///
    /// Panics if `parent` is a stream; streams cannot have children.
    pub fn add_storage(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        self.add_node(parent, name.into(), NodeKind::Storage, None)
    }

    /// Add a stream node with its payload under `parent`.
    ///
    /// Panics if `parent` is a stream; streams cannot have children.
    pub fn add_stream(&mut self, parent: NodeId, name: impl Into<String>, data: Bytes) -> NodeId {
        self.add_node(parent, name.into(), NodeKind::Stream, Some(data))
    }

    fn add_node(
        &mut self,
        parent: NodeId,
        name: String,
        kind: NodeKind,
        data: Option<Bytes>,
    ) -> NodeId {
        assert!(
            self.nodes[parent.0].is_storage(),
            "cannot add a child to a stream node"
        );
        let id = NodeId(self.nodes.len());
        self.nodes.push(ContainerNode {
            name,
            kind,
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Find a direct child by case-insensitive name and kind.
    pub fn find_child(&self, parent: NodeId, name: &str, kind: NodeKind) -> Option<NodeId> {
        let wanted = name.to_lowercase();
        self.children(parent).find(|&id| {
            let node = self.node(id);
            node.kind == kind && node.name.to_lowercase() == wanted
        })
    }

    /// Find a direct child storage by case-insensitive name.
    pub fn find_child_storage(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.find_child(parent, name, NodeKind::Storage)
    }

    /// Find a direct child stream by case-insensitive name.
    pub fn find_child_stream(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.find_child(parent, name, NodeKind::Stream)
    }

    /// Payload bytes of a stream node; `None` for storages.
    pub fn stream_data(&self, id: NodeId) -> Option<&Bytes> {
        self.nodes[id.0].data()
    }
}
