//! Compound file (CFB/OLE2) container support.
//!
//! [`file::CompoundFile`] reads the on-disk structures (header, DIFAT,
//! FAT, MiniFAT, directory) and [`tree::ContainerTree`] is the in-memory
//! model the rest of the crate navigates: an arena of named nodes, each
//! either a storage or a stream whose bytes were read once at build time.

/// Constants for the compound file binary format
pub mod consts;

/// Compound file reader
pub mod file;

/// In-memory container tree model
pub mod tree;

pub use file::{is_compound_file, CompoundFile};
pub use tree::{ContainerNode, ContainerTree, NodeId, NodeKind};
