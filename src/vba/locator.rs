//! VBA storage location.
//!
//! Host applications bury the VBA project in different places: Excel
//! under `_VBA_PROJECT_CUR`, Word under `Macros`, and a `vbaProject.bin`
//! unwrapped from a zip container keeps it directly under the root. The
//! structural signature in every case is a `VBA` storage with a direct
//! child stream literally named `dir`.

use crate::cfb::tree::{ContainerTree, NodeId};

/// Storages that host the VBA project storage, in priority order.
const HOST_STORAGES: [&str; 2] = ["_VBA_PROJECT_CUR", "Macros"];

/// Find the VBA storage in a container tree. First matching layout wins;
/// `None` when no layout matches. No side effects.
pub fn locate(tree: &ContainerTree) -> Option<NodeId> {
    let root = tree.root();

    for host in HOST_STORAGES {
        if let Some(found) = tree
            .find_child_storage(root, host)
            .and_then(|storage| vba_storage_under(tree, storage))
        {
            return Some(found);
        }
    }

    // vbaProject.bin extracted from a zip container: the project storage
    // sits directly under the root
    vba_storage_under(tree, root)
}

/// Accept a `VBA` child of `parent` only if it carries a `dir` stream;
/// that distinguishes the real project storage from unrelated storages.
fn vba_storage_under(tree: &ContainerTree, parent: NodeId) -> Option<NodeId> {
    let vba = tree.find_child_storage(parent, "VBA")?;
    tree.find_child_stream(vba, "dir").map(|_| vba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn dir_bytes() -> Bytes {
        Bytes::from_static(b"\x01")
    }

    #[test]
    fn test_locates_under_vba_project_cur() {
        let mut tree = ContainerTree::new("Root");
        let root = tree.root();
        let host = tree.add_storage(root, "_VBA_PROJECT_CUR");
        let vba = tree.add_storage(host, "VBA");
        tree.add_stream(vba, "dir", dir_bytes());

        assert_eq!(locate(&tree), Some(vba));
    }

    #[test]
    fn test_locates_under_macros() {
        let mut tree = ContainerTree::new("Root");
        let root = tree.root();
        let host = tree.add_storage(root, "Macros");
        let vba = tree.add_storage(host, "vba");
        tree.add_stream(vba, "DIR", dir_bytes());

        assert_eq!(locate(&tree), Some(vba));
    }

    #[test]
    fn test_locates_directly_under_root() {
        let mut tree = ContainerTree::new("Root");
        let root = tree.root();
        let vba = tree.add_storage(root, "VBA");
        tree.add_stream(vba, "dir", dir_bytes());
        tree.add_stream(vba, "Module1", dir_bytes());

        assert_eq!(locate(&tree), Some(vba));
    }

    #[test]
    fn test_host_storage_takes_priority_over_root() {
        let mut tree = ContainerTree::new("Root");
        let root = tree.root();
        let host = tree.add_storage(root, "_VBA_PROJECT_CUR");
        let hosted_vba = tree.add_storage(host, "VBA");
        tree.add_stream(hosted_vba, "dir", dir_bytes());
        let root_vba = tree.add_storage(root, "VBA");
        tree.add_stream(root_vba, "dir", dir_bytes());

        assert_eq!(locate(&tree), Some(hosted_vba));
    }

    #[test]
    fn test_rejects_vba_storage_without_dir_stream() {
        let mut tree = ContainerTree::new("Root");
        let root = tree.root();
        let vba = tree.add_storage(root, "VBA");
        // VBA-shaped children, but no dir stream
        tree.add_stream(vba, "Module1", dir_bytes());
        tree.add_stream(vba, "_VBA_PROJECT", dir_bytes());

        assert_eq!(locate(&tree), None);
    }

    #[test]
    fn test_rejects_dir_storage() {
        // `dir` must be a stream, not a storage
        let mut tree = ContainerTree::new("Root");
        let root = tree.root();
        let vba = tree.add_storage(root, "VBA");
        tree.add_storage(vba, "dir");

        assert_eq!(locate(&tree), None);
    }

    #[test]
    fn test_empty_container() {
        let tree = ContainerTree::new("Root");
        assert_eq!(locate(&tree), None);
    }
}
