//! Module save-extension classification.
//!
//! The dir stream only distinguishes procedural modules from "everything
//! else". UserForms are told apart from classes structurally: a form's
//! compiled UI definition lives in a designer storage named after the
//! module, as a sibling of the VBA storage.

use super::dir::{ModuleType, VbaModuleInfo};
use crate::cfb::tree::{ContainerTree, NodeId};

/// Assign a save/display file extension for a module.
pub fn classify(tree: &ContainerTree, vba_storage: NodeId, info: &VbaModuleInfo) -> &'static str {
    match info.module_type {
        ModuleType::Standard => "bas",
        ModuleType::ClassDocOrForm => {
            if has_designer_storage(tree, vba_storage, &info.module_name) {
                "frm"
            } else {
                "cls"
            }
        }
        ModuleType::Unknown => "txt",
    }
}

/// A sibling storage (not stream) of the VBA storage whose name matches
/// the module name signals a paired UserForm designer.
fn has_designer_storage(tree: &ContainerTree, vba_storage: NodeId, module_name: &str) -> bool {
    tree.parent(vba_storage)
        .and_then(|parent| tree.find_child_storage(parent, module_name))
        .is_some()
}
