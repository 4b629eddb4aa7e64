//! VBA project discovery and macro source recovery.
//!
//! [`VbaProject::from_tree`] runs the whole pipeline over a container
//! tree: locate the VBA storage, decompress and parse the `dir` stream,
//! and classify every module. Extraction of individual module sources is
//! fail-soft: one malformed module never blocks its siblings.

pub mod classify;
pub mod compression;
pub mod dir;
pub mod locator;
pub mod project_stream;
pub mod source;

pub use dir::{DirStream, ModuleType, ProjectContext, VbaModuleInfo};
pub use project_stream::ProjectStream;

use crate::cfb::tree::{ContainerTree, NodeId};

/// One extracted module, ready to persist or hand downstream.
#[derive(Debug, Clone)]
pub struct ExtractedModule {
    pub module_name: String,
    pub stream_name: String,
    pub save_extension: &'static str,
    /// Recovered source text; empty when `error` is set.
    pub source: String,
    pub error: Option<String>,
}

/// A located and parsed VBA project inside a container tree.
#[derive(Debug)]
pub struct VbaProject<'a> {
    tree: &'a ContainerTree,
    storage: NodeId,
    dir: DirStream,
}

impl<'a> VbaProject<'a> {
    /// Locate and parse the VBA project. `None` means the container
    /// simply carries no VBA project; a corrupt `dir` stream still
    /// yields a project, with whatever modules survived parsing.
    pub fn from_tree(tree: &'a ContainerTree) -> Option<Self> {
        let storage = locator::locate(tree)?;

        // locate() guarantees the dir stream exists
        let dir_node = tree.find_child_stream(storage, "dir")?;
        let dir_bytes = tree.stream_data(dir_node)?;

        let mut dir = match compression::decompress(dir_bytes) {
            Ok(decompressed) => dir::parse(&decompressed),
            Err(err) => {
                log::warn!("dir stream does not decompress: {err}");
                DirStream::default()
            }
        };

        for info in dir.modules.values_mut() {
            info.save_extension = Some(classify::classify(tree, storage, info));
        }

        Some(Self { tree, storage, dir })
    }

    pub fn context(&self) -> &ProjectContext {
        &self.dir.context
    }

    /// Module count the dir stream declared, which can exceed the
    /// parsed map when duplicate stream names collided.
    pub fn declared_module_count(&self) -> u16 {
        self.dir.declared_module_count
    }

    pub fn modules(&self) -> impl Iterator<Item = &VbaModuleInfo> {
        self.dir.modules.values()
    }

    pub fn module(&self, stream_name: &str) -> Option<&VbaModuleInfo> {
        self.dir.modules.get(stream_name)
    }

    /// Recover one module's source text. Unknown stream names, missing
    /// streams, and extraction failures all come back as an empty
    /// string after a logged warning.
    pub fn module_source(&self, stream_name: &str) -> String {
        let Some(info) = self.dir.modules.get(stream_name) else {
            log::warn!("no module with stream name {stream_name:?}");
            return String::new();
        };
        match self.extract(info) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("module {stream_name:?}: {err}");
                String::new()
            }
        }
    }

    /// Extract every module, in stream-name order. Per-module failures
    /// are recorded on the affected entry only.
    pub fn extract_all(&self) -> Vec<ExtractedModule> {
        let mut infos: Vec<&VbaModuleInfo> = self.dir.modules.values().collect();
        infos.sort_by(|a, b| a.stream_name.cmp(&b.stream_name));

        infos
            .into_iter()
            .map(|info| {
                let (source, error) = match self.extract(info) {
                    Ok(text) => (text, None),
                    Err(err) => (String::new(), Some(err.to_string())),
                };
                ExtractedModule {
                    module_name: info.module_name.clone(),
                    stream_name: info.stream_name.clone(),
                    save_extension: info.save_extension.unwrap_or("txt"),
                    source,
                    error,
                }
            })
            .collect()
    }

    /// Parse the `_VBA_PROJECT` stream header, if present and well
    /// formed. Diagnostic only.
    pub fn project_stream(&self) -> Option<ProjectStream> {
        let node = self.tree.find_child_stream(self.storage, "_VBA_PROJECT")?;
        let data = self.tree.stream_data(node)?;
        match ProjectStream::parse(data) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!("_VBA_PROJECT stream: {err}");
                None
            }
        }
    }

    fn extract(&self, info: &VbaModuleInfo) -> crate::common::Result<String> {
        let node = self
            .tree
            .find_child_stream(self.storage, &info.stream_name)
            .ok_or_else(|| {
                crate::common::Error::ComponentNotFound(format!(
                    "module stream {:?}",
                    info.stream_name
                ))
            })?;
        let data = self.tree.stream_data(node).ok_or_else(|| {
            crate::common::Error::ComponentNotFound(format!("module stream {:?}", info.stream_name))
        })?;
        source::extract_source(data, info)
    }
}
