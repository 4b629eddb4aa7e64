//! Macrolens - extraction of embedded VBA macro projects from Microsoft
//! Office containers
//!
//! This library opens legacy OLE2/CFB documents (.doc, .xls, .ppt) and
//! modern zip-based documents carrying a `vbaProject.bin` (.docm, .xlsm,
//! .pptm), locates the embedded VBA project, decodes the MS-OVBA `dir`
//! stream, and recovers the plaintext source of every macro module.
//!
//! # Features
//!
//! - **Container tree**: Navigate any compound file as an in-memory tree
//!   of storages and streams
//! - **VBA project discovery**: Known host layouts for Word, Excel and
//!   bare `vbaProject.bin` payloads
//! - **Source recovery**: MS-OVBA decompression, project code page
//!   decoding, compiler attribute-line stripping
//! - **Fail-soft parsing**: Malformed or adversarial input yields
//!   partial results instead of aborting the scan
//!
//! # Example - Extracting macro sources
//!
//! ```no_run
//! use macrolens::OfficeContainer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let container = OfficeContainer::open("invoice.docm")?;
//!
//! if let Some(project) = container.vba_project() {
//!     println!("project: {}", project.context().name);
//!     for module in project.extract_all() {
//!         println!(
//!             "--- {}.{} ---\n{}",
//!             module.module_name,
//!             module.save_extension,
//!             module.source
//!         );
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Inspecting arbitrary streams
//!
//! ```no_run
//! use macrolens::{sniff, OfficeContainer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let container = OfficeContainer::open("document.doc")?;
//! let tree = container.tree();
//! for child in tree.children(tree.root()) {
//!     let node = tree.node(child);
//!     println!("{}{}", node.name(), sniff::suggest_extension(tree, child));
//! }
//! # Ok(())
//! # }
//! ```

/// Compound file (CFB/OLE2) container support
pub mod cfb;

/// Shared binary, codepage and error infrastructure
pub mod common;

/// Office container opening, with the zip `vbaProject.bin` fallback
pub mod container;

/// Scan report data model
pub mod report;

/// Stream name/content sniffing for generic export
pub mod sniff;

/// VBA project location, dir-stream parsing and source extraction
pub mod vba;

pub use cfb::{ContainerTree, NodeId, NodeKind};
pub use common::{Error, Result};
pub use container::OfficeContainer;
pub use report::{ModuleReport, ScanReport, Verdict};
pub use vba::{ExtractedModule, ModuleType, VbaModuleInfo, VbaProject};
