//! Scan report data model.
//!
//! Downstream tooling classifies each extracted module and persists the
//! result next to the scanned file. Only the data model and aggregation
//! live here; producing verdicts is someone else's job.

use serde::{Deserialize, Serialize};

/// Classification verdict for one module, ordered by severity.
/// `Error` marks modules whose source could not be recovered or judged
/// and always dominates aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verdict {
    Benign,
    Suspicious,
    Malicious,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleReport {
    pub module_name: String,
    pub verdict: Verdict,
}

/// Per-file scan result, keyed by the scanned file's path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub source_path: String,
    pub modules: Vec<ModuleReport>,
}

impl ScanReport {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            modules: Vec::new(),
        }
    }

    pub fn push(&mut self, module_name: impl Into<String>, verdict: Verdict) {
        self.modules.push(ModuleReport {
            module_name: module_name.into(),
            verdict,
        });
    }

    /// Worst verdict across all modules. A file with no modules is
    /// benign by definition.
    pub fn aggregate(&self) -> Verdict {
        self.modules
            .iter()
            .map(|m| m.verdict)
            .max()
            .unwrap_or(Verdict::Benign)
    }
}
