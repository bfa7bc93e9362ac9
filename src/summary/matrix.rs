//! CI build matrix derived from a build summary.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::BuildSummary;
use crate::catalog::version::compare_runtime_labels_desc;

/// Filters applied when deriving a matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixFilter {
    pub lts_only: bool,
    pub image_type: Option<String>,
    /// Keep only the N newest runtimes.
    pub latest_lts_count: Option<usize>,
}

impl MatrixFilter {
    pub fn with_lts_only(mut self, lts_only: bool) -> Self {
        self.lts_only = lts_only;
        self
    }

    pub fn with_image_type(mut self, image_type: Option<String>) -> Self {
        self.image_type = image_type;
        self
    }

    pub fn with_latest_lts_count(mut self, count: Option<usize>) -> Self {
        self.latest_lts_count = count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub runtime: String,
    pub image_type: String,
    pub variant: String,
    pub suffix: String,
}

/// `{"include": [...]}` matrix consumed by CI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMatrix {
    pub include: Vec<MatrixEntry>,
}

impl BuildMatrix {
    /// Derives the matrix of runtime-specific builds, newest runtime first.
    pub fn from_summary(summary: &BuildSummary, filter: &MatrixFilter) -> Self {
        let mut entries: Vec<MatrixEntry> = summary
            .include
            .iter()
            .filter(|e| e.runtime_specific)
            .filter(|e| !filter.lts_only || e.is_lts)
            .filter(|e| {
                filter
                    .image_type
                    .as_deref()
                    .map_or(true, |t| e.image_type == t)
            })
            .map(|e| MatrixEntry {
                runtime: e.runtime.clone(),
                image_type: e.image_type.clone(),
                variant: e.variant.clone(),
                suffix: e.suffix.clone(),
            })
            .collect();

        // Stable sort keeps build order within one runtime.
        entries.sort_by(|a, b| compare_runtime_labels_desc(&a.runtime, &b.runtime));

        if let Some(count) = filter.latest_lts_count {
            let mut runtimes = Vec::new();
            for entry in &entries {
                if !runtimes.contains(&entry.runtime) {
                    runtimes.push(entry.runtime.clone());
                }
            }
            runtimes.truncate(count);
            entries.retain(|e| runtimes.contains(&e.runtime));
        }

        let mut seen = HashSet::new();
        entries.retain(|e| seen.insert(e.clone()));

        Self { include: entries }
    }

    pub fn len(&self) -> usize {
        self.include.len()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }
}
