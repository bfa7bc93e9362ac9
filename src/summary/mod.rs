//! Build manifest for the external image builder.
//!
//! One invocation collects every rendered artifact and writes
//! `<output>/build_summary.json` once at the end. The CI build matrix is
//! derived from that file.

mod matrix;

pub use matrix::{BuildMatrix, MatrixEntry, MatrixFilter};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SummaryError;
use crate::render::RenderedArtifact;

pub const SUMMARY_FILE: &str = "build_summary.json";

/// One generated Dockerfile in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummaryEntry {
    /// Runtime label, or `latest` for singleton images.
    pub runtime: String,
    pub image_type: String,
    /// `.ml` for ML builds, empty otherwise.
    pub variant: String,
    /// `-ubuntu<os>-py<python>` for runtime-specific images, empty otherwise.
    pub suffix: String,
    pub path: PathBuf,
    pub tag: String,
    pub base_image: String,
    pub os_version: String,
    pub runtime_specific: bool,
    #[serde(default)]
    pub is_lts: bool,
    /// Hex SHA-256 of the Dockerfile.
    pub digest: String,
}

impl BuildSummaryEntry {
    pub fn from_artifact(artifact: &RenderedArtifact) -> Self {
        let target = &artifact.target;
        Self {
            runtime: target.runtime_label().to_string(),
            image_type: target.image_type.name.clone(),
            variant: target.variant().to_string(),
            suffix: target.suffix(),
            path: target.dockerfile_path(),
            tag: artifact.image_tag.clone(),
            base_image: artifact.base_image.clone(),
            os_version: target.os_version.clone(),
            runtime_specific: target.is_runtime_specific(),
            is_lts: target.runtime.as_ref().is_some_and(|r| r.is_lts),
            digest: artifact.digest(),
        }
    }
}

/// Contents of `build_summary.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub default_os_version: String,
    /// Image types that were generated, in build order.
    pub image_types: Vec<String>,
    pub total_targets: usize,
    pub include: Vec<BuildSummaryEntry>,
}

impl BuildSummary {
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(SUMMARY_FILE)
    }

    /// Reads a summary file.
    pub fn load(path: &Path) -> Result<Self, SummaryError> {
        if !path.exists() {
            return Err(SummaryError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Accumulates entries during a build and writes the manifest once.
#[derive(Debug, Clone)]
pub struct BuildSummaryWriter {
    summary: BuildSummary,
}

impl BuildSummaryWriter {
    pub fn new(default_os_version: impl Into<String>) -> Self {
        Self {
            summary: BuildSummary {
                default_os_version: default_os_version.into(),
                ..Default::default()
            },
        }
    }

    pub fn record(&mut self, artifact: &RenderedArtifact) {
        let entry = BuildSummaryEntry::from_artifact(artifact);
        if !self.summary.image_types.contains(&entry.image_type) {
            self.summary.image_types.push(entry.image_type.clone());
        }
        self.summary.include.push(entry);
        self.summary.total_targets = self.summary.include.len();
    }

    pub fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    /// Writes `build_summary.json` under `data_dir` and returns its path.
    pub fn write(&self, data_dir: &Path) -> Result<PathBuf, SummaryError> {
        fs::create_dir_all(data_dir)?;
        let path = BuildSummary::path_in(data_dir);
        let mut json = serde_json::to_string_pretty(&self.summary)?;
        json.push('\n');
        fs::write(&path, json)?;

        tracing::info!(
            path = %path.display(),
            targets = self.summary.total_targets,
            "Wrote build summary"
        );
        Ok(path)
    }

    pub fn into_summary(self) -> BuildSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, RuntimeRelease};
    use crate::config::ForgeConfig;
    use crate::image::ImageTypeSet;
    use crate::render::Renderer;
    use crate::resolver::{ResolveRequest, Resolver};
    use crate::template::TemplateSet;
    use tempfile::TempDir;

    fn artifacts(config: &ForgeConfig) -> Vec<RenderedArtifact> {
        let catalog = Catalog::new(vec![RuntimeRelease::new("15.4 LTS", "22.04", "3.11")
            .with_lts(true)
            .with_ml_variant(true)])
        .expect("valid catalog");
        let image_types = ImageTypeSet::builtin();
        let templates = TemplateSet::builtin();
        let renderer = Renderer::new(config, &templates, &image_types);

        Resolver::new(&catalog, &image_types, config.resolver_options())
            .resolve(&ResolveRequest::new())
            .expect("resolves")
            .iter()
            .map(|t| renderer.render(t).expect("renders"))
            .collect()
    }

    #[test]
    fn test_summary_records_every_artifact() {
        let config = ForgeConfig::default();
        let mut writer = BuildSummaryWriter::new(&config.default_os_version);
        for artifact in artifacts(&config) {
            writer.record(&artifact);
        }

        let summary = writer.summary();
        // 5 singletons + python and python-gpu with base and ML builds
        assert_eq!(summary.total_targets, 9);
        assert_eq!(summary.image_types.len(), 7);

        let singleton = &summary.include[0];
        assert_eq!(singleton.runtime, "latest");
        assert_eq!(singleton.suffix, "");
        assert_eq!(singleton.variant, "");
        assert!(!singleton.runtime_specific);

        let ml = summary
            .include
            .iter()
            .find(|e| e.image_type == "python" && e.variant == ".ml")
            .expect("python ML entry");
        assert_eq!(ml.runtime, "15.4 LTS");
        assert_eq!(ml.suffix, "-ubuntu2404-py311");
        assert_eq!(ml.digest.len(), 64);
        assert!(ml.is_lts);
    }

    #[test]
    fn test_write_and_load_roundtrip() {
        let dir = TempDir::new().expect("temp dir");
        let config = ForgeConfig::default().with_output_dir(dir.path());
        let mut writer = BuildSummaryWriter::new(&config.default_os_version);
        for artifact in artifacts(&config) {
            writer.record(&artifact);
        }

        let path = writer.write(dir.path()).expect("writes summary");
        assert_eq!(path, dir.path().join(SUMMARY_FILE));

        let loaded = BuildSummary::load(&path).expect("loads summary");
        assert_eq!(&loaded, writer.summary());
    }

    #[test]
    fn test_load_missing_summary() {
        let dir = TempDir::new().expect("temp dir");
        let err = BuildSummary::load(&dir.path().join(SUMMARY_FILE)).unwrap_err();
        assert!(matches!(err, SummaryError::NotFound(_)));
        assert!(err.to_string().contains("Run build first"));
    }
}
