//! Build pipeline: resolve, render, write, summarize.
//!
//! # Pipeline Flow
//!
//! 1. **Catalog selection**: the catalog is narrowed to the newest LTS
//!    releases when a full build asks for it
//! 2. **Resolution**: filters become ordered, deduplicated targets
//! 3. **Rendering**: each target's Dockerfile, metadata and requirements are
//!    rendered and written under the output directory
//! 4. **Summary**: `build_summary.json` is written once at the end
//!
//! The first error aborts the run; files already written stay in place.
//!
//! # Example
//!
//! ```rust,ignore
//! use runtime_forge::catalog::Catalog;
//! use runtime_forge::config::ForgeConfig;
//! use runtime_forge::pipeline::BuildPipeline;
//! use runtime_forge::resolver::ResolveRequest;
//!
//! let pipeline = BuildPipeline::new(ForgeConfig::default(), Catalog::builtin())?;
//! let report = pipeline.run(&ResolveRequest::new().with_image_type("python"))?;
//! println!("Wrote {} Dockerfiles", report.written);
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::config::ForgeConfig;
use crate::error::{BuildError, RenderError};
use crate::image::ImageTypeSet;
use crate::render::Renderer;
use crate::resolver::{ResolveRequest, ResolvedTarget, Resolver};
use crate::summary::{BuildSummary, BuildSummaryWriter};
use crate::template::TemplateSet;

/// Outcome of one build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub summary_path: PathBuf,
    pub summary: BuildSummary,
    /// Number of Dockerfiles written.
    pub written: usize,
    /// Releases moved from their native OS to the default one.
    pub os_upgrades: usize,
}

/// Everything needed to generate Dockerfiles for one invocation.
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    config: ForgeConfig,
    catalog: Catalog,
    image_types: ImageTypeSet,
    templates: TemplateSet,
}

impl BuildPipeline {
    /// Creates a pipeline with the built-in image types and templates, plus
    /// any overrides from the configured templates directory.
    pub fn new(config: ForgeConfig, catalog: Catalog) -> Result<Self, RenderError> {
        let mut templates = TemplateSet::builtin();
        if let Some(dir) = &config.templates_dir {
            templates.load_directory(dir)?;
        }

        Ok(Self {
            config,
            catalog,
            image_types: ImageTypeSet::builtin(),
            templates,
        })
    }

    pub fn with_image_types(mut self, image_types: ImageTypeSet) -> Self {
        self.image_types = image_types;
        self
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn image_types(&self) -> &ImageTypeSet {
        &self.image_types
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Catalog a request resolves against.
    ///
    /// `latest_lts_count` only narrows full builds; an explicit runtime is
    /// always looked up in the whole catalog.
    pub fn effective_catalog(&self, request: &ResolveRequest) -> Catalog {
        match (self.config.latest_lts_count, &request.runtime) {
            (Some(count), None) => self.catalog.latest_lts(count),
            _ => self.catalog.clone(),
        }
    }

    /// Resolves targets without rendering anything.
    pub fn plan(&self, request: &ResolveRequest) -> Result<Vec<ResolvedTarget>, BuildError> {
        let catalog = self.effective_catalog(request);
        let resolver = Resolver::new(&catalog, &self.image_types, self.config.resolver_options());
        Ok(resolver.resolve(request)?)
    }

    /// Resolves, renders and writes every target, then the build summary.
    pub fn run(&self, request: &ResolveRequest) -> Result<BuildReport, BuildError> {
        let targets = self.plan(request)?;
        let renderer = Renderer::new(&self.config, &self.templates, &self.image_types);
        let mut writer = BuildSummaryWriter::new(&self.config.default_os_version);

        tracing::info!(
            targets = targets.len(),
            output_dir = %self.config.output_dir.display(),
            "Generating Dockerfiles"
        );

        for target in &targets {
            let artifact = renderer.render(target)?;
            renderer.write(&artifact)?;
            writer.record(&artifact);
        }

        let summary_path = writer.write(&self.config.output_dir)?;
        let os_upgrades = targets
            .iter()
            .filter(|t| t.os_upgraded)
            .map(|t| t.runtime_label())
            .collect::<HashSet<_>>()
            .len();

        Ok(BuildReport {
            summary_path,
            written: targets.len(),
            os_upgrades,
            summary: writer.into_summary(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuntimeRelease;
    use crate::error::ResolveError;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
        Catalog::new(vec![
            RuntimeRelease::new("14.3 LTS", "22.04", "3.10")
                .with_lts(true)
                .with_support_window(date(2024, 2, 1), date(2027, 2, 1)),
            RuntimeRelease::new("15.4 LTS", "22.04", "3.11")
                .with_lts(true)
                .with_ml_variant(true)
                .with_support_window(date(2024, 8, 19), date(2027, 8, 19)),
        ])
        .expect("valid catalog")
    }

    #[test]
    fn test_run_writes_files_and_summary() {
        let dir = TempDir::new().expect("temp dir");
        let config = ForgeConfig::default().with_output_dir(dir.path());
        let pipeline = BuildPipeline::new(config, catalog()).expect("pipeline");

        let report = pipeline
            .run(&ResolveRequest::new().with_image_type("python"))
            .expect("build succeeds");

        assert_eq!(report.written, 3);
        assert_eq!(report.os_upgrades, 2);
        assert!(report.summary_path.is_file());
        assert!(dir
            .path()
            .join("python/14.3-LTS-ubuntu2404-py310/Dockerfile")
            .is_file());
        assert!(dir
            .path()
            .join("python/15.4-LTS-ubuntu2404-py311/Dockerfile.ml")
            .is_file());
    }

    #[test]
    fn test_latest_lts_applies_to_full_builds_only() {
        let config = ForgeConfig::default().with_latest_lts_count(Some(1));
        let pipeline = BuildPipeline::new(config, catalog()).expect("pipeline");

        let all = pipeline
            .plan(&ResolveRequest::new().with_image_type("python"))
            .expect("plans");
        assert!(all.iter().all(|t| t.runtime_label() == "15.4 LTS"));

        let explicit = pipeline
            .plan(
                &ResolveRequest::new()
                    .with_runtime("14.3 LTS")
                    .with_image_type("python"),
            )
            .expect("plans");
        assert_eq!(explicit.len(), 1);
    }

    #[test]
    fn test_unknown_runtime_aborts_before_writing() {
        let dir = TempDir::new().expect("temp dir");
        let config = ForgeConfig::default().with_output_dir(dir.path().join("out"));
        let pipeline = BuildPipeline::new(config, catalog()).expect("pipeline");

        let err = pipeline
            .run(&ResolveRequest::new().with_runtime("unknown-version"))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Resolve(ResolveError::RuntimeNotFound(_))
        ));
        assert!(!dir.path().join("out").exists());
    }
}
