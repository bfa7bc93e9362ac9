//! Rendering resolved targets into files.
//!
//! [`Renderer::render`] is pure: it turns a [`ResolvedTarget`] into the
//! Dockerfile text, metadata JSON and requirements it needs.
//! [`Renderer::write`] puts an artifact on disk under the target's output
//! directory. Output is byte-identical for identical inputs.

mod metadata;

pub use metadata::{requirements_txt, RuntimeInfo, RuntimeMetadata, SystemEnvironment};

use std::fs;

use sha2::{Digest, Sha256};

use crate::catalog::version::compact;
use crate::config::ForgeConfig;
use crate::dockerfile::is_valid_package_name;
use crate::error::RenderError;
use crate::image::{ImageNaming, ImageTypeSet};
use crate::resolver::ResolvedTarget;
use crate::template::{TemplateContext, TemplateSet};

/// Everything generated for one target.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub target: ResolvedTarget,
    pub image_tag: String,
    /// Image the Dockerfile starts FROM.
    pub base_image: String,
    pub dockerfile: String,
    /// Pretty-printed metadata JSON, newline terminated.
    pub metadata: String,
    pub requirements: Option<String>,
}

impl RenderedArtifact {
    /// Hex SHA-256 of the Dockerfile text.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.dockerfile.as_bytes()))
    }
}

/// Renders targets with a template set and image naming rules.
#[derive(Debug, Clone)]
pub struct Renderer<'a> {
    config: &'a ForgeConfig,
    templates: &'a TemplateSet,
    image_types: &'a ImageTypeSet,
    naming: ImageNaming,
}

impl<'a> Renderer<'a> {
    pub fn new(
        config: &'a ForgeConfig,
        templates: &'a TemplateSet,
        image_types: &'a ImageTypeSet,
    ) -> Self {
        Self {
            config,
            templates,
            image_types,
            naming: config.naming(),
        }
    }

    pub fn naming(&self) -> &ImageNaming {
        &self.naming
    }

    /// Tag of the image built from `target`.
    pub fn image_tag(&self, target: &ResolvedTarget) -> String {
        self.tag_for(&target.image_type.name, target)
    }

    /// FROM reference of `target`: the parent's tag or, for roots, the OS image.
    pub fn base_image(&self, target: &ResolvedTarget) -> String {
        match self.image_types.parent_of(&target.image_type) {
            Some(parent) if parent.runtime_specific => self.tag_for(&parent.name, target),
            Some(parent) => self.naming.singleton_tag(&parent.name, &target.os_version),
            None => self
                .naming
                .root_base_image(target.image_type.gpu, &target.os_version),
        }
    }

    fn tag_for(&self, image_type: &str, target: &ResolvedTarget) -> String {
        match (&target.runtime, &target.python_version) {
            (Some(release), Some(python)) => self.naming.runtime_tag(
                image_type,
                &release.version,
                &target.os_version,
                python,
                target.ml,
            ),
            _ => self.naming.singleton_tag(image_type, &target.os_version),
        }
    }

    fn context(&self, target: &ResolvedTarget, image_tag: &str, base_image: &str) -> TemplateContext {
        let config = self.config;
        let release = target.runtime.as_ref();
        TemplateContext {
            image_type: target.image_type.name.clone(),
            image_tag: image_tag.to_string(),
            base_image: base_image.to_string(),
            os_version: target.os_version.clone(),
            os_compact: compact(&target.os_version),
            default_os_version: config.default_os_version.clone(),
            runtime_version: release.map(|r| r.version.clone()),
            python_version: target.python_version.clone(),
            spark_version: release.and_then(|r| r.spark_version.clone()),
            is_ml: target.ml,
            requirements_path: target.requirements_name(),
            jdk8_version: config.jdk.jdk8.clone(),
            jdk17_version: config.jdk.jdk17.clone(),
            cuda_version: config.cuda.version.clone(),
            cudnn_version: config.cuda.cudnn.clone(),
            pip_version: config.python.pip.clone(),
            setuptools_version: config.python.setuptools.clone(),
            wheel_version: config.python.wheel.clone(),
            virtualenv_version: config.python.virtualenv.clone(),
            system_packages: config.packages.system.clone(),
            standard_packages: config.packages.standard.clone(),
            python_build_packages: config.packages.python_build.clone(),
            lsp_packages: config.packages.lsp.clone(),
        }
    }

    /// Renders a target without touching the filesystem.
    ///
    /// # Errors
    /// `TemplateNotFound` when the image type has no template and
    /// `InvalidPackage` when a configured package name is not shell safe.
    pub fn render(&self, target: &ResolvedTarget) -> Result<RenderedArtifact, RenderError> {
        let packages = &self.config.packages;
        if let Some(bad) = [
            &packages.system,
            &packages.standard,
            &packages.python_build,
            &packages.lsp,
        ]
        .into_iter()
        .flatten()
        .find(|p| !is_valid_package_name(p))
        {
            return Err(RenderError::InvalidPackage(bad.clone()));
        }

        let image_tag = self.image_tag(target);
        let base_image = self.base_image(target);

        let context = self.context(target, &image_tag, &base_image);
        let dockerfile = self.templates.render(&target.image_type.name, &context)?;

        let metadata = RuntimeMetadata::from_target(target, &image_tag, &base_image);
        let mut metadata = serde_json::to_string_pretty(&metadata)?;
        metadata.push('\n');

        Ok(RenderedArtifact {
            target: target.clone(),
            image_tag,
            base_image,
            dockerfile,
            metadata,
            requirements: requirements_txt(target),
        })
    }

    /// Writes an artifact's files, creating the output directory.
    pub fn write(&self, artifact: &RenderedArtifact) -> Result<(), RenderError> {
        let target = &artifact.target;
        fs::create_dir_all(&target.output_dir)?;

        fs::write(target.dockerfile_path(), &artifact.dockerfile)?;
        fs::write(target.metadata_path(), &artifact.metadata)?;
        if let (Some(path), Some(requirements)) =
            (target.requirements_path(), &artifact.requirements)
        {
            fs::write(path, requirements)?;
        }

        tracing::info!(
            image_type = %target.image_type.name,
            runtime = %target.runtime_label(),
            variant = %target.variant(),
            path = %target.dockerfile_path().display(),
            "Wrote Dockerfile"
        );
        Ok(())
    }
}
