//! Image tags and root base images.

use crate::catalog::version::{compact, tag_runtime_label};

pub const DEFAULT_REPOSITORY: &str = "dbx-runtime";

/// CUDA release of the `gpu` root; it publishes images for 22.04 and 24.04.
pub const DEFAULT_CUDA_VERSION: &str = "12.6.3";

/// cuDNN major in the CUDA tag. Empty selects the bundled cuDNN tag form
/// (`12.6.3-cudnn-runtime-ubuntu24.04`) used by CUDA 12 images.
pub const DEFAULT_CUDNN_VERSION: &str = "";

/// Naming rules for generated images.
///
/// Tags are `<repository>:<image-type>` for singleton types, with
/// `-ubuntu<os>` appended when built for a non-default OS, and
/// `<repository>:<image-type>-<runtime>-ubuntu<os>-py<python>[-ml]` for
/// runtime-specific types. A registry, when set, replaces the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNaming {
    pub repository: String,
    pub registry: Option<String>,
    pub default_os_version: String,
    pub cuda_version: String,
    pub cudnn_version: String,
}

impl Default for ImageNaming {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.to_string(),
            registry: None,
            default_os_version: "24.04".to_string(),
            cuda_version: DEFAULT_CUDA_VERSION.to_string(),
            cudnn_version: DEFAULT_CUDNN_VERSION.to_string(),
        }
    }
}

impl ImageNaming {
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry.filter(|r| !r.trim().is_empty());
        self
    }

    /// Repository all tags are written under.
    pub fn image_repository(&self) -> &str {
        self.registry
            .as_deref()
            .map(|r| r.trim_end_matches('/'))
            .unwrap_or(&self.repository)
    }

    pub fn singleton_tag(&self, image_type: &str, os_version: &str) -> String {
        if os_version == self.default_os_version {
            format!("{}:{image_type}", self.image_repository())
        } else {
            format!(
                "{}:{image_type}-ubuntu{}",
                self.image_repository(),
                compact(os_version)
            )
        }
    }

    pub fn runtime_tag(
        &self,
        image_type: &str,
        runtime_label: &str,
        os_version: &str,
        python_version: &str,
        ml: bool,
    ) -> String {
        format!(
            "{}:{image_type}-{}{}{}",
            self.image_repository(),
            tag_runtime_label(runtime_label),
            target_suffix(os_version, python_version),
            if ml { "-ml" } else { "" }
        )
    }

    /// Base image for a root type: the CUDA runtime image or plain Ubuntu.
    pub fn root_base_image(&self, gpu: bool, os_version: &str) -> String {
        if gpu {
            format!(
                "nvidia/cuda:{}-cudnn{}-runtime-ubuntu{os_version}",
                self.cuda_version, self.cudnn_version
            )
        } else {
            format!("ubuntu:{os_version}")
        }
    }
}

/// Tag and directory suffix of a runtime-specific build, e.g. `-ubuntu2404-py311`.
pub fn target_suffix(os_version: &str, python_version: &str) -> String {
    format!("-ubuntu{}-py{}", compact(os_version), compact(python_version))
}
