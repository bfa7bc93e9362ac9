//! Resolved build targets and their output layout.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::version::compact;
use crate::catalog::RuntimeRelease;
use crate::image::{target_suffix, ImageTypeSpec};

pub const DOCKERFILE: &str = "Dockerfile";

/// Directory used by singleton images built for the default OS.
pub const LATEST_DIR: &str = "latest";

/// Variant marker of ML builds, used in file names and the build matrix.
pub const ML_VARIANT: &str = ".ml";

/// One Dockerfile to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    /// Runtime release for runtime-specific types; `None` for singletons.
    pub runtime: Option<RuntimeRelease>,
    pub image_type: ImageTypeSpec,
    /// Effective Ubuntu version the image is built on.
    pub os_version: String,
    pub python_version: Option<String>,
    pub ml: bool,
    /// True when the runtime's native OS was replaced by the default.
    pub os_upgraded: bool,
    /// Directory the target's files are written to.
    pub output_dir: PathBuf,
}

impl ResolvedTarget {
    /// Output directory for a target under `data_dir`.
    ///
    /// Singletons use `latest` at the default OS and `ubuntu<os>` otherwise;
    /// runtime-specific targets use `<runtime>-ubuntu<os>-py<python>`.
    pub fn output_dir_for(
        data_dir: &Path,
        image_type: &str,
        runtime: Option<&RuntimeRelease>,
        os_version: &str,
        default_os_version: &str,
    ) -> PathBuf {
        let dir = match runtime {
            Some(release) => format!(
                "{}{}",
                release.sanitized_version(),
                target_suffix(os_version, &release.python_version)
            ),
            None if os_version == default_os_version => LATEST_DIR.to_string(),
            None => format!("ubuntu{}", compact(os_version)),
        };
        data_dir.join(image_type).join(dir)
    }

    pub fn is_runtime_specific(&self) -> bool {
        self.runtime.is_some()
    }

    /// Runtime label, or `latest` for singletons.
    pub fn runtime_label(&self) -> &str {
        self.runtime
            .as_ref()
            .map(|r| r.version.as_str())
            .unwrap_or(LATEST_DIR)
    }

    /// `.ml` for ML builds, empty otherwise.
    pub fn variant(&self) -> &'static str {
        if self.ml {
            ML_VARIANT
        } else {
            ""
        }
    }

    /// `-ubuntu<os>-py<python>` for runtime-specific targets, empty otherwise.
    pub fn suffix(&self) -> String {
        match &self.python_version {
            Some(python) if self.runtime.is_some() => target_suffix(&self.os_version, python),
            _ => String::new(),
        }
    }

    pub fn dockerfile_name(&self) -> String {
        format!("{DOCKERFILE}{}", self.variant())
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.output_dir.join(self.dockerfile_name())
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("runtime_metadata{}.json", self.variant()))
    }

    /// Pinned requirements file name, for runtime-specific targets only.
    pub fn requirements_name(&self) -> Option<String> {
        self.is_runtime_specific()
            .then(|| format!("requirements{}.txt", self.variant()))
    }

    pub fn requirements_path(&self) -> Option<PathBuf> {
        self.requirements_name()
            .map(|name| self.output_dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_target(ml: bool) -> ResolvedTarget {
        let release = RuntimeRelease::new("15.4 LTS", "22.04", "3.11").with_ml_variant(true);
        let output_dir = ResolvedTarget::output_dir_for(
            Path::new("data"),
            "python",
            Some(&release),
            "24.04",
            "24.04",
        );
        ResolvedTarget {
            runtime: Some(release),
            image_type: ImageTypeSpec::child("python", "standard", "").with_runtime_specific(true),
            os_version: "24.04".to_string(),
            python_version: Some("3.11".to_string()),
            ml,
            os_upgraded: true,
            output_dir,
        }
    }

    #[test]
    fn test_runtime_specific_layout() {
        let base = python_target(false);
        assert_eq!(
            base.output_dir,
            PathBuf::from("data/python/15.4-LTS-ubuntu2404-py311")
        );
        assert_eq!(base.dockerfile_path(), base.output_dir.join("Dockerfile"));
        assert_eq!(base.metadata_path(), base.output_dir.join("runtime_metadata.json"));
        assert_eq!(base.requirements_path(), Some(base.output_dir.join("requirements.txt")));
        assert_eq!(base.suffix(), "-ubuntu2404-py311");
        assert_eq!(base.variant(), "");

        let ml = python_target(true);
        assert_eq!(ml.output_dir, base.output_dir);
        assert_eq!(ml.dockerfile_path(), ml.output_dir.join("Dockerfile.ml"));
        assert_eq!(ml.metadata_path(), ml.output_dir.join("runtime_metadata.ml.json"));
        assert_eq!(ml.requirements_name().as_deref(), Some("requirements.ml.txt"));
        assert_eq!(ml.variant(), ".ml");
    }

    #[test]
    fn test_singleton_layout() {
        let latest = ResolvedTarget::output_dir_for(Path::new("data"), "standard", None, "24.04", "24.04");
        assert_eq!(latest, PathBuf::from("data/standard/latest"));

        let forced = ResolvedTarget::output_dir_for(Path::new("data"), "standard", None, "22.04", "24.04");
        assert_eq!(forced, PathBuf::from("data/standard/ubuntu2204"));
    }
}
