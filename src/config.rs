//! Generator configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. CLI flags are applied on top of the loaded file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::version::is_os_version;
use crate::dockerfile::is_valid_package_name;
use crate::error::ConfigError;
use crate::image::{ImageNaming, DEFAULT_CUDA_VERSION, DEFAULT_CUDNN_VERSION, DEFAULT_REPOSITORY};
use crate::resolver::{ResolverOptions, DEFAULT_OS_VERSION};

/// Versions of the Python packaging tools installed in python images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PythonToolsConfig {
    pub pip: String,
    pub setuptools: String,
    pub wheel: String,
    pub virtualenv: String,
}

impl Default for PythonToolsConfig {
    fn default() -> Self {
        Self {
            pip: "24.0".to_string(),
            setuptools: "74.0.0".to_string(),
            wheel: "0.38.4".to_string(),
            virtualenv: "20.26.2".to_string(),
        }
    }
}

/// CUDA base image versions for GPU chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CudaConfig {
    pub version: String,
    /// cuDNN major for CUDA 11 style tags (`cudnn8`); empty for CUDA 12 tags.
    pub cudnn: String,
}

impl Default for CudaConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CUDA_VERSION.to_string(),
            cudnn: DEFAULT_CUDNN_VERSION.to_string(),
        }
    }
}

/// Azul Zulu package versions installed in minimal images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JdkConfig {
    pub jdk8: String,
    pub jdk17: String,
}

impl Default for JdkConfig {
    fn default() -> Self {
        Self {
            jdk8: "8.0.432-1".to_string(),
            jdk17: "17.0.13-1".to_string(),
        }
    }
}

/// Package lists substituted into the templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagesConfig {
    /// apt packages of the minimal image.
    pub system: Vec<String>,
    /// apt packages of the standard image.
    pub standard: Vec<String>,
    /// apt packages needed to build pinned Python libraries.
    pub python_build: Vec<String>,
    /// pip packages of the notebook language server environment.
    pub lsp: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            system: owned(&["iproute2", "bash", "sudo", "coreutils", "procps", "acl", "gnupg", "curl"]),
            standard: owned(&["fuse", "openssh-server"]),
            python_build: owned(&["libpq-dev", "build-essential"]),
            lsp: owned(&["python-lsp-server==1.10.0", "pylsp-mypy==0.6.8"]),
        }
    }
}

/// Configuration for one generator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    // Output settings
    /// Root directory Dockerfiles and manifests are written to.
    pub output_dir: PathBuf,
    /// OS version every chain uses unless one is forced.
    pub default_os_version: String,
    /// Include ML variants of releases that have one.
    pub include_ml: bool,
    /// Restrict a full build to the N most recent LTS releases.
    pub latest_lts_count: Option<usize>,
    /// Directory of `<image-type>.Dockerfile.tera` overrides.
    pub templates_dir: Option<PathBuf>,

    // Image naming
    pub repository: String,
    /// Registry repository replacing `repository` in every tag.
    pub registry: Option<String>,

    // Tool versions
    pub python: PythonToolsConfig,
    pub cuda: CudaConfig,
    pub jdk: JdkConfig,
    pub packages: PackagesConfig,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            default_os_version: DEFAULT_OS_VERSION.to_string(),
            include_ml: true,
            latest_lts_count: None,
            templates_dir: None,
            repository: DEFAULT_REPOSITORY.to_string(),
            registry: None,
            python: PythonToolsConfig::default(),
            cuda: CudaConfig::default(),
            jdk: JdkConfig::default(),
            packages: PackagesConfig::default(),
        }
    }
}

impl ForgeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_os_version(&self.default_os_version) {
            return Err(ConfigError::Invalid(format!(
                "default_os_version '{}' must look like '24.04'",
                self.default_os_version
            )));
        }

        if self.repository.trim().is_empty() {
            return Err(ConfigError::Invalid("repository cannot be empty".to_string()));
        }

        if self.latest_lts_count == Some(0) {
            return Err(ConfigError::Invalid(
                "latest_lts_count must be greater than 0".to_string(),
            ));
        }

        let package_lists = [
            ("packages.system", &self.packages.system),
            ("packages.standard", &self.packages.standard),
            ("packages.python_build", &self.packages.python_build),
            ("packages.lsp", &self.packages.lsp),
        ];
        for (field, packages) in package_lists {
            if let Some(bad) = packages.iter().find(|p| !is_valid_package_name(p)) {
                return Err(ConfigError::Invalid(format!(
                    "{field} contains invalid package name '{bad}'"
                )));
            }
        }

        Ok(())
    }

    /// Image naming rules derived from this configuration.
    pub fn naming(&self) -> ImageNaming {
        ImageNaming {
            repository: self.repository.clone(),
            registry: None,
            default_os_version: self.default_os_version.clone(),
            cuda_version: self.cuda.version.clone(),
            cudnn_version: self.cuda.cudnn.clone(),
        }
        .with_registry(self.registry.clone())
    }

    /// Resolver settings derived from this configuration.
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions::default()
            .with_default_os_version(self.default_os_version.clone())
            .with_include_ml(self.include_ml)
            .with_data_dir(self.output_dir.clone())
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_default_os_version(mut self, os_version: impl Into<String>) -> Self {
        self.default_os_version = os_version.into();
        self
    }

    pub fn with_include_ml(mut self, include_ml: bool) -> Self {
        self.include_ml = include_ml;
        self
    }

    pub fn with_latest_lts_count(mut self, count: Option<usize>) -> Self {
        self.latest_lts_count = count;
        self
    }

    pub fn with_templates_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.templates_dir = dir;
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ForgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_dir, PathBuf::from("data"));
        assert_eq!(config.default_os_version, "24.04");
        assert_eq!(config.python.pip, "24.0");
        assert_eq!(config.jdk.jdk17, "17.0.13-1");
        assert!(config.include_ml);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("forge.yaml");
        fs::write(
            &path,
            "output_dir: out\nregistry: ghcr.io/acme/runtime\ncuda:\n  version: 12.4.1\n",
        )
        .expect("write config");

        let config = ForgeConfig::load(&path).expect("config loads");
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.cuda.version, "12.4.1");
        assert_eq!(config.cuda.cudnn, "");
        assert_eq!(config.python, PythonToolsConfig::default());
        assert_eq!(config.naming().singleton_tag("gpu", "24.04"), "ghcr.io/acme/runtime:gpu");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("forge.yaml");
        fs::write(&path, "outptu_dir: typo\n").expect("write config");

        let err = ForgeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ForgeConfig::load(Path::new("/nonexistent/forge.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ForgeConfig::default().with_default_os_version("noble");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ForgeConfig::default().with_latest_lts_count(Some(0));
        assert!(config.validate().is_err());

        let mut config = ForgeConfig::default();
        config.packages.system.push("curl; reboot".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("packages.system"));
    }

    #[test]
    fn test_resolver_options_follow_config() {
        let options = ForgeConfig::default()
            .with_output_dir("build")
            .with_include_ml(false)
            .resolver_options();
        assert_eq!(options.data_dir, PathBuf::from("build"));
        assert!(!options.include_ml);
        assert_eq!(options.default_os_version, "24.04");
    }
}
