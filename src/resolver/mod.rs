//! Build target resolution.
//!
//! Turns an optional runtime filter, an optional image-type filter and an
//! optional forced OS version into the ordered list of Dockerfiles to render.
//! Image types come in parent-before-child order; within a runtime-specific
//! type, releases keep catalog order and each base build precedes its ML
//! build.

mod target;

pub use target::{ResolvedTarget, DOCKERFILE, LATEST_DIR, ML_VARIANT};

use std::collections::HashSet;
use std::path::PathBuf;

use crate::catalog::version::is_os_version;
use crate::catalog::{Catalog, RuntimeRelease};
use crate::error::ResolveError;
use crate::image::{ImageTypeSet, ImageTypeSpec};

/// Default Ubuntu version every chain is built on unless forced.
pub const DEFAULT_OS_VERSION: &str = "24.04";

/// Filters for one resolve call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Exact runtime label; `None` selects every release.
    pub runtime: Option<String>,
    /// Image type name; `None` selects every type.
    pub image_type: Option<String>,
    /// OS version applied to every target instead of the default.
    pub forced_os_version: Option<String>,
}

impl ResolveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    pub fn with_image_type(mut self, image_type: impl Into<String>) -> Self {
        self.image_type = Some(image_type.into());
        self
    }

    pub fn with_forced_os_version(mut self, os_version: impl Into<String>) -> Self {
        self.forced_os_version = Some(os_version.into());
        self
    }
}

/// Settings shared by every resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    pub default_os_version: String,
    /// Emit ML targets for releases that declare an ML variant.
    pub include_ml: bool,
    /// Root output directory.
    pub data_dir: PathBuf,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            default_os_version: DEFAULT_OS_VERSION.to_string(),
            include_ml: true,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl ResolverOptions {
    pub fn with_default_os_version(mut self, os_version: impl Into<String>) -> Self {
        self.default_os_version = os_version.into();
        self
    }

    pub fn with_include_ml(mut self, include_ml: bool) -> Self {
        self.include_ml = include_ml;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

/// Resolves build targets against a catalog and an image type set.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    image_types: &'a ImageTypeSet,
    options: ResolverOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, image_types: &'a ImageTypeSet, options: ResolverOptions) -> Self {
        Self {
            catalog,
            image_types,
            options,
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolves the targets selected by `request`.
    ///
    /// Singleton types are emitted whenever their type is selected, even with
    /// a runtime filter, and carry the runtime label `latest`.
    ///
    /// # Errors
    /// `RuntimeNotFound` / `ImageTypeNotFound` for unknown filters and
    /// `InvalidOsVersion` for a forced OS not shaped like `22.04`.
    pub fn resolve(&self, request: &ResolveRequest) -> Result<Vec<ResolvedTarget>, ResolveError> {
        let forced = match request.forced_os_version.as_deref().map(str::trim) {
            Some(os) if is_os_version(os) => Some(os.to_string()),
            Some(os) => return Err(ResolveError::InvalidOsVersion(os.to_string())),
            None => None,
        };

        let image_types: Vec<&ImageTypeSpec> = match &request.image_type {
            Some(name) => vec![self.image_types.require(name)?],
            None => self.image_types.iter().collect(),
        };

        let releases: Vec<&RuntimeRelease> = match &request.runtime {
            Some(label) => vec![self
                .catalog
                .get(label)
                .ok_or_else(|| ResolveError::RuntimeNotFound(label.clone()))?],
            None => self.catalog.iter().collect(),
        };

        let os_version = forced
            .clone()
            .unwrap_or_else(|| self.options.default_os_version.clone());

        let mut targets = Vec::new();
        let mut seen_paths = HashSet::new();
        let mut upgrades_logged = HashSet::new();

        for spec in image_types {
            if !spec.runtime_specific {
                let target = self.singleton(spec, &os_version);
                if seen_paths.insert(target.dockerfile_path()) {
                    targets.push(target);
                }
                continue;
            }

            for release in &releases {
                let os_upgraded = forced.is_none() && release.os_version != os_version;
                if os_upgraded && upgrades_logged.insert(release.version.clone()) {
                    tracing::info!(
                        runtime = %release.version,
                        native_os = %release.os_version,
                        os_version = %os_version,
                        "Upgrading runtime to the default OS version"
                    );
                }

                let base = self.runtime_target(spec, release, &os_version, os_upgraded, false);
                let ml = (self.options.include_ml && release.has_ml_variant)
                    .then(|| self.runtime_target(spec, release, &os_version, os_upgraded, true));

                for target in std::iter::once(base).chain(ml) {
                    if seen_paths.insert(target.dockerfile_path()) {
                        targets.push(target);
                    }
                }
            }
        }

        tracing::debug!(
            targets = targets.len(),
            os_version = %os_version,
            forced = forced.is_some(),
            "Resolved build targets"
        );
        Ok(targets)
    }

    fn singleton(&self, spec: &ImageTypeSpec, os_version: &str) -> ResolvedTarget {
        ResolvedTarget {
            runtime: None,
            image_type: spec.clone(),
            os_version: os_version.to_string(),
            python_version: None,
            ml: false,
            os_upgraded: false,
            output_dir: ResolvedTarget::output_dir_for(
                &self.options.data_dir,
                &spec.name,
                None,
                os_version,
                &self.options.default_os_version,
            ),
        }
    }

    fn runtime_target(
        &self,
        spec: &ImageTypeSpec,
        release: &RuntimeRelease,
        os_version: &str,
        os_upgraded: bool,
        ml: bool,
    ) -> ResolvedTarget {
        ResolvedTarget {
            runtime: Some(release.clone()),
            image_type: spec.clone(),
            os_version: os_version.to_string(),
            python_version: Some(release.python_version.clone()),
            ml,
            os_upgraded,
            output_dir: ResolvedTarget::output_dir_for(
                &self.options.data_dir,
                &spec.name,
                Some(release),
                os_version,
                &self.options.default_os_version,
            ),
        }
    }
}
