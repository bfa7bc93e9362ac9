//! Runtime release records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::version::{
    is_safe_runtime_label, normalize_os_version, normalize_python_version, sanitize_runtime_label,
};
use crate::error::CatalogError;

/// A supported runtime release and the environment its images are built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRelease {
    /// Version label, unique within a catalog (e.g. "15.4 LTS").
    pub version: String,
    /// Native Ubuntu version of the runtime (e.g. "22.04").
    pub os_version: String,
    /// Python `major.minor` version (e.g. "3.11").
    pub python_version: String,
    /// Whether this is a long-term-supported release.
    #[serde(default)]
    pub is_lts: bool,
    /// Whether an ML variant of this release exists.
    #[serde(default)]
    pub has_ml_variant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spark_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scala_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_support_date: Option<NaiveDate>,
    /// Release notes page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Python packages shipped with the runtime, name -> pinned version.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libraries: BTreeMap<String, String>,
    /// Packages added or re-pinned by the ML variant.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ml_libraries: BTreeMap<String, String>,
}

impl RuntimeRelease {
    pub fn new(
        version: impl Into<String>,
        os_version: impl Into<String>,
        python_version: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            os_version: os_version.into(),
            python_version: python_version.into(),
            is_lts: false,
            has_ml_variant: false,
            spark_version: None,
            scala_version: None,
            java_version: None,
            release_date: None,
            end_of_support_date: None,
            url: None,
            libraries: BTreeMap::new(),
            ml_libraries: BTreeMap::new(),
        }
    }

    pub fn with_lts(mut self, is_lts: bool) -> Self {
        self.is_lts = is_lts;
        self
    }

    pub fn with_ml_variant(mut self, has_ml_variant: bool) -> Self {
        self.has_ml_variant = has_ml_variant;
        self
    }

    pub fn with_spark(mut self, spark_version: impl Into<String>) -> Self {
        self.spark_version = Some(spark_version.into());
        self
    }

    pub fn with_scala(mut self, scala_version: impl Into<String>) -> Self {
        self.scala_version = Some(scala_version.into());
        self
    }

    pub fn with_java(mut self, java_version: impl Into<String>) -> Self {
        self.java_version = Some(java_version.into());
        self
    }

    pub fn with_support_window(mut self, released: NaiveDate, end_of_support: NaiveDate) -> Self {
        self.release_date = Some(released);
        self.end_of_support_date = Some(end_of_support);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_library(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.libraries.insert(name.into(), version.into());
        self
    }

    pub fn with_ml_library(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.ml_libraries.insert(name.into(), version.into());
        self
    }

    /// Directory-safe version label ("15.4 LTS" -> "15.4-LTS").
    pub fn sanitized_version(&self) -> String {
        sanitize_runtime_label(&self.version)
    }

    /// Python packages for the base or ML variant; ML pins override base pins.
    pub fn requirements(&self, ml: bool) -> BTreeMap<String, String> {
        let mut packages = self.libraries.clone();
        if ml {
            packages.extend(
                self.ml_libraries
                    .iter()
                    .map(|(name, version)| (name.clone(), version.clone())),
            );
        }
        packages
    }

    /// Normalizes loosely formatted OS and Python versions in place.
    ///
    /// # Errors
    /// Returns `InvalidRelease` if the label is empty or a version cannot be parsed.
    pub fn normalize(&mut self) -> Result<(), CatalogError> {
        self.version = self.version.trim().to_string();
        if self.version.is_empty() {
            return Err(CatalogError::InvalidRelease {
                version: self.version.clone(),
                reason: "version label is empty".to_string(),
            });
        }
        if !is_safe_runtime_label(&self.version) {
            return Err(CatalogError::InvalidRelease {
                version: self.version.clone(),
                reason: "version label must only use letters, digits, spaces, parentheses, '.', '-' and '_'"
                    .to_string(),
            });
        }

        self.os_version = normalize_os_version(&self.os_version).ok_or_else(|| {
            CatalogError::InvalidRelease {
                version: self.version.clone(),
                reason: format!("unrecognized OS version '{}'", self.os_version),
            }
        })?;

        self.python_version = normalize_python_version(&self.python_version).ok_or_else(|| {
            CatalogError::InvalidRelease {
                version: self.version.clone(),
                reason: format!("unrecognized Python version '{}'", self.python_version),
            }
        })?;

        Ok(())
    }
}
