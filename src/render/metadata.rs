//! Per-image metadata and pinned requirements.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::resolver::ResolvedTarget;

/// Release information of a runtime-specific image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub version: String,
    pub is_lts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_support_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// OS and language versions inside the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEnvironment {
    pub os_version: String,
    /// OS the runtime ships on, when it differs from `os_version`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scala_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spark_version: Option<String>,
}

/// Contents of `runtime_metadata[.ml].json`.
///
/// Carries no timestamps so repeated builds write identical files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetadata {
    pub image_type: String,
    pub image_tag: String,
    pub base_image: String,
    /// `.ml` for ML builds, empty otherwise.
    pub variant: String,
    pub is_ml: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeInfo>,
    pub system_environment: SystemEnvironment,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub included_libraries: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RuntimeMetadata {
    pub fn from_target(target: &ResolvedTarget, image_tag: &str, base_image: &str) -> Self {
        let release = target.runtime.as_ref();
        let native_os_version = release
            .map(|r| r.os_version.clone())
            .filter(|native| *native != target.os_version);

        Self {
            image_type: target.image_type.name.clone(),
            image_tag: image_tag.to_string(),
            base_image: base_image.to_string(),
            variant: target.variant().to_string(),
            is_ml: target.ml,
            runtime: release.map(|r| RuntimeInfo {
                version: r.version.clone(),
                is_lts: r.is_lts,
                release_date: r.release_date,
                end_of_support_date: r.end_of_support_date,
                url: r.url.clone(),
            }),
            system_environment: SystemEnvironment {
                os_version: target.os_version.clone(),
                native_os_version,
                python_version: target.python_version.clone(),
                java_version: release.and_then(|r| r.java_version.clone()),
                scala_version: release.and_then(|r| r.scala_version.clone()),
                spark_version: release.and_then(|r| r.spark_version.clone()),
            },
            included_libraries: release
                .map(|r| r.requirements(target.ml))
                .unwrap_or_default(),
            note: release
                .is_none()
                .then(|| "Shared base image; not tied to a runtime release".to_string()),
        }
    }
}

/// Pinned `requirements.txt` content for a runtime-specific target.
pub fn requirements_txt(target: &ResolvedTarget) -> Option<String> {
    let release = target.runtime.as_ref()?;
    let mut content = format!(
        "# Python libraries of runtime {}{}\n# Generated by runtime-forge; do not edit.\n",
        release.version,
        if target.ml { " ML" } else { "" }
    );
    for (name, version) in release.requirements(target.ml) {
        content.push_str(&format!("{name}=={version}\n"));
    }
    Some(content)
}
