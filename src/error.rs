//! Error types for runtime-forge operations.
//!
//! Defines error types for each subsystem:
//! - Runtime catalog loading and refresh
//! - Target resolution (unknown runtimes, image types, OS versions)
//! - Template lookup and Dockerfile rendering
//! - Build summary and matrix generation
//! - Configuration loading

use thiserror::Error;

/// Errors that can occur while loading or refreshing the runtime catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Duplicate runtime version '{0}' in catalog (labels must differ after sanitizing)")]
    DuplicateVersion(String),

    #[error("Invalid runtime release '{version}': {reason}")]
    InvalidRelease { version: String, reason: String },

    #[error("Unsupported catalog format for '{0}': expected .json, .yaml or .yml")]
    UnsupportedFormat(String),

    #[error("Catalog download from '{url}' failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors that can occur while resolving build targets.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Runtime version '{0}' not found in catalog")]
    RuntimeNotFound(String),

    #[error("Image type '{0}' not found")]
    ImageTypeNotFound(String),

    #[error("Invalid OS version '{0}': expected a version like '22.04'")]
    InvalidOsVersion(String),

    #[error("Image type '{name}' declares unknown parent '{parent}'")]
    UnknownParent { name: String, parent: String },

    #[error("Dependency cycle detected at image type '{0}'")]
    CyclicChain(String),
}

/// Errors that can occur while rendering or writing Dockerfiles.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No template registered for image type '{0}'")]
    TemplateNotFound(String),

    #[error("Invalid package name '{0}'")]
    InvalidPackage(String),

    #[error("Failed to parse template file '{path}': {message}")]
    TemplateParse { path: String, message: String },

    #[error("Tera template rendering error: {0}")]
    Tera(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while writing or reading the build summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Build summary not found at '{0}'. Run build first.")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error for a single build invocation.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Summary(#[from] SummaryError),
}
