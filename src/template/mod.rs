//! Dockerfile templates per image type.
//!
//! Every image type has one Tera template describing the layer it adds on
//! top of its parent. The built-in set covers all built-in image types;
//! a templates directory can override or add types with files named
//! `<image-type>.Dockerfile.tera`.
//!
//! # Example
//!
//! ```ignore
//! use runtime_forge::template::TemplateSet;
//!
//! let mut templates = TemplateSet::builtin();
//! templates.load_directory("templates/")?;
//!
//! let dockerfile = templates.render("python", &context)?;
//! ```

mod builtin;

use std::collections::{BTreeMap, HashMap};
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera, Value};
use walkdir::WalkDir;

use crate::dockerfile::escape_label_value;
use crate::error::RenderError;

/// Filter that escapes a value for use inside a double-quoted LABEL.
pub const LABEL_FILTER: &str = "docker_label";

/// File suffix of template overrides in a templates directory.
pub const TEMPLATE_FILE_SUFFIX: &str = ".Dockerfile.tera";

/// Where a template came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    Builtin,
    File(PathBuf),
}

impl std::fmt::Display for TemplateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateOrigin::Builtin => write!(f, "builtin"),
            TemplateOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A parsed-and-checked template source.
#[derive(Debug, Clone)]
pub struct DockerfileTemplate {
    pub image_type: String,
    pub source: String,
    pub origin: TemplateOrigin,
}

/// Values substituted into a template.
///
/// Runtime fields are `None` for singleton image types and render as empty
/// strings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateContext {
    pub image_type: String,
    pub image_tag: String,
    pub base_image: String,
    pub os_version: String,
    pub os_compact: String,
    pub default_os_version: String,
    pub runtime_version: Option<String>,
    pub python_version: Option<String>,
    pub spark_version: Option<String>,
    pub is_ml: bool,
    pub requirements_path: Option<String>,
    pub jdk8_version: String,
    pub jdk17_version: String,
    pub cuda_version: String,
    pub cudnn_version: String,
    pub pip_version: String,
    pub setuptools_version: String,
    pub wheel_version: String,
    pub virtualenv_version: String,
    pub system_packages: Vec<String>,
    pub standard_packages: Vec<String>,
    pub python_build_packages: Vec<String>,
    pub lsp_packages: Vec<String>,
}

impl TemplateContext {
    fn to_tera(&self) -> Result<Context, RenderError> {
        let mut context = Context::from_serialize(self)?;
        // Tera treats null as undefined; singletons render missing runtime fields as "".
        for (key, value) in [
            ("runtime_version", &self.runtime_version),
            ("python_version", &self.python_version),
            ("spark_version", &self.spark_version),
            ("requirements_path", &self.requirements_path),
        ] {
            context.insert(key, value.as_deref().unwrap_or_default());
        }
        Ok(context)
    }
}

/// Registry of Dockerfile templates keyed by image type.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, DockerfileTemplate>,
}

impl TemplateSet {
    /// Creates an empty template set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Template set with the built-in body of every built-in image type.
    pub fn builtin() -> Self {
        let templates = builtin::sources()
            .into_iter()
            .map(|(name, source)| {
                (
                    name.to_string(),
                    DockerfileTemplate {
                        image_type: name.to_string(),
                        source,
                        origin: TemplateOrigin::Builtin,
                    },
                )
            })
            .collect();
        Self { templates }
    }

    /// Registers (or replaces) the template for `image_type` after checking it parses.
    pub fn register(
        &mut self,
        image_type: impl Into<String>,
        source: impl Into<String>,
        origin: TemplateOrigin,
    ) -> Result<(), RenderError> {
        let image_type = image_type.into();
        let source = source.into();

        engine()
            .add_raw_template(&image_type, &source)
            .map_err(|e| RenderError::TemplateParse {
                path: origin.to_string(),
                message: error_chain(&e),
            })?;

        if let Some(previous) = self.templates.get(&image_type) {
            tracing::debug!(
                image_type = %image_type,
                previous = %previous.origin,
                replacement = %origin,
                "Overriding Dockerfile template"
            );
        }

        self.templates.insert(
            image_type.clone(),
            DockerfileTemplate {
                image_type,
                source,
                origin,
            },
        );
        Ok(())
    }

    /// Loads every `<image-type>.Dockerfile.tera` file under `dir`, recursively.
    ///
    /// Returns the number of templates loaded.
    pub fn load_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, RenderError> {
        let dir = dir.as_ref();
        let mut count = 0;

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                RenderError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other(format!("cannot walk {}", dir.display()))
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(image_type) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(TEMPLATE_FILE_SUFFIX))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
            else {
                continue;
            };

            let source = fs::read_to_string(entry.path())?;
            self.register(
                image_type,
                source,
                TemplateOrigin::File(entry.path().to_path_buf()),
            )?;
            count += 1;
        }

        tracing::info!(dir = %dir.display(), count, "Loaded Dockerfile templates");
        Ok(count)
    }

    /// Gets the template for an image type.
    pub fn get(&self, image_type: &str) -> Result<&DockerfileTemplate, RenderError> {
        self.templates
            .get(image_type)
            .ok_or_else(|| RenderError::TemplateNotFound(image_type.to_string()))
    }

    pub fn contains(&self, image_type: &str) -> bool {
        self.templates.contains_key(image_type)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates ordered by image type name.
    pub fn iter(&self) -> impl Iterator<Item = &DockerfileTemplate> {
        self.templates.values()
    }

    /// Renders the template of `image_type` with `context`.
    pub fn render(
        &self,
        image_type: &str,
        context: &TemplateContext,
    ) -> Result<String, RenderError> {
        let template = self.get(image_type)?;
        let context = context.to_tera()?;
        let mut tera = engine();
        tera.add_raw_template(&template.image_type, &template.source)?;
        Ok(tera.render(&template.image_type, &context)?)
    }
}

/// Tera instance with the Dockerfile filters registered and autoescape off.
fn engine() -> Tera {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.register_filter(LABEL_FILTER, docker_label_filter);
    tera
}

fn docker_label_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Value::String(escape_label_value(&text)))
}

/// Flattens a Tera error and its sources into one line.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
