//! Dockerfile text generation.
//!
//! Dockerfiles are assembled from typed [`Instruction`]s by a
//! [`DockerfileBuilder`]. The built-in image templates are written with the
//! builder and carry Tera placeholders that the renderer fills in.

mod instruction;

pub use instruction::Instruction;

/// Builder for Dockerfile content: a FROM line followed by instructions.
#[derive(Debug, Clone)]
pub struct DockerfileBuilder {
    base_image: String,
    instructions: Vec<Instruction>,
}

impl DockerfileBuilder {
    /// Create a builder for an image based on `base_image`.
    pub fn new(base_image: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
            instructions: Vec::new(),
        }
    }

    pub fn with(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn extend<I>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = Instruction>,
    {
        self.instructions.extend(instructions);
        self
    }

    /// Build and return the Dockerfile content, newline terminated.
    pub fn build(&self) -> String {
        let mut lines = Vec::with_capacity(self.instructions.len() + 1);
        lines.push(Instruction::From(self.base_image.clone()).to_string());
        lines.extend(self.instructions.iter().map(ToString::to_string));

        let mut content = lines.join("\n");
        content.push('\n');
        content
    }
}

/// Escape special characters in LABEL values.
pub fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
}

/// Validate a package name to prevent command injection.
///
/// Package names may only contain alphanumeric characters, hyphens,
/// underscores, periods, colons (architecture qualifiers), plus signs and
/// equals signs (version pins).
pub fn is_valid_package_name(package: &str) -> bool {
    if package.is_empty() {
        return false;
    }
    package
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '='))
}
