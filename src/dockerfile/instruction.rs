//! Typed Dockerfile instructions.

use std::fmt;

use super::escape_label_value;

/// Separator used when a RUN instruction chains several shell steps.
const RUN_STEP_SEPARATOR: &str = " && \\\n    ";

/// A single Dockerfile instruction.
///
/// Values are written as given, so template placeholders such as
/// `{{ base_image }}` pass through unchanged and are filled in at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    From(String),
    Comment(String),
    Arg {
        name: String,
        default: Option<String>,
    },
    Env {
        name: String,
        value: String,
    },
    /// Shell steps joined with `&&` onto continuation lines.
    Run(Vec<String>),
    Copy {
        src: String,
        dest: String,
        chown: Option<String>,
    },
    Label {
        key: String,
        value: String,
    },
}

impl Instruction {
    pub fn comment(text: impl Into<String>) -> Self {
        Self::Comment(text.into())
    }

    pub fn arg(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::Arg {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    pub fn env(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Env {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn run(command: impl Into<String>) -> Self {
        Self::Run(vec![command.into()])
    }

    pub fn run_steps<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Run(steps.into_iter().map(Into::into).collect())
    }

    pub fn copy(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::Copy {
            src: src.into(),
            dest: dest.into(),
            chown: None,
        }
    }

    pub fn label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Label {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Quotes an ENV value when it is empty or contains whitespace.
fn format_env_value(value: &str) -> String {
    if !value.is_empty() && !value.contains(char::is_whitespace) {
        return value.to_string();
    }
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::From(image) => write!(f, "FROM {image}"),
            Instruction::Comment(text) => write!(f, "# {text}"),
            Instruction::Arg {
                name,
                default: Some(default),
            } => write!(f, "ARG {name}={default}"),
            Instruction::Arg {
                name,
                default: None,
            } => write!(f, "ARG {name}"),
            Instruction::Env { name, value } => write!(f, "ENV {name}={}", format_env_value(value)),
            Instruction::Run(steps) => write!(f, "RUN {}", steps.join(RUN_STEP_SEPARATOR)),
            Instruction::Copy { src, dest, chown } => match chown {
                Some(owner) => write!(f, "COPY --chown={owner} {src} {dest}"),
                None => write!(f, "COPY {src} {dest}"),
            },
            Instruction::Label { key, value } => {
                write!(f, "LABEL {key}=\"{}\"", escape_label_value(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple_instructions() {
        assert_eq!(Instruction::From("ubuntu:24.04".into()).to_string(), "FROM ubuntu:24.04");
        assert_eq!(Instruction::comment("hello").to_string(), "# hello");
        assert_eq!(
            Instruction::arg("PIP_VERSION", "\"24.0\"").to_string(),
            "ARG PIP_VERSION=\"24.0\""
        );
    }

    #[test]
    fn test_env_quotes_only_when_needed() {
        assert_eq!(Instruction::env("LANG", "C.UTF-8").to_string(), "ENV LANG=C.UTF-8");
        assert_eq!(
            Instruction::env("PATH", "/databricks/python3/bin:$PATH").to_string(),
            "ENV PATH=/databricks/python3/bin:$PATH"
        );
        assert_eq!(
            Instruction::env("GREETING", "hello \"world\"").to_string(),
            "ENV GREETING=\"hello \\\"world\\\"\""
        );
    }

    #[test]
    fn test_run_steps_use_continuation_lines() {
        let run = Instruction::run_steps(["apt-get update", "apt-get install -y fuse"]);
        assert_eq!(
            run.to_string(),
            "RUN apt-get update && \\\n    apt-get install -y fuse"
        );
    }

    #[test]
    fn test_copy_with_chown() {
        let copy = Instruction::Copy {
            src: "requirements.txt".into(),
            dest: "/databricks/.".into(),
            chown: Some("libraries".into()),
        };
        assert_eq!(
            copy.to_string(),
            "COPY --chown=libraries requirements.txt /databricks/."
        );
    }

    #[test]
    fn test_label_is_escaped() {
        let label = Instruction::label("org.example.note", "costs $5 \"today\"");
        assert_eq!(
            label.to_string(),
            "LABEL org.example.note=\"costs \\$5 \\\"today\\\"\""
        );
    }
}
