//! Error types for the template engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while assembling or rendering templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("No template is under construction")]
    NoActiveTemplate,

    #[error("Template not found: {0}")]
    UnknownTemplate(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Cannot open template '{requested}' while '{active}' is under construction")]
    NestedContext { active: String, requested: String },

    #[error("{section} entries require a non-empty name")]
    EmptyName { section: String },

    #[error("Parameter '{parameter}' supplied for stack '{stack}' is not declared by the template")]
    UndeclaredParameter { stack: String, parameter: String },

    #[error("No nimbusfile found at {0:?}")]
    NimbusfileNotFound(PathBuf),

    #[error("Invalid nimbusfile: {0}")]
    InvalidNimbusfile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TemplateError {
    pub(crate) fn invalid_path(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
