//! cs-project: co-simulation configuration file format and validation.

pub mod initial;
pub mod schema;
pub mod validate;

pub use initial::InitialSettings;
pub use schema::*;
pub use validate::{ValidationError, validate_config};

use cs_core::FailureClass;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProjectError {
    pub fn class(&self) -> FailureClass {
        match self {
            ProjectError::Io(_) => FailureClass::Load,
            ProjectError::Validation(_) | ProjectError::Yaml(_) | ProjectError::Json(_) => {
                FailureClass::Config
            }
        }
    }
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<CoSimConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: CoSimConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_yaml(path: &std::path::Path, config: &CoSimConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<CoSimConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: CoSimConfig = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_json(path: &std::path::Path, config: &CoSimConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a configuration file, choosing the format by extension (`.json` or YAML).
pub fn load(path: &std::path::Path) -> ProjectResult<CoSimConfig> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json { load_json(path) } else { load_yaml(path) }
}
