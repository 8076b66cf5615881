use std::fmt;

pub const APP_CONFIGURATION_NAME: &str = "APP_ENVIRONMENT";

/// Selects which configuration files are loaded and merged.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum ConfigVariant {
    /// Merges `base.toml` with `production.toml` from the deployed config dir.
    Production,
    /// Merges `base.toml` with `local.toml` relative to the crate manifest.
    #[default]
    Local,
    /// Uses exactly one file at the given path, nothing merged.
    OnlyOneFilepath(String),
}

impl fmt::Display for ConfigVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigVariant::Production => write!(f, "production"),
            ConfigVariant::Local => write!(f, "local"),
            ConfigVariant::OnlyOneFilepath(path) => write!(f, "only_one_filepath({path})"),
        }
    }
}

impl ConfigVariant {
    pub fn init() -> ConfigVariant {
        match std::env::var(APP_CONFIGURATION_NAME).as_deref() {
            Ok("production") => ConfigVariant::Production,
            _ => ConfigVariant::Local,
        }
    }
}
