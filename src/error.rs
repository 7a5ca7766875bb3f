//! Error types for the format/parse pipeline
//!
//! Only configuration mistakes surface as `Err`. Runtime data (the value being
//! formatted or the string being parsed) never produces an error; those paths
//! return fallback renderings or unsuccessful `ParseResult`s instead.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Mutually exclusive or out-of-range option combinations
    #[error("Invalid format options: {0}")]
    InvalidOptions(String),

    /// A locale tag that is not well formed
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    /// A currency code that is not a three-letter ISO 4217 code
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// A specifier string naming a token or type character with no handler
    #[error("Unsupported specifier: {0}")]
    UnsupportedSpecifier(String),

    /// A plugin callback failed
    #[error("Plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// Engine configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedded locale data could not be parsed
    #[error("Error parsing locale data: {0}")]
    LocaleData(String),
}

impl Error {
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
