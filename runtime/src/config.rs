use crate::error::ConfigurationError;
use crate::response::DEFAULT_TEXT_MIME_TYPES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the adapter treats the lifespan protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LifespanMode {
    /// Run the handshake; an application that ignores it is fine
    #[default]
    Auto,
    /// Run the handshake; any failure is fatal to startup
    On,
    /// Never contact the application for lifespan events
    Off,
}

impl LifespanMode {
    /// Accepted spellings, in display order.
    pub const CHOICES: [&'static str; 3] = ["auto", "on", "off"];

    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for LifespanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifespanMode {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auto" => Ok(Self::Auto),
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(ConfigurationError::invalid_choice("lifespan", &Self::CHOICES)),
        }
    }
}

impl TryFrom<String> for LifespanMode {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LifespanMode> for String {
    fn from(mode: LifespanMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Configuration for [`Adapter`](crate::Adapter) instances.
///
/// # Example
///
/// ```
/// use vellox_runtime::{AdapterConfig, LifespanMode};
///
/// let config = AdapterConfig::default()
///     .with_lifespan(LifespanMode::On)
///     .with_base_path("/api")
///     .with_exclude_headers(["server"]);
///
/// assert_eq!(config.base_path, "/api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Lifespan handling
    pub lifespan: LifespanMode,
    /// Path prefix the application is mounted under
    pub base_path: String,
    /// Media types whose bodies are delivered as text
    pub text_mime_types: Vec<String>,
    /// Response headers removed before handing the response back
    pub exclude_headers: Vec<String>,
    /// Upper bound on each lifespan handshake; `None` waits indefinitely
    pub lifespan_timeout: Option<Duration>,
}

impl AdapterConfig {
    /// Set the lifespan mode
    #[must_use]
    pub const fn with_lifespan(mut self, lifespan: LifespanMode) -> Self {
        self.lifespan = lifespan;
        self
    }

    /// Set the base path
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Replace the text MIME allow-list
    #[must_use]
    pub fn with_text_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the header exclude-list
    #[must_use]
    pub fn with_exclude_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Bound each lifespan handshake
    #[must_use]
    pub const fn with_lifespan_timeout(mut self, timeout: Duration) -> Self {
        self.lifespan_timeout = Some(timeout);
        self
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            lifespan: LifespanMode::Auto,
            base_path: "/".to_string(),
            text_mime_types: DEFAULT_TEXT_MIME_TYPES.iter().map(ToString::to_string).collect(),
            exclude_headers: Vec::new(),
            lifespan_timeout: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();

        assert_eq!(config.lifespan, LifespanMode::Auto);
        assert_eq!(config.base_path, "/");
        assert_eq!(config.text_mime_types.len(), DEFAULT_TEXT_MIME_TYPES.len());
        assert!(config.exclude_headers.is_empty());
        assert_eq!(config.lifespan_timeout, None);
    }

    #[test]
    fn test_lifespan_parse() {
        assert_eq!("auto".parse::<LifespanMode>().unwrap(), LifespanMode::Auto);
        assert_eq!("on".parse::<LifespanMode>().unwrap(), LifespanMode::On);
        assert_eq!("off".parse::<LifespanMode>().unwrap(), LifespanMode::Off);

        let err = "unknown".parse::<LifespanMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument supplied for `lifespan`. Choices are: auto|on|off"
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AdapterConfig =
            serde_json::from_value(json!({"lifespan": "off", "exclude_headers": ["x-powered-by"]}))
                .unwrap();

        assert_eq!(config.lifespan, LifespanMode::Off);
        assert_eq!(config.exclude_headers, vec!["x-powered-by".to_string()]);
        assert_eq!(config.base_path, "/");
    }

    #[test]
    fn test_deserialize_rejects_unknown_lifespan() {
        let err = serde_json::from_value::<AdapterConfig>(json!({"lifespan": "sometimes"}))
            .unwrap_err();
        assert!(err.to_string().contains("Choices are: auto|on|off"));
    }

    #[test]
    fn test_builder_methods() {
        let config = AdapterConfig::default()
            .with_lifespan(LifespanMode::On)
            .with_text_mime_types(["application/custom"])
            .with_lifespan_timeout(Duration::from_secs(5));

        assert_eq!(config.lifespan.to_string(), "on");
        assert_eq!(config.text_mime_types, vec!["application/custom".to_string()]);
        assert_eq!(config.lifespan_timeout, Some(Duration::from_secs(5)));
    }
}
