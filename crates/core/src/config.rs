//! Registry policy configuration.
//!
//! Policy flags are fixed when a registry is constructed. Anything read from the process
//! environment is resolved once at startup by the binary and passed in as plain values, so the
//! library itself never consults environment variables.

use crate::{RegistryError, RegistryResult};

/// Policy flags fixed at registry construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    /// When false, re-registering an existing (non-root) name fails.
    pub allow_overwrite: bool,
    /// When true, lookups return string paths instead of native path values.
    pub stringify_results: bool,
}

impl RegistryOptions {
    pub fn new(allow_overwrite: bool, stringify_results: bool) -> Self {
        Self {
            allow_overwrite,
            stringify_results,
        }
    }

    pub fn allow_overwrite(mut self, allow: bool) -> Self {
        self.allow_overwrite = allow;
        self
    }

    pub fn stringify_results(mut self, stringify: bool) -> Self {
        self.stringify_results = stringify;
        self
    }
}

/// Build [`RegistryOptions`] from optional raw string values (typically environment variables).
///
/// `None`, empty and whitespace-only values fall back to the default for that flag.
pub fn options_from_env_values(
    allow_overwrite: Option<String>,
    stringify_results: Option<String>,
) -> RegistryResult<RegistryOptions> {
    let defaults = RegistryOptions::default();
    Ok(RegistryOptions {
        allow_overwrite: parse_flag("allow_overwrite", allow_overwrite)?
            .unwrap_or(defaults.allow_overwrite),
        stringify_results: parse_flag("stringify_results", stringify_results)?
            .unwrap_or(defaults.stringify_results),
    })
}

fn parse_flag(key: &str, value: Option<String>) -> RegistryResult<Option<bool>> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(None),
        Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some("0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(other) => Err(RegistryError::InvalidOption(format!(
            "{key} must be a boolean, got: '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_strict() {
        let options = RegistryOptions::default();
        assert!(!options.allow_overwrite);
        assert!(!options.stringify_results);
    }

    #[test]
    fn test_missing_and_blank_values_use_defaults() {
        let options = options_from_env_values(None, Some("   ".into())).unwrap();
        assert_eq!(options, RegistryOptions::default());
    }

    #[test]
    fn test_parses_boolean_spellings() {
        let options = options_from_env_values(Some("TRUE".into()), Some(" yes ".into())).unwrap();
        assert!(options.allow_overwrite);
        assert!(options.stringify_results);

        let options = options_from_env_values(Some("off".into()), Some("0".into())).unwrap();
        assert!(!options.allow_overwrite);
        assert!(!options.stringify_results);
    }

    #[test]
    fn test_rejects_garbage_value() {
        let err = options_from_env_values(Some("maybe".into()), None).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOption(msg) if msg.contains("allow_overwrite")));
    }

    #[test]
    fn test_builder_style_setters() {
        let options = RegistryOptions::default()
            .allow_overwrite(true)
            .stringify_results(true);
        assert_eq!(options, RegistryOptions::new(true, true));
    }

    #[test]
    fn test_deserialize_partial_options() {
        let options: RegistryOptions = serde_json::from_str(r#"{"allow_overwrite": true}"#).unwrap();
        assert!(options.allow_overwrite);
        assert!(!options.stringify_results);
    }
}
