//! Optional installer configuration from `conf/install.toml`.
pub mod toml_loader;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::DEFAULT_OUTPUT_STYLE;
use crate::source::Source;

/// Location of the config file relative to the distribution root.
pub const CONFIG_PATH: &str = "conf/install.toml";

/// Installer configuration. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Output style settings.
    #[serde(default)]
    pub style: StyleConfig,
    /// Remote distribution settings.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// `[style]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    /// Value written to the `outputStyle` settings key.
    #[serde(default = "default_style_name")]
    pub name: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            name: default_style_name(),
        }
    }
}

fn default_style_name() -> String {
    DEFAULT_OUTPUT_STYLE.to_string()
}

/// `[remote]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL used when `--remote` is passed without a value.
    pub base_url: Option<String>,
}

impl Config {
    /// Load the config file through `source`; a missing file gives defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be fetched or parsed.
    pub fn load(source: &dyn Source) -> Result<Self> {
        let bytes = source
            .read_optional(CONFIG_PATH)
            .with_context(|| format!("loading {CONFIG_PATH}"))?;
        toml_loader::load_config(bytes.as_deref(), CONFIG_PATH)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::source::MockSource;

    fn source_with(content: Option<&'static str>) -> MockSource {
        let mut source = MockSource::new();
        source
            .expect_read_optional()
            .withf(|rel| rel == CONFIG_PATH)
            .returning(move |_| Ok(content.map(|c| c.as_bytes().to_vec())));
        source
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(&source_with(None)).unwrap();
        assert_eq!(config.style.name, "sage");
        assert!(config.remote.base_url.is_none());
    }

    #[test]
    fn style_name_is_read() {
        let config = Config::load(&source_with(Some("[style]\nname = \"terse\"\n"))).unwrap();
        assert_eq!(config.style.name, "terse");
    }

    #[test]
    fn remote_base_url_is_read() {
        let toml = "[remote]\nbase_url = \"https://example.invalid/sage\"\n";
        let config = Config::load(&source_with(Some(toml))).unwrap();
        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("https://example.invalid/sage")
        );
        assert_eq!(config.style, StyleConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::load(&source_with(Some("[style]\ncolour = \"red\"\n"))).unwrap_err();
        assert!(format!("{err:#}").contains("colour"));
    }

    #[test]
    fn fetch_errors_propagate() {
        let mut source = MockSource::new();
        source.expect_read_optional().returning(|_| {
            Err(FetchError::Download {
                url: "u".to_string(),
                reason: "status 500".to_string(),
            })
        });
        assert!(Config::load(&source).is_err());
    }
}
