//! TOML configuration parsing.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Parse `bytes` as TOML, or return `T::default()` when there is no file.
///
/// `origin` names the file in error messages.
///
/// # Errors
///
/// Returns an error if the content is not UTF-8 or does not match `T`.
pub fn load_config<T: DeserializeOwned + Default>(bytes: Option<&[u8]>, origin: &str) -> Result<T> {
    let Some(bytes) = bytes else {
        return Ok(T::default());
    };

    let content = std::str::from_utf8(bytes)
        .with_context(|| format!("Failed to read config file: {origin}"))?;

    toml::from_str(content).with_context(|| format!("Failed to parse TOML config: {origin}"))
}
