//! Server configuration read from the process environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default upload size limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Characters of extracted text returned as a preview after upload.
pub const DEFAULT_PREVIEW_CHARS: usize = 1000;

/// Sessions untouched for this long are dropped (one hour).
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

/// Upper bound on concurrently live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// What to do with PDF pages that carry no extractable text layer
/// (typically scanned, image-only pages).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextlessPagePolicy {
    /// Drop the page from the output without complaint.
    #[default]
    Skip,
    /// Fail the extraction, naming the pages that had no text.
    Reject,
}

impl std::fmt::Display for TextlessPagePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for TextlessPagePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            other => Err(Error::Config(format!(
                "unknown textless page policy '{}' (expected 'skip' or 'reject')",
                other
            ))),
        }
    }
}

/// Top-level DocSage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSageConfig {
    /// HTTP server port.
    pub port: u16,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Directory for transient staging files (system temp dir when unset).
    pub staging_dir: Option<PathBuf>,
    /// Handling of image-only PDF pages.
    pub textless_pages: TextlessPagePolicy,
    /// Length of the extracted-text preview.
    pub preview_chars: usize,
    /// Idle time after which a session and its document are discarded.
    pub session_idle_secs: u64,
    pub max_sessions: usize,
}

impl Default for DocSageConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            staging_dir: None,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            textless_pages: TextlessPagePolicy::Skip,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

impl DocSageConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults; set but unparseable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = parse_var("PORT", &port)?;
        }
        if let Some(limit) = lookup("DOCSAGE_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_var("DOCSAGE_MAX_UPLOAD_BYTES", &limit)?;
        }
        if let Some(dir) = lookup("DOCSAGE_STAGING_DIR").filter(|d| !d.trim().is_empty()) {
            config.staging_dir = Some(PathBuf::from(dir));
        }
        if let Some(policy) = lookup("DOCSAGE_TEXTLESS_PAGES") {
            config.textless_pages = policy.parse()?;
        }
        if let Some(chars) = lookup("DOCSAGE_PREVIEW_CHARS") {
            config.preview_chars = parse_var("DOCSAGE_PREVIEW_CHARS", &chars)?;
        }
        if let Some(secs) = lookup("DOCSAGE_SESSION_IDLE_SECS") {
            config.session_idle_secs = parse_var("DOCSAGE_SESSION_IDLE_SECS", &secs)?;
        }
        if let Some(max) = lookup("DOCSAGE_MAX_SESSIONS") {
            config.max_sessions = parse_var("DOCSAGE_MAX_SESSIONS", &max)?;
        }
        if config.max_sessions == 0 {
            return Err(Error::Config("DOCSAGE_MAX_SESSIONS must be positive".into()));
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DocSageConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.textless_pages, TextlessPagePolicy::Skip);
        assert!(config.staging_dir.is_none());
        assert_eq!(config.session_idle_secs, 3600);
        assert_eq!(config.max_sessions, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = DocSageConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("DOCSAGE_TEXTLESS_PAGES", "Reject"),
            ("DOCSAGE_STAGING_DIR", "/var/tmp/docsage"),
            ("DOCSAGE_SESSION_IDLE_SECS", "900"),
            ("DOCSAGE_MAX_SESSIONS", "25"),
        ]))
        .unwrap();
        assert_eq!(config.session_idle_secs, 900);
        assert_eq!(config.max_sessions, 25);
        assert_eq!(config.port, 8080);
        assert_eq!(config.textless_pages, TextlessPagePolicy::Reject);
        assert_eq!(config.staging_dir, Some(PathBuf::from("/var/tmp/docsage")));
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let err = DocSageConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = DocSageConfig::from_lookup(lookup_from(&[("DOCSAGE_TEXTLESS_PAGES", "ocr")]))
            .unwrap_err();
        assert!(err.to_string().contains("ocr"));

        let err = DocSageConfig::from_lookup(lookup_from(&[("DOCSAGE_MAX_SESSIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
