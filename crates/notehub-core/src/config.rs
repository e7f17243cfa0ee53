//! NoteHub configuration
//!
//! Loaded from TOML. Every field has a default so an empty file is valid.

use crate::error::NoteHubError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteHubConfig {
    /// Absolute origin used to build share links
    pub origin: String,
    /// Document collection holding notes
    pub notes_collection: String,
    /// Object path prefix for attachments
    pub blob_prefix: String,
    /// How long a share status stays visible
    pub share_status_window_ms: u64,
    /// Semester filter options
    pub semesters: Vec<String>,
    /// Subject filter options
    pub subjects: Vec<String>,
    /// Default log filter directive
    pub log_filter: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl NoteHubConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With share origin
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// With notes collection
    #[inline]
    #[must_use]
    pub fn with_notes_collection(mut self, collection: impl Into<String>) -> Self {
        self.notes_collection = collection.into();
        self
    }

    /// With share status window
    #[inline]
    #[must_use]
    pub fn with_share_status_window(mut self, window: Duration) -> Self {
        self.share_status_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `NoteHubError::Config` on malformed TOML or an invalid origin
    pub fn from_toml_str(raw: &str) -> Result<Self, NoteHubError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| NoteHubError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `NoteHubError::Config` if the file cannot be read or is invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NoteHubError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NoteHubError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Check invariants that serde cannot express
    ///
    /// # Errors
    /// `NoteHubError::Config` describing the first violation
    pub fn validate(&self) -> Result<(), NoteHubError> {
        self.origin_url()?;
        if self.notes_collection.trim().is_empty() {
            return Err(NoteHubError::Config("notes_collection is empty".to_string()));
        }
        if self.blob_prefix.trim().is_empty() {
            return Err(NoteHubError::Config("blob_prefix is empty".to_string()));
        }
        Ok(())
    }

    /// Parsed share origin
    ///
    /// # Errors
    /// `NoteHubError::Config` if the origin is not an absolute http(s) URL
    pub fn origin_url(&self) -> Result<Url, NoteHubError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| NoteHubError::Config(format!("origin {:?}: {e}", self.origin)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NoteHubError::Config(format!(
                "origin {:?} must be http or https",
                self.origin
            )));
        }
        Ok(url)
    }

    /// Share status display window
    #[inline]
    #[must_use]
    pub fn share_status_window(&self) -> Duration {
        Duration::from_millis(self.share_status_window_ms)
    }
}

impl Default for NoteHubConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:5173".to_string(),
            notes_collection: "notes".to_string(),
            blob_prefix: "notes".to_string(),
            share_status_window_ms: 2000,
            semesters: ["I", "II", "III", "IV", "V", "VI"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            subjects: ["OOP", "AAD", "JAVA", "C"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NoteHubConfig::new();
        assert_eq!(config.notes_collection, "notes");
        assert_eq!(config.share_status_window(), Duration::from_secs(2));
        assert_eq!(config.semesters.len(), 6);
        assert_eq!(config.subjects, vec!["OOP", "AAD", "JAVA", "C"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        let config = NoteHubConfig::from_toml_str("").unwrap();
        assert_eq!(config, NoteHubConfig::default());
    }

    #[test]
    fn toml_overrides() {
        let config = NoteHubConfig::from_toml_str(
            r#"
            origin = "https://notes.example.org"
            share_status_window_ms = 500
            subjects = ["DBMS"]
            "#,
        )
        .unwrap();

        assert_eq!(config.origin, "https://notes.example.org");
        assert_eq!(config.share_status_window(), Duration::from_millis(500));
        assert_eq!(config.subjects, vec!["DBMS"]);
        assert_eq!(config.notes_collection, "notes");
    }

    #[test]
    fn invalid_origin_rejected() {
        let err = NoteHubConfig::from_toml_str(r#"origin = "notes.example.org""#).unwrap_err();
        assert!(matches!(err, NoteHubError::Config(_)));

        let err = NoteHubConfig::from_toml_str(r#"origin = "ftp://notes.example.org""#)
            .unwrap_err();
        assert!(matches!(err, NoteHubError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notehub.toml");
        std::fs::write(&path, "notes_collection = \"shared_notes\"\n").unwrap();

        let config = NoteHubConfig::load(&path).unwrap();
        assert_eq!(config.notes_collection, "shared_notes");

        assert!(NoteHubConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
