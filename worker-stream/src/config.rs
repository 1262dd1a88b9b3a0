//! Worker creation options

use crate::error::{Result, WorkerError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Options forwarded verbatim to the thread factory
///
/// The adapters never interpret these. The native factory reads `name` and
/// `stack_size`; anything else lands in `extra` for custom factories.
///
/// # Example
/// ```
/// # use worker_stream::WorkerOptions;
/// let options = WorkerOptions::from_yaml_str("name: resize\nstack_size: 4194304\nqueue: hot\n").unwrap();
/// assert_eq!(options.name.as_deref(), Some("resize"));
/// assert_eq!(options.extra["queue"], "hot");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerOptions {
    /// Thread name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Thread stack size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_size: Option<usize>,
    /// Pass-through settings for custom factories
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the thread stack size in bytes
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Add a pass-through setting
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Parse options from a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| WorkerError::Config(e.to_string()))
    }

    /// Load options from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| WorkerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder() {
        let options = WorkerOptions::new()
            .with_name("w")
            .with_stack_size(1024 * 1024)
            .with_extra("priority", 3);

        assert_eq!(options.name.as_deref(), Some("w"));
        assert_eq!(options.stack_size, Some(1024 * 1024));
        assert_eq!(options.extra.get("priority"), Some(&Value::from(3)));
    }

    #[test]
    fn test_empty_yaml_object() {
        let options = WorkerOptions::from_yaml_str("{}").unwrap();
        assert_eq!(options, WorkerOptions::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = WorkerOptions::from_yaml_str("stack_size: [1, 2").unwrap_err();
        assert!(matches!(err, WorkerError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: from-file").unwrap();
        writeln!(file, "credentials: omit").unwrap();

        let options = WorkerOptions::from_file(file.path()).unwrap();
        assert_eq!(options.name.as_deref(), Some("from-file"));
        assert_eq!(options.extra["credentials"], "omit");
    }

    #[test]
    fn test_missing_file() {
        let err = WorkerOptions::from_file("/nonexistent/worker.yml").unwrap_err();
        assert!(matches!(err, WorkerError::Config(_)));
    }
}
