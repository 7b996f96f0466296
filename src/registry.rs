//! Registry of database names already created.
//!
//! A JSON array of strings on disk, e.g. `["default_database", "notes"]`.
//! Names are only ever appended, and every save rewrites the whole file.
//! There is no locking; one process at a time is assumed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DatabaseRegistry {
    path: PathBuf,
    names: Vec<String>,
}

impl DatabaseRegistry {
    /// Read the registry at `path`. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let names = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read registry: {}", path.display()))?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)
                    .with_context(|| format!("Invalid registry file: {}", path.display()))?
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            names,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Append `name` and rewrite the file. Registering a known name is a
    /// no-op.
    pub fn register(&mut self, name: &str) -> Result<()> {
        if self.contains(name) {
            return Ok(());
        }
        self.names.push(name.to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.names)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write registry: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let registry = DatabaseRegistry::load(&tmp.path().join("databases.json")).unwrap();
        assert!(registry.names().is_empty());
    }

    #[test]
    fn register_persists_across_loads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("databases.json");

        let mut registry = DatabaseRegistry::load(&path).unwrap();
        registry.register("first").unwrap();
        registry.register("second").unwrap();
        registry.register("first").unwrap();

        let reloaded = DatabaseRegistry::load(&path).unwrap();
        assert_eq!(reloaded.names(), ["first", "second"]);
        assert!(reloaded.contains("second"));
        assert!(!reloaded.contains("third"));
    }

    #[test]
    fn reads_plain_json_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("databases.json");
        std::fs::write(&path, r#"["default_database"]"#).unwrap();

        let registry = DatabaseRegistry::load(&path).unwrap();
        assert!(registry.contains("default_database"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("databases.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(DatabaseRegistry::load(&path).is_err());
    }
}
