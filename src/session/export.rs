//! Session export
//!
//! Writes the full session (conversations, agent states, context, creation
//! time) as pretty JSON into a timestamped file.

use chrono::Local;
use eyre::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::Session;

impl Session {
    /// Pretty JSON dump of the whole session
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize session")
    }

    /// Write the session into `dir` and return the file path
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

        let path = dir.join(export_file_name());
        let json = self.export_json()?;

        // The export only appears under its final name once fully written
        let mut tmp = tempfile::NamedTempFile::new_in(dir).context("Failed to create temporary export file")?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write session export")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to save session export: {}", path.display()))?;

        log::info!(
            "Exported session ({} exchanges) to {}",
            self.conversations.len(),
            path.display()
        );
        Ok(path)
    }
}

/// `session_export_YYYYmmdd_HHMMSS.json`
pub fn export_file_name() -> String {
    format!("session_export_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::PersonaRegistry;
    use tempfile::TempDir;

    #[test]
    fn test_export_json_shape() {
        let registry = PersonaRegistry::builtin();
        let mut session = Session::new();
        session.append(registry.get("spy").unwrap(), "hello", "hi");

        let value: serde_json::Value = serde_json::from_str(&session.export_json().unwrap()).unwrap();
        assert_eq!(value["conversations"][0]["agent"], "spy");
        assert_eq!(value["conversations"][0]["user_input"], "hello");
        assert_eq!(value["conversations"][0]["response"], "hi");
        assert!(value["conversations"][0]["timestamp"].is_string());
        assert_eq!(value["agent_states"]["spy"]["status"], "active");
        assert_eq!(value["agent_states"]["spy"]["exchanges"], 1);
        assert!(value["project_context"].as_object().unwrap().is_empty());
        assert!(value["created_at"].is_string());
    }

    #[test]
    fn test_export_to_writes_file() {
        let dir = TempDir::new().unwrap();
        let registry = PersonaRegistry::builtin();
        let mut session = Session::new();
        session.append(registry.get("tinker").unwrap(), "build", "built");

        let path = session.export_to(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("session_export_"));
        assert!(name.ends_with(".json"));

        let restored: Session = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored.conversations(), session.conversations());

        // only the export itself is left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_export_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("exports").join("today");
        let path = Session::new().export_to(&nested).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
