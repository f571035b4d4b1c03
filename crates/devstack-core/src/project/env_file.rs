//! `.env` file editing that preserves everything it does not touch.

use crate::atomic::{atomic_write, read_optional};
use crate::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A `.env` file held as its original lines.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl EnvFile {
    /// Load the file; a missing file yields an empty one.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lines = read_optional(&path)?
            .map(|contents| contents.lines().map(str::to_string).collect())
            .unwrap_or_default();
        Ok(Self { path, lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of `key`, unquoted. The last assignment wins.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lines
            .iter()
            .filter_map(|line| parse_line(line))
            .filter(|(k, _)| *k == key)
            .last()
            .map(|(_, v)| v)
    }

    /// Set `key`, rewriting existing assignments in place or appending one.
    pub fn set(&mut self, key: &str, value: &str) {
        let assignment = format!("{}={}", key, value);
        let mut found = false;
        for line in self.lines.iter_mut() {
            if matches!(parse_line(line), Some((k, _)) if k == key) {
                *line = assignment.clone();
                found = true;
            }
        }
        if !found {
            self.lines.push(assignment);
        }
    }

    /// All `*_PORT` assignments that hold a valid port number.
    pub fn ports(&self) -> BTreeMap<String, u16> {
        self.lines
            .iter()
            .filter_map(|line| parse_line(line))
            .filter(|(k, _)| k.ends_with("_PORT"))
            .filter_map(|(k, v)| v.parse::<u16>().ok().map(|port| (k.to_string(), port)))
            .collect()
    }

    /// Write the file back atomically.
    pub fn save(&self) -> Result<()> {
        let mut contents = self.lines.join("\n");
        contents.push('\n');
        atomic_write(&self.path, contents.as_bytes())
    }
}

/// Split `KEY=value`, skipping comments and an `export ` prefix.
fn parse_line(line: &str) -> Option<(&str, String)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "# devstack\nDEVSTACK_VERSION=0.7.0\nAPI_PORT=8080\nexport WEB_PORT=\"3000\"\n\nSECRET='a=b'\n";

    fn sample(temp: &TempDir) -> EnvFile {
        let path = temp.path().join(".env");
        std::fs::write(&path, SAMPLE).unwrap();
        EnvFile::load(path).unwrap()
    }

    #[test]
    fn test_get_values() {
        let temp = TempDir::new().unwrap();
        let env = sample(&temp);
        assert_eq!(env.get("DEVSTACK_VERSION").as_deref(), Some("0.7.0"));
        assert_eq!(env.get("SECRET").as_deref(), Some("a=b"));
        assert!(env.get("MISSING").is_none());
    }

    #[test]
    fn test_ports() {
        let temp = TempDir::new().unwrap();
        let ports = sample(&temp).ports();
        assert_eq!(ports.get("API_PORT"), Some(&8080));
        assert_eq!(ports.get("WEB_PORT"), Some(&3000));
    }

    #[test]
    fn test_set_preserves_other_lines() {
        let temp = TempDir::new().unwrap();
        let mut env = sample(&temp);
        env.set("DEVSTACK_VERSION", "0.8.0");
        env.set("NEW_KEY", "1");
        env.save().unwrap();

        let written = std::fs::read_to_string(env.path()).unwrap();
        assert_eq!(
            written,
            "# devstack\nDEVSTACK_VERSION=0.8.0\nAPI_PORT=8080\nexport WEB_PORT=\"3000\"\n\nSECRET='a=b'\nNEW_KEY=1\n"
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let env = EnvFile::load(temp.path().join(".env")).unwrap();
        assert!(env.get("DEVSTACK_VERSION").is_none());
    }
}
