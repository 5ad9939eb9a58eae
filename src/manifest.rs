//! Project manifest (kiln.yaml) parsing.
//!
//! The manifest defines project configuration: where sprite sources
//! live, where artifacts go, and which paths discovery should ignore.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};

/// The name of the manifest file.
pub const MANIFEST_FILENAME: &str = "kiln.yaml";

/// Project manifest loaded from kiln.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Root directory holding one subdirectory per sprite sheet.
    pub sprites: PathBuf,

    /// Output directory for built artifacts.
    pub output: PathBuf,

    /// Build with production settings (slower, smaller encodes) by
    /// default. The CLI flag overrides this.
    pub production: bool,

    /// Patterns to exclude from discovery and watching.
    pub excludes: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            sprites: PathBuf::from("assets/sprites"),
            output: PathBuf::from("dist"),
            production: false,
            excludes: vec![],
        }
    }
}

impl Manifest {
    /// Load the manifest from `<root>/kiln.yaml`, falling back to the
    /// defaults when the file does not exist.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| KilnError::Io {
            path: path.clone(),
            message: format!("Failed to read manifest: {}", e),
        })?;
        Self::parse(&content)
    }

    /// Parse the manifest from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| KilnError::Parse {
            message: format!("Invalid manifest: {}", e),
            help: Some("Check kiln.yaml syntax".to_string()),
        })
    }

    /// Check if a path should be excluded based on exclude patterns.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.excludes
            .iter()
            .any(|pattern| matches_pattern(&path_str, pattern))
    }
}

/// Minimal glob matching: patterns anchor at the end of the path
/// ("*.bak" matches any trailing segment, "tmp/*" any file directly
/// under a tmp directory anywhere); `*` spans within one segment. A
/// leading `**/` is accepted and redundant.
fn matches_pattern(path: &str, pattern: &str) -> bool {
    let pattern = pattern.strip_prefix("**/").unwrap_or(pattern);
    let segments: Vec<&str> = path.split('/').collect();
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    if segments.len() < pattern_segments.len() {
        return false;
    }
    let tail = &segments[segments.len() - pattern_segments.len()..];
    tail.iter()
        .zip(&pattern_segments)
        .all(|(seg, pat)| matches_segment(seg, pat))
}

fn matches_segment(segment: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(idx) = pattern.find('*') {
        let (prefix, suffix) = (&pattern[..idx], &pattern[idx + 1..]);
        return segment.len() >= prefix.len() + suffix.len()
            && segment.starts_with(prefix)
            && segment.ends_with(suffix);
    }
    segment == pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let manifest = Manifest::parse("{}").unwrap();
        assert_eq!(manifest.sprites, PathBuf::from("assets/sprites"));
        assert_eq!(manifest.output, PathBuf::from("dist"));
        assert!(!manifest.production);
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
sprites: art/sheets
output: build
production: true
excludes:
  - "*.bak"
"#;
        let manifest = Manifest::parse(yaml).unwrap();
        assert_eq!(manifest.sprites, PathBuf::from("art/sheets"));
        assert_eq!(manifest.output, PathBuf::from("build"));
        assert!(manifest.production);
        assert_eq!(manifest.excludes, vec!["*.bak"]);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(Manifest::parse(": not yaml").is_err());
    }

    #[test]
    fn test_excludes_extension_pattern() {
        let manifest = Manifest {
            excludes: vec!["*.bak".to_string()],
            ..Default::default()
        };
        assert!(manifest.is_excluded(Path::new("sheets/hero/frame.bak")));
        assert!(!manifest.is_excluded(Path::new("sheets/hero/frame.png")));
    }

    #[test]
    fn test_excludes_anywhere_pattern() {
        let manifest = Manifest {
            excludes: vec!["**/tmp/*".to_string()],
            ..Default::default()
        };
        assert!(manifest.is_excluded(Path::new("sheets/tmp/scratch.png")));
        assert!(manifest.is_excluded(Path::new("tmp/scratch.png")));
        assert!(!manifest.is_excluded(Path::new("sheets/hero/idle.png")));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::load_or_default(dir.path()).unwrap();
        assert_eq!(manifest.output, PathBuf::from("dist"));
    }

    #[test]
    fn test_load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILENAME), "output: out\n").unwrap();
        let manifest = Manifest::load_or_default(dir.path()).unwrap();
        assert_eq!(manifest.output, PathBuf::from("out"));
    }
}
