// src/challenge.rs
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{ClientError, Result};

/// A debugging exercise. Test cases are opaque to the client and forwarded to the executor.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Challenge {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub instructions: String,
    #[serde(default)]
    pub examples: String,
    #[serde(default)]
    pub test_cases: Vec<serde_json::Value>,
    /// Walkthrough video or other media shown next to the instructions.
    #[serde(default)]
    pub media: Option<String>,
}

#[derive(Deserialize)]
struct ChallengeFile {
    #[serde(default)]
    challenges: Vec<Challenge>,
}

/// Read-only lookup table of challenges, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ChallengeStore {
    challenges: Vec<Challenge>,
    index: HashMap<String, usize>,
}

impl ChallengeStore {
    pub fn new(challenges: Vec<Challenge>) -> Result<Self> {
        let mut index = HashMap::with_capacity(challenges.len());
        for (pos, challenge) in challenges.iter().enumerate() {
            if index.insert(challenge.id.clone(), pos).is_some() {
                return Err(ClientError::Config(format!(
                    "duplicate challenge id '{}'",
                    challenge.id
                )));
            }
        }
        Ok(Self { challenges, index })
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ChallengeFile = toml::from_str(source)?;
        Self::new(file.challenges)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let store = Self::from_toml_str(&source)?;
        log::info!("Loaded {} challenges from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn get(&self, id: &str) -> Option<&Challenge> {
        self.index.get(id).map(|&pos| &self.challenges[pos])
    }

    /// Identifiers in file order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.challenges.iter().map(|c| c.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.iter()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[challenges]]
id = "sum-list"
title = "Sum of a list"
instructions = "Return the sum of numbers."
examples = "main([1, 2, 3]) -> 6"
media = "/videos/sum.mp4"

[[challenges.test_cases]]
input = [[1, 2, 3]]
expected = 6

[[challenges.test_cases]]
input = [[]]
expected = 0

[[challenges]]
id = "max-list"
instructions = "Return the largest number."
"#;

    #[test]
    fn test_parse_store() {
        let store = ChallengeStore::from_toml_str(SAMPLE).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["sum-list", "max-list"]);

        let sum = store.get("sum-list").unwrap();
        assert_eq!(sum.title.as_deref(), Some("Sum of a list"));
        assert_eq!(sum.media.as_deref(), Some("/videos/sum.mp4"));
        assert_eq!(sum.test_cases.len(), 2);
        assert_eq!(sum.test_cases[0], json!({"input": [[1, 2, 3]], "expected": 6}));

        let max = store.get("max-list").unwrap();
        assert!(max.test_cases.is_empty());
        assert_eq!(max.examples, "");

        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let source = r#"
[[challenges]]
id = "a"
instructions = "x"

[[challenges]]
id = "a"
instructions = "y"
"#;
        let err = ChallengeStore::from_toml_str(source).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = ChallengeStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 2);

        let missing = ChallengeStore::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ClientError::FileRead(_))));
    }
}
