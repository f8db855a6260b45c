//! Training configuration
//!
//! Plain serde struct; every field has a default, so a JSON file only needs
//! the keys it changes.
//!
//! ```json
//! { "variant": "recurrent", "state_words": 8, "reinforce_depth": 2 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BitvoteError, Result};

/// Which network variant drives training
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// One layer over an explicit provenance graph
    #[default]
    Graph,
    /// Two layers in a cycle with double-buffered state
    Recurrent,
}

/// Training configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub variant: Variant,
    /// Width of the recurrent state, in words
    pub state_words: usize,
    /// Concatenate the previous symbol as an extra input word (graph variant)
    pub feed_input: bool,
    /// Provenance kept after each step (graph variant)
    pub truncate_depth: usize,
    /// Layers a correction may travel through (recurrent variant)
    ///
    /// Each extra layer multiplies the cost of one correction by roughly
    /// `64 * input words`; 2 or 3 is practical.
    pub reinforce_depth: usize,
    /// Passes over the training text
    pub epochs: usize,
    /// Generator seed; `None` draws one from the OS
    pub seed: Option<u64>,
    /// Print every n-th epoch (0 = only the last)
    pub report_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Graph,
            state_words: 16,
            feed_input: false,
            truncate_depth: 2,
            reinforce_depth: 2,
            epochs: 10_000,
            seed: None,
            report_every: 100,
        }
    }
}

impl TrainConfig {
    /// Graph variant, as in the classic single-layer setup
    pub fn graph() -> Self {
        Self::default()
    }

    /// Two-layer recurrent cycle
    pub fn recurrent() -> Self {
        Self {
            variant: Variant::Recurrent,
            state_words: 8,
            reinforce_depth: 2,
            ..Default::default()
        }
    }

    /// Small, seeded and quick (tests and smoke runs)
    pub fn quick(seed: u64) -> Self {
        Self {
            state_words: 2,
            reinforce_depth: 2,
            epochs: 20,
            seed: Some(seed),
            report_every: 0,
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| BitvoteError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BitvoteError::Config(e.to_string()))
    }

    /// Reject settings that cannot train
    pub fn validate(&self) -> Result<()> {
        if self.state_words == 0 {
            return Err(BitvoteError::Config("state_words must be at least 1".into()));
        }
        if self.variant == Variant::Recurrent && self.reinforce_depth == 0 {
            return Err(BitvoteError::Config(
                "reinforce_depth must be at least 1 for a recurrent network".into(),
            ));
        }
        if self.variant == Variant::Graph && self.truncate_depth == 0 {
            log::warn!("truncate_depth 0 forgets every state; reinforcement only touches weights");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = TrainConfig::default();
        assert_eq!(config.variant, Variant::Graph);
        assert_eq!(config.state_words, 16);
        assert_eq!(config.truncate_depth, 2);
        assert_eq!(config.reinforce_depth, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TrainConfig::from_json(r#"{ "variant": "recurrent", "seed": 5 }"#).unwrap();
        assert_eq!(config.variant, Variant::Recurrent);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.state_words, 16);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = TrainConfig::recurrent();
        let json = config.to_json().unwrap();
        assert_eq!(TrainConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            TrainConfig::from_json(r#"{ "state_words": 0 }"#),
            Err(BitvoteError::Config(_))
        ));
        assert!(matches!(
            TrainConfig::from_json(r#"{ "variant": "recurrent", "reinforce_depth": 0 }"#),
            Err(BitvoteError::Config(_))
        ));
        assert!(matches!(
            TrainConfig::from_json(r#"{ "variant": "hopfield" }"#),
            Err(BitvoteError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let path = dir.path().join("train.json");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{ "state_words": 4, "feed_input": true }}"#).unwrap();

        let config = TrainConfig::load(&path).unwrap();
        assert_eq!(config.state_words, 4);
        assert!(config.feed_input);

        let missing = TrainConfig::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(BitvoteError::Io(_))));
    }
}
