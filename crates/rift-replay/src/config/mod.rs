//! Configuration types for rift-replay.

mod rules;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use rules::{
    CompiledMatch, CompiledReplacement, CompiledRules, Replacement, RequestVariable,
    ResponseHeaderTransform, RuleValue,
};

use crate::heuristic::DEFAULT_INCREMENT;
use crate::matcher::DEFAULT_THRESHOLD;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayConfig {
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Rewrites applied to textual bodies of matched responses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<Replacement>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_header_transforms: Vec<ResponseHeaderTransform>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingConfig {
    /// Full score step; must be positive and even.
    #[serde(default = "default_increment")]
    pub increment: i64,

    /// Ratings must be strictly greater than this to match.
    #[serde(default = "default_threshold")]
    pub threshold: i64,

    /// Replay repeated identical requests in recorded order.
    #[serde(default = "default_sequence_aware")]
    pub sequence_aware: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            increment: default_increment(),
            threshold: default_threshold(),
            sequence_aware: default_sequence_aware(),
        }
    }
}

fn default_increment() -> i64 {
    DEFAULT_INCREMENT
}

fn default_threshold() -> i64 {
    DEFAULT_THRESHOLD
}

fn default_sequence_aware() -> bool {
    true
}

impl ReplayConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: ReplayConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let increment = self.matching.increment;
        if increment <= 0 || increment % 2 != 0 {
            anyhow::bail!(
                "Invalid 'matching.increment': {increment}. It must be a positive even number"
            );
        }
        if self.matching.threshold < 0 {
            anyhow::bail!(
                "Invalid 'matching.threshold': {}. It must not be negative",
                self.matching.threshold
            );
        }

        for (i, replacement) in self.replacements.iter().enumerate() {
            replacement
                .validate()
                .map_err(|e| anyhow::anyhow!("replacements[{i}]: {e}"))?;
        }
        for (i, transform) in self.response_header_transforms.iter().enumerate() {
            transform
                .validate()
                .map_err(|e| anyhow::anyhow!("responseHeaderTransforms[{i}]: {e}"))?;
        }
        Ok(())
    }

    /// Compile replacement and header rules.
    pub fn compile_rules(&self) -> Result<CompiledRules, anyhow::Error> {
        CompiledRules::compile(&self.replacements, &self.response_header_transforms)
    }
}
