//! Service configuration.
//!
//! Only the knobs the segmenter core itself consumes live here. Reading the
//! values from the environment (or anywhere else) is the caller's business;
//! this type just deserializes and defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default target segment duration in seconds.
pub const DEFAULT_SEGMENT_DURATION_SECS: u64 = 4;

/// Configuration for a segmenter instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Target media segment duration in whole seconds. Every segment but the
    /// last covers exactly this much of the decode timeline.
    pub segment_duration_secs: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            segment_duration_secs: DEFAULT_SEGMENT_DURATION_SECS,
        }
    }
}

impl StreamingConfig {
    /// Deserialize a config from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_str)
            .map_err(|e| Error::Config(format!("config parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.segment_duration_secs == 0 {
            return Err(Error::Config(
                "segment_duration_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
