//! Type definitions for the tool registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Signal tag for tools that act on image attachments.
pub const SIGNAL_IMAGE: &str = "image";

/// Signal tag for tools that open `.m3u`/`.m3u8` playlist URLs.
pub const SIGNAL_URL_M3U: &str = "url_m3u";

/// Static definition of one client-executable action.
///
/// Loaded once from the registry asset and never mutated afterwards.
/// `embedding_text` is what the offline builder embeds; the `guidance*`
/// fields are what the model reads in its instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Text embedded into the precomputed vector asset.
    pub embedding_text: String,

    /// Default guidance rendered into the prompt.
    pub guidance: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_ios: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_android: Option<String>,

    /// Categorical tags matched against situational heuristics (e.g. "image").
    #[serde(default)]
    pub signals: BTreeSet<String>,
}

impl ToolDefinition {
    pub fn new(embedding_text: impl Into<String>, guidance: impl Into<String>) -> Self {
        Self {
            embedding_text: embedding_text.into(),
            guidance: guidance.into(),
            guidance_ios: None,
            guidance_android: None,
            signals: BTreeSet::new(),
        }
    }

    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signals.insert(signal.into());
        self
    }

    pub fn has_signal(&self, signal: &str) -> bool {
        self.signals.contains(signal)
    }

    /// Guidance for the given (lowercased) platform, falling back to the default.
    pub fn guidance_for(&self, platform: &str) -> &str {
        let specific = match platform {
            "ios" => self.guidance_ios.as_deref(),
            "android" => self.guidance_android.as_deref(),
            _ => None,
        };
        specific.unwrap_or(&self.guidance)
    }
}
