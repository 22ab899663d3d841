//! Per-request selection context.

use crate::config::RagMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".webp"];

/// Client-supplied description of an attached file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub mime_type: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        let lower = |v: &Option<String>| v.as_deref().unwrap_or("").to_lowercase();
        let (name, kind, mime) = (lower(&self.name), lower(&self.kind), lower(&self.mime_type));

        kind == "image"
            || mime.starts_with("image/")
            || IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
    }
}

/// Situational signals for one request, built once and not mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    /// Lowercased platform hint (`ios`, `android`, ...).
    pub platform: Option<String>,
    pub attachments: Vec<Attachment>,
    pub last_active_tool_id: Option<String>,
    /// Action ids the client declared for this turn, in client order.
    pub client_capability_ids: Vec<String>,
    pub locale: String,
    pub rag_mode: RagMode,
}

impl SelectionContext {
    pub fn with_capabilities<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_capability_ids: ids.into_iter().map(Into::into).collect(),
            locale: "en".to_string(),
            ..Self::default()
        }
    }

    /// The authoritative set of actions this client may execute this turn.
    pub fn allowed_action_ids(&self) -> HashSet<String> {
        self.client_capability_ids.iter().cloned().collect()
    }

    pub fn has_image_attachment(&self) -> bool {
        self.attachments.iter().any(Attachment::is_image)
    }

    pub fn platform(&self) -> &str {
        self.platform.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: Option<&str>, kind: Option<&str>, mime: Option<&str>) -> Attachment {
        Attachment {
            name: name.map(str::to_string),
            kind: kind.map(str::to_string),
            mime_type: mime.map(str::to_string),
        }
    }

    #[test]
    fn test_image_detection() {
        assert!(attachment(None, Some("Image"), None).is_image());
        assert!(attachment(None, None, Some("image/heic")).is_image());
        assert!(attachment(Some("Photo.JPG"), None, None).is_image());
        assert!(attachment(Some("shot.webp"), Some("file"), None).is_image());
        assert!(!attachment(Some("notes.txt"), Some("file"), Some("text/plain")).is_image());
        assert!(!attachment(None, None, None).is_image());
    }

    #[test]
    fn test_allowed_action_ids() {
        let ctx = SelectionContext::with_capabilities(["a", "b", "a"]);
        let allowed = ctx.allowed_action_ids();
        assert_eq!(allowed.len(), 2);
        assert!(allowed.contains("a"));
        assert!(allowed.contains("b"));
    }
}
