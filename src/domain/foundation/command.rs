//! Command metadata carried through lifecycle handlers.
//!
//! Handlers take a single `CommandMetadata` instead of loose correlation and
//! source parameters, and copy it onto every envelope they publish with
//! `EventEnvelope::with_command_metadata`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata context for command handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// Links related operations across a single request.
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    /// Source of this command (e.g., "websocket", "api").
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Creates empty command metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Add correlation ID for request tracing.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Builder: Add source identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the correlation ID, generating one if not set.
    pub fn correlation_id(&self) -> String {
        self.correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Returns the source if set.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain_sets_all_fields() {
        let metadata = CommandMetadata::new()
            .with_correlation_id("corr-123")
            .with_source("websocket");

        assert_eq!(metadata.correlation_id(), "corr-123");
        assert_eq!(metadata.source(), Some("websocket"));
    }

    #[test]
    fn correlation_id_generates_if_missing() {
        let metadata = CommandMetadata::new();
        assert!(!metadata.correlation_id().is_empty());
    }

    #[test]
    fn serialization_skips_none_fields() {
        let json = serde_json::to_string(&CommandMetadata::new()).unwrap();
        assert_eq!(json, "{}");
    }
}
