//! Generation trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ContextPacket, Result};

/// Answer generator interface
///
/// The generator receives the assembled packet and must cite sources by
/// their `source_id`. Only `cited_source_ids` flows back into confidence
/// estimation.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn answer(&self, query: &str, packet: &ContextPacket) -> Result<GeneratedAnswer>;

    /// Generator name for logging
    fn name(&self) -> &str {
        "generator"
    }
}

/// Generated answer with its citations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    #[serde(default)]
    pub cited_source_ids: Vec<String>,
}

impl GeneratedAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cited_source_ids: Vec::new(),
        }
    }

    pub fn with_citation(mut self, source_id: impl Into<String>) -> Self {
        self.cited_source_ids.push(source_id.into());
        self
    }
}
