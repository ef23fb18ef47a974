use std::io::ErrorKind;
use std::path::Path;

use tertulia_core::Agent;
use tertulia_core::retrieval::{Retriever, ScoredSegment};

use crate::error::ApiError;

const CONTEXT_HEADER: &str = "Answer using the following information:";

/// The document-grounded assistant behind `/api/rag/ask`.
pub struct RagService {
    agent: Agent,
    retriever: Retriever,
}

impl RagService {
    pub fn new(agent: Agent, retriever: Retriever) -> Self {
        Self { agent, retriever }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Loads and ingests the document at `path`, returning the number of
    /// stored segments.
    ///
    /// A missing or unreadable document is logged and leaves the store as
    /// it was.
    pub async fn ingest_file(&self, path: &Path) -> usize {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                error!("document `{}` not found, answering without it", path.display());
                return 0;
            }
            Err(err) => {
                error!("failed to read `{}`: {err}", path.display());
                return 0;
            }
        };
        let source = path.display().to_string();
        match self.retriever.ingest(&source, &text).await {
            Ok(count) => count,
            Err(err) => {
                error!("failed to ingest `{source}`: {err}");
                0
            }
        }
    }

    /// Embeds `text` and logs the vector's shape, as a smoke test of the
    /// embedding backend.
    pub async fn log_probe(&self, text: &str) {
        match self.retriever.embedder().embed(text).await {
            Ok(vector) => {
                let head: Vec<_> = vector.iter().take(10).collect();
                debug!("probe `{text}`: dimension {}, head {head:?}", vector.len());
            }
            Err(err) => warn!("probe embedding failed: {err}"),
        }
    }

    pub async fn ask(&self, query: &str) -> Result<String, ApiError> {
        let found = self.retriever.retrieve(query).await?;
        let context = format_context(&found);
        let reply = self.agent.chat_with_context(query, context).await?;
        Ok(reply.text)
    }
}

/// Joins the segments into one system message, `None` if there are none.
pub fn format_context(segments: &[ScoredSegment]) -> Option<String> {
    if segments.is_empty() {
        return None;
    }
    let body = segments
        .iter()
        .map(|found| found.segment.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(format!("{CONTEXT_HEADER}\n{body}"))
}
