use crate::config::RetrievalSettings;
use crate::error::Result;
use crate::traits::VectorStore;
use crate::types::ScoredChunk;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextSelector {
    k: usize,
    max_distance: f32,
}

impl Default for ContextSelector {
    fn default() -> Self {
        Self { k: 3, max_distance: 1.0 }
    }
}

impl From<&RetrievalSettings> for ContextSelector {
    fn from(s: &RetrievalSettings) -> Self {
        Self { k: s.k, max_distance: s.max_distance }
    }
}

impl ContextSelector {
    /// Texts of the hits closer than `max_distance`, space-joined in the
    /// order given. Empty when nothing qualifies.
    pub fn filter(&self, hits: &[ScoredChunk]) -> String {
        hits.iter()
            .filter(|h| h.distance < self.max_distance)
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub async fn select(&self, store: &dyn VectorStore, question: &str) -> Result<String> {
        let hits = store.query(question, self.k).await?;
        Ok(self.filter(&hits))
    }
}
