//! pdfchat-session
//!
//! One user's chat: the message history, whether answers come from the
//! uploaded documents (RAG) or from the plain chat model, and the index built
//! from the last successful upload.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pdfchat_core::chunker::{ChunkingConfig, TokenChunker, TokenSpans};
use pdfchat_core::config::{expand_path, LlmSettings, Settings};
use pdfchat_core::context::ContextSelector;
use pdfchat_core::error::{Error, Result};
use pdfchat_core::ingest::DocumentIngestor;
use pdfchat_core::normalize::{Language, TextNormalizer};
use pdfchat_core::prompt::{compose_prompt, error_reply, no_context_reply};
use pdfchat_core::traits::{Embedder, Generator, PageExtractor, VectorStore};
use pdfchat_core::types::{ChatMessage, Chunk};
use pdfchat_vector::LanceVectorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    NonRag,
    Rag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelChoice {
    pub rag_model: String,
    pub chat_model: String,
    pub temperature: f32,
}

impl From<&LlmSettings> for ModelChoice {
    fn from(s: &LlmSettings) -> Self {
        Self { rag_model: s.rag_model.clone(), chat_model: s.chat_model.clone(), temperature: s.temperature }
    }
}

/// Everything a session is assembled from. Shared, expensive pieces (embedder,
/// tokenizer, HTTP client) are built once at startup and handed to each new
/// session.
pub struct SessionParts {
    pub store: Box<dyn VectorStore>,
    pub generator: Arc<dyn Generator>,
    pub ingestor: DocumentIngestor,
    pub chunker: TokenChunker,
    pub selector: ContextSelector,
    pub models: ModelChoice,
    pub language: Language,
}

impl SessionParts {
    pub fn from_settings(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        tokenizer: Arc<dyn TokenSpans>,
        extractor: Arc<dyn PageExtractor>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let language = settings.language()?;
        let store = LanceVectorStore::new(expand_path(&settings.index.dir), &settings.index.table, embedder);
        Ok(Self {
            store: Box::new(store),
            generator,
            ingestor: DocumentIngestor::new(extractor, TextNormalizer::new(language)),
            chunker: TokenChunker::new(ChunkingConfig::from(&settings.chunking), tokenizer)?,
            selector: ContextSelector::from(&settings.retrieval),
            models: ModelChoice::from(&settings.llm),
            language,
        })
    }
}

/// Snapshot of a session for status displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStatus {
    pub rag_active: bool,
    pub messages: usize,
    pub indexed_chunks: usize,
    pub context: Option<String>,
}

pub struct ChatSession {
    store: Box<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    ingestor: DocumentIngestor,
    chunker: TokenChunker,
    selector: ContextSelector,
    models: ModelChoice,
    language: Language,
    mode: Mode,
    history: Vec<ChatMessage>,
    context: Option<String>,
    indexed_chunks: usize,
}

impl ChatSession {
    pub fn new(parts: SessionParts) -> Self {
        Self {
            store: parts.store,
            generator: parts.generator,
            ingestor: parts.ingestor,
            chunker: parts.chunker,
            selector: parts.selector,
            models: parts.models,
            language: parts.language,
            mode: Mode::NonRag,
            history: Vec::new(),
            context: None,
            indexed_chunks: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_rag(&self) -> bool {
        self.mode == Mode::Rag
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Context used for the most recent document-backed answer.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn indexed_chunks(&self) -> usize {
        self.indexed_chunks
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            rag_active: self.is_rag(),
            messages: self.history.len(),
            indexed_chunks: self.indexed_chunks,
            context: self.context.clone(),
        }
    }

    /// Ingest every PDF in `dir`, chunk it and rebuild the index. Switches to
    /// RAG mode and returns the chunk count on success.
    ///
    /// On failure the session keeps whatever index it still has; when none is
    /// left it drops back to plain chat.
    pub async fn process_directory(&mut self, dir: &Path, cancel: &CancellationToken) -> Result<usize> {
        match self.rebuild(dir, cancel).await {
            Ok(n) => {
                self.mode = Mode::Rag;
                self.indexed_chunks = n;
                self.context = None;
                info!(chunks = n, "RAG mode active");
                Ok(n)
            }
            Err(e) => {
                warn!(error = %e, "document processing failed");
                if !self.store.is_ready() {
                    self.mode = Mode::NonRag;
                    self.indexed_chunks = 0;
                    self.context = None;
                }
                Err(e)
            }
        }
    }

    async fn rebuild(&mut self, dir: &Path, cancel: &CancellationToken) -> Result<usize> {
        let chunks = self.prepare_chunks(dir).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.store.build(&chunks, cancel).await
    }

    async fn prepare_chunks(&self, dir: &Path) -> Result<Vec<Chunk>> {
        let ingestor = self.ingestor.clone();
        let chunker = self.chunker.clone();
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<Vec<Chunk>> {
            let records = ingestor.ingest(&dir)?;
            let chunks = chunker.split(&records)?;
            info!(documents = records.len(), chunks = chunks.len(), "documents chunked");
            Ok(chunks)
        })
        .await
        .map_err(Error::operation)?
    }

    /// Back to plain chat. The snapshot on disk is left alone.
    pub fn disable_rag(&mut self) {
        self.mode = Mode::NonRag;
        self.context = None;
        info!("RAG mode disabled");
    }

    /// One chat turn. Always appends the question and exactly one assistant
    /// reply to the history, and returns that reply.
    pub async fn ask(&mut self, question: &str, cancel: &CancellationToken) -> String {
        self.history.push(ChatMessage::user(question));
        let reply = match self.mode {
            Mode::Rag => self.answer_from_documents(question, cancel).await,
            Mode::NonRag => self.complete(&self.models.chat_model, question, cancel).await,
        };
        self.history.push(ChatMessage::assistant(reply.clone()));
        reply
    }

    async fn answer_from_documents(&mut self, question: &str, cancel: &CancellationToken) -> String {
        let context = match self.selector.select(self.store.as_ref(), question).await {
            Ok(context) => context,
            Err(e) => {
                error!(error = %e, "context lookup failed");
                return error_reply(self.language, &e);
            }
        };
        if context.is_empty() {
            return no_context_reply(self.language).to_string();
        }
        let prompt = compose_prompt(self.language, &context, question);
        self.context = Some(context);
        self.complete(&self.models.rag_model, &prompt, cancel).await
    }

    async fn complete(&self, model: &str, prompt: &str, cancel: &CancellationToken) -> String {
        match self.generator.try_generate(model, prompt, self.models.temperature, cancel).await {
            Ok(text) => text,
            Err(e) => {
                error!(model, error = %e, "generation failed");
                error_reply(self.language, &e)
            }
        }
    }
}
