use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pdfchat_core::chunker::{HfTokenizer, TokenSpans, WordTokenizer};
use pdfchat_core::config::Settings;
use pdfchat_core::error::Result;
use pdfchat_core::ingest::PdfExtractor;
use pdfchat_core::traits::{Embedder, Generator, PageExtractor};
use pdfchat_embed::get_default_embedder;
use pdfchat_llm::OllamaClient;
use pdfchat_session::{ChatSession, SessionParts};
use pdfchat_web::{create_app, AppState, SessionFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let settings = Settings::load()?;
    settings.validate()?;
    let language = settings.language()?;

    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let tokenizer: Arc<dyn TokenSpans> = match settings.tokenizer_path() {
        Some(path) => {
            info!(path = %path.display(), "chunking with model tokenizer");
            Arc::new(HfTokenizer::from_file(&path)?)
        }
        None => {
            warn!("no tokenizer.json found, chunking by Unicode words");
            Arc::new(WordTokenizer)
        }
    };
    let generator: Arc<dyn Generator> = Arc::new(OllamaClient::new(&settings.llm)?);
    let extractor: Arc<dyn PageExtractor> = Arc::new(PdfExtractor);

    let session_settings = settings.clone();
    let factory: SessionFactory = Arc::new(move || -> Result<ChatSession> {
        let parts = SessionParts::from_settings(
            &session_settings,
            Arc::clone(&embedder),
            Arc::clone(&tokenizer),
            Arc::clone(&extractor),
            Arc::clone(&generator),
        )?;
        Ok(ChatSession::new(parts))
    });

    let state = AppState::new(factory, language, settings.server.max_upload_mb * 1024 * 1024);
    let app = create_app(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("pdfchat listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
