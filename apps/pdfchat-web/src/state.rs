use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use pdfchat_core::error::Result;
use pdfchat_core::normalize::Language;
use pdfchat_session::ChatSession;

/// Builds a fresh session. Called on the first request after startup and
/// after every `POST /session/end`.
pub type SessionFactory = Arc<dyn Fn() -> Result<ChatSession> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// One-shot banner shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into() }
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    factory: SessionFactory,
    language: Language,
    max_upload_bytes: usize,
    /// Held for the whole of every handler that reads or changes the session.
    session: Mutex<Option<ChatSession>>,
    /// Token of the action holding `session`.
    cancel: Mutex<CancellationToken>,
    notice: Mutex<Option<Notice>>,
}

impl AppState {
    pub fn new(factory: SessionFactory, language: Language, max_upload_bytes: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                language,
                max_upload_bytes,
                session: Mutex::new(None),
                cancel: Mutex::new(CancellationToken::new()),
                notice: Mutex::new(None),
            }),
        }
    }

    pub fn language(&self) -> Language {
        self.inner.language
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner.max_upload_bytes
    }

    /// Locks the session slot, starting a session if none is live.
    pub async fn session(&self) -> Result<MutexGuard<'_, Option<ChatSession>>> {
        let mut guard = self.inner.session.lock().await;
        if guard.is_none() {
            *guard = Some((self.inner.factory)()?);
            tracing::info!("session started");
        }
        Ok(guard)
    }

    /// Locks the session slot without starting a session.
    pub async fn existing_session(&self) -> MutexGuard<'_, Option<ChatSession>> {
        self.inner.session.lock().await
    }

    /// Locks the session slot for an action and installs the token that
    /// `abort` cancels. The token is installed only once the lock is held.
    pub async fn action(&self) -> Result<(MutexGuard<'_, Option<ChatSession>>, CancellationToken)> {
        let guard = self.session().await?;
        let token = CancellationToken::new();
        *self.inner.cancel.lock().await = token.clone();
        Ok((guard, token))
    }

    pub async fn abort(&self) {
        self.inner.cancel.lock().await.cancel();
    }

    pub async fn set_notice(&self, notice: Notice) {
        *self.inner.notice.lock().await = Some(notice);
    }

    pub async fn take_notice(&self) -> Option<Notice> {
        self.inner.notice.lock().await.take()
    }
}
