use std::path::Path;

use anyhow::{anyhow, bail};
use axum::extract::{Multipart, State};
use axum::response::{Html, Redirect};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use pdfchat_core::error::Error;
use pdfchat_session::{ChatSession, SessionStatus};

use crate::render::{self, labels};
use crate::state::{AppState, Notice};

const UPLOAD_FIELD: &str = "files";

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let labels = labels(state.language());
    let notice = state.take_notice().await;
    match state.session().await {
        Ok(guard) => {
            let (status, history) = match guard.as_ref() {
                Some(session) => (session.status(), session.history()),
                None => (SessionStatus::default(), &[][..]),
            };
            Html(render::page(labels, &status, history, notice.as_ref()))
        }
        Err(e) => {
            let notice = Notice::error(format!("{} {e}", labels.session_error));
            Html(render::page(labels, &SessionStatus::default(), &[], Some(&notice)))
        }
    }
}

pub async fn upload_documents(State(state): State<AppState>, multipart: Multipart) -> Redirect {
    let labels = labels(state.language());
    let notice = match process_upload(&state, multipart).await {
        Ok(chunks) => Notice::success(labels.processed(chunks)),
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::Cancelled)) => Notice::info(labels.aborted),
        Err(e) => {
            warn!(error = %e, "upload failed");
            Notice::error(format!("{} {e}", labels.processing_error))
        }
    };
    state.set_notice(notice).await;
    Redirect::to("/")
}

/// Writes the uploaded PDFs into a temporary directory and indexes them. The
/// directory is removed when this returns, whatever the outcome.
async fn process_upload(state: &AppState, mut multipart: Multipart) -> anyhow::Result<usize> {
    let (mut guard, cancel) = state.action().await?;
    let session = guard.as_mut().ok_or_else(|| anyhow!("no active session"))?;

    let upload_dir = tempfile::TempDir::new()?;
    let mut saved = 0usize;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(name) = field.file_name().and_then(safe_file_name) else {
            continue;
        };
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            continue;
        }
        tokio::fs::write(upload_dir.path().join(&name), &bytes).await?;
        saved += 1;
    }
    if saved == 0 {
        bail!(labels(state.language()).no_files);
    }
    info!(files = saved, "processing upload");
    Ok(session.process_directory(upload_dir.path(), &cancel).await?)
}

/// Final path component of a client-supplied file name.
fn safe_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw).file_name()?.to_str()?.trim();
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    question: String,
}

pub async fn chat(State(state): State<AppState>, Form(form): Form<ChatForm>) -> Redirect {
    let question = form.question.trim();
    if question.is_empty() {
        return Redirect::to("/");
    }
    match state.action().await {
        Ok((mut guard, cancel)) => {
            if let Some(session) = guard.as_mut() {
                session.ask(question, &cancel).await;
            }
        }
        Err(e) => {
            let labels = labels(state.language());
            state.set_notice(Notice::error(format!("{} {e}", labels.session_error))).await;
        }
    }
    Redirect::to("/")
}

pub async fn disable_rag(State(state): State<AppState>) -> Redirect {
    let mut guard = state.existing_session().await;
    if let Some(session) = guard.as_mut() {
        if session.is_rag() {
            session.disable_rag();
            state.set_notice(Notice::info(labels(state.language()).rag_disabled)).await;
        }
    }
    Redirect::to("/")
}

pub async fn abort(State(state): State<AppState>) -> Redirect {
    state.abort().await;
    info!("abort requested");
    Redirect::to("/")
}

pub async fn end_session(State(state): State<AppState>) -> Redirect {
    state.abort().await;
    let ended = state.existing_session().await.take().is_some();
    if ended {
        info!("session ended");
        state.set_notice(Notice::info(labels(state.language()).session_ended)).await;
    }
    Redirect::to("/")
}

pub async fn status(State(state): State<AppState>) -> Json<SessionStatus> {
    let guard = state.existing_session().await;
    Json(guard.as_ref().map(ChatSession::status).unwrap_or_default())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
