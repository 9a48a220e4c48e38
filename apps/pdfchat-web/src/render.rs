//! Server-rendered HTML for the chat page.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{html, Event, Options, Parser};

use pdfchat_core::normalize::Language;
use pdfchat_core::types::{ChatMessage, Role};
use pdfchat_session::SessionStatus;

use crate::state::{Notice, NoticeKind};

/// Interface strings.
pub struct Labels {
    pub title: &'static str,
    pub upload_header: &'static str,
    pub upload_hint: &'static str,
    pub process_button: &'static str,
    pub status_header: &'static str,
    pub rag_mode: &'static str,
    pub history: &'static str,
    pub messages: &'static str,
    pub indexed_chunks: &'static str,
    pub disable_rag: &'static str,
    pub end_session: &'static str,
    pub rag_banner: &'static str,
    pub chat_header: &'static str,
    pub chat_placeholder: &'static str,
    pub send: &'static str,
    pub abort: &'static str,
    pub processed: &'static str,
    pub processing_error: &'static str,
    pub no_files: &'static str,
    pub rag_disabled: &'static str,
    pub aborted: &'static str,
    pub session_ended: &'static str,
    pub session_error: &'static str,
}

const PORTUGUESE: Labels = Labels {
    title: "📚 Assistente Chatbot - Aplicação RAG",
    upload_header: "Upload seu documento",
    upload_hint: "Adicione um arquivo .pdf para acionar o RAG",
    process_button: "Processar documento",
    status_header: "Status do sistema",
    rag_mode: "Modo RAG",
    history: "Histórico de Chat",
    messages: "mensagens",
    indexed_chunks: "Chunks indexados",
    disable_rag: "Desabilitar modo RAG",
    end_session: "Encerrar sessão",
    rag_banner: "🔍 Modo RAG Ativado, agora as respostas serão baseadas no documento carregado",
    chat_header: "💬 Chat",
    chat_placeholder: "Bora! Solta o verbo",
    send: "Enviar",
    abort: "Interromper",
    processed: "Documento processado com sucesso em {n} chunks!",
    processing_error: "Erro ao processar o PDF:",
    no_files: "Nenhum arquivo foi enviado.",
    rag_disabled: "Modo RAG desabilitado.",
    aborted: "Operação interrompida.",
    session_ended: "Sessão encerrada.",
    session_error: "Não foi possível iniciar a sessão:",
};

const ENGLISH: Labels = Labels {
    title: "📚 Chatbot Assistant - RAG Application",
    upload_header: "Upload your document",
    upload_hint: "Add a .pdf file to enable RAG",
    process_button: "Process documents",
    status_header: "System status",
    rag_mode: "RAG mode",
    history: "Chat history",
    messages: "messages",
    indexed_chunks: "Indexed chunks",
    disable_rag: "Disable RAG mode",
    end_session: "End session",
    rag_banner: "🔍 RAG mode active, answers are now based on the uploaded documents",
    chat_header: "💬 Chat",
    chat_placeholder: "Ask away!",
    send: "Send",
    abort: "Abort",
    processed: "Documents processed successfully into {n} chunks!",
    processing_error: "Error processing the PDF:",
    no_files: "No files were uploaded.",
    rag_disabled: "RAG mode disabled.",
    aborted: "Operation aborted.",
    session_ended: "Session ended.",
    session_error: "Could not start the session:",
};

pub fn labels(language: Language) -> &'static Labels {
    match language {
        Language::Portuguese => &PORTUGUESE,
        Language::English => &ENGLISH,
    }
}

impl Labels {
    pub fn processed(&self, chunks: usize) -> String {
        self.processed.replace("{n}", &chunks.to_string())
    }
}

/// Markdown to HTML with any raw HTML in the source shown as text.
pub fn markdown(text: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, events);
    out
}

fn message_html(message: &ChatMessage) -> String {
    match message.role {
        Role::User => format!("<div class=\"msg user\"><p>{}</p></div>", encode_text(&message.content)),
        Role::Assistant => format!("<div class=\"msg assistant\">{}</div>", markdown(&message.content)),
    }
}

fn notice_html(notice: &Notice) -> String {
    let class = match notice.kind {
        NoticeKind::Success => "success",
        NoticeKind::Info => "info",
        NoticeKind::Error => "error",
    };
    format!("<div class=\"notice {class}\">{}</div>", encode_text(&notice.text))
}

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex;min-height:100vh}\
aside{width:300px;padding:1rem;background:#f0f2f6}\
main{flex:1;padding:1rem 2rem;max-width:900px}\
.msg{padding:.5rem 1rem;margin:.5rem 0;border-radius:8px}\
.user{background:#e8f0fe;white-space:pre-wrap}.assistant{background:#f7f7f7}\
.notice{padding:.5rem 1rem;border-radius:6px;margin:.5rem 0}\
.success{background:#d4edda}.info{background:#d1ecf1}.error{background:#f8d7da}\
form.inline{display:inline}textarea{width:100%}";

pub fn page(labels: &Labels, status: &SessionStatus, history: &[ChatMessage], notice: Option<&Notice>) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<aside><h2>{upload_header}</h2><p>{upload_hint}</p>\
         <form method=\"post\" action=\"/documents\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"files\" accept=\".pdf\" multiple required>\
         <button type=\"submit\">{process}</button></form><hr>\
         <h3>{status_header}</h3>\
         <p>{rag_mode}: {rag_flag}</p><p>{history}: {messages} {messages_word}</p>\
         <p>{chunks_label}: {chunks}</p>",
        upload_header = labels.upload_header,
        upload_hint = labels.upload_hint,
        process = labels.process_button,
        status_header = labels.status_header,
        rag_mode = labels.rag_mode,
        rag_flag = if status.rag_active { "✅" } else { "❌" },
        history = labels.history,
        messages = status.messages,
        messages_word = labels.messages,
        chunks_label = labels.indexed_chunks,
        chunks = status.indexed_chunks,
    );
    if status.rag_active {
        let _ = write!(
            body,
            "<form method=\"post\" action=\"/rag/disable\"><button type=\"submit\">{}</button></form>",
            labels.disable_rag
        );
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"/session/end\"><button type=\"submit\">{}</button></form></aside>",
        labels.end_session
    );

    let _ = write!(body, "<main><h1>{}</h1>", labels.title);
    if let Some(notice) = notice {
        body.push_str(&notice_html(notice));
    }
    let _ = write!(body, "<h2>{}</h2>", labels.chat_header);
    if status.rag_active {
        body.push_str(&notice_html(&Notice::info(labels.rag_banner)));
    }
    for message in history {
        body.push_str(&message_html(message));
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"/chat\"><textarea name=\"question\" rows=\"3\" placeholder=\"{placeholder}\" required></textarea>\
         <button type=\"submit\">{send}</button></form>\
         <form class=\"inline\" method=\"post\" action=\"/abort\"><button type=\"submit\">{abort}</button></form></main>",
        placeholder = encode_double_quoted_attribute(labels.chat_placeholder),
        send = labels.send,
        abort = labels.abort,
    );

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title><style>{STYLE}</style></head><body>{body}</body></html>",
        title = encode_text(labels.title),
    )
}
