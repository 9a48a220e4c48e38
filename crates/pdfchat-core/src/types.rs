//! Domain types shared by ingestion, indexing and the chat session.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// One page of text extracted from a source document.
///
/// - `source`: file name of the originating document
/// - `page`: zero-based page ordinal within that file
/// - `text`: page text, normalized once ingestion finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source: String,
    pub page: usize,
    pub text: String,
}

/// A token-bounded span of a [`DocumentRecord`], the unit stored in the index.
///
/// `source`/`page` point back at the record; `token_start..token_end` is the
/// window of tokens the chunk covers inside that record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source: String,
    pub page: usize,
    pub chunk_index: usize,
    pub text: String,
    pub token_start: usize,
    pub token_end: usize,
}

/// A chunk returned by a nearest-neighbour query.
///
/// `distance` is whatever the index metric produces; lower is always closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: ChunkId,
    pub source: String,
    pub page: usize,
    pub text: String,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
