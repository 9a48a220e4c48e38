//! `manifest.json` written next to the LanceDB table on every build.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub table: String,
    pub chunks: usize,
    pub dim: usize,
    /// Distinct source files, in first-seen order.
    pub sources: Vec<String>,
    /// RFC 3339, UTC.
    pub built_at: String,
}

impl Manifest {
    pub fn new(table: &str, chunks: usize, dim: usize, sources: Vec<String>) -> Self {
        Self { table: table.to_string(), chunks, dim, sources, built_at: Utc::now().to_rfc3339() }
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
