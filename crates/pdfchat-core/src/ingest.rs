use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::normalize::TextNormalizer;
use crate::traits::PageExtractor;
use crate::types::DocumentRecord;

pub const PDF_EXTENSION: &str = "pdf";

/// Page text via `pdf-extract`. Parser panics on malformed files are turned
/// into errors so one bad upload cannot take the batch down.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(anyhow::anyhow!("cannot parse {}: {}", path.display(), e)),
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(anyhow::anyhow!("parser panicked on {}: {}", path.display(), msg))
            }
        }
    }
}

#[derive(Clone)]
pub struct DocumentIngestor {
    extractor: Arc<dyn PageExtractor>,
    normalizer: TextNormalizer,
}

impl DocumentIngestor {
    pub fn new(extractor: Arc<dyn PageExtractor>, normalizer: TextNormalizer) -> Self {
        Self { extractor, normalizer }
    }

    /// Every page of every PDF directly under `dir`, normalized, grouped by
    /// file in name order and in page order within a file.
    pub fn ingest(&self, dir: &Path) -> Result<Vec<DocumentRecord>> {
        if !dir.is_dir() {
            return Err(Error::InvalidConfig(format!("directory {} does not exist", dir.display())));
        }
        let files = list_pdf_files(dir);
        let mut records = Vec::new();
        for path in &files {
            let source = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
            match self.extractor.extract_pages(path) {
                Ok(pages) => {
                    info!(file = %source, pages = pages.len(), "processed document");
                    records.extend(pages.into_iter().enumerate().map(|(page, text)| DocumentRecord {
                        source: source.clone(),
                        page,
                        text,
                    }));
                }
                Err(e) => warn!(file = %source, error = %e, "skipping unreadable document"),
            }
        }
        if records.is_empty() {
            return Err(Error::NoDocuments(dir.display().to_string()));
        }
        for record in &mut records {
            record.text = self.normalizer.normalize(&record.text);
        }
        Ok(records)
    }
}

fn list_pdf_files(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
        })
        .collect()
}
