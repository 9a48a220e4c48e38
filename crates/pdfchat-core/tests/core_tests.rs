use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use pdfchat_core::chunker::{ChunkingConfig, TokenChunker, TokenSpans, WordTokenizer};
use pdfchat_core::context::ContextSelector;
use pdfchat_core::error::{Error, Result};
use pdfchat_core::ingest::{DocumentIngestor, PdfExtractor};
use pdfchat_core::normalize::{Language, TextNormalizer};
use pdfchat_core::traits::{PageExtractor, VectorStore};
use pdfchat_core::types::{Chunk, DocumentRecord, ScoredChunk};

/// Reads "PDFs" as plain text, one page per form feed. Files starting with
/// `%BROKEN` fail to parse.
struct TextPages;

impl PageExtractor for TextPages {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        let raw = fs::read_to_string(path)?;
        if raw.starts_with("%BROKEN") {
            anyhow::bail!("corrupt file");
        }
        Ok(raw.split('\x0c').map(str::to_string).collect())
    }
}

fn ingestor() -> DocumentIngestor {
    DocumentIngestor::new(Arc::new(TextPages), TextNormalizer::new(Language::Portuguese))
}

fn words(n: usize) -> String {
    (0..n).map(|i| format!("palavra{i}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn ingest_groups_pages_by_file_in_name_order() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("b.pdf"), "segundo\x0cterceiro").unwrap();
    fs::write(tmp.path().join("a.pdf"), "primeiro\n\n  texto").unwrap();
    fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

    let records = ingestor().ingest(tmp.path()).expect("ingest");

    let got: Vec<(&str, usize, &str)> =
        records.iter().map(|r| (r.source.as_str(), r.page, r.text.as_str())).collect();
    assert_eq!(
        got,
        vec![("a.pdf", 0, "primeiro texto"), ("b.pdf", 0, "segundo"), ("b.pdf", 1, "terceiro")]
    );
}

#[test]
fn ingest_skips_files_that_fail_to_parse() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.pdf"), "%BROKEN").unwrap();
    fs::write(tmp.path().join("good.pdf"), "conteúdo válido").unwrap();

    let records = ingestor().ingest(tmp.path()).expect("ingest");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "good.pdf");
}

#[test]
fn ingest_missing_directory_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let err = ingestor().ingest(&tmp.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn ingest_without_pdfs_yields_no_documents() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("readme.md"), "# not a pdf").unwrap();
    let err = ingestor().ingest(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::NoDocuments(_)), "got {err:?}");
}

#[test]
fn ingest_with_only_broken_pdfs_yields_no_documents() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("x.pdf"), "%BROKEN").unwrap();
    fs::write(tmp.path().join("y.pdf"), "%BROKEN again").unwrap();
    let err = ingestor().ingest(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::NoDocuments(_)), "got {err:?}");
}

#[test]
fn pdf_extractor_rejects_garbage_without_panicking() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("garbage.pdf"), b"this is not a pdf at all").unwrap();
    let ingestor =
        DocumentIngestor::new(Arc::new(PdfExtractor), TextNormalizer::new(Language::English));
    let err = ingestor.ingest(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::NoDocuments(_)), "got {err:?}");
}

/// Smallest well-formed PDF with one line of Helvetica text per page.
fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let font_id = 3 + 2 * pages.len();
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
    ];
    for (i, text) in pages.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {} 0 R >>",
            4 + 2 * i
        ));
        objects.push(format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string());

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in offsets {
        xref.push_str(&format!("{off:010} 00000 n \n"));
    }
    xref.push_str(&format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n", objects.len() + 1));
    out.extend_from_slice(xref.as_bytes());
    out
}

#[test]
fn pdf_extractor_reads_every_page_of_a_real_pdf() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("manual.pdf"), text_pdf(&["Primeira pagina do manual", "Segunda pagina do manual"]))
        .unwrap();
    let ingestor =
        DocumentIngestor::new(Arc::new(PdfExtractor), TextNormalizer::new(Language::Portuguese));

    let records = ingestor.ingest(tmp.path()).expect("ingest");

    let pages: Vec<(&str, usize)> = records.iter().map(|r| (r.source.as_str(), r.page)).collect();
    assert_eq!(pages, vec![("manual.pdf", 0), ("manual.pdf", 1)]);
    assert!(records[0].text.contains("Primeira") && !records[0].text.contains("Segunda"), "{:?}", records[0].text);
    assert!(records[1].text.contains("Segunda"), "{:?}", records[1].text);
    for r in &records {
        assert!(r.text.contains("manual"));
        assert!(!r.text.contains('\n'));
    }
}

#[test]
fn long_documents_produce_at_least_one_chunk_each() {
    let records = vec![
        DocumentRecord { source: "a.pdf".into(), page: 0, text: words(1200) },
        DocumentRecord { source: "a.pdf".into(), page: 1, text: words(10) },
    ];
    let chunker = TokenChunker::new(ChunkingConfig::default(), Arc::new(WordTokenizer)).unwrap();
    let chunks = chunker.split(&records).expect("split");

    assert!(chunks.len() >= records.len());
    assert_eq!(chunks.iter().filter(|c| c.page == 0).count(), 3);
    assert!(chunks.iter().all(|c| c.token_end - c.token_start <= 500));
    assert_eq!(chunks[0].id, "a.pdf:0:0");
    assert_eq!(chunks.last().unwrap().id, "a.pdf:1:0");
}

#[test]
fn consecutive_chunks_share_the_overlap() {
    let record = DocumentRecord { source: "a.pdf".into(), page: 0, text: words(30) };
    let config = ChunkingConfig { budget: 10, overlap: 3 };
    let chunker = TokenChunker::new(config, Arc::new(WordTokenizer)).unwrap();
    let chunks = chunker.split_record(&record).expect("split");

    for pair in chunks.windows(2) {
        let prev: Vec<&str> = pair[0].text.split(' ').collect();
        let next: Vec<&str> = pair[1].text.split(' ').collect();
        assert_eq!(&prev[prev.len() - 3..], &next[..3]);
    }
    assert_eq!(chunks.last().unwrap().token_end, 30);
}

#[test]
fn chunking_is_deterministic() {
    let record = DocumentRecord { source: "a.pdf".into(), page: 0, text: words(777) };
    let chunker = TokenChunker::new(ChunkingConfig::default(), Arc::new(WordTokenizer)).unwrap();
    let first: Vec<Chunk> = chunker.split_record(&record).unwrap();
    let second: Vec<Chunk> = chunker.split_record(&record).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_pages_produce_no_chunks() {
    let record = DocumentRecord { source: "a.pdf".into(), page: 0, text: String::new() };
    let chunker = TokenChunker::new(ChunkingConfig::default(), Arc::new(WordTokenizer)).unwrap();
    assert!(chunker.split_record(&record).unwrap().is_empty());
}

#[test]
fn overlap_must_be_below_budget() {
    let config = ChunkingConfig { budget: 50, overlap: 50 };
    let tokenizer: Arc<dyn TokenSpans> = Arc::new(WordTokenizer);
    assert!(matches!(TokenChunker::new(config, tokenizer), Err(Error::InvalidConfig(_))));
}

fn hit(text: &str, distance: f32) -> ScoredChunk {
    ScoredChunk { id: text.into(), source: "a.pdf".into(), page: 0, text: text.into(), distance }
}

#[test]
fn selector_drops_hits_at_or_beyond_the_threshold() {
    let selector = ContextSelector::default();
    let hits = vec![hit("primeiro", 0.3), hit("segundo", 0.8), hit("terceiro", 1.2)];
    assert_eq!(selector.filter(&hits), "primeiro segundo");
    assert_eq!(selector.filter(&[hit("limite", 1.0)]), "");
    assert_eq!(selector.filter(&[]), "");
}

struct EmptyStore;

#[async_trait]
impl VectorStore for EmptyStore {
    async fn build(&mut self, _chunks: &[Chunk], _cancel: &CancellationToken) -> Result<usize> {
        Ok(0)
    }
    async fn query(&self, _question: &str, _k: usize) -> Result<Vec<ScoredChunk>> {
        Err(Error::NotReady)
    }
    fn is_ready(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn selecting_before_any_index_is_not_ready() {
    let err = ContextSelector::default().select(&EmptyStore, "pergunta").await.unwrap_err();
    assert!(matches!(err, Error::NotReady));
}
