use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Table};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pdfchat_core::error::{Error, Result};
use pdfchat_core::traits::{Embedder, VectorStore};
use pdfchat_core::types::{Chunk, ScoredChunk};

use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::schema::{self, build_chunk_schema};

pub const EMBED_BATCH_SIZE: usize = 32;

/// Chunk index persisted as a LanceDB table under a snapshot directory.
///
/// Every [`build`](VectorStore::build) drops the previous table and manifest
/// and writes fresh ones, so the snapshot on disk always matches the last
/// successful build. Other files in the directory are left alone.
/// Queries only run against a table built by this instance.
pub struct LanceVectorStore {
    dir: PathBuf,
    table_name: String,
    embedder: Arc<dyn Embedder>,
    table: Option<Table>,
    rows: usize,
}

impl LanceVectorStore {
    pub fn new(dir: impl Into<PathBuf>, table_name: &str, embedder: Arc<dyn Embedder>) -> Self {
        Self { dir: dir.into(), table_name: table_name.to_string(), embedder, table: None, rows: 0 }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Chunk count of the current index, 0 before the first build.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    async fn embed_all(&self, chunks: &[Chunk], cancel: &CancellationToken) -> Result<Vec<Vec<f32>>> {
        let pb = ProgressBar::new(chunks.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            if cancel.is_cancelled() {
                pb.abandon();
                return Err(Error::Cancelled);
            }
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            vectors.extend(self.embed_off_thread(texts).await?);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        Ok(vectors)
    }

    async fn embed_off_thread(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        let expected = texts.len();
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(Error::operation)?
            .map_err(Error::operation)?;
        if vectors.len() != expected {
            return Err(Error::Operation(format!("embedder returned {} vectors for {expected} texts", vectors.len())));
        }
        Ok(vectors)
    }

    fn to_record_batch(&self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<RecordBatch> {
        let dim = i32::try_from(self.embedder.dim()).map_err(Error::operation)?;
        let to_i32 = |n: usize| i32::try_from(n).map_err(Error::operation);

        let pages = chunks.iter().map(|c| to_i32(c.page)).collect::<Result<Vec<_>>>()?;
        let indices = chunks.iter().map(|c| to_i32(c.chunk_index)).collect::<Result<Vec<_>>>()?;
        let vectors = vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>()));

        RecordBatch::try_new(
            build_chunk_schema(dim),
            vec![
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.source.as_str()))),
                Arc::new(Int32Array::from(pages)),
                Arc::new(Int32Array::from(indices)),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
            ],
        )
        .map_err(Error::operation)
    }

    /// Removes the table and manifest of the previous build. Anything else in
    /// the directory belongs to someone else and stays.
    fn clear_snapshot(&self) -> Result<()> {
        let table_dir = self.dir.join(format!("{}.lance", self.table_name));
        if table_dir.exists() {
            std::fs::remove_dir_all(&table_dir).map_err(Error::operation)?;
        }
        let manifest = self.dir.join(MANIFEST_FILE);
        if manifest.exists() {
            std::fs::remove_file(&manifest).map_err(Error::operation)?;
        }
        std::fs::create_dir_all(&self.dir).map_err(Error::operation)
    }

    async fn write_snapshot(&self, batch: RecordBatch) -> Result<Table> {
        self.clear_snapshot()?;

        let uri = self.dir.to_string_lossy();
        let db = connect(uri.as_ref()).execute().await.map_err(Error::operation)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        db.create_table(&self.table_name, reader).execute().await.map_err(Error::operation)
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn build(&mut self, chunks: &[Chunk], cancel: &CancellationToken) -> Result<usize> {
        if chunks.is_empty() {
            return Err(Error::NoDocuments("the uploaded documents contain no text".to_string()));
        }
        info!(chunks = chunks.len(), dir = %self.dir.display(), "building vector index");
        let vectors = self.embed_all(chunks, cancel).await?;
        let batch = self.to_record_batch(chunks, vectors)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // The old table is about to be deleted.
        self.table = None;
        self.rows = 0;
        let table = self.write_snapshot(batch).await?;

        let mut sources: Vec<String> = Vec::new();
        for c in chunks {
            if !sources.contains(&c.source) {
                sources.push(c.source.clone());
            }
        }
        Manifest::new(&self.table_name, chunks.len(), self.embedder.dim(), sources)
            .write(&self.dir)
            .map_err(Error::operation)?;

        self.table = Some(table);
        self.rows = chunks.len();
        info!(chunks = self.rows, "vector index ready");
        Ok(self.rows)
    }

    async fn query(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let table = self.table.as_ref().ok_or(Error::NotReady)?;
        if k == 0 || self.rows == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self
            .embed_off_thread(vec![question.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Operation("embedder returned no vector".to_string()))?;

        let mut stream = table
            .vector_search(query_vec)
            .map_err(Error::operation)?
            .limit(k)
            .execute()
            .await
            .map_err(Error::operation)?;

        let mut hits = Vec::new();
        while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await.map_err(Error::operation)? {
            hits.extend(scored_rows(&batch)?);
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        debug!(hits = hits.len(), "vector query");
        Ok(hits)
    }

    fn is_ready(&self) -> bool {
        self.table.is_some()
    }
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::Operation(format!("column {name} missing from search results")))
}

fn scored_rows(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
    let ids = column::<StringArray>(batch, schema::ID)?;
    let sources = column::<StringArray>(batch, schema::SOURCE)?;
    let pages = column::<Int32Array>(batch, schema::PAGE)?;
    let texts = column::<StringArray>(batch, schema::TEXT)?;
    let distances = column::<Float32Array>(batch, schema::DISTANCE)?;

    (0..batch.num_rows())
        .map(|i| {
            Ok(ScoredChunk {
                id: ids.value(i).to_string(),
                source: sources.value(i).to_string(),
                page: usize::try_from(pages.value(i)).map_err(Error::operation)?,
                text: texts.value(i).to_string(),
                distance: distances.value(i),
            })
        })
        .collect()
}
