use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use pdfchat_core::error::Error;
use pdfchat_core::traits::VectorStore;
use pdfchat_core::types::Chunk;
use pdfchat_embed::FakeEmbedder;
use pdfchat_vector::{LanceVectorStore, Manifest};

fn chunk(source: &str, page: usize, chunk_index: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("{source}:{page}:{chunk_index}"),
        source: source.to_string(),
        page,
        chunk_index,
        text: text.to_string(),
        token_start: 0,
        token_end: text.split_whitespace().count(),
    }
}

fn store(dir: &std::path::Path) -> LanceVectorStore {
    LanceVectorStore::new(dir.join("faiss_index"), "chunks", Arc::new(FakeEmbedder::new(64)))
}

#[tokio::test]
async fn query_before_build_is_not_ready() {
    let tmp = TempDir::new().unwrap();
    let store = store(tmp.path());
    assert!(!store.is_ready());
    assert!(matches!(store.query("qualquer coisa", 3).await, Err(Error::NotReady)));
}

#[tokio::test]
async fn build_then_query_finds_the_matching_chunk() {
    let tmp = TempDir::new().unwrap();
    let mut store = store(tmp.path());
    let chunks = vec![
        chunk("a.pdf", 0, 0, "o contrato de locação vence em dezembro"),
        chunk("a.pdf", 1, 0, "a receita leva farinha ovos e açúcar"),
        chunk("b.pdf", 0, 0, "o motor elétrico consome pouca energia"),
    ];

    let n = store.build(&chunks, &CancellationToken::new()).await.expect("build");
    assert_eq!(n, 3);
    assert!(store.is_ready());
    assert_eq!(store.len(), 3);

    let hits = store.query("a receita leva farinha ovos e açúcar", 2).await.expect("query");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "a.pdf:1:0");
    assert!(hits[0].distance < 1e-4, "identical text sits at distance ~0, got {}", hits[0].distance);
    assert!(hits[0].distance <= hits[1].distance);

    let manifest = Manifest::read(store.dir()).expect("manifest");
    assert_eq!(manifest.chunks, 3);
    assert_eq!(manifest.dim, 64);
    assert_eq!(manifest.sources, vec!["a.pdf".to_string(), "b.pdf".to_string()]);
}

#[tokio::test]
async fn rebuilding_replaces_the_previous_index() {
    let tmp = TempDir::new().unwrap();
    let mut store = store(tmp.path());
    let cancel = CancellationToken::new();

    store.build(&[chunk("old.pdf", 0, 0, "texto antigo sobre navios")], &cancel).await.unwrap();
    store
        .build(&[chunk("new.pdf", 0, 0, "texto novo sobre aviões"), chunk("new.pdf", 0, 1, "mais aviões")], &cancel)
        .await
        .unwrap();

    let hits = store.query("texto antigo sobre navios", 10).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.source == "new.pdf"));
    assert_eq!(Manifest::read(store.dir()).unwrap().sources, vec!["new.pdf".to_string()]);
}

#[tokio::test]
async fn cancelled_build_keeps_the_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let mut store = store(tmp.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = store.build(&[chunk("a.pdf", 0, 0, "algum texto")], &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(!store.is_ready());
    assert!(!store.dir().exists());
}

#[tokio::test]
async fn building_nothing_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut store = store(tmp.path());
    let err = store.build(&[], &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::NoDocuments(_)));
}

#[tokio::test]
async fn rebuilding_leaves_unrelated_files_in_the_index_directory() {
    let tmp = TempDir::new().unwrap();
    let index_dir = tmp.path().join("shared");
    std::fs::create_dir_all(index_dir.join("notes")).unwrap();
    std::fs::write(index_dir.join("config.toml"), "[llm]\n").unwrap();
    std::fs::write(index_dir.join("notes").join("todo.txt"), "keep me").unwrap();

    let mut store = LanceVectorStore::new(&index_dir, "chunks", Arc::new(FakeEmbedder::new(32)));
    let cancel = CancellationToken::new();
    store.build(&[chunk("a.pdf", 0, 0, "primeira versão")], &cancel).await.unwrap();
    store.build(&[chunk("b.pdf", 0, 0, "segunda versão")], &cancel).await.unwrap();

    assert_eq!(std::fs::read_to_string(index_dir.join("config.toml")).unwrap(), "[llm]\n");
    assert_eq!(std::fs::read_to_string(index_dir.join("notes").join("todo.txt")).unwrap(), "keep me");
    assert!(index_dir.join("chunks.lance").is_dir());
    assert_eq!(Manifest::read(&index_dir).unwrap().sources, vec!["b.pdf".to_string()]);
}
