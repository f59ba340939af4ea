//! Deterministic providers and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use quarry_core::{Embedding, EmbeddingModel, GenerationRequest, LanguageModel, ProviderError};
use quarry_rag::{
    DirectorySnapshotStore, FlatIndex, RagConfig, RetryPolicy, Snapshot, SnapshotHandle,
    SnapshotStore,
};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

pub const DIM: usize = 256;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Lower-cased words with a trailing plural `s` dropped.
fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let word = word.to_lowercase();
            match word.strip_suffix('s') {
                Some(stem) if stem.len() >= 3 => stem.to_owned(),
                _ => word,
            }
        })
}

fn bucket(term: &str, dim: usize) -> usize {
    let hash = term.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    usize::try_from(hash % dim as u64).unwrap()
}

/// Hashed bag-of-words vectors: texts sharing words score high.
#[derive(Debug, Clone)]
pub struct BagOfWords {
    dim: usize,
}

impl BagOfWords {
    pub const fn new() -> Self {
        Self { dim: DIM }
    }

    pub const fn with_dim(dim: usize) -> Self {
        Self { dim }
    }

    pub fn vector(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0; self.dim];
        for term in terms(text) {
            vector[bucket(&term, self.dim)] += 1.0;
        }
        vector
    }
}

impl EmbeddingModel for BagOfWords {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        Ok(self.vector(text))
    }
}

/// Fails with an authentication error whenever a text contains `poison`.
#[derive(Debug, Clone)]
pub struct Poisoned {
    inner: BagOfWords,
}

impl Poisoned {
    pub const fn new() -> Self {
        Self {
            inner: BagOfWords::new(),
        }
    }
}

impl EmbeddingModel for Poisoned {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        if text.contains("poison") {
            return Err(ProviderError::Authentication("api key revoked".into()));
        }
        self.inner.embed(text).await
    }
}

/// Rate-limits the first `failures` calls, then behaves.
#[derive(Debug)]
pub struct Flaky {
    inner: BagOfWords,
    failures: usize,
    pub calls: Arc<AtomicUsize>,
}

impl Flaky {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: BagOfWords::new(),
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl EmbeddingModel for Flaky {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(ProviderError::RateLimited {
                retry_after: Some(Duration::from_millis(1)),
            });
        }
        self.inner.embed_batch(texts).await
    }
}

/// Lets a test pause a build in the middle of embedding.
#[derive(Debug, Default)]
pub struct Gate {
    armed: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

/// Blocks any batch containing `gated` until the gate is released.
#[derive(Debug, Clone)]
pub struct Gated {
    inner: BagOfWords,
    pub gate: Arc<Gate>,
}

impl Gated {
    pub fn new() -> Self {
        Self {
            inner: BagOfWords::new(),
            gate: Arc::new(Gate::default()),
        }
    }
}

impl EmbeddingModel for Gated {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        let gated = texts.iter().any(|text| text.contains("gated"));
        if gated && self.gate.armed.swap(false, Ordering::SeqCst) {
            self.gate.entered.notify_one();
            self.gate.release.notified().await;
        }
        self.inner.embed_batch(texts).await
    }
}

/// Answers with the references of the passages it was given.
#[derive(Debug, Clone)]
pub struct Echo {
    budget: usize,
}

impl Echo {
    pub const fn new() -> Self {
        Self {
            budget: quarry_core::llm::DEFAULT_CONTEXT_BUDGET,
        }
    }

    pub const fn with_budget(budget: usize) -> Self {
        Self { budget }
    }
}

impl LanguageModel for Echo {
    fn context_budget(&self) -> usize {
        self.budget
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let references: Vec<String> = request
            .passages
            .iter()
            .map(|passage| format!("[{}] {}", passage.label, passage.reference()))
            .collect();
        Ok(format!("{}: {}", request.question, references.join("; ")))
    }
}

/// Always unavailable.
#[derive(Debug, Clone)]
pub struct Broken;

impl LanguageModel for Broken {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable("model overloaded".into()))
    }
}

/// Never answers in time.
#[derive(Debug, Clone)]
pub struct Stalled;

impl LanguageModel for Stalled {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(String::new())
    }
}

/// Directory store whose saves take a while.
#[derive(Debug)]
pub struct SlowStore {
    inner: DirectorySnapshotStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(root: &Path, delay: Duration) -> Self {
        Self {
            inner: DirectorySnapshotStore::new(root),
            delay,
        }
    }
}

impl SnapshotStore for SlowStore {
    fn save(&self, index: &FlatIndex) -> quarry_rag::Result<SnapshotHandle> {
        std::thread::sleep(self.delay);
        self.inner.save(index)
    }

    fn load(&self) -> quarry_rag::Result<Option<Snapshot>> {
        self.inner.load()
    }
}

pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        Self { dir }
    }

    pub fn docs(&self) -> PathBuf {
        self.dir.path().join("docs")
    }

    pub fn index(&self) -> PathBuf {
        self.dir.path().join("index")
    }

    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) {
        fs::write(self.docs().join(name), contents).unwrap();
    }

    pub fn config(&self) -> quarry_rag::RagConfigBuilder {
        RagConfig::builder()
            .index_dir(self.index())
            .source_dir(self.docs())
            .retry(RetryPolicy {
                max_retries: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
                backoff_multiplier: 2.0,
            })
    }
}

/// Every file below `root` with its contents.
pub fn tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let contents = fs::read(&path).unwrap();
                files.insert(path.strip_prefix(root).unwrap().to_path_buf(), contents);
            }
        }
    }
    files
}

/// A PDF with one text line per page.
pub fn pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
