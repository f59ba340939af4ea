//! High-level orchestrator: build snapshots from documents and answer questions.

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use quarry_core::{EmbeddingModel, GenerationRequest, LanguageModel, ProviderError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::context;
use crate::error::{ParseError, RagError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::indexing::{BuildProgress, BuildStage, collect_files, document_id};
use crate::loader::load_document;
use crate::persistence::{DirectorySnapshotStore, Snapshot, SnapshotStore};
use crate::retrieval::{Retriever, embed_with_retry};
use crate::types::{
    Answer, BuildReport, Chunk, Citation, DocumentError, IndexEntry, SearchResult, Upload,
};

/// Lifecycle state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No snapshot exists; questions are rejected.
    Empty,
    /// A build is running. Questions are served from the previous snapshot, if any.
    Building,
    /// A snapshot is live and no build is running.
    Ready,
}

struct PipelineInner<E, G, S> {
    embedder: Arc<E>,
    retriever: Retriever<E>,
    generator: G,
    store: Arc<S>,
    chunker: FixedSizeChunker,
    config: RagConfig,
    current: Arc<RwLock<Option<Arc<Snapshot>>>>,
    building: Arc<AtomicBool>,
}

/// Retrieval-augmented question answering over a document collection.
///
/// The pipeline owns the current [`Snapshot`]. Builds run one at a time and promote a
/// new snapshot with a single pointer swap; questions clone the current snapshot and
/// run without holding any lock, so they are never blocked by a build.
///
/// Cloning is cheap and every clone shares the same state.
///
/// # Example
///
/// ```rust,no_run
/// use quarry_rag::{Pipeline, RagConfig};
/// # use quarry_core::{EmbeddingModel, LanguageModel};
///
/// # async fn run<E: EmbeddingModel, G: LanguageModel>(embedder: E, llm: G) -> quarry_rag::Result<()> {
/// let config = RagConfig::builder().index_dir("./index").build();
/// let pipeline = Pipeline::open(embedder, llm, config).await?;
///
/// let report = pipeline.build_from_directory("./docs").await?;
/// println!("{} chunks from {} documents", report.chunks_created, report.documents_processed);
///
/// let answer = pipeline.ask("How long do refunds take?").await?;
/// for citation in &answer.citations {
///     println!("{} page {:?}", citation.source, citation.page);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, G, S = DirectorySnapshotStore> {
    inner: Arc<PipelineInner<E, G, S>>,
}

impl<E, G, S> Clone for Pipeline<E, G, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, G, S> fmt::Debug for Pipeline<E, G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "snapshot_version",
                &self.inner.current.read().as_ref().map(|s| s.version()),
            )
            .field("building", &self.inner.building.load(Ordering::Acquire))
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Clears the build flag when a build ends, however it ends.
///
/// A save that is already running keeps the guard until it finishes, even if the
/// build future is dropped.
struct BuildGuard(Arc<AtomicBool>);

impl Drop for BuildGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<E, G> Pipeline<E, G, DirectorySnapshotStore>
where
    E: EmbeddingModel,
    G: LanguageModel,
{
    /// Opens a pipeline whose snapshots live in `config.index_dir`.
    ///
    /// An existing snapshot is loaded, so a restarted process is immediately ready.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, an unreadable or corrupt snapshot, or a snapshot
    /// whose dimension differs from the embedder's.
    pub async fn open(embedder: E, generator: G, config: RagConfig) -> Result<Self> {
        let store = DirectorySnapshotStore::new(&config.index_dir)
            .with_retention(config.snapshots_retained);
        Self::with_store(embedder, generator, store, config).await
    }
}

impl<E, G, S> Pipeline<E, G, S>
where
    E: EmbeddingModel,
    G: LanguageModel,
    S: SnapshotStore,
{
    /// Opens a pipeline over a custom snapshot store.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::open`].
    pub async fn with_store(embedder: E, generator: G, store: S, config: RagConfig) -> Result<Self> {
        config.validate()?;
        let chunker = FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?;
        let store = Arc::new(store);

        let loader = Arc::clone(&store);
        let loaded = tokio::task::spawn_blocking(move || loader.load()).await??;
        if let Some(snapshot) = &loaded {
            if snapshot.dimension() != embedder.dim() {
                return Err(RagError::DimensionMismatch {
                    expected: embedder.dim(),
                    actual: snapshot.dimension(),
                });
            }
            info!(
                version = snapshot.version(),
                chunks = snapshot.index().len(),
                "loaded existing snapshot"
            );
        }

        let embedder = Arc::new(embedder);
        Ok(Self {
            inner: Arc::new(PipelineInner {
                retriever: Retriever::new(Arc::clone(&embedder), &config),
                embedder,
                generator,
                store,
                chunker,
                config,
                current: Arc::new(RwLock::new(loaded.map(Arc::new))),
                building: Arc::new(AtomicBool::new(false)),
            }),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        if self.inner.building.load(Ordering::Acquire) {
            PipelineState::Building
        } else if self.inner.current.read().is_some() {
            PipelineState::Ready
        } else {
            PipelineState::Empty
        }
    }

    /// The snapshot questions are currently served from.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.current.read().clone()
    }

    /// Version of the current snapshot.
    #[must_use]
    pub fn snapshot_version(&self) -> Option<u64> {
        self.inner.current.read().as_ref().map(|s| s.version())
    }

    /// The configuration the pipeline was opened with.
    #[must_use]
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Builds a new snapshot from every supported document below `dir`.
    ///
    /// # Errors
    ///
    /// See [`build_from_directory_with_progress`](Self::build_from_directory_with_progress).
    pub async fn build_from_directory(&self, dir: impl AsRef<Path>) -> Result<BuildReport> {
        self.build_from_directory_with_progress(dir, |_| {}).await
    }

    /// Builds a new snapshot from `dir`, reporting progress.
    ///
    /// Documents that fail to parse are recorded in the report and skipped. A build that
    /// yields no chunks at all leaves the current snapshot in place and reports
    /// `success = false`.
    ///
    /// # Errors
    ///
    /// - [`RagError::BuildInProgress`] if another build is running.
    /// - [`RagError::Io`] if `dir` cannot be read.
    /// - [`RagError::Embedding`] or [`RagError::DimensionMismatch`] if embedding fails.
    /// - Persistence errors if the snapshot cannot be written.
    ///
    /// In every error case the previous snapshot stays current and untouched.
    pub async fn build_from_directory_with_progress<F>(
        &self,
        dir: impl AsRef<Path>,
        mut on_progress: F,
    ) -> Result<BuildReport>
    where
        F: FnMut(BuildProgress) + Send,
    {
        let guard = self.begin_build()?;
        self.run_build(
            dir.as_ref().to_path_buf(),
            BuildReport::default(),
            guard,
            &mut on_progress,
        )
        .await
    }

    /// Stores uploaded files in the source directory and rebuilds from it.
    ///
    /// Uploads with invalid names are reported as per-document errors. Valid uploads are
    /// written atomically and join the corpus for every later rebuild.
    ///
    /// # Errors
    ///
    /// As for [`build_from_directory`](Self::build_from_directory), plus I/O errors
    /// while writing uploads.
    pub async fn build_from_uploads(&self, uploads: Vec<Upload>) -> Result<BuildReport> {
        let guard = self.begin_build()?;
        let source_dir = self.inner.config.source_dir.clone();

        let target = source_dir.clone();
        let rejected = tokio::task::spawn_blocking(move || persist_uploads(&target, uploads)).await??;
        let report = BuildReport {
            errors: rejected,
            ..BuildReport::default()
        };
        self.run_build(source_dir, report, guard, &mut |_: BuildProgress| {})
            .await
    }

    /// Retrieves up to `k` passages for `question` from the current snapshot.
    ///
    /// # Errors
    ///
    /// [`RagError::IndexNotReady`] before the first build, or embedding failures.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let snapshot = self.snapshot();
        self.inner
            .retriever
            .retrieve(snapshot.as_deref(), question, k)
            .await
    }

    /// Answers `question` from the `top_k` most relevant passages.
    ///
    /// # Errors
    ///
    /// See [`ask_with_k`](Self::ask_with_k).
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_k(question, self.inner.config.top_k).await
    }

    /// Answers `question` from up to `k` retrieved passages.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyQuestion`] if the question is blank.
    /// - [`RagError::IndexNotReady`] before the first build.
    /// - [`RagError::Embedding`] if the question cannot be embedded.
    /// - [`RagError::Generation`] if the model fails or times out; it carries the
    ///   retrieved citations.
    pub async fn ask_with_k(&self, question: &str, k: usize) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let hits = self.retrieve(question, k).await?;
        let window = context::assemble(&hits, self.inner.generator.context_budget());
        let citations: Vec<Citation> = hits
            .iter()
            .take(window.passages.len())
            .map(Citation::from)
            .collect();
        if window.truncated {
            debug!(budget = self.inner.generator.context_budget(), "top passage truncated");
        }

        let request = GenerationRequest::new(question, window.passages);
        let deadline = self.inner.config.generation_timeout;
        let text = tokio::time::timeout(deadline, self.inner.generator.generate(&request))
            .await
            .unwrap_or_else(|_| Err(ProviderError::Timeout(deadline)))
            .map_err(|source| {
                warn!(error = %source, "generation failed");
                RagError::Generation {
                    source,
                    citations: hits.iter().map(Citation::from).collect(),
                }
            })?;

        debug!(
            passages = citations.len(),
            dropped = window.dropped,
            truncated = window.truncated,
            "answer generated"
        );
        Ok(Answer {
            text,
            citations,
            context_truncated: window.truncated,
            dropped_passages: window.dropped,
        })
    }

    fn begin_build(&self) -> Result<BuildGuard> {
        self.inner
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RagError::BuildInProgress)?;
        Ok(BuildGuard(Arc::clone(&self.inner.building)))
    }

    async fn run_build<F>(
        &self,
        root: PathBuf,
        mut report: BuildReport,
        guard: BuildGuard,
        on_progress: &mut F,
    ) -> Result<BuildReport>
    where
        F: FnMut(BuildProgress) + Send,
    {
        on_progress(BuildProgress::new(0, 0, None, BuildStage::Scanning));
        let scan_root = root.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&scan_root)).await??;
        let total = files.len();
        info!(root = %root.display(), documents = total, "build started");

        let mut index = FlatIndex::new(self.inner.embedder.dim());
        for (position, path) in files.into_iter().enumerate() {
            let id = document_id(&root, &path);
            on_progress(BuildProgress::new(
                position,
                total,
                Some(id.clone()),
                BuildStage::Parsing,
            ));

            let doc_id = id.clone();
            let loaded = tokio::task::spawn_blocking(move || load_document(&path, doc_id)).await?;
            let document = match loaded {
                Ok(document) => document,
                Err(err) => {
                    warn!(source = %id, error = %err, "skipping document");
                    on_progress(BuildProgress::new(
                        position + 1,
                        total,
                        Some(id.clone()),
                        BuildStage::Skipped {
                            reason: err.to_string(),
                        },
                    ));
                    report.errors.push(DocumentError {
                        source: id,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            report.documents_processed += 1;

            if document.is_blank() {
                on_progress(BuildProgress::new(
                    position + 1,
                    total,
                    Some(id.clone()),
                    BuildStage::Skipped {
                        reason: "no extractable text".into(),
                    },
                ));
                report.empty_documents.push(id);
                continue;
            }

            let chunks = self.inner.chunker.chunk(&document);
            debug!(source = %id, pages = document.pages.len(), chunks = chunks.len(), "chunked document");
            report.chunks_created += chunks.len();
            self.embed_into(&mut index, chunks, |done, of| {
                on_progress(BuildProgress::new(
                    position,
                    total,
                    Some(id.clone()),
                    BuildStage::Embedding { done, total: of },
                ));
            })
            .await?;
            on_progress(BuildProgress::new(
                position + 1,
                total,
                Some(id),
                BuildStage::Indexing,
            ));
        }

        if report.chunks_created == 0 {
            warn!(
                documents = report.documents_processed,
                errors = report.errors.len(),
                "build produced no chunks; keeping the current snapshot"
            );
            on_progress(BuildProgress::new(total, total, None, BuildStage::Done));
            return Ok(report);
        }

        on_progress(BuildProgress::new(total, total, None, BuildStage::Saving));
        let store = Arc::clone(&self.inner.store);
        let current = Arc::clone(&self.inner.current);
        // Saving and promotion finish together even if this future is dropped.
        let handle = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let handle = store.save(&index)?;
            *current.write() = Some(Arc::new(Snapshot::new(
                handle.version,
                handle.built_at,
                index,
            )));
            Ok::<_, RagError>(handle)
        })
        .await??;

        info!(
            version = handle.version,
            documents = report.documents_processed,
            chunks = report.chunks_created,
            errors = report.errors.len(),
            "snapshot promoted"
        );

        report.success = true;
        report.snapshot_version = Some(handle.version);
        on_progress(BuildProgress::new(total, total, None, BuildStage::Done));
        Ok(report)
    }

    /// Embeds `chunks` batch by batch and appends them to `index`.
    async fn embed_into(
        &self,
        index: &mut FlatIndex,
        chunks: Vec<Chunk>,
        mut on_batch: impl FnMut(usize, usize) + Send,
    ) -> Result<()> {
        let config = &self.inner.config;
        let total = chunks.len();
        let mut done = 0;
        let mut pending = chunks.into_iter();
        loop {
            let batch: Vec<Chunk> = pending.by_ref().take(config.embed_batch_size).collect();
            if batch.is_empty() {
                return Ok(());
            }
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = embed_with_retry(
                self.inner.embedder.as_ref(),
                &texts,
                config.embed_timeout,
                &config.retry,
            )
            .await
            .map_err(RagError::Embedding)?;

            done += batch.len();
            index.add(batch.into_iter().zip(vectors).map(|(c, v)| IndexEntry::new(c, v)).collect())?;
            on_batch(done, total);
        }
    }
}

/// Checks that an upload name is a bare, visible file name.
fn validate_upload_name(name: &str) -> std::result::Result<(), ParseError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().is_some_and(|f| f == name);
    if valid {
        Ok(())
    } else {
        Err(ParseError::InvalidName(name.to_owned()))
    }
}

/// Writes valid uploads into `dir`, returning errors for the rejected ones.
fn persist_uploads(dir: &Path, uploads: Vec<Upload>) -> Result<Vec<DocumentError>> {
    fs::create_dir_all(dir).map_err(|e| RagError::persistence(dir, e))?;
    let mut rejected = Vec::new();
    for upload in uploads {
        if let Err(err) = validate_upload_name(&upload.name) {
            warn!(name = %upload.name, "rejecting upload");
            rejected.push(DocumentError {
                message: err.to_string(),
                source: upload.name,
            });
            continue;
        }

        // Hidden while partial, so a concurrent scan never picks it up.
        let partial = dir.join(format!(".{}.partial", upload.name));
        let target = dir.join(&upload.name);
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&partial)?;
            file.write_all(&upload.bytes)?;
            file.sync_all()?;
            fs::rename(&partial, &target)
        };
        write().map_err(|e| RagError::persistence(&target, e))?;
        debug!(name = %upload.name, bytes = upload.bytes.len(), "stored upload");
    }
    Ok(rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_names_must_be_bare() {
        for good in ["handbook.pdf", "notes v2.txt", "ünïcode.md"] {
            assert!(validate_upload_name(good).is_ok(), "{good}");
        }
        for bad in ["", ".", "..", ".env", "../escape.txt", "dir/file.txt", "c:\\x.txt", "nul\0.txt"] {
            assert!(
                matches!(validate_upload_name(bad), Err(ParseError::InvalidName(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn uploads_are_written_and_invalid_ones_reported() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        let rejected = persist_uploads(
            &docs,
            vec![
                Upload::new("faq.txt", "Shipping is free."),
                Upload::new("../evil.txt", "nope"),
            ],
        )
        .unwrap();

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].source, "../evil.txt");
        assert_eq!(fs::read_to_string(docs.join("faq.txt")).unwrap(), "Shipping is free.");
        assert!(!dir.path().join("evil.txt").exists());
        assert_eq!(fs::read_dir(&docs).unwrap().count(), 1);
    }
}
