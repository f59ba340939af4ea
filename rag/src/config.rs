//! Configuration for the retrieval pipeline.

use std::path::PathBuf;
use std::time::Duration;

use quarry_core::ProviderError;

use crate::error::{RagError, Result};

/// Backoff policy for transient provider failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }

    /// Delay before retrying after `err`, honouring a provider-supplied `retry_after`.
    #[must_use]
    pub fn delay_for(&self, err: &ProviderError, attempt: u32) -> Duration {
        err.retry_after().map_or_else(
            || self.delay_for_attempt(attempt),
            |delay| delay.min(self.max_delay),
        )
    }
}

/// Configuration for a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    /// Directory holding index snapshots.
    pub index_dir: PathBuf,
    /// Directory uploads are written to; rebuilt by `build_from_uploads`.
    pub source_dir: PathBuf,
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks of a page.
    pub chunk_overlap: usize,
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Hits scoring below this cosine similarity are discarded. Off when `None`.
    pub similarity_threshold: Option<f32>,
    /// Number of chunks sent to the embedding provider per call.
    pub embed_batch_size: usize,
    /// Deadline for one embedding call.
    pub embed_timeout: Duration,
    /// Deadline for one generation call.
    pub generation_timeout: Duration,
    /// Retry policy for transient embedding failures.
    pub retry: RetryPolicy,
    /// Number of snapshots kept on disk. Values below 2 are raised to 2.
    pub snapshots_retained: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("./quarry_index"),
            source_dir: PathBuf::from("./documents"),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            similarity_threshold: None,
            embed_batch_size: 32,
            embed_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            snapshots_retained: 3,
        }
    }
}

impl RagConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::new()
    }

    /// Checks that the settings are usable together.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] describing the first inconsistent setting.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be positive".into()));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::Config("embed_batch_size must be positive".into()));
        }
        if self.embed_timeout.is_zero() || self.generation_timeout.is_zero() {
            return Err(RagError::Config("provider timeouts must be non-zero".into()));
        }
        if let Some(threshold) = self.similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(RagError::Config(format!(
                    "similarity_threshold {threshold} is outside [-1, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`RagConfig`].
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
        }
    }

    /// Sets the snapshot directory.
    #[must_use]
    pub fn index_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_dir = path.into();
        self
    }

    /// Sets the upload directory.
    #[must_use]
    pub fn source_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_dir = path.into();
        self
    }

    /// Sets the target chunk length in characters.
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Sets the overlap between consecutive chunks.
    #[must_use]
    pub const fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Sets the number of passages retrieved per question.
    #[must_use]
    pub const fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Sets the minimum similarity score for retrieved passages.
    #[must_use]
    pub const fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Sets the embedding batch size.
    #[must_use]
    pub const fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Sets the deadline for one embedding call.
    #[must_use]
    pub const fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout = timeout;
        self
    }

    /// Sets the deadline for one generation call.
    #[must_use]
    pub const fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    /// Sets the retry policy for transient embedding failures.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Disables retries.
    #[must_use]
    pub fn no_retry(mut self) -> Self {
        self.config.retry = RetryPolicy::none();
        self
    }

    /// Sets how many snapshots are kept on disk.
    #[must_use]
    pub const fn snapshots_retained(mut self, count: usize) -> Self {
        self.config.snapshots_retained = count;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RagConfig {
        self.config
    }
}
