//! # Grounded Generation
//!
//! A [`LanguageModel`] answers a question using only the context passages it is given.
//! The retrieval pipeline decides which passages go in, in which order, and how much text
//! fits; the model only has to turn a [`GenerationRequest`] into an answer.
//!
//! Providers that speak a chat API can build their payload from
//! [`GenerationRequest::render_prompt`], which numbers each passage and names its source so
//! the model can cite it.
//!
//! ```rust
//! use quarry_core::llm::{GenerationRequest, Passage};
//!
//! let request = GenerationRequest::new(
//!     "How long do refunds take?",
//!     vec![Passage::new(1, "policy.pdf", Some(2), "Refunds are processed within 14 days.")],
//! );
//! let prompt = request.render_prompt();
//! assert!(prompt.contains("[1] policy.pdf, page 2"));
//! ```

use core::fmt::Write as _;
use core::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Context budget assumed for models that do not report their own, in characters.
pub const DEFAULT_CONTEXT_BUDGET: usize = 12_000;

const SYSTEM_INSTRUCTIONS: &str = "You answer questions about a private document collection. \
Use only the numbered context passages below. Cite passages by their number, for example [1]. \
If the passages do not contain the answer, say that the documents do not cover it.";

/// One retrieved fragment handed to the model as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// 1-based position in retrieval order; the number the model cites.
    pub label: usize,
    /// Identifier of the document the passage came from.
    pub source: String,
    /// Page the passage starts on, for paginated documents.
    pub page: Option<u32>,
    /// Passage text.
    pub text: String,
    /// Whether the text was cut to fit the context budget.
    pub truncated: bool,
}

impl Passage {
    /// Creates an untruncated passage.
    #[must_use]
    pub fn new(
        label: usize,
        source: impl Into<String>,
        page: Option<u32>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            label,
            source: source.into(),
            page,
            text: text.into(),
            truncated: false,
        }
    }

    /// Human-readable reference, e.g. `handbook.pdf, page 2`.
    #[must_use]
    pub fn reference(&self) -> String {
        match self.page {
            Some(page) => format!("{}, page {page}", self.source),
            None => self.source.clone(),
        }
    }
}

/// Question plus ordered context passages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user's question.
    pub question: String,
    /// Context passages, highest-ranked first.
    pub passages: Vec<Passage>,
}

impl GenerationRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(question: impl Into<String>, passages: Vec<Passage>) -> Self {
        Self {
            question: question.into(),
            passages,
        }
    }

    /// System instructions for grounded answering.
    #[must_use]
    pub const fn system_instructions() -> &'static str {
        SYSTEM_INSTRUCTIONS
    }

    /// Renders the user turn: numbered passages followed by the question.
    #[must_use]
    pub fn render_prompt(&self) -> String {
        let mut prompt = String::from("CONTEXT:\n");
        if self.passages.is_empty() {
            prompt.push_str("(no passages were retrieved)\n");
        }
        for passage in &self.passages {
            let _ = write!(prompt, "\n[{}] {}", passage.label, passage.reference());
            if passage.truncated {
                prompt.push_str(" (truncated)");
            }
            let _ = write!(prompt, "\n{}\n", passage.text);
        }
        let _ = write!(prompt, "\nQUESTION: {}\n", self.question);
        prompt
    }
}

/// Language models that produce grounded answers.
pub trait LanguageModel: Send + Sync {
    /// Maximum amount of passage text, in characters, the model accepts per request.
    fn context_budget(&self) -> usize {
        DEFAULT_CONTEXT_BUDGET
    }

    /// Generates an answer for the request.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    impl LanguageModel for EchoModel {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            request
                .passages
                .first()
                .map(|p| p.text.clone())
                .ok_or_else(|| ProviderError::InvalidResponse("nothing to echo".into()))
        }
    }

    #[test]
    fn prompt_numbers_passages_in_order() {
        let request = GenerationRequest::new(
            "What is covered?",
            vec![
                Passage::new(1, "a.txt", None, "alpha"),
                Passage::new(2, "b.pdf", Some(3), "beta"),
            ],
        );
        let prompt = request.render_prompt();

        let first = prompt.find("[1] a.txt").unwrap();
        let second = prompt.find("[2] b.pdf, page 3").unwrap();
        assert!(first < second);
        assert!(prompt.ends_with("QUESTION: What is covered?\n"));
    }

    #[test]
    fn prompt_marks_truncation_and_empty_context() {
        let mut passage = Passage::new(1, "long.txt", None, "cut");
        passage.truncated = true;
        let prompt = GenerationRequest::new("q", vec![passage]).render_prompt();
        assert!(prompt.contains("[1] long.txt (truncated)"));

        let empty = GenerationRequest::new("q", Vec::new()).render_prompt();
        assert!(empty.contains("no passages were retrieved"));
    }

    #[tokio::test]
    async fn default_budget_and_generation() {
        let model = EchoModel;
        assert_eq!(model.context_budget(), DEFAULT_CONTEXT_BUDGET);

        let request = GenerationRequest::new("q", vec![Passage::new(1, "s", None, "answer")]);
        assert_eq!(model.generate(&request).await.unwrap(), "answer");
        assert!(
            model
                .generate(&GenerationRequest::new("q", Vec::new()))
                .await
                .is_err()
        );
    }
}
