//! Fitting retrieved passages into a model's context budget.

use quarry_core::Passage;

use crate::types::SearchResult;

/// Passages selected for one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Passages in retrieval order.
    pub passages: Vec<Passage>,
    /// Retrieved passages that did not fit.
    pub dropped: usize,
    /// Whether the top passage was cut to fit.
    pub truncated: bool,
}

/// Selects passages from `hits` (best first) whose combined length fits `budget` chars.
///
/// Passages are taken in rank order until the next one would overflow the budget;
/// it and everything ranked below it are dropped. A passage is never cut, except when
/// the top-ranked one alone exceeds the budget: it is then truncated to the budget and
/// the window is flagged as truncated.
#[must_use]
pub fn assemble(hits: &[SearchResult], budget: usize) -> ContextWindow {
    let mut passages = Vec::new();
    let mut used = 0;
    for (rank, hit) in hits.iter().enumerate() {
        let len = hit.chunk.text.chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        passages.push(passage(rank, hit, hit.chunk.text.clone()));
    }

    let mut truncated = false;
    if passages.is_empty() {
        if let Some(top) = hits.first() {
            let text: String = top.chunk.text.chars().take(budget).collect();
            let mut cut = passage(0, top, text);
            cut.truncated = true;
            passages.push(cut);
            truncated = true;
        }
    }

    ContextWindow {
        dropped: hits.len() - passages.len(),
        passages,
        truncated,
    }
}

fn passage(rank: usize, hit: &SearchResult, text: String) -> Passage {
    Passage::new(rank + 1, hit.chunk.source.clone(), hit.chunk.page, text)
}
