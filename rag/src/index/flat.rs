//! Exact cosine-similarity index over a flat vector array.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::error::{RagError, Result};
use crate::types::{Chunk, IndexEntry, SearchResult};

use super::VectorIndex;

/// Exact nearest-neighbour index.
///
/// Vectors are stored back to back in one `Vec<f32>` with their norms precomputed,
/// and every search scores all entries with a parallel iterator. That stays fast well
/// into hundreds of thousands of chunks without an approximate structure.
///
/// # Example
///
/// ```rust
/// use quarry_rag::index::{FlatIndex, VectorIndex};
/// use quarry_rag::{Chunk, IndexEntry};
///
/// let mut index = FlatIndex::new(2);
/// let chunk = Chunk {
///     text: "hello".into(),
///     source: "a.txt".into(),
///     page: None,
///     index: 0,
///     start: 0,
///     len: 5,
/// };
/// index.add(vec![IndexEntry::new(chunk, vec![1.0, 0.0])]).unwrap();
/// let hits = index.search(&[1.0, 0.0], 3).unwrap();
/// assert_eq!(hits.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
    norms: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of `dimension` components.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            norms: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Rebuilds an index from its stored parts.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if `vectors` does not hold exactly one
    /// `dimension`-sized vector per chunk.
    pub fn from_parts(dimension: usize, vectors: Vec<f32>, chunks: Vec<Chunk>) -> Result<Self> {
        let expected = dimension * chunks.len();
        if vectors.len() != expected {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: vectors.len(),
            });
        }
        let norms = if dimension == 0 {
            vec![0.0; chunks.len()]
        } else {
            vectors.chunks_exact(dimension).map(norm).collect()
        };
        Ok(Self {
            dimension,
            vectors,
            norms,
            chunks,
        })
    }

    /// All vectors, back to back in insertion order.
    #[must_use]
    pub fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// Chunk metadata in insertion order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn vector(&self, position: usize) -> &[f32] {
        &self.vectors[position * self.dimension..(position + 1) * self.dimension]
    }
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(lhs, rhs)| lhs * rhs).sum()
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
        if let Some(bad) = entries
            .iter()
            .find(|entry| entry.embedding.len() != self.dimension)
        {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.embedding.len(),
            });
        }

        self.vectors.reserve(entries.len() * self.dimension);
        for entry in entries {
            self.norms.push(norm(&entry.embedding));
            self.vectors.extend_from_slice(&entry.embedding);
            self.chunks.push(entry.chunk);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_norm = norm(query);
        let mut scored: Vec<(usize, f32)> = (0..self.chunks.len())
            .into_par_iter()
            .map(|position| {
                let denominator = self.norms[position] * query_norm;
                let score = if denominator == 0.0 {
                    0.0
                } else {
                    dot(self.vector(position), query) / denominator
                };
                (position, score)
            })
            .collect();

        scored.par_sort_unstable_by_key(|&(position, score)| (Reverse(OrderedFloat(score)), position));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchResult {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize) -> Chunk {
        Chunk {
            text: format!("chunk {index}"),
            source: "doc".into(),
            page: None,
            index,
            start: 0,
            len: 7,
        }
    }

    fn index_of(vectors: &[[f32; 3]]) -> FlatIndex {
        let mut index = FlatIndex::new(3);
        index
            .add(
                vectors
                    .iter()
                    .enumerate()
                    .map(|(i, v)| IndexEntry::new(chunk(i), v.to_vec()))
                    .collect(),
            )
            .unwrap();
        index
    }

    #[test]
    fn empty_index_and_zero_k_return_nothing() {
        let empty = FlatIndex::new(3);
        assert!(empty.is_empty());
        assert!(empty.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());

        let index = index_of(&[[1.0, 0.0, 0.0]]);
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn nothing_to_rank_ignores_query_dimension() {
        assert!(FlatIndex::new(3).search(&[1.0, 0.0], 4).unwrap().is_empty());

        let index = index_of(&[[1.0, 0.0, 0.0]]);
        assert!(index.search(&[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn returns_min_k_n_results_in_score_order() {
        let index = index_of(&[
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.7, 0.7, 0.0],
            [-1.0, 0.0, 0.0],
        ]);

        let hits = index.search(&[1.0, 0.1, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk.index, 1);
        assert_eq!(hits[1].chunk.index, 2);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

        assert_eq!(index.search(&[1.0, 0.1, 0.0], 100).unwrap().len(), 4);
    }

    #[test]
    fn ties_go_to_earlier_insertion() {
        let index = index_of(&[[0.0, 1.0, 0.0], [2.0, 0.0, 0.0], [1.0, 0.0, 0.0], [3.0, 0.0, 0.0]]);
        let hits = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        let order: Vec<_> = hits.iter().map(|h| h.chunk.index).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn zero_vectors_score_zero() {
        let index = index_of(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0, 0.0], 2).unwrap();
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn rejected_batch_leaves_index_untouched() {
        let mut index = index_of(&[[1.0, 0.0, 0.0]]);
        let err = index
            .add(vec![
                IndexEntry::new(chunk(1), vec![0.0, 1.0, 0.0]),
                IndexEntry::new(chunk(2), vec![0.0, 1.0]),
            ])
            .unwrap_err();

        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(index.len(), 1);
        assert_eq!(index.vectors().len(), 3);
    }

    #[test]
    fn wrong_query_dimension_is_rejected() {
        let index = index_of(&[[1.0, 0.0, 0.0]]);
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(RagError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn parts_round_trip() {
        let index = index_of(&[[1.0, 2.0, 3.0], [0.5, 0.0, -1.0]]);
        let rebuilt =
            FlatIndex::from_parts(3, index.vectors().to_vec(), index.chunks().to_vec()).unwrap();
        assert_eq!(rebuilt, index);

        assert!(FlatIndex::from_parts(3, vec![1.0; 5], index.chunks().to_vec()).is_err());
    }
}
