//! On-disk encodings of a snapshot's three files.

use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{from_bytes, to_bytes};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{RagError, Result};

pub(super) const FORMAT_VERSION: u32 = 1;

/// Flat vector array, archived with rkyv.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
struct VectorBlock {
    dimension: u32,
    values: Vec<f32>,
}

pub(super) fn encode_vectors(dimension: usize, values: &[f32]) -> Result<Vec<u8>> {
    let block = VectorBlock {
        dimension: u32::try_from(dimension)
            .map_err(|_| RagError::Serialization(format!("dimension {dimension} too large")))?,
        values: values.to_vec(),
    };
    let bytes =
        to_bytes::<RkyvError>(&block).map_err(|e| RagError::Serialization(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Decodes `(dimension, values)`.
pub(super) fn decode_vectors(bytes: &[u8]) -> Result<(usize, Vec<f32>)> {
    // Archived data must be aligned; a plain `Vec<u8>` read from disk is not.
    let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    let block = from_bytes::<VectorBlock, RkyvError>(&aligned)
        .map_err(|e| RagError::Serialization(e.to_string()))?;
    Ok((block.dimension as usize, block.values))
}

pub(super) fn checksum(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct Manifest {
    pub format_version: u32,
    pub version: u64,
    /// RFC 3339 timestamp.
    pub built_at: String,
    pub dimension: usize,
    pub count: usize,
    pub vectors_checksum: u64,
    pub chunks_checksum: u64,
}

pub(super) fn format_timestamp(at: OffsetDateTime) -> Result<String> {
    at.format(&Rfc3339)
        .map_err(|e| RagError::Serialization(e.to_string()))
}

pub(super) fn parse_timestamp(text: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339).map_err(|e| RagError::Serialization(e.to_string()))
}
