//! Brute-force dense vector search over stored reference embeddings.
//!
//! Vectors are stored unit-normalized, so cosine similarity is a plain dot
//! product. Scoring runs in one pass over all rows with `wide` SIMD lanes;
//! only the top `k` are sorted.

use std::time::Instant;

use tracing::{debug, warn};
use wide::f32x8;

use crate::error::{Result, ShelfError};
use crate::model::SemanticHit;
use crate::storage::Database;

/// Matches below this similarity are treated as noise and dropped.
pub const MIN_SIMILARITY: f32 = 0.1;

/// Read-only view of the embedding table.
pub struct VectorIndex<'a> {
    db: &'a Database,
}

impl<'a> VectorIndex<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// References most similar to `query`, best first.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SemanticHit>> {
        if limit == 0 || query.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();

        let rows = self.db.all_embeddings()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(rows.len());
        let mut scores = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for (rec_number, vector) in &rows {
            if vector.len() != query.len() {
                skipped += 1;
                continue;
            }
            ids.push(*rec_number);
            scores.push(dot(query, vector));
        }
        if skipped > 0 {
            warn!(
                skipped,
                expected_dims = query.len(),
                "skipped embeddings with mismatched dimension"
            );
        }

        let mut hits = Vec::new();
        for (idx, similarity) in top_k(&scores, limit) {
            if similarity < MIN_SIMILARITY {
                break;
            }
            if let Some(reference) = self.db.get_reference(ids[idx])? {
                hits.push(SemanticHit {
                    summary: reference.summary(),
                    similarity,
                });
            }
        }

        debug!(
            candidates = scores.len(),
            hits = hits.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "vector search"
        );
        Ok(hits)
    }

    /// Neighbours of a reference by its own stored vector, excluding itself.
    /// Unknown references and references without a vector give no results.
    pub fn find_related(&self, rec_number: i64, limit: usize) -> Result<Vec<SemanticHit>> {
        let Some(seed) = self.db.get_embedding(rec_number)? else {
            return Ok(Vec::new());
        };
        let mut hits = self.search(&seed, limit.saturating_add(1))?;
        hits.retain(|hit| hit.summary.rec_number != rec_number);
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Indices and scores of the `k` largest scores, descending.
///
/// Partitions with `select_nth_unstable_by` and sorts only the kept prefix.
/// Equal scores order by index so results are stable across runs.
#[must_use]
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    let by_score_desc =
        |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));

    if k == 0 {
        return Vec::new();
    }
    if k < ranked.len() {
        ranked.select_nth_unstable_by(k - 1, by_score_desc);
        ranked.truncate(k);
    }
    ranked.sort_unstable_by(by_score_desc);
    ranked
}

/// Dot product in 8-lane SIMD chunks plus a scalar tail.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let mut acc = f32x8::splat(0.0);
    let mut chunks_a = a.chunks_exact(8);
    let mut chunks_b = b.chunks_exact(8);
    for (ca, cb) in chunks_a.by_ref().zip(chunks_b.by_ref()) {
        let va = f32x8::from(lanes(ca));
        let vb = f32x8::from(lanes(cb));
        acc = acc + va * vb;
    }
    let tail: f32 = chunks_a
        .remainder()
        .iter()
        .zip(chunks_b.remainder())
        .map(|(x, y)| x * y)
        .sum();
    acc.to_array().iter().sum::<f32>() + tail
}

fn lanes(chunk: &[f32]) -> [f32; 8] {
    let mut out = [0.0f32; 8];
    out.copy_from_slice(chunk);
    out
}

/// Cosine similarity of two unit vectors; 0 when the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    dot(a, b)
}

/// Scale `v` to unit length in place. Returns false (leaving `v` untouched)
/// for empty or all-zero vectors.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm = dot(v, v).sqrt();
    if v.is_empty() || norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Little-endian `f32` blob.
#[must_use]
pub fn encode_vector(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(ShelfError::Serialization(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
