//! Embedding similarity scoring.
//!
//! Cosine similarity normalized from `[-1, 1]` onto a `[0, 100]` percentage.

use crate::error::SimilarityError;

/// Raw cosine similarity in `[-1, 1]`.
///
/// # Panics
///
/// Panics if the vectors differ in length or are empty. Callers holding
/// vectors of unknown provenance must check dimensions first.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    assert_eq!(
        a.len(),
        b.len(),
        "similarity requires vectors of equal length"
    );
    assert!(!a.is_empty(), "similarity requires non-empty vectors");

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if !(dot.is_finite() && norm_a.is_finite() && norm_b.is_finite()) {
        return Err(SimilarityError::NonFinite);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return Err(SimilarityError::ZeroMagnitude);
    }

    // Rounding can push the ratio a hair outside the closed interval.
    Ok((dot / denom).clamp(-1.0, 1.0))
}

/// Similarity of two embeddings as a percentage in `[0, 100]`.
///
/// Identical directions score 100, opposite directions score 0 and
/// orthogonal vectors score 50.
pub fn similarity(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    let raw = cosine(a, b)?;
    Ok((raw + 1.0) / 2.0 * 100.0)
}
