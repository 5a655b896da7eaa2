//! Dense vector helpers shared by the embedder and its callers.

/// L2-normalize a vector in place.
///
/// The squared sum is accumulated in `f64` so 768-wide vectors do not lose
/// precision. A vector whose squared sum is non-positive or non-finite is
/// left untouched.
pub fn l2_normalize_in_place(vec: &mut [f32]) {
    let sum_sq: f64 = vec.iter().map(|&v| f64::from(v) * f64::from(v)).sum();
    if sum_sq <= 0.0 || !sum_sq.is_finite() {
        return;
    }

    let norm = sum_sq.sqrt();
    for v in vec.iter_mut() {
        *v = (f64::from(*v) / norm) as f32;
    }
}

/// Euclidean norm of a vector, accumulated in `f64`.
#[must_use]
pub fn l2_norm(vec: &[f32]) -> f64 {
    vec.iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity of two vectors.
///
/// Returns `0.0` for empty or mismatched inputs and when either side has
/// zero norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }

    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
