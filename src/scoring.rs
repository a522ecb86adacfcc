//! Score fusion and deterministic ordering shared by both engines

use std::cmp::Ordering;

/// Clamp a score to [0, 1]. Non-finite scores collapse to 0.0.
pub fn clamp_unit(x: f32) -> f32 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Convex combination of two optional scores; an absent score counts as 0.0.
pub fn fuse(a: Option<f32>, b: Option<f32>, weight: f32) -> f32 {
    let a = a.unwrap_or(0.0);
    let b = b.unwrap_or(0.0);
    clamp_unit(weight * a + (1.0 - weight) * b)
}

/// Ranking order: score descending, then name ascending.
///
/// Scores are compared with `total_cmp` so the order is total even if a
/// NaN slipped through.
pub fn rank_order(score_a: f32, name_a: &str, score_b: f32, name_b: &str) -> Ordering {
    score_b.total_cmp(&score_a).then_with(|| name_a.cmp(name_b))
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON || !norm.is_finite() {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Cosine similarity for embeddings (assumes unit-normalized vectors)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_treats_absent_as_zero() {
        assert!((fuse(None, Some(0.6), 0.9) - 0.06).abs() < 1e-6);
        assert!((fuse(Some(0.95), None, 0.9) - 0.855).abs() < 1e-6);
        assert_eq!(fuse(None, None, 0.5), 0.0);
    }

    #[test]
    fn test_fuse_clamps() {
        assert_eq!(fuse(Some(3.0), Some(2.0), 0.5), 1.0);
        assert_eq!(fuse(Some(-1.0), None, 1.0), 0.0);
    }

    #[test]
    fn test_rank_order_breaks_ties_by_name() {
        let mut items = vec![(0.8, "walnut"), (0.9, "pecan"), (0.8, "almond")];
        items.sort_by(|a, b| rank_order(a.0, a.1, b.0, b.1));
        let names: Vec<&str> = items.iter().map(|(_, n)| *n).collect();
        assert_eq!(names, vec!["pecan", "almond", "walnut"]);
    }

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_clamp_unit_non_finite() {
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert_eq!(clamp_unit(f32::INFINITY), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
    }
}
