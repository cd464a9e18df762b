//! 向量距离。所有距离都满足“越小越相似”，完全相同时为 0。

use serde::{Deserialize, Serialize};

/// 向量字段声明的距离度量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// 余弦距离 `1 - cos(a, b)`，范围 [0, 2]
    Cosine,
    /// 直方图交集距离 `1 - Σ min(a_i, b_i)`，范围 [0, 1]
    Intersection,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Intersection => "intersection",
        }
    }

    /// 调用前需要保证 a 和 b 长度一致
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_distance(a, b),
            Self::Intersection => intersection_distance(a, b),
        }
    }
}

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}

/// 余弦相似度，任一向量为零向量时返回 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let n = norm(a) * norm(b);
    if n == 0. {
        return 0.;
    }
    (dot(a, b) / n).clamp(-1., 1.)
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1. - cosine_similarity(a, b)
}

/// 直方图交集，两个概率分布完全相同时为 1
pub fn histogram_intersection(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x.min(*y)).sum()
}

pub fn intersection_distance(a: &[f32], b: &[f32]) -> f32 {
    (1. - histogram_intersection(a, b)).max(0.)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identity() {
        let v = [0.3, -1.2, 4.0, 0.01];
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let v = [1.0, 2.0, 3.0];
        let n = [-1.0, -2.0, -3.0];
        assert!((cosine_distance(&v, &n) - 2.).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_distance(&[0., 0.], &[1., 0.]), 1.);
    }

    #[test]
    fn test_cosine_scale_invariant() {
        let a = [1.0, 2.0, 2.0];
        let b = [10.0, 20.0, 20.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_intersection() {
        let a = [0.5, 0.5, 0.0];
        let b = [0.0, 0.5, 0.5];
        assert!((histogram_intersection(&a, &b) - 0.5).abs() < 1e-6);
        assert!((intersection_distance(&a, &b) - 0.5).abs() < 1e-6);
        assert_eq!(intersection_distance(&a, &a), 0.);
        assert_eq!(intersection_distance(&[1., 0.], &[0., 1.]), 1.);
    }
}
