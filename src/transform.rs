//! 反向查询（antipode）使用的向量变换，全部为纯函数

use crate::color::HISTOGRAM_BINS;
use crate::error::{Result, SearchError, check_dimension};
use crate::hsl::Rgb;

/// 所有分量取反，`negate(negate(v)) == v`
pub fn negate(v: &[f32]) -> Vec<f32> {
    v.iter().map(|x| -x).collect()
}

/// 以 c 为中心做点反射 `2c - v`，中心固定时反射两次回到原向量
pub fn reflect(v: &[f32], centroid: &[f32]) -> Result<Vec<f32>> {
    check_dimension(centroid.len(), v.len())?;
    Ok(v.iter().zip(centroid).map(|(x, c)| 2. * c - x).collect())
}

/// 计算一组向量的分量均值，所有向量长度必须为 dim
pub fn centroid<'a, I>(vectors: I, dim: usize) -> Result<Option<Vec<f32>>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum = vec![0f64; dim];
    let mut n = 0usize;
    for v in vectors {
        check_dimension(dim, v.len())?;
        for (s, x) in sum.iter_mut().zip(v) {
            *s += *x as f64;
        }
        n += 1;
    }
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(sum.into_iter().map(|s| (s / n as f64) as f32).collect()))
}

/// 归一化为概率分布，总和为 0 时退化为均匀分布
fn renormalize(mut hist: Vec<f32>) -> Vec<f32> {
    let total = hist.iter().map(|&v| v as f64).sum::<f64>();
    if total <= 0. {
        return vec![1. / hist.len() as f32; hist.len()];
    }
    for v in hist.iter_mut() {
        *v = (*v as f64 / total) as f32;
    }
    hist
}

fn check_histogram(hist: &[f32]) -> Result<()> {
    check_dimension(HISTOGRAM_BINS, hist.len())?;
    if hist.iter().any(|v| !v.is_finite() || *v < 0.) {
        return Err(SearchError::InvalidArgument("直方图包含负数或非法值".to_string()));
    }
    Ok(())
}

/// 直方图反转：以峰值为基准，原本占比越低的分桶得到越高的权重
pub fn invert_histogram(hist: &[f32]) -> Result<Vec<f32>> {
    check_histogram(hist)?;
    let peak = hist.iter().copied().fold(0f32, f32::max);
    Ok(renormalize(hist.iter().map(|&v| peak - v).collect()))
}

/// 负空间：在概率空间中关于均匀分布取对称 `2/64 - h`，负数截断为 0
pub fn negative_space(hist: &[f32]) -> Result<Vec<f32>> {
    check_histogram(hist)?;
    let uniform = 1. / HISTOGRAM_BINS as f32;
    Ok(renormalize(hist.iter().map(|&v| (2. * uniform - v).max(0.)).collect()))
}

/// 互补色：色相旋转 180°
pub fn complementary(color: Rgb) -> Rgb {
    color.to_hsl().complementary().to_rgb()
}

/// 亮度反转：反转亮度与饱和度，保留色相
pub fn invert_lightness(color: Rgb) -> Rgb {
    color.to_hsl().invert_lightness().to_rgb()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_vec(rng: &mut StdRng, d: usize) -> Vec<f32> {
        (0..d).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    fn random_histogram(rng: &mut StdRng) -> Vec<f32> {
        let raw = (0..HISTOGRAM_BINS).map(|_| rng.random::<f32>()).collect::<Vec<_>>();
        renormalize(raw)
    }

    fn assert_distribution(hist: &[f32]) {
        assert_eq!(hist.len(), HISTOGRAM_BINS);
        assert!(hist.iter().all(|&v| v >= 0.));
        let sum = hist.iter().map(|&v| v as f64).sum::<f64>();
        assert!((sum - 1.).abs() < 1e-5, "sum = {sum}");
    }

    #[test]
    fn test_negate_involution() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let v = random_vec(&mut rng, 512);
            assert_eq!(negate(&negate(&v)), v);
        }
    }

    #[test]
    fn test_reflect_involution() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let v = random_vec(&mut rng, 64);
            let c = random_vec(&mut rng, 64);
            let back = reflect(&reflect(&v, &c).unwrap(), &c).unwrap();
            for (a, b) in back.iter().zip(&v) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_reflect_dimension_mismatch() {
        assert!(matches!(
            reflect(&[1., 2.], &[1., 2., 3.]),
            Err(SearchError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_centroid() {
        let a = [1f32, 2., 3.];
        let b = [3f32, 4., 5.];
        let c = centroid([&a[..], &b[..]], 3).unwrap().unwrap();
        assert_eq!(c, vec![2., 3., 4.]);
        assert!(centroid(std::iter::empty::<&[f32]>(), 3).unwrap().is_none());
        assert!(centroid([&a[..2]], 3).is_err());
    }

    #[test]
    fn test_invert_histogram() {
        let mut hist = vec![0f32; HISTOGRAM_BINS];
        hist[0] = 0.75;
        hist[1] = 0.25;
        let inv = invert_histogram(&hist).unwrap();
        assert_distribution(&inv);
        assert_eq!(inv[0], 0.);
        // 原本为空的分桶权重最高
        assert!(inv[2] > inv[1]);
        assert!((inv[2] - inv[63]).abs() < 1e-9);
    }

    #[test]
    fn test_invert_uniform_histogram() {
        let hist = vec![1. / HISTOGRAM_BINS as f32; HISTOGRAM_BINS];
        let inv = invert_histogram(&hist).unwrap();
        assert_distribution(&inv);
    }

    #[test]
    fn test_negative_space() {
        let mut hist = vec![0f32; HISTOGRAM_BINS];
        hist[48] = 1.;
        let neg = negative_space(&hist).unwrap();
        assert_distribution(&neg);
        assert_eq!(neg[48], 0.);
        assert!((neg[0] - 1. / 63.).abs() < 1e-6);
    }

    #[test]
    fn test_histogram_transforms_stay_distributions() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let hist = random_histogram(&mut rng);
            assert_distribution(&invert_histogram(&hist).unwrap());
            assert_distribution(&negative_space(&hist).unwrap());
        }
    }

    #[test]
    fn test_invalid_histogram() {
        assert!(matches!(
            invert_histogram(&[0.5, 0.5]),
            Err(SearchError::DimensionMismatch { .. })
        ));
        let mut hist = vec![0f32; HISTOGRAM_BINS];
        hist[0] = -1.;
        assert!(matches!(negative_space(&hist), Err(SearchError::InvalidArgument(_))));
    }

    #[test]
    fn test_color_transforms() {
        assert_eq!(complementary(Rgb::new(0, 0, 255)), Rgb::new(255, 255, 0));
        assert_eq!(invert_lightness(Rgb::new(255, 255, 255)), Rgb::new(0, 0, 0));
        // 纯色的亮度为 0.5，饱和度 1 -> 0，变为灰色
        assert_eq!(invert_lightness(Rgb::new(255, 0, 0)), Rgb::new(128, 128, 128));
    }
}
