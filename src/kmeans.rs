use std::cmp::Reverse;
use std::collections::HashSet;

use crate::hsl::Rgb;

/// 固定迭代次数，不做收敛判断，保证结果可复现
pub const KMEANS_ITERATIONS: usize = 10;

fn sq_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// 返回距离最近的中心点下标，距离相同时取下标较小者
fn nearest(pixel: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    let mut best = 0;
    let mut best_dis = f64::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = sq_distance(pixel, c);
        if d < best_dis {
            best_dis = d;
            best = i;
        }
    }
    best
}

/// 从像素序列中等间隔取样作为初始中心点，第 i 个中心点取 `pixels[i * (n / k)]`
///
/// 只有取到的颜色与之前的中心点重复时，才沿序列向后寻找下一个未使用过的颜色，
/// 保证 k 个初始中心点互不相同；不重复的取样点保持原样，不做其他初始化优化。
/// 调用方需保证 k 不超过不同颜色的数量。
fn init_centroids(pixels: &[Rgb], k: usize) -> Vec<[f64; 3]> {
    let n = pixels.len();
    let step = n / k;
    let mut used = HashSet::with_capacity(k);
    let mut centroids = Vec::with_capacity(k);
    for i in 0..k {
        let start = i * step;
        let mut pixel = pixels[start];
        if used.contains(&pixel) {
            pixel = (1..n)
                .map(|offset| pixels[(start + offset) % n])
                .find(|p| !used.contains(p))
                .unwrap_or(pixel);
        }
        used.insert(pixel);
        centroids.push(pixel.0.map(|c| c as f64));
    }
    centroids
}

/// 使用简化的 k-means 计算主色调，按聚类大小降序返回
///
/// - 初始中心点为等间隔取样，不使用随机数
/// - 固定迭代 [`KMEANS_ITERATIONS`] 次
/// - 没有分配到像素的中心点保持原值
/// - 返回数量为 `min(k, 不同颜色数量)`
pub fn dominant_colors(pixels: &[Rgb], k: usize) -> Vec<Rgb> {
    let distinct = pixels.iter().collect::<HashSet<_>>().len();
    let k = k.min(distinct);
    if k == 0 {
        return vec![];
    }

    let points = pixels.iter().map(|p| p.0.map(|c| c as f64)).collect::<Vec<_>>();
    let mut centroids = init_centroids(pixels, k);

    for _ in 0..KMEANS_ITERATIONS {
        let mut sums = vec![[0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for p in &points {
            let i = nearest(p, &centroids);
            counts[i] += 1;
            for c in 0..3 {
                sums[i][c] += p[c];
            }
        }
        for i in 0..k {
            if counts[i] > 0 {
                centroids[i] = sums[i].map(|s| s / counts[i] as f64);
            }
        }
    }

    let mut sizes = vec![0usize; k];
    for p in &points {
        sizes[nearest(p, &centroids)] += 1;
    }

    let mut order = (0..k).collect::<Vec<_>>();
    // sort_by_key 是稳定排序，大小相同时保持原有顺序
    order.sort_by_key(|&i| Reverse(sizes[i]));

    order
        .into_iter()
        .map(|i| Rgb(centroids[i].map(|c| c.round().clamp(0., 255.) as u8)))
        .collect()
}
