//! 图片颜色分析：64 维颜色直方图、平均色以及主色调

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hsl::Rgb;
use crate::kmeans::dominant_colors;

/// 每个通道的量化等级
pub const BINS_PER_CHANNEL: usize = 4;
/// 直方图维度，4 x 4 x 4
pub const HISTOGRAM_BINS: usize = BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL;
/// 分析前图片缩放到的最大尺寸
pub const MAX_SAMPLE_SIZE: u32 = 100;
/// 主色调数量
pub const DOMINANT_COLORS: usize = 5;

/// 将颜色投影到直方图空间时使用的高斯核宽度
const PROJECTION_SIGMA: f64 = 32.;

#[derive(Debug, Error)]
pub enum ColorError {
    #[error("图片解码失败: {0}")]
    Decode(#[from] image::ImageError),
    #[error("图片不包含任何像素")]
    Empty,
}

/// 一张图片的颜色信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorInfo {
    /// 归一化的颜色直方图，长度为 64，总和为 1
    pub histogram: Vec<f32>,
    pub average: Rgb,
    /// 主色调，按像素数量降序
    pub dominant: Vec<Rgb>,
}

/// 单通道的量化下标
#[inline]
fn channel_bin(c: u8) -> usize {
    (c as usize / 64).min(BINS_PER_CHANNEL - 1)
}

/// 颜色所在的直方图下标 `r * 16 + g * 4 + b`
#[inline]
pub fn bin_index(c: Rgb) -> usize {
    let [r, g, b] = c.0.map(channel_bin);
    r * 16 + g * 4 + b
}

/// 直方图下标对应的颜色中心
fn bin_center(index: usize) -> [f64; 3] {
    let center = |bin: usize| (bin * 64 + 32) as f64;
    [center(index / 16), center(index / 4 % 4), center(index % 4)]
}

/// 计算像素的颜色直方图
pub fn histogram(pixels: &[Rgb]) -> Vec<f32> {
    let mut counts = [0u32; HISTOGRAM_BINS];
    for p in pixels {
        counts[bin_index(*p)] += 1;
    }
    let total = pixels.len().max(1) as f64;
    counts.iter().map(|&c| (c as f64 / total) as f32).collect()
}

/// 计算像素的平均色，每个通道四舍五入
pub fn average_color(pixels: &[Rgb]) -> Rgb {
    let mut sums = [0u64; 3];
    for p in pixels {
        for c in 0..3 {
            sums[c] += p.0[c] as u64;
        }
    }
    let n = pixels.len().max(1) as f64;
    Rgb(sums.map(|s| (s as f64 / n).round() as u8))
}

/// 将单个颜色投影为直方图，用于和颜色直方图比较
///
/// 使用高斯核对 64 个分桶中心进行软分配，相近的分桶也会分到一部分权重。
pub fn project_color(color: Rgb) -> Vec<f32> {
    let c = color.0.map(|v| v as f64);
    let weights = (0..HISTOGRAM_BINS)
        .map(|i| {
            let center = bin_center(i);
            let d2 = (0..3).map(|j| (c[j] - center[j]).powi(2)).sum::<f64>();
            (-d2 / (2. * PROJECTION_SIGMA * PROJECTION_SIGMA)).exp()
        })
        .collect::<Vec<_>>();
    let total = weights.iter().sum::<f64>();
    weights.into_iter().map(|w| (w / total) as f32).collect()
}

/// 缩放图片（只缩小不放大），去掉透明通道后返回像素序列
fn sample_pixels(img: &DynamicImage) -> Vec<Rgb> {
    let (w, h) = img.dimensions();
    let img = if w > MAX_SAMPLE_SIZE || h > MAX_SAMPLE_SIZE {
        img.resize(MAX_SAMPLE_SIZE, MAX_SAMPLE_SIZE, FilterType::Triangle)
    } else {
        img.clone()
    };
    img.to_rgb8().pixels().map(|p| Rgb(p.0)).collect()
}

/// 分析已解码的图片
pub fn analyze_image(img: &DynamicImage) -> Result<ColorInfo, ColorError> {
    let pixels = sample_pixels(img);
    if pixels.is_empty() {
        return Err(ColorError::Empty);
    }
    Ok(ColorInfo {
        histogram: histogram(&pixels),
        average: average_color(&pixels),
        dominant: dominant_colors(&pixels, DOMINANT_COLORS),
    })
}

/// 解码并分析图片
pub fn analyze(bytes: &[u8]) -> Result<ColorInfo, ColorError> {
    let img = image::load_from_memory(bytes)?;
    analyze_image(&img)
}
