use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// 8 位 RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

/// HSL 颜色，h 为角度 [0, 360)，s 和 l 范围为 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// 转换为 `#rrggbb` 格式
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }

    pub fn to_hsl(&self) -> Hsl {
        let [r, g, b] = self.0.map(|c| c as f64 / 255.);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.;
        let d = max - min;

        if d == 0. {
            return Hsl { h: 0., s: 0., l };
        }

        let s = if l > 0.5 { d / (2. - max - min) } else { d / (max + min) };
        let h = if max == r {
            (g - b) / d + if g < b { 6. } else { 0. }
        } else if max == g {
            (b - r) / d + 2.
        } else {
            (r - g) / d + 4.
        };

        Hsl { h: h * 60., s, l }
    }
}

impl Hsl {
    pub fn to_rgb(&self) -> Rgb {
        let h = self.h.rem_euclid(360.) / 360.;
        let s = self.s.clamp(0., 1.);
        let l = self.l.clamp(0., 1.);

        if s == 0. {
            let v = (l * 255.).round() as u8;
            return Rgb([v, v, v]);
        }

        let q = if l < 0.5 { l * (1. + s) } else { l + s - l * s };
        let p = 2. * l - q;
        let channel = |t: f64| (hue_to_rgb(p, q, t) * 255.).round() as u8;

        Rgb([channel(h + 1. / 3.), channel(h), channel(h - 1. / 3.)])
    }

    /// 色相旋转 180°，饱和度与亮度不变
    pub fn complementary(&self) -> Self {
        Self { h: (self.h + 180.).rem_euclid(360.), ..*self }
    }

    /// 反转亮度和饱和度，色相不变
    pub fn invert_lightness(&self) -> Self {
        Self { h: self.h, s: 1. - self.s, l: 1. - self.l }
    }
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.);
    if t < 1. / 6. {
        p + (q - p) * 6. * t
    } else if t < 1. / 2. {
        q
    } else if t < 2. / 3. {
        p + (q - p) * (2. / 3. - t) * 6.
    } else {
        p
    }
}

impl FromStr for Rgb {
    type Err = SearchError;

    /// 解析 `#rrggbb`、`rrggbb` 或 `#rgb`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || SearchError::InvalidArgument(format!("无效的颜色: {s}"));
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        match hex.len() {
            6 => {
                let parse = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
                Ok(Rgb([parse(0)?, parse(2)?, parse(4)?]))
            }
            3 => {
                let parse = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17).map_err(|_| invalid())
                };
                Ok(Rgb([parse(0)?, parse(1)?, parse(2)?]))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
