//! 黒線抽出
//!
//! 明るさ（R,G,Bの平均）が閾値未満の画素を「線」とみなし、指定色・指定αで塗る。
//! それ以外は完全透明にする。

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// 線とみなす明るさの閾値（未満が線）
pub const DEFAULT_INK_THRESHOLD: f32 = 200.0;

/// 抽出した線に付ける色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Tint {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 旧図面の赤
    pub const fn red(a: u8) -> Self {
        Self::new(255, 0, 0, a)
    }

    /// 新図面の青
    pub const fn blue(a: u8) -> Self {
        Self::new(0, 120, 255, a)
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

/// 抽出結果。各画素は完全透明か、Tintそのもの。
#[derive(Debug, Clone, PartialEq)]
pub struct TintedMask {
    image: RgbaImage,
    tint: Tint,
}

impl TintedMask {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn tint(&self) -> Tint {
        self.tint
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// 線画素の数
    pub fn ink_count(&self) -> usize {
        self.image.pixels().filter(|p| p[3] != 0).count()
    }
}

/// 閾値（f32）をキャッシュのキーにするためのラッパー
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(pub f32);

impl Eq for Threshold {}

impl Hash for Threshold {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// 画像から線を抽出して着色する（入力は変更しない）
pub fn extract_lines(image: &RgbaImage, tint: Tint, threshold: f32) -> TintedMask {
    let ink = tint.to_rgba();
    let clear = Rgba([0, 0, 0, 0]);

    let out = RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        if is_ink(p, threshold) {
            ink
        } else {
            clear
        }
    });

    TintedMask { image: out, tint }
}

/// 明るさ（R,G,Bの平均）が閾値未満か
pub fn is_ink(p: &Rgba<u8>, threshold: f32) -> bool {
    let sum = p[0] as f32 + p[1] as f32 + p[2] as f32;
    sum / 3.0 < threshold
}
