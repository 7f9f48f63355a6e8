//! 重ね合わせ描画
//!
//! 旧図面は基準点の相似変換で「固定」、新図面はユーザー調整（平行移動＋キャンバス中心回転）で「可動」。
//! モードごとに色と描画順が決まっている:
//!
//! | モード | 1枚目               | 2枚目               |
//! |--------|---------------------|---------------------|
//! | delete | 旧図面・赤（固定）  | 新図面・黒（可動）  |
//! | add    | 新図面・青（可動）  | 旧図面・黒（固定）  |
//! | mix    | 新図面・青（可動）  | 旧図面・赤（固定）  |
//!
//! 後から描いたものが前のものの上に source-over（非乗算α）で合成される。
//!
//! 可動レイヤーの回転はどのモードでも効く。delete/add は本来平行移動だけだが、
//! ページ一括比較の回転ボタンをそのまま使えるようにしている（回転量は既定で0）。

use crate::adjust::Adjustment;
use crate::extract::{Tint, TintedMask, DEFAULT_INK_THRESHOLD};
use crate::geometry::{Affine, Point, SimilarityTransform};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 比較モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// 削除チェック: 旧図面にあって新図面にない線
    #[default]
    Delete,
    /// 追記チェック: 新図面で追加された線
    Add,
    /// 統合: 重なりを黒、旧のみ赤、新のみ青
    Mix,
}

/// 2枚のうちどちらを先に描くか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOrder {
    FixedFirst,
    FreeFirst,
}

impl CompareMode {
    pub const ALL: [CompareMode; 3] = [CompareMode::Delete, CompareMode::Add, CompareMode::Mix];

    pub fn draw_order(self) -> DrawOrder {
        match self {
            CompareMode::Delete => DrawOrder::FixedFirst,
            CompareMode::Add | CompareMode::Mix => DrawOrder::FreeFirst,
        }
    }

    /// 旧図面（固定レイヤー）の色
    pub fn fixed_tint(self, options: &RenderOptions) -> Tint {
        match self {
            CompareMode::Delete | CompareMode::Mix => options.red,
            CompareMode::Add => options.black,
        }
    }

    /// 新図面（可動レイヤー）の色
    pub fn free_tint(self, options: &RenderOptions) -> Tint {
        match self {
            CompareMode::Delete => options.black,
            CompareMode::Add | CompareMode::Mix => options.blue,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CompareMode::Delete => "削除チェック",
            CompareMode::Add => "追記チェック",
            CompareMode::Mix => "統合",
        }
    }
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delete" | "del" | "d" => Ok(CompareMode::Delete),
            "add" | "a" => Ok(CompareMode::Add),
            "mix" | "m" => Ok(CompareMode::Mix),
            _ => Err(format!("Unknown mode: {}. Use delete, add, or mix", s)),
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareMode::Delete => write!(f, "delete"),
            CompareMode::Add => write!(f, "add"),
            CompareMode::Mix => write!(f, "mix"),
        }
    }
}

/// 変換描画時の画素サンプリング
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    Nearest,
    /// キャンバスの drawImage 相当のスムージング
    #[default]
    Bilinear,
}

impl FromStr for Sampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" | "n" => Ok(Sampling::Nearest),
            "bilinear" | "b" => Ok(Sampling::Bilinear),
            _ => Err(format!("Unknown sampling: {}. Use nearest or bilinear", s)),
        }
    }
}

impl fmt::Display for Sampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sampling::Nearest => write!(f, "nearest"),
            Sampling::Bilinear => write!(f, "bilinear"),
        }
    }
}

/// 描画設定（色・α・閾値・サンプリング）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub red: Tint,
    pub blue: Tint,
    pub black: Tint,
    pub threshold: f32,
    pub sampling: Sampling,
}

impl RenderOptions {
    pub const PREVIEW_ALPHA: u8 = 100;
    pub const EXPORT_ALPHA: u8 = 150;
    pub const PAGES_ALPHA: u8 = 120;

    /// 赤・青を同じαで作る
    pub fn with_alpha(alpha: u8) -> Self {
        Self {
            red: Tint::red(alpha),
            blue: Tint::blue(alpha),
            black: Tint::black(),
            threshold: DEFAULT_INK_THRESHOLD,
            sampling: Sampling::default(),
        }
    }

    /// 画面表示用（α=100）
    pub fn preview() -> Self {
        Self::with_alpha(Self::PREVIEW_ALPHA)
    }

    /// 保存用（α=150）
    pub fn export() -> Self {
        Self::with_alpha(Self::EXPORT_ALPHA)
    }

    /// ページ一括比較用（α=120）
    pub fn pages() -> Self {
        Self::with_alpha(Self::PAGES_ALPHA)
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::preview()
    }
}

/// 描画先キャンバス
///
/// 再描画のたびに `reset` で消去してから使う。
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFrame {
    image: RgbaImage,
}

impl CompositeFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// サイズを合わせて全画素を透明にする
    pub fn reset(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        } else {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn center(&self) -> Point {
        Point::new(self.width() as f64 / 2.0, self.height() as f64 / 2.0)
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// 1回の描画に使う2枚のマスク
pub struct LayerMasks<'a> {
    /// 旧図面（基準点で固定）
    pub fixed: &'a TintedMask,
    /// 新図面（手動調整で可動）
    pub free: &'a TintedMask,
}

/// モードの描画手順でキャンバスに描く（キャンバスはクリア済みであること）
///
/// `adjustment` の回転は mode によらず可動レイヤーに掛かる。
pub fn render(
    frame: &mut CompositeFrame,
    mode: CompareMode,
    masks: &LayerMasks<'_>,
    transform: &SimilarityTransform,
    adjustment: &Adjustment,
    sampling: Sampling,
) {
    let fixed = transform.to_affine();
    let free = adjustment.free_layer_affine(frame.center());

    match mode.draw_order() {
        DrawOrder::FixedFirst => {
            draw_mask(frame, masks.fixed, &fixed, sampling);
            draw_mask(frame, masks.free, &free, sampling);
        }
        DrawOrder::FreeFirst => {
            draw_mask(frame, masks.free, &free, sampling);
            draw_mask(frame, masks.fixed, &fixed, sampling);
        }
    }
}

/// マスクを変換してキャンバスに重ねる
pub fn draw_mask(frame: &mut CompositeFrame, mask: &TintedMask, transform: &Affine, sampling: Sampling) {
    draw_image(frame, mask.as_image(), transform, sampling);
}

/// 任意のRGBA画像を変換してキャンバスに重ねる
pub fn draw_image(frame: &mut CompositeFrame, src: &RgbaImage, transform: &Affine, sampling: Sampling) {
    let Some(inverse) = transform.inverse() else {
        log::warn!("singular layer transform, layer skipped");
        return;
    };
    let Some((x0, y0, x1, y1)) = destination_bounds(frame, src, transform) else {
        return;
    };

    for y in y0..y1 {
        for x in x0..x1 {
            let s = inverse.apply(Point::new(x as f64 + 0.5, y as f64 + 0.5));
            let sample = match sampling {
                Sampling::Nearest => sample_nearest(src, s),
                Sampling::Bilinear => sample_bilinear(src, s),
            };
            if sample[3] <= 0.0 {
                continue;
            }
            let dst = frame.image.get_pixel_mut(x, y);
            *dst = blend_over(sample, dst);
        }
    }
}

/// 基準点マーカー（塗りつぶし円）
pub fn draw_marker(frame: &mut CompositeFrame, center: Point, radius: f64, tint: Tint) {
    let color = [tint.r as f32, tint.g as f32, tint.b as f32, tint.a as f32];
    let (w, h) = frame.dimensions();
    let x0 = (center.x - radius).floor().max(0.0) as u32;
    let y0 = (center.y - radius).floor().max(0.0) as u32;
    let x1 = ((center.x + radius).ceil().max(0.0) as u32).min(w);
    let y1 = ((center.y + radius).ceil().max(0.0) as u32).min(h);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if p.distance(center) <= radius {
                let dst = frame.image.get_pixel_mut(x, y);
                *dst = blend_over(color, dst);
            }
        }
    }
}

/// 変換後の画像が掛かる範囲（キャンバス内にクリップ）
fn destination_bounds(
    frame: &CompositeFrame,
    src: &RgbaImage,
    transform: &Affine,
) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (src.width() as f64, src.height() as f64);
    let corners = [
        transform.apply(Point::new(0.0, 0.0)),
        transform.apply(Point::new(w, 0.0)),
        transform.apply(Point::new(0.0, h)),
        transform.apply(Point::new(w, h)),
    ];

    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min).floor() - 1.0;
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min).floor() - 1.0;
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max).ceil() + 1.0;
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max).ceil() + 1.0;

    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return None;
    }

    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let x0 = min_x.clamp(0.0, fw) as u32;
    let y0 = min_y.clamp(0.0, fh) as u32;
    let x1 = max_x.clamp(0.0, fw) as u32;
    let y1 = max_y.clamp(0.0, fh) as u32;

    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

fn to_f32(p: &Rgba<u8>) -> [f32; 4] {
    [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
}

fn sample_nearest(src: &RgbaImage, at: Point) -> [f32; 4] {
    let x = at.x.floor();
    let y = at.y.floor();
    if x < 0.0 || y < 0.0 || x >= src.width() as f64 || y >= src.height() as f64 {
        return [0.0; 4];
    }
    to_f32(src.get_pixel(x as u32, y as u32))
}

/// 乗算済みαで補間してから戻す（透明画素の色が滲まないように）
fn sample_bilinear(src: &RgbaImage, at: Point) -> [f32; 4] {
    let u = at.x - 0.5;
    let v = at.y - 0.5;
    let x0 = u.floor();
    let y0 = v.floor();
    let fx = (u - x0) as f32;
    let fy = (v - y0) as f32;

    let fetch = |x: f64, y: f64| -> [f32; 4] {
        if x < 0.0 || y < 0.0 || x >= src.width() as f64 || y >= src.height() as f64 {
            return [0.0; 4];
        }
        let p = src.get_pixel(x as u32, y as u32);
        let a = p[3] as f32;
        [p[0] as f32 * a, p[1] as f32 * a, p[2] as f32 * a, a]
    };

    let taps = [
        (fetch(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (fetch(x0 + 1.0, y0), fx * (1.0 - fy)),
        (fetch(x0, y0 + 1.0), (1.0 - fx) * fy),
        (fetch(x0 + 1.0, y0 + 1.0), fx * fy),
    ];

    let mut acc = [0.0f32; 4];
    for (px, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        for (slot, value) in acc.iter_mut().zip(px) {
            *slot += value * weight;
        }
    }

    let a = acc[3];
    if a <= 0.0 {
        return [0.0; 4];
    }
    [acc[0] / a, acc[1] / a, acc[2] / a, a]
}

/// source-over（非乗算α）
fn blend_over(src: [f32; 4], dst: &Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}
