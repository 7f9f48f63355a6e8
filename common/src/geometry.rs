//! 2点基準の位置合わせ（相似変換）
//!
//! 旧図面の基準点 A1, B1 と新図面の基準点 A2, B2 から
//! 拡大率・回転角・平行移動を求め、旧図面座標を新図面座標へ写す。
//!
//! 変換は「-A1 だけ移動 → scale 倍 → rotation 回転 → +A2 だけ移動」の順で合成する。
//! この順序であれば A1→A2, B1→B2 が丸め誤差の範囲で厳密に一致する。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 画像座標上の点（どの画像の座標系かは呼び出し側が管理する）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// self → other ベクトルの角度（ラジアン）
    pub fn angle_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Point {
    type Err = String;

    /// "x,y" 形式（空白許容）
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid point: {}. Use X,Y", s))?;
        let x: f64 = x
            .trim()
            .parse()
            .map_err(|_| format!("Invalid x coordinate: {}", x.trim()))?;
        let y: f64 = y
            .trim()
            .parse()
            .map_err(|_| format!("Invalid y coordinate: {}", y.trim()))?;
        if !x.is_finite() || !y.is_finite() {
            return Err(format!("Point must be finite: {}", s));
        }
        Ok(Point::new(x, y))
    }
}

/// 基準点の組
///
/// `old[0]`↔`new[0]`, `old[1]`↔`new[1]` が対応する。順序はクリック順で決まり、並べ替えない。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPair {
    pub old: [Point; 2],
    pub new: [Point; 2],
}

impl CalibrationPair {
    pub fn new(a1: Point, b1: Point, a2: Point, b2: Point) -> Self {
        Self {
            old: [a1, b1],
            new: [a2, b2],
        }
    }

    /// 基準点なしで重ねる場合（ページ一括比較）の恒等対応
    pub fn identity() -> Self {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        Self::new(a, b, a, b)
    }
}

/// 旧図面座標 → 新図面座標の相似変換
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    pub scale: f64,
    /// ラジアン（正規化しない）
    pub rotation: f64,
    pub pivot_old: Point,
    pub pivot_new: Point,
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: 0.0,
            pivot_old: Point::default(),
            pivot_new: Point::default(),
        }
    }

    /// 2組の対応点から変換を求める
    ///
    /// 基準点同士の距離が 0 の場合は `DegenerateCalibration` を返す。
    pub fn solve(pair: &CalibrationPair) -> Result<Self> {
        let [a1, b1] = pair.old;
        let [a2, b2] = pair.new;

        let old_len = a1.distance(b1);
        if !old_len.is_finite() || old_len <= 0.0 {
            return Err(Error::DegenerateCalibration("old A1/B1"));
        }
        let new_len = a2.distance(b2);
        if !new_len.is_finite() || new_len <= 0.0 {
            return Err(Error::DegenerateCalibration("new A2/B2"));
        }

        let scale = new_len / old_len;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::DegenerateCalibration("old A1/B1"));
        }
        let rotation = a2.angle_to(b2) - a1.angle_to(b1);

        log::debug!(
            "similarity solved: scale={:.6} rotation={:.4}°",
            scale,
            rotation.to_degrees()
        );

        Ok(Self {
            scale,
            rotation,
            pivot_old: a1,
            pivot_new: a2,
        })
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.rotation.to_degrees()
    }

    /// 旧図面座標 → 新図面座標
    pub fn apply(&self, p: Point) -> Point {
        let (sin, cos) = self.rotation.sin_cos();
        let dx = p.x - self.pivot_old.x;
        let dy = p.y - self.pivot_old.y;
        Point::new(
            self.pivot_new.x + self.scale * (cos * dx - sin * dy),
            self.pivot_new.y + self.scale * (sin * dx + cos * dy),
        )
    }

    /// 新図面座標 → 旧図面座標
    pub fn invert(&self, p: Point) -> Point {
        let (sin, cos) = self.rotation.sin_cos();
        let dx = p.x - self.pivot_new.x;
        let dy = p.y - self.pivot_new.y;
        Point::new(
            self.pivot_old.x + (cos * dx + sin * dy) / self.scale,
            self.pivot_old.y + (-sin * dx + cos * dy) / self.scale,
        )
    }

    pub fn to_affine(&self) -> Affine {
        Affine::translation(-self.pivot_old.x, -self.pivot_old.y)
            .then(&Affine::scaling(self.scale))
            .then(&Affine::rotation(self.rotation))
            .then(&Affine::translation(self.pivot_new.x, self.pivot_new.y))
    }
}

/// 2x3 アフィン行列（x' = m[0]x + m[1]y + m[2], y' = m[3]x + m[4]y + m[5]）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    m: [f64; 6],
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            m: [1.0, 0.0, dx, 0.0, 1.0, dy],
        }
    }

    pub fn scaling(s: f64) -> Self {
        Self {
            m: [s, 0.0, 0.0, 0.0, s, 0.0],
        }
    }

    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            m: [cos, -sin, 0.0, sin, cos, 0.0],
        }
    }

    /// `center` を中心とした回転
    pub fn rotation_about(center: Point, radians: f64) -> Self {
        Affine::translation(-center.x, -center.y)
            .then(&Affine::rotation(radians))
            .then(&Affine::translation(center.x, center.y))
    }

    /// self を適用した後に `next` を適用する変換
    pub fn then(&self, next: &Affine) -> Affine {
        let a = &next.m;
        let b = &self.m;
        Affine {
            m: [
                a[0] * b[0] + a[1] * b[3],
                a[0] * b[1] + a[1] * b[4],
                a[0] * b[2] + a[1] * b[5] + a[2],
                a[3] * b[0] + a[4] * b[3],
                a[3] * b[1] + a[4] * b[4],
                a[3] * b[2] + a[4] * b[5] + a[5],
            ],
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        let m = &self.m;
        Point::new(
            m[0] * p.x + m[1] * p.y + m[2],
            m[3] * p.x + m[4] * p.y + m[5],
        )
    }

    /// 逆行列（特異な場合は None）
    pub fn inverse(&self) -> Option<Affine> {
        let m = &self.m;
        let det = m[0] * m[4] - m[1] * m[3];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        let a = m[4] * inv;
        let b = -m[1] * inv;
        let d = -m[3] * inv;
        let e = m[0] * inv;
        Some(Affine {
            m: [a, b, -(a * m[2] + b * m[5]), d, e, -(d * m[2] + e * m[5])],
        })
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}
