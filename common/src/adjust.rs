//! 可動レイヤー（新図面）の手動調整
//!
//! 共通（基本）調整を1つ持ち、必要なページだけページ別調整で上書きする。
//! ページ別調整は一度作ると OFF にしても値を保持し、再度 ON にすると前回値に戻る。

use crate::geometry::{Affine, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 方向キー1回の移動量
pub const NUDGE_STEP: f64 = 0.5;
/// 回転ボタン1回の角度（度）
pub const ROTATE_STEP_DEG: f64 = 0.10;

/// 平行移動と回転（度）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Adjustment {
    pub dx: f64,
    pub dy: f64,
    pub rotation_deg: f64,
}

/// 方向キー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Up,
    Down,
    Left,
    Right,
}

impl Adjustment {
    pub fn new(dx: f64, dy: f64, rotation_deg: f64) -> Self {
        Self { dx, dy, rotation_deg }
    }

    pub fn nudge(&mut self, direction: Nudge, step: f64) {
        match direction {
            Nudge::Up => self.dy -= step,
            Nudge::Down => self.dy += step,
            Nudge::Left => self.dx -= step,
            Nudge::Right => self.dx += step,
        }
    }

    pub fn rotate(&mut self, delta_deg: f64) {
        self.rotation_deg += delta_deg;
    }

    /// キャンバス中心で回転した後、(dx, dy) だけ移動する変換
    pub fn free_layer_affine(&self, center: Point) -> Affine {
        Affine::rotation_about(center, self.rotation_deg.to_radians())
            .then(&Affine::translation(self.dx, self.dy))
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0 && self.rotation_deg == 0.0
    }
}

/// ページ別調整
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageOverride {
    pub enabled: bool,
    pub adjustment: Adjustment,
}

/// 共通調整＋ページ別上書き
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdjustmentBook {
    baseline: Adjustment,
    #[serde(default)]
    overrides: BTreeMap<usize, PageOverride>,
}

impl AdjustmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Adjustment {
        self.baseline
    }

    pub fn override_for(&self, page: usize) -> Option<&PageOverride> {
        self.overrides.get(&page)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (usize, &PageOverride)> {
        self.overrides.iter().map(|(k, v)| (*k, v))
    }

    pub fn is_override_enabled(&self, page: usize) -> bool {
        self.overrides.get(&page).is_some_and(|o| o.enabled)
    }

    /// そのページで現在適用される調整（ページ別ONならそれ、OFFなら共通）
    pub fn current(&self, page: usize) -> Adjustment {
        match self.overrides.get(&page) {
            Some(o) if o.enabled => o.adjustment,
            _ => self.baseline,
        }
    }

    /// 操作の対象になる調整
    pub fn current_mut(&mut self, page: usize) -> &mut Adjustment {
        match self.overrides.get_mut(&page) {
            Some(o) if o.enabled => &mut o.adjustment,
            _ => &mut self.baseline,
        }
    }

    /// ページ別調整の ON/OFF を切り替え、切り替え後の状態を返す
    ///
    /// 初回 ON 時は共通調整の現在値をコピーして作る。
    pub fn toggle_override(&mut self, page: usize) -> bool {
        let baseline = self.baseline;
        let entry = self.overrides.entry(page).or_insert(PageOverride {
            enabled: false,
            adjustment: baseline,
        });
        entry.enabled = !entry.enabled;
        entry.enabled
    }

    /// 現在ページの調整を共通値にして、すべてのページ別調整を OFF にする
    pub fn apply_to_all(&mut self, page: usize) {
        self.baseline = self.current(page);
        for o in self.overrides.values_mut() {
            o.enabled = false;
        }
    }

    /// このページだけ共通値に戻す（ページ別は OFF）
    pub fn reset_page(&mut self, page: usize) {
        self.overrides.insert(
            page,
            PageOverride {
                enabled: false,
                adjustment: self.baseline,
            },
        );
    }

    /// 比較開始時: 共通値をゼロに戻す（ページ別は残す）
    pub fn reset_baseline(&mut self) {
        self.baseline = Adjustment::default();
    }

    pub fn set_baseline(&mut self, adjustment: Adjustment) {
        self.baseline = adjustment;
    }
}
