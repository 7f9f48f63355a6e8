//! 画素分類
//!
//! - 重なり判定: 赤と青が重なってできた紫を黒に置換する（αはそのまま）
//! - 背景白化: 透明または白っぽい画素を不透明の白にする（保存時のみ）
//!
//! しきい値は α=100〜150 の赤・青で実際に出る紫に合わせて調整した値。変更しないこと。

use crate::compose::CompositeFrame;
use image::Rgba;

/// R+B がこれより大きい
pub const OVERLAP_MIN_RB_SUM: i32 = 180;
/// |R-B| がこれより小さい
pub const OVERLAP_MAX_RB_DIFF: i32 = 120;
/// G がこれより小さい
pub const OVERLAP_MAX_G: i32 = 160;

/// α がこれより小さければ背景
pub const FLATTEN_MAX_ALPHA: u8 = 10;
/// R+G+B がこれより大きければ背景
pub const FLATTEN_MIN_RGB_SUM: i32 = 730;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// 紫（重なり）判定
pub fn is_overlap(p: &Rgba<u8>) -> bool {
    let r = p[0] as i32;
    let g = p[1] as i32;
    let b = p[2] as i32;
    (r + b) > OVERLAP_MIN_RB_SUM && (r - b).abs() < OVERLAP_MAX_RB_DIFF && g < OVERLAP_MAX_G
}

/// 背景（透明 or 白っぽい）判定
pub fn is_background(p: &Rgba<u8>) -> bool {
    let sum = p[0] as i32 + p[1] as i32 + p[2] as i32;
    p[3] < FLATTEN_MAX_ALPHA || sum > FLATTEN_MIN_RGB_SUM
}

/// 紫 → 黒。置換した画素数を返す。
pub fn recolor_overlap(frame: &mut CompositeFrame) -> usize {
    let mut count = 0;
    for p in frame.image_mut().pixels_mut() {
        if is_overlap(p) {
            p[0] = 0;
            p[1] = 0;
            p[2] = 0;
            count += 1;
        }
    }
    count
}

/// 背景を完全な白に。変更した画素数を返す。
///
/// 対象は背景と判定した画素だけで、半透明の線はそのまま残る。
pub fn flatten_background(frame: &mut CompositeFrame) -> usize {
    let mut count = 0;
    for p in frame.image_mut().pixels_mut() {
        if is_background(p) && *p != WHITE {
            *p = WHITE;
            count += 1;
        }
    }
    count
}
