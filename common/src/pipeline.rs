//! 描画パイプライン
//!
//! 重ね合わせ描画 → 紫→黒 →（保存時のみ）背景白化 を1回の呼び出しで行う。

use crate::adjust::Adjustment;
use crate::classify;
use crate::compose::{self, CompareMode, CompositeFrame, LayerMasks, RenderOptions, Sampling};
use crate::error::Result;
use crate::extract::extract_lines;
use crate::geometry::{CalibrationPair, SimilarityTransform};
use image::RgbaImage;

/// 画面表示か保存か
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// 画面表示: 背景は透明のまま
    Preview,
    /// 保存: 背景を白で埋める
    Export,
}

/// 1回の描画で置換された画素数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub overlap: usize,
    pub flattened: usize,
}

/// クリア済みのキャンバスに描画して分類まで行う
pub fn compose_pass(
    frame: &mut CompositeFrame,
    mode: CompareMode,
    masks: &LayerMasks<'_>,
    transform: &SimilarityTransform,
    adjustment: &Adjustment,
    sampling: Sampling,
    pass: Pass,
) -> PassStats {
    compose::render(frame, mode, masks, transform, adjustment, sampling);

    let overlap = classify::recolor_overlap(frame);
    let flattened = match pass {
        Pass::Preview => 0,
        Pass::Export => classify::flatten_background(frame),
    };

    log::debug!(
        "compose pass: mode={} {:?} overlap={} flattened={}",
        mode,
        pass,
        overlap,
        flattened
    );
    PassStats { overlap, flattened }
}

/// 2枚の画像から保存用の差分画像を作る（新図面と同じサイズ）
///
/// 背景は不透明な白に揃えるが、線は描画時のα（保存用は150）と補間の半透明を残す。
/// 白の上に合成した不透明な画像にはならない。
pub fn export_diff(
    old: &RgbaImage,
    new: &RgbaImage,
    pair: &CalibrationPair,
    mode: CompareMode,
    adjustment: &Adjustment,
    options: &RenderOptions,
) -> Result<RgbaImage> {
    let transform = SimilarityTransform::solve(pair)?;

    let fixed = extract_lines(old, mode.fixed_tint(options), options.threshold);
    let free = extract_lines(new, mode.free_tint(options), options.threshold);

    let mut frame = CompositeFrame::new(new.width(), new.height());
    compose_pass(
        &mut frame,
        mode,
        &LayerMasks {
            fixed: &fixed,
            free: &free,
        },
        &transform,
        adjustment,
        options.sampling,
        Pass::Export,
    );
    Ok(frame.into_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extract::Tint;
    use crate::geometry::Point;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, WHITE)
    }

    fn hline(img: &mut RgbaImage, y: u32, xs: std::ops::Range<u32>) {
        for x in xs {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }

    #[test]
    fn test_export_delete_shows_removed_line_in_red() {
        // 旧図面の横線が新図面では 10px 右にずれている。新図面には他の線がない。
        let mut old = blank(40, 10);
        hline(&mut old, 5, 5..15);
        let new = blank(40, 10);

        let pair = CalibrationPair::new(
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(30.0, 0.0),
        );
        let mut options = RenderOptions::export();
        options.sampling = Sampling::Nearest;
        let out = export_diff(&old, &new, &pair, CompareMode::Delete, &Adjustment::default(), &options)
            .unwrap();

        assert_eq!(out.dimensions(), (40, 10));
        for (x, y, p) in out.enumerate_pixels() {
            if y == 5 && (15..25).contains(&x) {
                assert_eq!(p, &Rgba([255, 0, 0, 150]), "({}, {})", x, y);
            } else {
                assert_eq!(p, &WHITE, "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_export_mix_overlap_is_black() {
        let mut old = blank(20, 4);
        hline(&mut old, 1, 0..10);
        let mut new = blank(20, 4);
        hline(&mut new, 1, 5..15);

        let out = export_diff(
            &old,
            &new,
            &CalibrationPair::identity(),
            CompareMode::Mix,
            &Adjustment::default(),
            &RenderOptions::export(),
        )
        .unwrap();

        let old_only = out.get_pixel(2, 1);
        let both = out.get_pixel(7, 1);
        let new_only = out.get_pixel(12, 1);
        assert_eq!(old_only, &Rgba([255, 0, 0, 150]));
        assert_eq!(&both.0[..3], &[0, 0, 0]);
        assert_eq!(new_only, &Rgba([0, 120, 255, 150]));
        assert_eq!(out.get_pixel(18, 3), &WHITE);
    }

    #[test]
    fn test_export_rejects_degenerate_pair() {
        let p = Point::new(3.0, 3.0);
        let pair = CalibrationPair::new(p, p, Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let err = export_diff(
            &blank(4, 4),
            &blank(4, 4),
            &pair,
            CompareMode::Mix,
            &Adjustment::default(),
            &RenderOptions::export(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DegenerateCalibration(_)));
    }

    #[test]
    fn test_preview_keeps_transparent_background() {
        let mut old = blank(6, 2);
        hline(&mut old, 0, 0..3);
        let new = blank(6, 2);
        let fixed = extract_lines(&old, Tint::red(100), 200.0);
        let free = extract_lines(&new, Tint::black(), 200.0);
        let mut frame = CompositeFrame::new(6, 2);
        let stats = compose_pass(
            &mut frame,
            CompareMode::Delete,
            &LayerMasks { fixed: &fixed, free: &free },
            &SimilarityTransform::identity(),
            &Adjustment::default(),
            Sampling::Nearest,
            Pass::Preview,
        );
        assert_eq!(stats.flattened, 0);
        assert_eq!(frame.as_image().get_pixel(5, 1)[3], 0);
        assert_eq!(frame.as_image().get_pixel(1, 0), &Rgba([255, 0, 0, 100]));
    }
}
