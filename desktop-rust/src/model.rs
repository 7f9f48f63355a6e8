use drawing_diff_common::Point;

/// キャンバス表示の倍率（画面座標 ↔ 図面の画素座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasView {
    pub scale: f32,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl CanvasView {
    /// 表示領域に収まる倍率（拡大はしない）
    pub fn fit(available: [f32; 2], image: [u32; 2]) -> Self {
        if image[0] == 0 || image[1] == 0 {
            return Self::default();
        }
        let sx = available[0] / image[0] as f32;
        let sy = available[1] / image[1] as f32;
        let scale = sx.min(sy).min(1.0);
        Self {
            scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
        }
    }

    pub fn display_size(&self, image: [u32; 2]) -> [f32; 2] {
        [image[0] as f32 * self.scale, image[1] as f32 * self.scale]
    }

    /// キャンバス左上からの相対位置 → 画素座標
    pub fn to_image(&self, offset: [f32; 2]) -> Point {
        Point::new(
            (offset[0] / self.scale) as f64,
            (offset[1] / self.scale) as f64,
        )
    }
}

/// 読み込み元（状態表示用）
#[derive(Debug, Clone, Default)]
pub struct LoadedPaths {
    pub old: Option<std::path::PathBuf>,
    pub new: Option<std::path::PathBuf>,
    pub project: Option<std::path::PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_shrinks_but_never_enlarges() {
        let view = CanvasView::fit([500.0, 500.0], [1000, 250]);
        assert_eq!(view.scale, 0.5);
        assert_eq!(view.display_size([1000, 250]), [500.0, 125.0]);

        let small = CanvasView::fit([800.0, 600.0], [100, 100]);
        assert_eq!(small.scale, 1.0);
    }

    #[test]
    fn fit_empty_image() {
        assert_eq!(CanvasView::fit([100.0, 100.0], [0, 10]), CanvasView::default());
        assert_eq!(CanvasView::fit([0.0, 100.0], [10, 10]), CanvasView::default());
    }

    #[test]
    fn to_image_undoes_scale() {
        let view = CanvasView { scale: 0.25 };
        assert_eq!(view.to_image([10.0, 2.5]), Point::new(40.0, 10.0));
    }
}
