//! 比較セッション（操作の状態管理）
//!
//! 画面側のイベント（クリック・ドラッグ・方向キー・回転ボタン・モード切替・ページ送り）を受け取り、
//! そのたびに同期的に描画パイプラインを最後まで実行する。
//!
//! 再描画できない状態（画像未読込・基準点未確定）では何もしない。

use crate::adjust::{Adjustment, AdjustmentBook, Nudge, NUDGE_STEP, ROTATE_STEP_DEG};
use crate::cache::{MaskCache, MaskKey};
use crate::calibration::{CalibrationPicker, CalibrationStage, Side};
use crate::compose::{self, CompareMode, CompositeFrame, LayerMasks, RenderOptions};
use crate::error::{Error, Result};
use crate::extract::Tint;
use crate::geometry::{Affine, CalibrationPair, Point, SimilarityTransform};
use crate::pipeline::{self, Pass, PassStats};
use image::RgbaImage;

/// 基準点マーカーの半径
const MARKER_RADIUS: f64 = 5.0;

/// 読み込み済みの画像とそのID（キャッシュキー）
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub id: String,
    pub image: RgbaImage,
}

impl SourceImage {
    pub fn new(id: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            id: id.into(),
            image,
        }
    }
}

/// 比較する1ページ分
#[derive(Debug, Clone)]
pub struct PagePair {
    pub old: SourceImage,
    pub new: SourceImage,
    pub calibration: Option<CalibrationPair>,
}

/// 旧・新のページ数が違う場合の対応結果
#[derive(Debug, Clone, PartialEq)]
pub struct PagePairing<T> {
    pub pairs: Vec<(T, T)>,
    /// 比較されない旧図面ページ数
    pub unused_old: usize,
    /// 比較されない新図面ページ数
    pub unused_new: usize,
}

impl<T> PagePairing<T> {
    pub fn has_unused(&self) -> bool {
        self.unused_old > 0 || self.unused_new > 0
    }
}

/// 先頭から順に組にする。多い側の余りは使わない。
pub fn pair_pages<T>(old: Vec<T>, new: Vec<T>) -> PagePairing<T> {
    let len = old.len().min(new.len());
    let unused_old = old.len() - len;
    let unused_new = new.len() - len;
    PagePairing {
        pairs: old.into_iter().zip(new).collect(),
        unused_old,
        unused_new,
    }
}

/// セッション設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub preview: RenderOptions,
    pub export: RenderOptions,
    /// ページ一括比較中は表示・保存ともこれを使う
    pub pages: RenderOptions,
    pub nudge_step: f64,
    pub rotate_step_deg: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            preview: RenderOptions::preview(),
            export: RenderOptions::export(),
            pages: RenderOptions::pages(),
            nudge_step: NUDGE_STEP,
            rotate_step_deg: ROTATE_STEP_DEG,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PageSlot {
    old: Option<SourceImage>,
    new: Option<SourceImage>,
    picker: CalibrationPicker,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    start: Point,
    start_dx: f64,
    start_dy: f64,
}

/// 比較セッション
#[derive(Debug)]
pub struct Session {
    pages: Vec<PageSlot>,
    index: usize,
    mode: CompareMode,
    book: AdjustmentBook,
    locked: bool,
    settings: SessionSettings,
    /// ページ一括比較中か
    paged: bool,
    cache: MaskCache,
    frame: CompositeFrame,
    rendered: bool,
    drag: Option<DragState>,
    notice: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            pages: vec![PageSlot::default()],
            index: 0,
            mode: CompareMode::default(),
            book: AdjustmentBook::new(),
            locked: false,
            settings,
            paged: false,
            cache: MaskCache::new(),
            frame: CompositeFrame::new(0, 0),
            rendered: false,
            drag: None,
            notice: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // ------------------------------
    // 画像・ページ
    // ------------------------------

    /// 現在ページの画像を差し替え、基準点を取り直す
    pub fn set_image(&mut self, side: Side, source: SourceImage) {
        let page = &mut self.pages[self.index];
        let slot = match side {
            Side::Old => &mut page.old,
            Side::New => &mut page.new,
        };
        if let Some(prev) = slot.take() {
            self.cache.invalidate(&prev.id);
        }
        log::debug!(
            "{:?} image set: {} ({}x{})",
            side,
            source.id,
            source.image.width(),
            source.image.height()
        );
        *slot = Some(source);
        page.picker.reset();
        self.rendered = false;
        self.notice = None;
    }

    /// ページ一括比較を開始する
    ///
    /// 共通調整はゼロに戻し、ページ別調整は残す。
    /// モードは mix（新図面・青の上に旧図面・赤）に切り替え、α はページ用設定を使う。
    pub fn start_pages(&mut self, pairs: Vec<PagePair>) -> Result<()> {
        if pairs.is_empty() {
            self.notice = Some("新図面・旧図面の両方を読み込んでください".to_string());
            return Err(Error::MissingImage("page pairs"));
        }

        self.pages = pairs
            .into_iter()
            .map(|p| PageSlot {
                picker: p
                    .calibration
                    .as_ref()
                    .map(CalibrationPicker::from_pair)
                    .unwrap_or_default(),
                old: Some(p.old),
                new: Some(p.new),
            })
            .collect();
        self.index = 0;
        self.paged = true;
        self.mode = CompareMode::Mix;
        self.book.reset_baseline();
        self.cache.clear();
        self.notice = None;
        log::info!("comparing {} page pair(s)", self.pages.len());
        self.redraw();
        Ok(())
    }

    pub fn page_index(&self) -> usize {
        self.index
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_paged(&self) -> bool {
        self.paged
    }

    /// 保持している抽出マスクの数
    pub fn cached_masks(&self) -> usize {
        self.cache.len()
    }

    pub fn has_images(&self) -> bool {
        let page = &self.pages[self.index];
        page.old.is_some() && page.new.is_some()
    }

    pub fn image(&self, side: Side) -> Option<&SourceImage> {
        let page = &self.pages[self.index];
        match side {
            Side::Old => page.old.as_ref(),
            Side::New => page.new.as_ref(),
        }
    }

    pub fn next_page(&mut self) -> bool {
        if self.index + 1 >= self.pages.len() {
            return false;
        }
        self.index += 1;
        self.redraw();
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.redraw();
        true
    }

    pub fn go_to_page(&mut self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(Error::PageOutOfRange {
                index,
                len: self.pages.len(),
            });
        }
        self.index = index;
        self.redraw();
        Ok(())
    }

    // ------------------------------
    // 基準点
    // ------------------------------

    pub fn stage(&self) -> CalibrationStage {
        self.pages[self.index].picker.stage()
    }

    /// 基準点クリック（座標はクリック対象の図面の画素座標）
    pub fn click(&mut self, point: Point) -> CalibrationStage {
        if !self.has_images() {
            self.notice = Some("新図面・旧図面の両方を読み込んでください".to_string());
            return self.stage();
        }

        let stage = self.pages[self.index].picker.pick(point);
        self.notice = None;
        if stage == CalibrationStage::Complete {
            self.redraw();
        }
        self.stage()
    }

    pub fn calibration(&self) -> Option<CalibrationPair> {
        self.pages[self.index].picker.pair().ok()
    }

    pub fn set_calibration(&mut self, pair: CalibrationPair) {
        self.pages[self.index].picker = CalibrationPicker::from_pair(&pair);
        self.notice = None;
        self.redraw();
    }

    /// 基準点なしでそのまま重ねる
    pub fn use_identity_calibration(&mut self) {
        self.set_calibration(CalibrationPair::identity());
    }

    pub fn reset_calibration(&mut self) {
        self.pages[self.index].picker.reset();
        self.rendered = false;
        self.notice = None;
    }

    /// 基準点取得中の表示（対象の図面＋取得済みマーカー）
    pub fn calibration_preview(&mut self) -> Option<&CompositeFrame> {
        let page = &self.pages[self.index];
        let side = page.picker.stage().side()?;
        let (source, points, tint) = match side {
            Side::Old => (page.old.as_ref()?, page.picker.old_points(), Tint::red(255)),
            Side::New => (page.new.as_ref()?, page.picker.new_points(), Tint::blue(255)),
        };

        self.rendered = false;
        self.frame.reset(source.image.width(), source.image.height());
        compose::draw_image(
            &mut self.frame,
            &source.image,
            &Affine::IDENTITY,
            compose::Sampling::Nearest,
        );
        for p in points {
            compose::draw_marker(&mut self.frame, *p, MARKER_RADIUS, tint);
        }
        Some(&self.frame)
    }

    // ------------------------------
    // モード・調整
    // ------------------------------

    pub fn mode(&self) -> CompareMode {
        self.mode
    }

    /// モード変更（基準点取得済みなら即反映）
    pub fn set_mode(&mut self, mode: CompareMode) {
        self.mode = mode;
        if self.pages[self.index].picker.is_complete() {
            self.redraw();
        }
    }

    pub fn current_adjustment(&self) -> Adjustment {
        self.book.current(self.index)
    }

    pub fn adjustments(&self) -> &AdjustmentBook {
        &self.book
    }

    pub fn set_adjustments(&mut self, book: AdjustmentBook) {
        self.book = book;
        self.redraw();
    }

    /// 位置を確定する（以降の方向キーは無効）
    pub fn lock_position(&mut self) {
        self.locked = true;
        self.notice = Some("位置を確定しました（矢印キーでの移動は無効）".to_string());
    }

    pub fn unlock_position(&mut self) {
        self.locked = false;
        self.notice = None;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// 方向キー。基準点未確定・位置確定後は無視して false を返す。
    pub fn nudge(&mut self, direction: Nudge) -> bool {
        if self.locked || !self.pages[self.index].picker.is_complete() {
            return false;
        }
        let step = self.settings.nudge_step;
        self.book.current_mut(self.index).nudge(direction, step);
        self.redraw();
        true
    }

    pub fn rotate_left(&mut self) {
        let step = self.settings.rotate_step_deg;
        self.book.current_mut(self.index).rotate(-step);
        self.redraw();
    }

    pub fn rotate_right(&mut self) {
        let step = self.settings.rotate_step_deg;
        self.book.current_mut(self.index).rotate(step);
        self.redraw();
    }

    /// ドラッグ開始（座標はキャンバス画素）
    pub fn drag_begin(&mut self, pointer: Point) {
        let current = self.book.current(self.index);
        self.drag = Some(DragState {
            start: pointer,
            start_dx: current.dx,
            start_dy: current.dy,
        });
    }

    pub fn drag_to(&mut self, pointer: Point) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let adj = self.book.current_mut(self.index);
        adj.dx = drag.start_dx + (pointer.x - drag.start.x);
        adj.dy = drag.start_dy + (pointer.y - drag.start.y);
        self.redraw();
        true
    }

    pub fn drag_end(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// このページだけ調整 ON/OFF（切り替え後の状態を返す）
    pub fn toggle_per_page(&mut self) -> bool {
        let enabled = self.book.toggle_override(self.index);
        self.redraw();
        enabled
    }

    pub fn is_per_page(&self) -> bool {
        self.book.is_override_enabled(self.index)
    }

    /// 現在の調整を全ページ共通にする
    pub fn apply_to_all(&mut self) {
        self.book.apply_to_all(self.index);
        self.redraw();
    }

    /// このページだけ共通値に戻す
    pub fn reset_page(&mut self) {
        self.book.reset_page(self.index);
        self.redraw();
    }

    // ------------------------------
    // 描画
    // ------------------------------

    /// 現在の状態でキャンバスを描き直す。描けない状態なら None。
    pub fn redraw(&mut self) -> Option<&CompositeFrame> {
        self.rendered = false;
        self.trim_cache();
        let adjustment = self.book.current(self.index);
        let options = *self.view_options();
        let result = draw_page(
            &self.pages[self.index],
            &mut self.cache,
            &mut self.frame,
            self.mode,
            &adjustment,
            &options,
            Pass::Preview,
        );

        match result {
            Ok(_) => {
                self.rendered = true;
                self.notice = None;
                Some(&self.frame)
            }
            Err(Error::DegenerateCalibration(which)) => {
                log::warn!("degenerate calibration ({}), points cleared", which);
                self.pages[self.index].picker.reset();
                self.notice = Some(
                    "基準点①と②が同じ位置です。離れた2点を選び直してください".to_string(),
                );
                None
            }
            Err(e) => {
                log::debug!("redraw skipped: {}", e);
                None
            }
        }
    }

    /// 最後の再描画結果
    pub fn frame(&self) -> Option<&CompositeFrame> {
        self.rendered.then_some(&self.frame)
    }

    /// 保存用の画像を作る（表示用キャンバスには触れない）
    ///
    /// 背景は不透明な白になるが、線は描画時のαを残す（白で合成はしない）。
    pub fn export(&mut self) -> Result<RgbaImage> {
        self.trim_cache();
        let adjustment = self.book.current(self.index);
        let options = *self.export_options();
        let mut frame = CompositeFrame::new(0, 0);
        draw_page(
            &self.pages[self.index],
            &mut self.cache,
            &mut frame,
            self.mode,
            &adjustment,
            &options,
            Pass::Export,
        )?;
        Ok(frame.into_image())
    }

    fn view_options(&self) -> &RenderOptions {
        if self.paged {
            &self.settings.pages
        } else {
            &self.settings.preview
        }
    }

    fn export_options(&self) -> &RenderOptions {
        if self.paged {
            &self.settings.pages
        } else {
            &self.settings.export
        }
    }

    /// 現在ページ・現在モードの表示用と保存用のマスクだけを残す
    fn trim_cache(&mut self) {
        let page = &self.pages[self.index];
        let mut keep = Vec::with_capacity(4);
        if let (Some(old), Some(new)) = (&page.old, &page.new) {
            for options in [self.view_options(), self.export_options()] {
                keep.push(MaskKey::new(&old.id, self.mode.fixed_tint(options), options.threshold));
                keep.push(MaskKey::new(&new.id, self.mode.free_tint(options), options.threshold));
            }
        }
        let dropped = self.cache.retain_keys(&keep);
        if dropped > 0 {
            log::debug!("dropped {} cached mask(s)", dropped);
        }
    }

    // ------------------------------
    // 表示用テキスト
    // ------------------------------

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn guide(&self) -> String {
        if let Some(notice) = &self.notice {
            return notice.clone();
        }
        if !self.has_images() {
            return "旧図面・新図面を読み込んでください".to_string();
        }
        match self.stage() {
            CalibrationStage::Complete => format!("比較処理 完了（モード：{}）", self.mode),
            stage => stage.guide().to_string(),
        }
    }

    pub fn status_line(&self) -> String {
        let t = self.current_adjustment();
        format!(
            "ページ {}/{}  dx:{:.1} dy:{:.1} rot:{:.2}°",
            self.index + 1,
            self.pages.len(),
            t.dx,
            t.dy,
            t.rotation_deg
        )
    }

    pub fn per_page_label(&self) -> String {
        format!(
            "このページだけ調整：{}",
            if self.is_per_page() { "ON" } else { "OFF" }
        )
    }
}

/// 1ページ分を描く
fn draw_page(
    page: &PageSlot,
    cache: &mut MaskCache,
    frame: &mut CompositeFrame,
    mode: CompareMode,
    adjustment: &Adjustment,
    options: &RenderOptions,
    pass: Pass,
) -> Result<PassStats> {
    let old = page.old.as_ref().ok_or(Error::MissingImage("old"))?;
    let new = page.new.as_ref().ok_or(Error::MissingImage("new"))?;
    let pair = page.picker.pair()?;
    let transform = SimilarityTransform::solve(&pair)?;

    let fixed = cache.get_or_extract(&old.id, &old.image, mode.fixed_tint(options), options.threshold);
    let free = cache.get_or_extract(&new.id, &new.image, mode.free_tint(options), options.threshold);

    frame.reset(new.image.width(), new.image.height());
    Ok(pipeline::compose_pass(
        frame,
        mode,
        &LayerMasks {
            fixed: &fixed,
            free: &free,
        },
        &transform,
        adjustment,
        options.sampling,
        pass,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn drawing(w: u32, h: u32, ink: &[(u32, u32)]) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
        for &(x, y) in ink {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
        img
    }

    fn loaded_session() -> Session {
        let mut s = Session::default();
        s.set_image(Side::Old, SourceImage::new("old", drawing(20, 10, &[(2, 2), (3, 2)])));
        s.set_image(Side::New, SourceImage::new("new", drawing(30, 12, &[(5, 5)])));
        s
    }

    fn calibrate(s: &mut Session) {
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(10.0, 0.0));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(10.0, 0.0));
    }

    #[test]
    fn test_redraw_noop_without_images() {
        let mut s = Session::default();
        assert!(s.redraw().is_none());
        assert_eq!(s.click(Point::new(1.0, 1.0)), CalibrationStage::OldFirst);
        assert!(s.notice().is_some());
        assert!(s.export().is_err());
    }

    #[test]
    fn test_incomplete_calibration_no_render() {
        let mut s = loaded_session();
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(5.0, 0.0));
        s.click(Point::new(1.0, 1.0));
        assert!(s.redraw().is_none());
        assert!(s.frame().is_none());
        assert!(matches!(
            s.export().unwrap_err(),
            Error::IncompleteCalibration { picked: 3 }
        ));
    }

    #[test]
    fn test_fourth_click_renders_at_new_size() {
        let mut s = loaded_session();
        calibrate(&mut s);
        assert_eq!(s.stage(), CalibrationStage::Complete);
        let frame = s.frame().expect("rendered");
        assert_eq!(frame.dimensions(), (30, 12));
        assert!(s.guide().contains("比較処理 完了"));
    }

    #[test]
    fn test_degenerate_calibration_blocks_render() {
        let mut s = loaded_session();
        s.click(Point::new(4.0, 4.0));
        s.click(Point::new(4.0, 4.0));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(1.0, 0.0));
        assert!(s.frame().is_none());
        assert!(s.notice().is_some());
        assert_eq!(s.stage(), CalibrationStage::OldFirst);
    }

    #[test]
    fn test_guide_recovers_after_degenerate_pick() {
        let mut s = loaded_session();
        s.click(Point::new(4.0, 4.0));
        s.click(Point::new(4.0, 4.0));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(1.0, 0.0));
        assert!(s.guide().contains("同じ位置"));

        s.click(Point::new(0.0, 0.0));
        assert!(s.notice().is_none());
        assert_eq!(s.guide(), CalibrationStage::OldSecond.guide());
        s.click(Point::new(10.0, 0.0));
        s.click(Point::new(0.0, 0.0));
        s.click(Point::new(10.0, 0.0));
        assert!(s.frame().is_some());
        assert!(s.guide().contains("比較処理 完了"));
    }

    #[test]
    fn test_nudge_requires_calibration_and_unlocked() {
        let mut s = loaded_session();
        assert!(!s.nudge(Nudge::Right));
        calibrate(&mut s);
        assert!(s.nudge(Nudge::Right));
        assert_eq!(s.current_adjustment().dx, 0.5);

        s.lock_position();
        assert!(!s.nudge(Nudge::Right));
        assert_eq!(s.current_adjustment().dx, 0.5);
        s.unlock_position();
        assert!(s.nudge(Nudge::Up));
        assert_eq!(s.current_adjustment().dy, -0.5);
    }

    #[test]
    fn test_drag_is_relative_to_start() {
        let mut s = loaded_session();
        calibrate(&mut s);
        s.nudge(Nudge::Right);
        s.drag_begin(Point::new(100.0, 100.0));
        s.drag_to(Point::new(103.0, 98.0));
        s.drag_to(Point::new(110.0, 101.0));
        s.drag_end();
        assert_eq!(s.current_adjustment().dx, 10.5);
        assert_eq!(s.current_adjustment().dy, 1.0);
        assert!(!s.drag_to(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_rotate_buttons() {
        let mut s = loaded_session();
        s.rotate_right();
        s.rotate_right();
        s.rotate_left();
        assert!((s.current_adjustment().rotation_deg - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_mode_change_redraws_when_calibrated() {
        let mut s = loaded_session();
        s.set_mode(CompareMode::Mix);
        assert!(s.frame().is_none());
        calibrate(&mut s);
        s.set_mode(CompareMode::Add);
        assert!(s.frame().is_some());
        assert!(s.guide().contains("add"));
    }

    #[test]
    fn test_new_image_resets_calibration() {
        let mut s = loaded_session();
        calibrate(&mut s);
        s.set_image(Side::New, SourceImage::new("new2", drawing(8, 8, &[])));
        assert_eq!(s.stage(), CalibrationStage::OldFirst);
        assert!(s.frame().is_none());
    }

    #[test]
    fn test_calibration_preview_switches_image() {
        let mut s = loaded_session();
        assert_eq!(s.calibration_preview().unwrap().dimensions(), (20, 10));
        s.click(Point::new(1.0, 1.0));
        let preview = s.calibration_preview().unwrap();
        assert_eq!(preview.as_image().get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        s.click(Point::new(9.0, 1.0));
        assert_eq!(s.calibration_preview().unwrap().dimensions(), (30, 12));
        s.click(Point::new(1.0, 1.0));
        s.click(Point::new(9.0, 1.0));
        assert!(s.calibration_preview().is_none());
    }

    fn page(id: usize) -> PagePair {
        PagePair {
            old: SourceImage::new(format!("old{}", id), drawing(10, 10, &[(1, 1)])),
            new: SourceImage::new(format!("new{}", id), drawing(10, 10, &[(1, 1)])),
            calibration: Some(CalibrationPair::identity()),
        }
    }

    #[test]
    fn test_pages_navigation_and_overrides() {
        let mut s = Session::default();
        s.start_pages(vec![page(0), page(1), page(2)]).unwrap();
        assert_eq!(s.page_count(), 3);
        assert!(s.frame().is_some());
        assert!(!s.prev_page());

        s.nudge(Nudge::Right);
        assert!(s.next_page());
        assert_eq!(s.current_adjustment().dx, 0.5);

        assert!(s.toggle_per_page());
        s.rotate_right();
        assert!(s.per_page_label().ends_with("ON"));
        assert!(s.next_page());
        assert_eq!(s.current_adjustment().rotation_deg, 0.0);
        assert!(s.prev_page());
        assert!((s.current_adjustment().rotation_deg - 0.1).abs() < 1e-12);

        s.apply_to_all();
        assert!(!s.is_per_page());
        s.go_to_page(2).unwrap();
        assert!((s.current_adjustment().rotation_deg - 0.1).abs() < 1e-12);
        assert!(s.go_to_page(3).is_err());
        assert!(!s.next_page());
    }

    #[test]
    fn test_pages_draw_mix_with_page_alpha() {
        let mut s = Session::default();
        s.set_mode(CompareMode::Delete);
        s.start_pages(vec![PagePair {
            old: SourceImage::new("old", drawing(10, 10, &[(1, 1)])),
            new: SourceImage::new("new", drawing(10, 10, &[(5, 5)])),
            calibration: Some(CalibrationPair::identity()),
        }])
        .unwrap();
        assert!(s.is_paged());
        assert_eq!(s.mode(), CompareMode::Mix);

        let frame = s.frame().expect("rendered");
        assert_eq!(frame.as_image().get_pixel(1, 1), &Rgba([255, 0, 0, 120]));
        assert_eq!(frame.as_image().get_pixel(5, 5), &Rgba([0, 120, 255, 120]));

        // 保存もページ用のα
        let out = s.export().unwrap();
        assert_eq!(out.get_pixel(1, 1), &Rgba([255, 0, 0, 120]));
    }

    #[test]
    fn test_cache_holds_only_current_page() {
        let mut s = Session::default();
        s.start_pages((0..5).map(page).collect()).unwrap();
        while s.next_page() {
            for mode in CompareMode::ALL {
                s.set_mode(mode);
            }
        }
        assert_eq!(s.page_index(), 4);
        assert!(s.cached_masks() <= 4);

        s.export().unwrap();
        assert!(s.cached_masks() <= 4);
    }

    #[test]
    fn test_start_pages_resets_baseline() {
        let mut s = Session::default();
        s.start_pages(vec![page(0)]).unwrap();
        s.nudge(Nudge::Down);
        s.start_pages(vec![page(0), page(1)]).unwrap();
        assert_eq!(s.current_adjustment(), Adjustment::default());
        assert!(s.start_pages(Vec::new()).is_err());
    }

    #[test]
    fn test_status_line_format() {
        let mut s = Session::default();
        s.start_pages(vec![page(0), page(1)]).unwrap();
        s.nudge(Nudge::Left);
        s.rotate_left();
        assert_eq!(s.status_line(), "ページ 1/2  dx:-0.5 dy:0.0 rot:-0.10°");
    }

    #[test]
    fn test_export_is_flattened() {
        let mut s = Session::default();
        s.start_pages(vec![page(0)]).unwrap();
        let out = s.export().unwrap();
        assert_eq!(out.get_pixel(9, 9), &Rgba([255, 255, 255, 255]));
        // 同じ位置の線は重なり（黒）
        assert_eq!(&out.get_pixel(1, 1).0[..3], &[0, 0, 0]);
        // 表示用は透明背景のまま
        assert_eq!(s.frame().unwrap().as_image().get_pixel(9, 9)[3], 0);
    }

    #[test]
    fn test_pair_pages_prefix() {
        let pairing = pair_pages(vec![1, 2, 3], vec![0, 0]);
        assert_eq!(pairing.pairs, vec![(1, 0), (2, 0)]);
        assert_eq!(pairing.unused_old, 1);
        assert_eq!(pairing.unused_new, 0);
        assert!(pairing.has_unused());

        let even = pair_pages(vec!['a'], vec!['b']);
        assert!(!even.has_unused());
    }
}
