use std::sync::mpsc::{self, Receiver};

use drawing_diff::config::Config;
use drawing_diff::project::ProjectFile;
use drawing_diff_common::{
    CalibrationStage, CompareMode, Nudge, PagePair, Session, Side,
};
use eframe::egui::{self, Color32, RichText};
use eframe::egui::{FontData, FontDefinitions, FontFamily};

use crate::io::{load_page_pairs, load_project, open_source, save_png, save_project, to_color_image};
use crate::model::{CanvasView, LoadedPaths};

pub struct DesktopApp {
    session: Session,
    config: Config,
    paths: LoadedPaths,
    status: String,
    texture: Option<egui::TextureHandle>,
    texture_size: [u32; 2],
    texture_dirty: bool,
    view: CanvasView,
    pages_rx: Option<Receiver<UiMessage>>,
    loading_pages: bool,
}

enum UiMessage {
    PagesLoaded(anyhow::Result<(Vec<PagePair>, (usize, usize))>),
}

impl DesktopApp {
    pub fn new(config: Config) -> Self {
        Self {
            session: Session::new(config.session_settings()),
            config,
            paths: LoadedPaths::default(),
            status: String::new(),
            texture: None,
            texture_size: [0, 0],
            texture_dirty: true,
            view: CanvasView::default(),
            pages_rx: None,
            loading_pages: false,
        }
    }

    fn open_image(&mut self, side: Side) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg"])
            .pick_file()
        else {
            return;
        };

        match open_source(&path) {
            Ok(source) => {
                self.session.set_image(side, source);
                self.status = format!("Loaded {}", path.display());
                match side {
                    Side::Old => self.paths.old = Some(path),
                    Side::New => self.paths.new = Some(path),
                }
            }
            Err(err) => self.status = format!("Load failed: {err:#}"),
        }
        self.texture_dirty = true;
    }

    fn open_pages(&mut self) {
        let Some(old_dir) = rfd::FileDialog::new().set_title("旧図面フォルダ").pick_folder() else {
            return;
        };
        let Some(new_dir) = rfd::FileDialog::new().set_title("新図面フォルダ").pick_folder() else {
            return;
        };

        let project = self
            .paths
            .project
            .as_deref()
            .map(ProjectFile::load);
        let (tx, rx) = mpsc::channel();
        self.pages_rx = Some(rx);
        self.loading_pages = true;
        self.status = "Loading pages...".to_string();

        std::thread::spawn(move || {
            let result = load_page_pairs(&old_dir, &new_dir, project.as_ref());
            let _ = tx.send(UiMessage::PagesLoaded(result));
        });
    }

    fn open_project(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        else {
            return;
        };

        match load_project(&path) {
            Ok(project) => {
                self.session.set_mode(project.mode);
                self.session.set_adjustments(project.adjustments.clone());
                if let Some(pair) = project.calibration {
                    if self.session.has_images() {
                        self.session.set_calibration(pair);
                    }
                }
                self.status = format!("Loaded {}", path.display());
                self.paths.project = Some(path);
            }
            Err(err) => self.status = format!("Load failed: {err:#}"),
        }
        self.texture_dirty = true;
    }

    fn save_project(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("drawing-diff.json")
            .save_file()
        else {
            return;
        };

        let mut project = ProjectFile::load(&path);
        project.mode = self.session.mode();
        project.calibration = self.session.calibration();
        project.adjustments = self.session.adjustments().clone();

        match save_project(&path, &mut project) {
            Ok(_) => {
                self.status = format!("Saved {}", path.display());
                self.paths.project = Some(path);
            }
            Err(err) => self.status = format!("Save failed: {err:#}"),
        }
    }

    fn save_diff(&mut self) {
        let image = match self.session.export() {
            Ok(image) => image,
            Err(err) => {
                self.status = format!("Export failed: {err}");
                return;
            }
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(&self.config.output_name)
            .save_file()
        else {
            return;
        };

        match save_png(&path, &image) {
            Ok(_) => self.status = format!("Saved {}", path.display()),
            Err(err) => self.status = format!("Save failed: {err:#}"),
        }
    }

    fn poll_messages(&mut self) {
        let Some(rx) = &self.pages_rx else {
            return;
        };
        let Ok(msg) = rx.try_recv() else {
            return;
        };

        let UiMessage::PagesLoaded(result) = msg;
        self.pages_rx = None;
        self.loading_pages = false;
        match result {
            Ok((pages, (unused_old, unused_new))) => {
                let count = pages.len();
                match self.session.start_pages(pages) {
                    Ok(_) if unused_old + unused_new > 0 => {
                        self.status = format!(
                            "{count}ページを比較（比較しないページ: 旧 {unused_old} / 新 {unused_new}）"
                        );
                    }
                    Ok(_) => self.status = format!("{count}ページを比較"),
                    Err(err) => self.status = format!("Load failed: {err}"),
                }
            }
            Err(err) => self.status = format!("Load failed: {err:#}"),
        }
        self.texture_dirty = true;
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let keys = [
            (egui::Key::ArrowUp, Nudge::Up),
            (egui::Key::ArrowDown, Nudge::Down),
            (egui::Key::ArrowLeft, Nudge::Left),
            (egui::Key::ArrowRight, Nudge::Right),
        ];
        for (key, nudge) in keys {
            if ctx.input(|i| i.key_pressed(key)) && self.session.nudge(nudge) {
                self.texture_dirty = true;
            }
        }
    }

    /// 表示中の画像が変わったときだけテクスチャを作り直す
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if !self.texture_dirty {
            return;
        }
        self.texture_dirty = false;

        let frame = if self.session.stage() == CalibrationStage::Complete {
            self.session.frame()
        } else {
            self.session.calibration_preview()
        };

        let Some(frame) = frame else {
            self.texture = None;
            self.texture_size = [0, 0];
            return;
        };

        let (w, h) = frame.dimensions();
        let color_image = to_color_image(frame.as_image());
        match &mut self.texture {
            Some(texture) if self.texture_size == [w, h] => {
                texture.set(color_image, egui::TextureOptions::LINEAR);
            }
            _ => {
                self.texture = Some(ctx.load_texture("canvas", color_image, egui::TextureOptions::LINEAR));
            }
        }
        self.texture_size = [w, h];
    }

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = &self.texture else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new(self.session.guide()).size(16.0));
            });
            return;
        };
        let texture_id = texture.id();

        let available = ui.available_size();
        self.view = CanvasView::fit([available.x, available.y], self.texture_size);
        let [w, h] = self.view.display_size(self.texture_size);
        let (rect, response) = ui.allocate_exact_size(egui::vec2(w, h), egui::Sense::click_and_drag());

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::WHITE);
        painter.image(
            texture_id,
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            Color32::WHITE,
        );

        let to_image = |pos: egui::Pos2| {
            let offset = pos - rect.min;
            self.view.to_image([offset.x, offset.y])
        };

        if self.session.stage() != CalibrationStage::Complete {
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let point = to_image(pos);
                    self.session.click(point);
                    self.texture_dirty = true;
                }
            }
            return;
        }

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.session.drag_begin(to_image(pos));
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                if self.session.drag_to(to_image(pos)) {
                    self.texture_dirty = true;
                }
            }
        }
        if response.drag_stopped() {
            self.session.drag_end();
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("図面");
        ui.horizontal(|ui| {
            if ui.button("旧図面を開く").clicked() {
                self.open_image(Side::Old);
            }
            if ui.button("新図面を開く").clicked() {
                self.open_image(Side::New);
            }
        });
        if ui
            .add_enabled(!self.loading_pages, egui::Button::new("ページ一括比較..."))
            .clicked()
        {
            self.open_pages();
        }
        for (label, path) in [("旧", &self.paths.old), ("新", &self.paths.new)] {
            let name = path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "-".to_string());
            ui.label(RichText::new(format!("{label}: {name}")).color(Color32::from_gray(170)));
        }

        ui.separator();
        ui.heading("基準点");
        ui.horizontal(|ui| {
            if ui.button("取り直す").clicked() {
                self.session.reset_calibration();
                self.texture_dirty = true;
            }
            if ui
                .add_enabled(self.session.has_images(), egui::Button::new("基準点なし"))
                .clicked()
            {
                self.session.use_identity_calibration();
                self.texture_dirty = true;
            }
        });

        ui.separator();
        ui.heading("モード");
        let mut mode = self.session.mode();
        for m in CompareMode::ALL {
            ui.radio_value(&mut mode, m, m.label());
        }
        if mode != self.session.mode() {
            self.session.set_mode(mode);
            self.texture_dirty = true;
        }

        ui.separator();
        ui.heading("調整");
        ui.horizontal(|ui| {
            if ui.button("⟲ 左回転").clicked() {
                self.session.rotate_left();
                self.texture_dirty = true;
            }
            if ui.button("⟳ 右回転").clicked() {
                self.session.rotate_right();
                self.texture_dirty = true;
            }
        });
        let mut locked = self.session.is_locked();
        if ui.checkbox(&mut locked, "位置を確定").changed() {
            if locked {
                self.session.lock_position();
            } else {
                self.session.unlock_position();
            }
        }
        if ui.button(self.session.per_page_label()).clicked() {
            self.session.toggle_per_page();
            self.texture_dirty = true;
        }
        ui.horizontal(|ui| {
            if ui.button("全ページに適用").clicked() {
                self.session.apply_to_all();
                self.texture_dirty = true;
            }
            if ui.button("このページをリセット").clicked() {
                self.session.reset_page();
                self.texture_dirty = true;
            }
        });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("◀ 前").clicked() && self.session.prev_page() {
                self.texture_dirty = true;
            }
            ui.label(format!(
                "{}/{}",
                self.session.page_index() + 1,
                self.session.page_count()
            ));
            if ui.button("次 ▶").clicked() && self.session.next_page() {
                self.texture_dirty = true;
            }
        });

        ui.separator();
        let can_export = self.session.frame().is_some();
        if ui.add_enabled(can_export, egui::Button::new("差分PNGを保存")).clicked() {
            self.save_diff();
        }
    }
}

pub fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = FontDefinitions::default();
    let candidates = [
        r"C:\Windows\Fonts\meiryo.ttc",
        r"C:\Windows\Fonts\msgothic.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    ];

    for path in candidates {
        if let Ok(data) = std::fs::read(path) {
            fonts.font_data.insert("jp_fallback".to_string(), FontData::from_owned(data));
            fonts.families
                .entry(FontFamily::Proportional)
                .or_default()
                .insert(0, "jp_fallback".to_string());
            fonts.families
                .entry(FontFamily::Monospace)
                .or_default()
                .insert(0, "jp_fallback".to_string());
            ctx.set_fonts(fonts);
            return;
        }
    }
    log::warn!("no CJK font found, Japanese labels may not render");
}

impl Default for DesktopApp {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.loading_pages {
            ctx.request_repaint();
        }
        self.poll_messages();
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Project").clicked() {
                        self.open_project();
                        ui.close_menu();
                    }
                    if ui.button("Save Project").clicked() {
                        self.save_project();
                        ui.close_menu();
                    }
                });
                ui.separator();
                ui.label(RichText::new(self.session.guide()).color(Color32::from_rgb(246, 196, 69)));
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(RichText::new(&self.status).color(Color32::from_gray(170)));
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.session.status_line());
                ui.separator();
                ui.label(self.session.per_page_label());
            });
        });

        egui::SidePanel::left("controls").resizable(true).show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_controls(ui);
            });
        });

        self.refresh_texture(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_canvas(ui);
        });
    }
}

