use anyhow::{Context, Result};
use std::path::Path;

use drawing_diff::project::ProjectFile;
use drawing_diff::{export, loader};
use drawing_diff_common::{CalibrationPair, PagePair, SourceImage};
use eframe::egui;
use image::RgbaImage;

pub fn open_source(path: &Path) -> Result<SourceImage> {
    loader::load_source(path).with_context(|| format!("read {}", path.display()))
}

/// 旧・新フォルダを先頭から組にして読み込む。戻り値の2つ目は使わないページ数（旧, 新）。
pub fn load_page_pairs(
    old_dir: &Path,
    new_dir: &Path,
    project: Option<&ProjectFile>,
) -> Result<(Vec<PagePair>, (usize, usize))> {
    let pairing = loader::pair_folders(old_dir, new_dir)
        .with_context(|| format!("scan {} / {}", old_dir.display(), new_dir.display()))?;
    let calibration = project
        .map(ProjectFile::calibration_or_identity)
        .unwrap_or_else(CalibrationPair::identity);

    let mut pages = Vec::with_capacity(pairing.pairs.len());
    for (old, new) in &pairing.pairs {
        pages.push(PagePair {
            old: open_source(old)?,
            new: open_source(new)?,
            calibration: Some(calibration),
        });
    }
    Ok((pages, (pairing.unused_old, pairing.unused_new)))
}

pub fn save_png(path: &Path, image: &RgbaImage) -> Result<()> {
    export::save_png(image, path).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn load_project(path: &Path) -> Result<ProjectFile> {
    ProjectFile::open(path).with_context(|| format!("parse {}", path.display()))
}

pub fn save_project(path: &Path, project: &mut ProjectFile) -> Result<()> {
    project
        .save(path)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// 合成結果をテクスチャ用に変換（αは非乗算のまま）
pub fn to_color_image(image: &RgbaImage) -> egui::ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}
