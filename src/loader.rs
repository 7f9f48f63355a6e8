//! 図面画像の読み込み
//!
//! PNG/JPEG を RGBA で読み込む。フォルダ指定時は直下の画像をファイル名順に並べる。

use crate::error::{DrawingDiffError, Result};
use drawing_diff_common::SourceImage;
use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use drawing_diff_common::{pair_pages, PagePairing};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

/// 画像1枚を RGBA で読み込む
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    if !path.exists() {
        return Err(DrawingDiffError::FileNotFound(path.display().to_string()));
    }

    let img = image::open(path)
        .map_err(|e| DrawingDiffError::ImageLoad(format!("{}: {}", path.display(), e)))?;
    log::debug!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img.to_rgba8())
}

/// 画像を読み込み、内容ハッシュをIDにする
pub fn load_source(path: &Path) -> Result<SourceImage> {
    let image = load_image(path)?;
    let id = source_id(path)?;
    Ok(SourceImage::new(id, image))
}

/// ファイル内容の SHA-256（マスクキャッシュのキー）
pub fn source_id(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}

/// フォルダ直下の図面画像をファイル名順で返す
pub fn scan_pages(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(DrawingDiffError::FolderNotFound(folder.display().to_string()));
    }

    let mut pages: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();

    // ファイル名でソート
    pages.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(pages)
}

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

/// 旧・新フォルダのページを先頭から組にする
pub fn pair_folders(old_dir: &Path, new_dir: &Path) -> Result<PagePairing<PathBuf>> {
    let old = scan_pages(old_dir)?;
    let new = scan_pages(new_dir)?;

    if old.is_empty() {
        return Err(DrawingDiffError::NoImagesFound(old_dir.display().to_string()));
    }
    if new.is_empty() {
        return Err(DrawingDiffError::NoImagesFound(new_dir.display().to_string()));
    }

    Ok(pair_pages(old, new))
}
