//! 差分画像の保存
//!
//! 1枚の保存と、ページ一括の並列出力。

use crate::error::{DrawingDiffError, Result};
use crate::loader;
use drawing_diff_common::pipeline::export_diff;
use drawing_diff_common::{AdjustmentBook, CalibrationPair, CompareMode, RenderOptions};
use image::RgbaImage;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// 出力先がフォルダ（または拡張子なし）ならファイル名を補う
pub fn output_path(output: &Path, default_name: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(default_name)
    } else {
        output.to_path_buf()
    }
}

/// ページ番号付きのファイル名（diff.png → diff_001.png）
pub fn page_file_name(default_name: &str, page: usize) -> String {
    let path = Path::new(default_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("diff");
    format!("{}_{:03}.png", stem, page + 1)
}

/// PNG で保存（親フォルダがなければ作る）
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| DrawingDiffError::ImageSave(format!("{}: {}", path.display(), e)))?;
    log::debug!("saved {} ({}x{})", path.display(), image.width(), image.height());
    Ok(())
}

/// ページ一括出力の1ページ分
#[derive(Debug, Clone)]
pub struct PageJob {
    pub index: usize,
    pub old: PathBuf,
    pub new: PathBuf,
}

/// 組になったページを並列で書き出す
///
/// 位置合わせは全ページ共通、手動調整はページごとに `book` から取る。
/// 1ページでも失敗したら最初のエラーを返す（成功分のファイルは残る）。
pub fn export_pages(
    jobs: &[PageJob],
    calibration: &CalibrationPair,
    mode: CompareMode,
    book: &AdjustmentBook,
    options: &RenderOptions,
    out_dir: &Path,
    default_name: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let results: Vec<Result<PathBuf>> = jobs
        .par_iter()
        .map(|job| {
            let old = loader::load_image(&job.old)?;
            let new = loader::load_image(&job.new)?;
            let adjustment = book.current(job.index);

            let diff = export_diff(&old, &new, calibration, mode, &adjustment, options)?;
            let path = out_dir.join(page_file_name(default_name, job.index));
            save_png(&diff, &path)?;

            pb.inc(1);
            pb.set_message(format!("{}", path.display()));
            Ok(path)
        })
        .collect();

    pb.finish_and_clear();
    results.into_iter().collect()
}
