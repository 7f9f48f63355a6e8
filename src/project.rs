//! 比較プロジェクトファイル
//!
//! 基準点・モード・手動調整（共通値とページ別）をJSONで保存し、
//! CLI の各コマンド間やデスクトップ版と受け渡す。

use crate::error::{DrawingDiffError, Result};
use drawing_diff_common::{AdjustmentBook, CalibrationPair, CompareMode};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// バージョン（互換性チェック用）
    version: u32,
    #[serde(default)]
    pub mode: CompareMode,
    #[serde(default)]
    pub calibration: Option<CalibrationPair>,
    #[serde(default)]
    pub adjustments: AdjustmentBook,
    /// 最終保存日時
    #[serde(default)]
    pub saved_at: Option<String>,
}

impl ProjectFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn version(&self) -> u32 {
        self.version
    }

    /// 読み込み（なければ、または壊れていれば新規）
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("project file open failed: {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, ProjectFile>(reader) {
            Ok(project) => {
                // バージョンチェック
                if project.version != Self::CURRENT_VERSION {
                    eprintln!("プロジェクトファイルのバージョン不一致、新規として扱います");
                    return Self::default();
                }
                project
            }
            Err(e) => {
                log::warn!("project file parse failed: {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// 読み込み（存在しない・壊れている・バージョン違いの場合はエラー）
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let project: ProjectFile = serde_json::from_reader(BufReader::new(file))?;
        if project.version != Self::CURRENT_VERSION {
            return Err(DrawingDiffError::ProjectVersion {
                found: project.version,
                expected: Self::CURRENT_VERSION,
            });
        }
        Ok(project)
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        self.saved_at = Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// 記録された基準点（なければ恒等）
    pub fn calibration_or_identity(&self) -> CalibrationPair {
        self.calibration.unwrap_or_else(CalibrationPair::identity)
    }
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            mode: CompareMode::default(),
            calibration: None,
            adjustments: AdjustmentBook::default(),
            saved_at: None,
        }
    }
}
