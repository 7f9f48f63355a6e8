//! プロジェクトファイルのテスト
//!
//! 基準点・モード・調整値の保存と読み込みを検証

use drawing_diff::error::DrawingDiffError;
use drawing_diff::project::ProjectFile;
use drawing_diff_common::{AdjustmentBook, CalibrationPair, CompareMode, Point};
use tempfile::tempdir;

/// ファイルがない場合は新規
#[test]
fn test_project_missing_is_default() {
    let dir = tempdir().expect("Failed to create temp dir");
    let project = ProjectFile::load(&dir.path().join("none.json"));

    assert_eq!(project.mode, CompareMode::Delete);
    assert!(project.calibration.is_none());
    assert_eq!(project.calibration_or_identity(), CalibrationPair::identity());
}

/// 保存と読み込み
#[test]
fn test_project_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("project.json");

    let mut book = AdjustmentBook::new();
    book.current_mut(0).dx = 2.5;
    book.toggle_override(3);
    book.current_mut(3).rotation_deg = -0.3;

    let mut project = ProjectFile::default();
    project.mode = CompareMode::Mix;
    project.calibration = Some(CalibrationPair::new(
        Point::new(10.0, 10.0),
        Point::new(110.0, 10.0),
        Point::new(12.0, 14.0),
        Point::new(112.0, 14.0),
    ));
    project.adjustments = book;
    project.save(&path).expect("プロジェクト保存失敗");
    assert!(project.saved_at.is_some());

    let loaded = ProjectFile::open(&path).expect("読み込み失敗");
    assert_eq!(loaded, project);
    assert_eq!(loaded.adjustments.current(0).dx, 2.5);
    assert_eq!(loaded.adjustments.current(3).rotation_deg, -0.3);
    assert!(loaded.adjustments.is_override_enabled(3));
}

/// 破損している場合
#[test]
fn test_project_corrupted_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("project.json");
    std::fs::write(&path, "{ invalid json }").unwrap();

    // load は新規扱い、open はエラー
    assert_eq!(ProjectFile::load(&path), ProjectFile::default());
    assert!(ProjectFile::open(&path).is_err());
}

/// バージョン不一致
#[test]
fn test_project_version_mismatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("project.json");
    std::fs::write(&path, r#"{"version": 99, "mode": "mix"}"#).unwrap();

    let project = ProjectFile::load(&path);
    assert_eq!(project.version(), 1);
    assert_eq!(project.mode, CompareMode::Delete);
}

/// 明示的に開くときはバージョン違いをエラーにする
#[test]
fn test_project_open_rejects_other_version() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("project.json");
    std::fs::write(&path, r#"{"version": 99, "mode": "mix"}"#).unwrap();

    let err = ProjectFile::open(&path).unwrap_err();
    assert!(matches!(
        err,
        DrawingDiffError::ProjectVersion { found: 99, expected: 1 }
    ));

    std::fs::write(&path, r#"{"version": 1, "mode": "mix"}"#).unwrap();
    assert_eq!(ProjectFile::open(&path).unwrap().mode, CompareMode::Mix);
}

/// 古い形式（ページ別調整なし）も読める
#[test]
fn test_project_minimal_fields() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("project.json");
    std::fs::write(&path, r#"{"version": 1, "mode": "add"}"#).unwrap();

    let project = ProjectFile::load(&path);
    assert_eq!(project.mode, CompareMode::Add);
    assert_eq!(project.adjustments, AdjustmentBook::default());
}
