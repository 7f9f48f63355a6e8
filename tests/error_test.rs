//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use drawing_diff::error::DrawingDiffError;
use drawing_diff::loader;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = loader::scan_pages(Path::new("/nonexistent/path/12345"));
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, DrawingDiffError::FolderNotFound(_)));
}

/// 画像のないフォルダ同士を組にした場合
#[test]
fn test_pair_folders_without_images() {
    let old = tempdir().expect("Failed to create temp dir");
    let new = tempdir().expect("Failed to create temp dir");
    std::fs::write(old.path().join("memo.txt"), "hello").unwrap();

    let err = loader::pair_folders(old.path(), new.path()).unwrap_err();
    assert!(matches!(err, DrawingDiffError::NoImagesFound(_)));
}

/// DrawingDiffErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        DrawingDiffError::Config("テスト設定エラー".to_string()),
        DrawingDiffError::FileNotFound("old.png".to_string()),
        DrawingDiffError::FolderNotFound("/path/to/folder".to_string()),
        DrawingDiffError::ImageLoad("壊れた画像".to_string()),
        DrawingDiffError::ImageSave("書き込み不可".to_string()),
        DrawingDiffError::InvalidPoint("10;20".to_string()),
        DrawingDiffError::NoImagesFound("フォルダ".to_string()),
        DrawingDiffError::ProjectVersion { found: 2, expected: 1 },
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: DrawingDiffError = io_err.into();

    assert!(matches!(err, DrawingDiffError::Io(_)));
    let display = format!("{}", err);
    assert!(display.contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: DrawingDiffError = json_err.into();

    assert!(matches!(err, DrawingDiffError::JsonParse(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_transparent() {
    let common_err = drawing_diff_common::Error::DegenerateCalibration("old A1/B1");
    let expected = common_err.to_string();
    let err: DrawingDiffError = common_err.into();

    assert!(matches!(err, DrawingDiffError::Common(_)));
    assert_eq!(format!("{}", err), expected);
}
