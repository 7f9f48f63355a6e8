use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrawingDiffError {
    #[error(transparent)]
    Common(#[from] drawing_diff_common::Error),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像保存エラー: {0}")]
    ImageSave(String),

    #[error("座標の形式が不正です（x,y で指定）: {0}")]
    InvalidPoint(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("プロジェクトファイルのバージョンが違います: {found}（対応: {expected}）")]
    ProjectVersion { found: u32, expected: u32 },

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

pub type Result<T> = std::result::Result<T, DrawingDiffError>;
