//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Degenerate calibration: reference points {0} coincide")]
    DegenerateCalibration(&'static str),

    #[error("Calibration incomplete: {picked}/4 points picked")]
    IncompleteCalibration { picked: usize },

    #[error("Source image missing: {0}")]
    MissingImage(&'static str),

    #[error("Page {index} out of range (pages: {len})")]
    PageOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_degenerate() {
        let error = Error::DegenerateCalibration("old A1/B1");
        let display = format!("{}", error);
        assert!(display.contains("Degenerate calibration"));
        assert!(display.contains("old A1/B1"));
    }

    #[test]
    fn test_error_display_incomplete() {
        let error = Error::IncompleteCalibration { picked: 3 };
        assert_eq!(format!("{}", error), "Calibration incomplete: 3/4 points picked");
    }

    #[test]
    fn test_error_display_page_out_of_range() {
        let error = Error::PageOutOfRange { index: 3, len: 2 };
        assert_eq!(format!("{}", error), "Page 3 out of range (pages: 2)");
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
