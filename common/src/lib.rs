//! Drawing Diff Common Library
//!
//! CLIとデスクトップ版で共有する差分処理の本体
//!
//! - 線抽出（extract）
//! - 2点基準の位置合わせ（geometry）
//! - 重ね合わせ描画と画素分類（compose / classify / pipeline）
//! - 手動調整とページ別調整（adjust）
//! - 操作状態の管理（calibration / session）

pub mod adjust;
pub mod cache;
pub mod calibration;
pub mod classify;
pub mod compose;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod pipeline;
pub mod session;

pub use adjust::{Adjustment, AdjustmentBook, Nudge, PageOverride};
pub use cache::MaskCache;
pub use calibration::{CalibrationPicker, CalibrationStage, Side};
pub use compose::{CompareMode, CompositeFrame, RenderOptions, Sampling};
pub use error::{Error, Result};
pub use extract::{extract_lines, Tint, TintedMask};
pub use geometry::{Affine, CalibrationPair, Point, SimilarityTransform};
pub use pipeline::{export_diff, Pass};
pub use session::{pair_pages, PagePair, PagePairing, Session, SessionSettings, SourceImage};
