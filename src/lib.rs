//! drawing-diff
//!
//! 新旧図面の差分チェック（CLI側）。差分処理の本体は drawing-diff-common。

pub mod calibrate;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod project;
