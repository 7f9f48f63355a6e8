use crate::error::{DrawingDiffError, Result};
use drawing_diff_common::adjust::{NUDGE_STEP, ROTATE_STEP_DEG};
use drawing_diff_common::compose::RenderOptions;
use drawing_diff_common::extract::DEFAULT_INK_THRESHOLD;
use drawing_diff_common::{Sampling, SessionSettings};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 線とみなす明度の上限（RGB平均がこれ未満なら線）
    pub ink_threshold: f32,
    pub nudge_step: f64,
    pub rotate_step_deg: f64,
    pub preview_alpha: u8,
    pub export_alpha: u8,
    pub page_alpha: u8,
    pub sampling: Sampling,
    /// 出力先がフォルダのときのファイル名
    pub output_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ink_threshold: DEFAULT_INK_THRESHOLD,
            nudge_step: NUDGE_STEP,
            rotate_step_deg: ROTATE_STEP_DEG,
            preview_alpha: RenderOptions::PREVIEW_ALPHA,
            export_alpha: RenderOptions::EXPORT_ALPHA,
            page_alpha: RenderOptions::PAGES_ALPHA,
            sampling: Sampling::default(),
            output_name: "diff.png".into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DrawingDiffError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("drawing-diff").join("config.json"))
    }

    /// `KEY=VALUE` 形式で1項目を書き換える
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| DrawingDiffError::Config(format!("KEY=VALUE の形式で指定してください: {}", assignment)))?;
        let key = key.trim();
        let value = value.trim();

        match key {
            "ink_threshold" => self.ink_threshold = parse_value(key, value)?,
            "nudge_step" => self.nudge_step = parse_value(key, value)?,
            "rotate_step_deg" => self.rotate_step_deg = parse_value(key, value)?,
            "preview_alpha" => self.preview_alpha = parse_value(key, value)?,
            "export_alpha" => self.export_alpha = parse_value(key, value)?,
            "page_alpha" => self.page_alpha = parse_value(key, value)?,
            "sampling" => self.sampling = parse_value(key, value)?,
            "output_name" => self.output_name = value.to_string(),
            other => {
                return Err(DrawingDiffError::Config(format!("不明な設定項目: {}", other)));
            }
        }
        Ok(())
    }

    fn render_options(&self, alpha: u8) -> RenderOptions {
        let mut options = RenderOptions::with_alpha(alpha);
        options.threshold = self.ink_threshold;
        options.sampling = self.sampling;
        options
    }

    pub fn preview_options(&self) -> RenderOptions {
        self.render_options(self.preview_alpha)
    }

    pub fn export_options(&self) -> RenderOptions {
        self.render_options(self.export_alpha)
    }

    pub fn page_options(&self) -> RenderOptions {
        self.render_options(self.page_alpha)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            preview: self.preview_options(),
            export: self.export_options(),
            pages: self.page_options(),
            nudge_step: self.nudge_step,
            rotate_step_deg: self.rotate_step_deg,
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| DrawingDiffError::Config(format!("{} の値が不正です: {} ({})", key, value, e)))
}
