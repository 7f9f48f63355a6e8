use clap::{Parser, Subcommand};
use drawing_diff_common::{CompareMode, Point};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drawing-diff")]
#[command(about = "新旧図面の差分チェックツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 2枚の図面を重ねて差分PNGを出力
    Overlay {
        /// 旧図面
        #[arg(required = true)]
        old: PathBuf,

        /// 新図面
        #[arg(required = true)]
        new: PathBuf,

        /// 旧図面の基準点① (x,y)
        #[arg(long, allow_hyphen_values = true)]
        old_a: Option<Point>,

        /// 旧図面の基準点② (x,y)
        #[arg(long, allow_hyphen_values = true)]
        old_b: Option<Point>,

        /// 新図面の基準点① (x,y)
        #[arg(long, allow_hyphen_values = true)]
        new_a: Option<Point>,

        /// 新図面の基準点② (x,y)
        #[arg(long, allow_hyphen_values = true)]
        new_b: Option<Point>,

        /// 比較モード (delete/add/mix)
        #[arg(short, long)]
        mode: Option<CompareMode>,

        /// 横方向の手動調整 (px)
        #[arg(long, allow_hyphen_values = true)]
        dx: Option<f64>,

        /// 縦方向の手動調整 (px)
        #[arg(long, allow_hyphen_values = true)]
        dy: Option<f64>,

        /// 回転の手動調整 (度)
        #[arg(long, allow_hyphen_values = true)]
        rotate: Option<f64>,

        /// 出力ファイル/ディレクトリ（デフォルト: カレント/diff.png）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// プロジェクトファイル（基準点・調整値を読み込む）
        #[arg(short, long)]
        project: Option<PathBuf>,
    },

    /// 対話的に基準点を入力してプロジェクトに保存
    Calibrate {
        /// 旧図面
        #[arg(required = true)]
        old: PathBuf,

        /// 新図面
        #[arg(required = true)]
        new: PathBuf,

        /// プロジェクトファイル
        #[arg(short, long, default_value = "drawing-diff.json")]
        project: PathBuf,
    },

    /// フォルダ内のページを先頭から組にして一括出力
    Pages {
        /// 旧図面フォルダ
        #[arg(required = true)]
        old_dir: PathBuf,

        /// 新図面フォルダ
        #[arg(required = true)]
        new_dir: PathBuf,

        /// プロジェクトファイル（基準点・ページ別調整）
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// 比較モード (delete/add/mix)
        #[arg(short, long)]
        mode: Option<CompareMode>,

        /// 出力ディレクトリ（デフォルト: カレント）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// プロジェクトの手動調整を編集
    Adjust {
        /// プロジェクトファイル
        #[arg(short, long, default_value = "drawing-diff.json")]
        project: PathBuf,

        /// 対象ページ（1始まり）
        #[arg(long, default_value = "1")]
        page: usize,

        /// 横方向の移動量を加算 (px)
        #[arg(long, allow_hyphen_values = true)]
        dx: Option<f64>,

        /// 縦方向の移動量を加算 (px)
        #[arg(long, allow_hyphen_values = true)]
        dy: Option<f64>,

        /// 回転量を加算 (度)
        #[arg(long, allow_hyphen_values = true)]
        rotate: Option<f64>,

        /// このページだけ調整 ON/OFF を切り替え
        #[arg(long)]
        toggle: bool,

        /// このページの調整を全ページ共通にする
        #[arg(long)]
        apply_all: bool,

        /// このページを共通値に戻す
        #[arg(long)]
        reset: bool,

        /// 比較モードを変更 (delete/add/mix)
        #[arg(short, long)]
        mode: Option<CompareMode>,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を変更 (KEY=VALUE)
        #[arg(long)]
        set: Vec<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overlay() {
        let cli = Cli::try_parse_from([
            "drawing-diff", "overlay", "old.png", "new.png",
            "--old-a", "10,20", "--old-b", "110,20",
            "--new-a", "12,22", "--new-b", "112,22",
            "--mode", "mix", "--dx", "-1.5",
        ])
        .unwrap();

        match cli.command {
            Commands::Overlay { old_a, mode, dx, rotate, .. } => {
                assert_eq!(old_a, Some(Point::new(10.0, 20.0)));
                assert_eq!(mode, Some(CompareMode::Mix));
                assert_eq!(dx, Some(-1.5));
                assert_eq!(rotate, None);
            }
            _ => panic!("overlay expected"),
        }
    }

    #[test]
    fn test_parse_bad_point() {
        let result = Cli::try_parse_from([
            "drawing-diff", "overlay", "a.png", "b.png", "--old-a", "10;20",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_adjust_defaults() {
        let cli = Cli::try_parse_from(["drawing-diff", "adjust", "--toggle"]).unwrap();
        match cli.command {
            Commands::Adjust { project, page, toggle, apply_all, .. } => {
                assert_eq!(project, PathBuf::from("drawing-diff.json"));
                assert_eq!(page, 1);
                assert!(toggle);
                assert!(!apply_all);
            }
            _ => panic!("adjust expected"),
        }
    }
}
