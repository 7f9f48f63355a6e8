use clap::Parser;
use drawing_diff::{calibrate, cli, config, error, export, loader, project};
use cli::{Cli, Commands};
use config::Config;
use drawing_diff_common::pipeline::export_diff;
use drawing_diff_common::{Adjustment, CalibrationPair, Point};
use error::{DrawingDiffError, Result};
use project::ProjectFile;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = Config::load()?;

    match cli.command {
        Commands::Overlay {
            old,
            new,
            old_a,
            old_b,
            new_a,
            new_b,
            mode,
            dx,
            dy,
            rotate,
            output,
            project,
        } => {
            println!("📐 drawing-diff - 図面比較\n");

            let project = project
                .as_deref()
                .map(ProjectFile::open)
                .transpose()?
                .unwrap_or_default();

            // 1. 基準点
            let pair = match points_from_args(old_a, old_b, new_a, new_b)? {
                Some(pair) => pair,
                None => match project.calibration {
                    Some(pair) => pair,
                    None => {
                        println!("- 基準点の指定がないため、そのまま重ねます");
                        CalibrationPair::identity()
                    }
                },
            };
            let mode = mode.unwrap_or(project.mode);

            let mut adjustment = project.adjustments.current(0);
            adjustment.dx += dx.unwrap_or(0.0);
            adjustment.dy += dy.unwrap_or(0.0);
            adjustment.rotate(rotate.unwrap_or(0.0));

            // 2. 読み込み
            println!("[1/2] 図面を読み込み中...");
            let old_img = loader::load_image(&old)?;
            let new_img = loader::load_image(&new)?;
            println!(
                "✔ 旧図面 {}x{} / 新図面 {}x{}\n",
                old_img.width(),
                old_img.height(),
                new_img.width(),
                new_img.height()
            );

            // 3. 重ね合わせ
            println!("[2/2] 重ね合わせ中...（モード：{} {}）", mode, mode.label());
            let diff = export_diff(&old_img, &new_img, &pair, mode, &adjustment, &config.export_options())?;

            let target = export::output_path(
                &output.unwrap_or_else(|| PathBuf::from(".")),
                &config.output_name,
            );
            export::save_png(&diff, &target)?;
            println!("✔ 差分画像を保存: {}", target.display());

            println!("\n✅ 完了");
        }

        Commands::Calibrate { old, new, project } => {
            println!("📍 drawing-diff - 基準点入力\n");
            calibrate::run_interactive_calibration(&old, &new, &project)?;
        }

        Commands::Pages {
            old_dir,
            new_dir,
            project,
            mode,
            output,
        } => {
            println!("📚 drawing-diff - ページ一括比較\n");

            let project = project
                .as_deref()
                .map(ProjectFile::open)
                .transpose()?
                .unwrap_or_default();

            // 1. スキャン
            println!("[1/2] ページをスキャン中...");
            let pairing = loader::pair_folders(&old_dir, &new_dir)?;
            println!("✔ {}ページを比較", pairing.pairs.len());
            if pairing.has_unused() {
                println!(
                    "  ※ ページ数が異なります（比較しないページ: 旧 {} / 新 {}）",
                    pairing.unused_old, pairing.unused_new
                );
            }
            println!();

            let jobs: Vec<export::PageJob> = pairing
                .pairs
                .into_iter()
                .enumerate()
                .map(|(index, (old, new))| export::PageJob { index, old, new })
                .collect();

            // 2. 出力
            let mode = mode.unwrap_or(project.mode);
            println!("[2/2] 差分画像を出力中...（モード：{}）", mode);
            let out_dir = output.unwrap_or_else(|| PathBuf::from("."));
            let written = export::export_pages(
                &jobs,
                &project.calibration_or_identity(),
                mode,
                &project.adjustments,
                &config.page_options(),
                &out_dir,
                &config.output_name,
            )?;
            for path in &written {
                println!("✔ {}", path.display());
            }

            println!("\n✅ {}ページ出力完了", written.len());
        }

        Commands::Adjust {
            project,
            page,
            dx,
            dy,
            rotate,
            toggle,
            apply_all,
            reset,
            mode,
        } => {
            run_adjust(&project, page, dx, dy, rotate, toggle, apply_all, reset, mode)?;
        }

        Commands::Config { set, show } => {
            let mut config = config;

            if !set.is_empty() {
                for assignment in &set {
                    config.set(assignment)?;
                }
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || set.is_empty() {
                println!("設定: {}", Config::config_path()?.display());
                println!("  線の閾値: {}", config.ink_threshold);
                println!("  移動量: {}px", config.nudge_step);
                println!("  回転量: {}°", config.rotate_step_deg);
                println!(
                    "  α（表示/保存/ページ）: {}/{}/{}",
                    config.preview_alpha, config.export_alpha, config.page_alpha
                );
                println!("  サンプリング: {}", config.sampling);
                println!("  出力ファイル名: {}", config.output_name);
            }
        }
    }

    Ok(())
}

/// 4点すべて指定されたときだけ基準点として使う
fn points_from_args(
    old_a: Option<Point>,
    old_b: Option<Point>,
    new_a: Option<Point>,
    new_b: Option<Point>,
) -> Result<Option<CalibrationPair>> {
    match (old_a, old_b, new_a, new_b) {
        (Some(a1), Some(b1), Some(a2), Some(b2)) => Ok(Some(CalibrationPair::new(a1, b1, a2, b2))),
        (None, None, None, None) => Ok(None),
        _ => Err(DrawingDiffError::InvalidPoint(
            "--old-a / --old-b / --new-a / --new-b は4点すべて指定してください".into(),
        )),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_adjust(
    path: &Path,
    page: usize,
    dx: Option<f64>,
    dy: Option<f64>,
    rotate: Option<f64>,
    toggle: bool,
    apply_all: bool,
    reset: bool,
    mode: Option<drawing_diff_common::CompareMode>,
) -> Result<()> {
    if page == 0 {
        return Err(DrawingDiffError::Config("ページは1から指定してください".into()));
    }
    let index = page - 1;
    let mut project = ProjectFile::load(path);
    let book = &mut project.adjustments;

    if toggle {
        let enabled = book.toggle_override(index);
        println!(
            "✔ ページ{}: このページだけ調整：{}",
            page,
            if enabled { "ON" } else { "OFF" }
        );
    }

    if dx.is_some() || dy.is_some() || rotate.is_some() {
        let current: &mut Adjustment = book.current_mut(index);
        current.dx += dx.unwrap_or(0.0);
        current.dy += dy.unwrap_or(0.0);
        current.rotate(rotate.unwrap_or(0.0));
    }

    if apply_all {
        book.apply_to_all(index);
        println!("✔ ページ{}の調整を全ページ共通にしました", page);
    }

    if reset {
        book.reset_page(index);
        println!("✔ ページ{}を共通値に戻しました", page);
    }

    if let Some(mode) = mode {
        project.mode = mode;
    }

    let t = project.adjustments.current(index);
    println!(
        "ページ {}  dx:{:.1} dy:{:.1} rot:{:.2}°  モード：{}",
        page, t.dx, t.dy, t.rotation_deg, project.mode
    );

    project.save(path)?;
    println!("✔ 保存しました: {}", path.display());
    Ok(())
}
