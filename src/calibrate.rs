//! 対話式の基準点入力
//!
//! 旧図面①②・新図面①②の順に座標を入力してもらい、
//! 位置合わせが解けることを確認してからプロジェクトファイルへ保存する。

use crate::error::{DrawingDiffError, Result};
use crate::loader;
use crate::project::ProjectFile;
use dialoguer::Input;
use drawing_diff_common::{CalibrationPair, CalibrationPicker, CalibrationStage, Point, SimilarityTransform};
use std::path::Path;

/// 1点ごとの入力結果
pub enum PointAction {
    /// 座標を入力
    Point(Point),
    /// 基準点なし（そのまま重ねる）
    Identity,
    /// 保存せずに終了
    Quit,
}

/// 4点を集めて検証する
///
/// 同じ位置の2点が入力された場合は最初からやり直す。
pub fn collect_calibration<F>(mut ask: F) -> Result<Option<CalibrationPair>>
where
    F: FnMut(CalibrationStage) -> Result<PointAction>,
{
    let mut picker = CalibrationPicker::new();

    loop {
        let stage = picker.stage();
        if stage == CalibrationStage::Complete {
            let pair = picker.pair()?;
            match SimilarityTransform::solve(&pair) {
                Ok(_) => return Ok(Some(pair)),
                Err(e) => {
                    println!("  → {}。最初から入力し直してください\n", e);
                    picker.reset();
                    continue;
                }
            }
        }

        match ask(stage)? {
            PointAction::Point(p) => {
                picker.pick(p);
            }
            PointAction::Identity => return Ok(Some(CalibrationPair::identity())),
            PointAction::Quit => return Ok(None),
        }
    }
}

/// 対話式で基準点を入力してプロジェクトに保存
pub fn run_interactive_calibration(old: &Path, new: &Path, project_path: &Path) -> Result<()> {
    let old_img = loader::load_image(old)?;
    let new_img = loader::load_image(new)?;

    println!("旧図面: {} ({}x{})", old.display(), old_img.width(), old_img.height());
    println!("新図面: {} ({}x{})", new.display(), new_img.width(), new_img.height());
    println!("---");
    println!("座標は x,y（画素）で入力 [i]基準点なし [q]終了");
    println!("---\n");

    let Some(pair) = collect_calibration(prompt_point)? else {
        println!("保存せずに終了します");
        return Ok(());
    };

    let transform = SimilarityTransform::solve(&pair)?;
    println!(
        "✔ 位置合わせ: 倍率 {:.4} 回転 {:.3}°",
        transform.scale,
        transform.rotation_degrees()
    );

    let mut project = ProjectFile::load(project_path);
    project.calibration = Some(pair);
    project.save(project_path)?;
    println!("\n✔ 保存しました: {}", project_path.display());

    Ok(())
}

/// 1点分の入力プロンプト
fn prompt_point(stage: CalibrationStage) -> Result<PointAction> {
    let input: String = Input::new()
        .with_prompt(stage.guide())
        .validate_with(|s: &String| -> std::result::Result<(), String> {
            match s.trim() {
                "i" | "q" | "Q" => Ok(()),
                other => other.parse::<Point>().map(|_| ()),
            }
        })
        .interact_text()
        .map_err(|e| DrawingDiffError::CliExecution(e.to_string()))?;

    parse_action(&input)
}

fn parse_action(input: &str) -> Result<PointAction> {
    match input.trim() {
        "i" => Ok(PointAction::Identity),
        "q" | "Q" => Ok(PointAction::Quit),
        other => other
            .parse::<Point>()
            .map(PointAction::Point)
            .map_err(|_| DrawingDiffError::InvalidPoint(other.to_string())),
    }
}
