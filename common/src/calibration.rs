//! 基準点クリックの流れ
//!
//! 旧図面①→旧図面②→新図面①→新図面② の順で4点を受け付ける。
//! 4点そろうまでは重ね合わせを行わない。

use crate::error::{Error, Result};
use crate::geometry::{CalibrationPair, Point};

/// どちらの図面か
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Old,
    New,
}

/// 次に受け付ける基準点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStage {
    OldFirst,
    OldSecond,
    NewFirst,
    NewSecond,
    Complete,
}

impl CalibrationStage {
    fn from_picked(picked: usize) -> Self {
        match picked {
            0 => CalibrationStage::OldFirst,
            1 => CalibrationStage::OldSecond,
            2 => CalibrationStage::NewFirst,
            3 => CalibrationStage::NewSecond,
            _ => CalibrationStage::Complete,
        }
    }

    /// クリックを受け付ける図面（完了後は None）
    pub fn side(self) -> Option<Side> {
        match self {
            CalibrationStage::OldFirst | CalibrationStage::OldSecond => Some(Side::Old),
            CalibrationStage::NewFirst | CalibrationStage::NewSecond => Some(Side::New),
            CalibrationStage::Complete => None,
        }
    }

    /// ガイド表示
    pub fn guide(self) -> &'static str {
        match self {
            CalibrationStage::OldFirst => "旧図面：基準点①をクリック",
            CalibrationStage::OldSecond => "旧図面：基準点②をクリック",
            CalibrationStage::NewFirst => "新図面：基準点①をクリック",
            CalibrationStage::NewSecond => "新図面：基準点②をクリック",
            CalibrationStage::Complete => "重ね合わせ中…",
        }
    }
}

/// 基準点の取得状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationPicker {
    points: Vec<Point>,
}

impl CalibrationPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録済みの対応点から復元
    pub fn from_pair(pair: &CalibrationPair) -> Self {
        Self {
            points: vec![pair.old[0], pair.old[1], pair.new[0], pair.new[1]],
        }
    }

    pub fn stage(&self) -> CalibrationStage {
        CalibrationStage::from_picked(self.points.len())
    }

    pub fn picked(&self) -> usize {
        self.points.len()
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == 4
    }

    /// 1点追加して次の段階を返す（完了後のクリックは無視）
    pub fn pick(&mut self, point: Point) -> CalibrationStage {
        if !self.is_complete() {
            self.points.push(point);
        }
        self.stage()
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    /// 取得済みの旧図面側の点
    pub fn old_points(&self) -> &[Point] {
        &self.points[..self.points.len().min(2)]
    }

    /// 取得済みの新図面側の点
    pub fn new_points(&self) -> &[Point] {
        if self.points.len() > 2 {
            &self.points[2..]
        } else {
            &[]
        }
    }

    pub fn pair(&self) -> Result<CalibrationPair> {
        match self.points.as_slice() {
            [a1, b1, a2, b2] => Ok(CalibrationPair::new(*a1, *b1, *a2, *b2)),
            _ => Err(Error::IncompleteCalibration {
                picked: self.points.len(),
            }),
        }
    }
}
