//! Observation Types
//!
//! ストリーム上の観測値とラベルの型定義

use serde::{Deserialize, Serialize};
use std::fmt;

/// 異常ラベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// 正常
    Normal,
    /// 異常
    Anomaly,
}

impl Label {
    /// 異常ラベルかどうか
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Label::Anomaly)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Normal => f.write_str("normal"),
            Label::Anomaly => f.write_str("anomaly"),
        }
    }
}

/// ラベル付き観測値
///
/// 生成時にコントローラーがラベル付けし、以後は変更されない。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// 単調増加するシーケンス番号（0始まり）
    pub index: u64,
    /// 取引額
    pub value: f64,
    /// 判定ラベル
    pub label: Label,
}

impl Observation {
    /// 新しい観測値を作成
    pub fn new(index: u64, value: f64, label: Label) -> Self {
        Self {
            index,
            value,
            label,
        }
    }
}
