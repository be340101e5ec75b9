//! Detector Types
//!
//! 外れ値検知器の設定と統計情報

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Isolation Forest設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSettings {
    /// ツリー数
    pub n_trees: usize,
    /// ツリーごとのサブサンプルサイズ上限
    pub max_samples: usize,
    /// 汚染率（学習データ中の想定異常割合）
    pub contamination: f64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.1,
        }
    }
}

/// モデル統計情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    /// トレーニングサンプル数
    pub training_samples: usize,
    /// モデルバージョン（学習成功ごとに加算）
    pub model_version: u64,
    /// 最終学習日時
    pub last_fitted: DateTime<Utc>,
    /// 異常判定しきい値（異常スコア）
    pub threshold: f64,
}
