//! 設定の型定義

use crate::detector::ForestSettings;
use crate::error::{Error, Result};
use crate::logging::LogConfig;
use crate::stream::{GeneratorSettings, SeasonalProfile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ストリーム検知の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// ウィンドウ容量
    pub window_capacity: usize,
    /// 再学習間隔（観測数）
    pub retrain_period: u64,
    /// 汚染率
    pub contamination_rate: f64,
    /// 観測間の待機時間（ミリ秒）
    pub pacing_delay_ms: u64,
    /// 極端な外れ値の注入確率
    pub extreme_anomaly_probability: f64,
    /// 外れ値倍率の範囲 [min, max]
    pub extreme_factor_range: [f64; 2],
    /// 取引額の変動幅
    pub variation: f64,
    /// 取引額のベース値
    pub base_value: f64,
    /// 乱数シード（未指定ならエントロピー）
    pub seed: Option<u64>,
    /// 指定件数で停止（未指定なら無限）
    pub max_observations: Option<u64>,
    /// 履歴データファイル（CSV）
    pub history_path: Option<PathBuf>,
    /// 履歴データの列名（未指定なら最初の数値列）
    pub history_column: Option<String>,
    /// Isolation Forestのツリー数
    pub n_trees: usize,
    /// ツリーごとのサブサンプルサイズ上限
    pub max_samples: usize,
    /// 描画キューの容量
    pub sink_queue_capacity: usize,
    /// ログ設定
    pub log: LogConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_capacity: 100,
            retrain_period: 100,
            contamination_rate: 0.1,
            pacing_delay_ms: 500,
            extreme_anomaly_probability: 0.1,
            extreme_factor_range: [5.0, 10.0],
            variation: 1000.0,
            base_value: 0.0,
            seed: None,
            max_observations: None,
            history_path: None,
            history_column: None,
            n_trees: 100,
            max_samples: 256,
            sink_queue_capacity: 256,
            log: LogConfig::default(),
        }
    }
}

impl StreamConfig {
    /// 設定値を検証
    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(invalid("window_capacity must be at least 1"));
        }
        if self.retrain_period == 0 {
            return Err(invalid("retrain_period must be at least 1"));
        }
        if !(self.contamination_rate > 0.0 && self.contamination_rate <= 0.5) {
            return Err(invalid(format!(
                "contamination_rate must be in (0, 0.5], got {}",
                self.contamination_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.extreme_anomaly_probability) {
            return Err(invalid(format!(
                "extreme_anomaly_probability must be in [0, 1], got {}",
                self.extreme_anomaly_probability
            )));
        }
        let [lo, hi] = self.extreme_factor_range;
        if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 || lo > hi {
            return Err(invalid(format!(
                "extreme_factor_range must satisfy 0 <= min <= max, got [{}, {}]",
                lo, hi
            )));
        }
        if !(self.variation.is_finite() && self.variation > 0.0) {
            return Err(invalid("variation must be positive"));
        }
        if !(self.base_value.is_finite() && self.base_value >= 0.0) {
            return Err(invalid("base_value must be non-negative"));
        }
        if self.n_trees == 0 {
            return Err(invalid("n_trees must be at least 1"));
        }
        if self.max_samples < 2 {
            return Err(invalid("max_samples must be at least 2"));
        }
        if self.sink_queue_capacity == 0 {
            return Err(invalid("sink_queue_capacity must be at least 1"));
        }
        Ok(())
    }

    /// 生成器設定を作成
    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            base_value: self.base_value,
            variation: self.variation,
            extreme_probability: self.extreme_anomaly_probability,
            extreme_factor_range: (self.extreme_factor_range[0], self.extreme_factor_range[1]),
            profile: SeasonalProfile::default(),
        }
    }

    /// 検知器設定を作成
    pub fn forest_settings(&self) -> ForestSettings {
        ForestSettings {
            n_trees: self.n_trees,
            max_samples: self.max_samples,
            contamination: self.contamination_rate,
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfiguration(message.into())
}
