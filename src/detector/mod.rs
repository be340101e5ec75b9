//! Outlier Detector Module
//!
//! 再学習可能な教師なし外れ値検知モデル。
//!
//! ## 主要機能
//!
//! - **学習**: 値のバッチからモデルパラメータを丸ごと再構築（逐次更新なし）
//! - **判定**: 単一の値を `Normal` / `Anomaly` に分類
//! - **汚染率**: 学習バッチ中の想定異常割合から判定しきい値を決定
//!
//! ## 使用例
//!
//! ```rust
//! use txstream_rs::detector::{ForestSettings, IsolationForest, OutlierDetector};
//!
//! let mut detector = IsolationForest::with_seed(ForestSettings::default(), 7);
//! let batch: Vec<f64> = (0..200).map(|i| (i % 50) as f64 * 10.0).collect();
//! detector.fit(&batch)?;
//!
//! let label = detector.predict(250.0)?;
//! println!("label = {}", label);
//! # Ok::<(), txstream_rs::Error>(())
//! ```

mod isolation_forest;
mod types;

pub use isolation_forest::IsolationForest;
pub use types::{ForestSettings, ModelStats};

use crate::error::Result;
use crate::observation::Label;

/// 外れ値検知器
///
/// `fit` はパラメータを置き換える唯一の操作。失敗した場合は直前の
/// パラメータが維持される。
pub trait OutlierDetector: Send {
    /// バッチからモデルを学習
    fn fit(&mut self, batch: &[f64]) -> Result<()>;

    /// 値を分類
    fn predict(&self, value: f64) -> Result<Label>;

    /// 学習済みかどうか
    fn is_fitted(&self) -> bool;

    /// 現在のモデル統計情報
    fn stats(&self) -> Option<ModelStats> {
        None
    }
}

impl<D: OutlierDetector + ?Sized> OutlierDetector for Box<D> {
    fn fit(&mut self, batch: &[f64]) -> Result<()> {
        (**self).fit(batch)
    }

    fn predict(&self, value: f64) -> Result<Label> {
        (**self).predict(value)
    }

    fn is_fitted(&self) -> bool {
        (**self).is_fitted()
    }

    fn stats(&self) -> Option<ModelStats> {
        (**self).stats()
    }
}
