//! Isolation Forest
//!
//! 一次元の値に対するIsolation Forest実装。
//! ランダムな分割で値を孤立させ、平均パス長が短いものほど異常とみなす。

use super::types::{ForestSettings, ModelStats};
use super::OutlierDetector;
use crate::error::{Error, Result};
use crate::observation::Label;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{seq::index, Rng, SeedableRng};
use tracing::{debug, info};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// 孤立ツリーのノード
#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// 孤立ツリー
#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn build<R: Rng + ?Sized>(values: &[f64], height_limit: usize, rng: &mut R) -> Self {
        Self {
            root: Self::grow(values, 0, height_limit, rng),
        }
    }

    fn grow<R: Rng + ?Sized>(values: &[f64], depth: usize, limit: usize, rng: &mut R) -> Node {
        if depth >= limit || values.len() <= 1 {
            return Node::Leaf { size: values.len() };
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min >= max {
            return Node::Leaf { size: values.len() };
        }

        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<f64>, Vec<f64>) = values.iter().partition(|&&v| v < threshold);

        Node::Split {
            threshold,
            left: Box::new(Self::grow(&left, depth + 1, limit, rng)),
            right: Box::new(Self::grow(&right, depth + 1, limit, rng)),
        }
    }

    /// 値が到達する葉までのパス長（葉のサイズ補正込み）
    fn path_length(&self, value: f64) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    node = if value < *threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

/// 二分探索木の失敗探索の平均パス長 c(n)
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// 線形補間による分位点（`sorted` は昇順）
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// 学習済みフォレスト
#[derive(Debug, Clone)]
struct FittedForest {
    trees: Vec<IsolationTree>,
    /// ツリーごとのサブサンプルサイズ
    subsample_size: usize,
    stats: ModelStats,
}

impl FittedForest {
    fn score(&self, value: f64) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(value))
            .sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_path / average_path_length(self.subsample_size))
    }
}

/// Isolation Forest外れ値検知器
///
/// 学習は部分的にランダム（サブサンプリングと分割点）だが、
/// 学習済みパラメータに対する判定は決定的。
pub struct IsolationForest {
    settings: ForestSettings,
    rng: StdRng,
    model: Option<FittedForest>,
    /// 学習成功回数
    fits: u64,
}

impl IsolationForest {
    /// エントロピーから初期化した検知器を作成
    pub fn new(settings: ForestSettings) -> Self {
        Self::from_rng(settings, StdRng::from_entropy())
    }

    /// シード固定の検知器を作成
    pub fn with_seed(settings: ForestSettings, seed: u64) -> Self {
        Self::from_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn from_rng(settings: ForestSettings, rng: StdRng) -> Self {
        Self {
            settings,
            rng,
            model: None,
            fits: 0,
        }
    }

    pub fn settings(&self) -> &ForestSettings {
        &self.settings
    }

    /// 異常スコア（0.0-1.0、大きいほど異常）
    pub fn score(&self, value: f64) -> Result<f64> {
        let model = self.trained_model()?;
        Ok(model.score(value))
    }

    fn trained_model(&self) -> Result<&FittedForest> {
        self.model
            .as_ref()
            .ok_or_else(|| Error::Prediction("model has not been fitted".to_string()))
    }

    /// 学習バッチの妥当性を検証
    fn validate_batch(batch: &[f64]) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::Training("empty training batch".to_string()));
        }
        if let Some(bad) = batch.iter().find(|v| !v.is_finite()) {
            return Err(Error::Training(format!(
                "non-finite value in training batch: {}",
                bad
            )));
        }

        let mean = batch.iter().sum::<f64>() / batch.len() as f64;
        let variance =
            batch.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / batch.len() as f64;
        let std_dev = variance.sqrt();
        if std_dev <= f64::EPSILON * mean.abs().max(1.0) {
            return Err(Error::Training(format!(
                "degenerate training batch: {} samples with zero variance",
                batch.len()
            )));
        }

        Ok(())
    }
}

impl OutlierDetector for IsolationForest {
    fn fit(&mut self, batch: &[f64]) -> Result<()> {
        Self::validate_batch(batch)?;

        let subsample_size = self.settings.max_samples.min(batch.len()).max(2);
        let height_limit = (subsample_size as f64).log2().ceil() as usize;
        debug!(
            "Fitting isolation forest: {} samples, {} trees, subsample {}",
            batch.len(),
            self.settings.n_trees,
            subsample_size
        );

        let mut trees = Vec::with_capacity(self.settings.n_trees);
        let mut sample = Vec::with_capacity(subsample_size);
        for _ in 0..self.settings.n_trees.max(1) {
            sample.clear();
            sample.extend(
                index::sample(&mut self.rng, batch.len(), subsample_size.min(batch.len()))
                    .iter()
                    .map(|i| batch[i]),
            );
            trees.push(IsolationTree::build(&sample, height_limit, &mut self.rng));
        }

        let mut fitted = FittedForest {
            trees,
            subsample_size,
            stats: ModelStats {
                training_samples: batch.len(),
                model_version: self.fits + 1,
                last_fitted: Utc::now(),
                threshold: 0.0,
            },
        };

        // 学習データのスコア分布から汚染率に対応するしきい値を決める
        let mut scores: Vec<f64> = batch.iter().map(|&v| fitted.score(v)).collect();
        scores.sort_by(f64::total_cmp);
        fitted.stats.threshold = quantile(&scores, 1.0 - self.settings.contamination);

        info!(
            "Isolation forest fitted: version {}, threshold {:.4}",
            fitted.stats.model_version, fitted.stats.threshold
        );

        self.model = Some(fitted);
        self.fits += 1;
        Ok(())
    }

    fn predict(&self, value: f64) -> Result<Label> {
        let model = self.trained_model()?;
        if model.score(value) > model.stats.threshold {
            Ok(Label::Anomaly)
        } else {
            Ok(Label::Normal)
        }
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    fn stats(&self) -> Option<ModelStats> {
        self.model.as_ref().map(|m| m.stats.clone())
    }
}
