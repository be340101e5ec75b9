//! Retrain Schedule
//!
//! 再学習タイミングのポリシー

/// デフォルトの再学習間隔
pub const DEFAULT_RETRAIN_PERIOD: u64 = 100;

/// 一定間隔の再学習スケジュール
///
/// インデックス `0, period, 2*period, ...` で発火する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrainSchedule {
    period: u64,
}

impl RetrainSchedule {
    /// 新しいスケジュールを作成（間隔0は1として扱う）
    pub fn new(period: u64) -> Self {
        Self {
            period: period.max(1),
        }
    }

    /// このインデックスで再学習するか
    pub fn trigger(&self, index: u64) -> bool {
        index % self.period == 0
    }

    /// `index` より後の最初の発火インデックス
    pub fn next_trigger_after(&self, index: u64) -> u64 {
        (index / self.period + 1) * self.period
    }

    pub fn period(&self) -> u64 {
        self.period
    }
}

impl Default for RetrainSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_RETRAIN_PERIOD)
    }
}
