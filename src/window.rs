//! Observation Window
//!
//! 直近N件の観測値を保持するスライディングウィンドウ

use crate::observation::Observation;
use std::collections::VecDeque;

/// デフォルトのウィンドウ容量
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// 観測値ウィンドウ
///
/// 容量は生成時に固定され、超過分は先頭（最古）から破棄される。
#[derive(Debug, Clone)]
pub struct ObservationWindow {
    /// 観測値バッファ（挿入順）
    entries: VecDeque<Observation>,
    /// 最大保持数
    capacity: usize,
}

impl ObservationWindow {
    /// 新しいウィンドウを作成
    ///
    /// 容量0は1として扱う。
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 観測値を末尾に追加
    pub fn append(&mut self, observation: Observation) {
        self.entries.push_back(observation);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// 現在の内容を取得
    pub fn snapshot(&self) -> Vec<Observation> {
        self.entries.iter().copied().collect()
    }

    /// 値のみを取得（学習データ用）
    pub fn values_only(&self) -> Vec<f64> {
        self.entries.iter().map(|o| o.value).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ObservationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
