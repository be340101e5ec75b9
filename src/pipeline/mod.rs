//! Pipeline Module
//!
//! 生成 → 判定 → バッファ → 再学習 → 出力 の検知ループ

mod controller;
mod schedule;

pub use controller::{ControllerSettings, ControllerState, RunStats, StreamController};
pub use schedule::{RetrainSchedule, DEFAULT_RETRAIN_PERIOD};
