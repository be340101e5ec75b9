//! Log Sink
//!
//! 観測値ごとに構造化ログを1行出力する

use super::ObservationSink;
use crate::error::Result;
use crate::observation::{Label, Observation};
use tracing::{info, warn};

/// 構造化ログシンク
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl ObservationSink for LogSink {
    fn deliver(&mut self, observation: &Observation) -> Result<()> {
        match observation.label {
            Label::Anomaly => warn!(
                index = observation.index,
                value = observation.value,
                label = %observation.label,
                "anomalous transaction"
            ),
            Label::Normal => info!(
                index = observation.index,
                value = observation.value,
                label = %observation.label,
                "transaction"
            ),
        }
        Ok(())
    }
}
