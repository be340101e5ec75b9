//! Channel Sink
//!
//! 有界キュー経由で描画タスクへ観測値を渡す非ブロッキングシンク。
//! 描画が遅れても検知ループは待たされず、キューが満杯なら観測値を捨てる。

use super::ObservationSink;
use crate::error::{Error, Result};
use crate::observation::Observation;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// 有界キューシンク
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Observation>,
}

impl ChannelSink {
    /// 新しいシンクと受信側を作成
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Observation>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl ObservationSink for ChannelSink {
    fn deliver(&mut self, observation: &Observation) -> Result<()> {
        self.sender.try_send(*observation).map_err(|e| match e {
            TrySendError::Full(o) => Error::Presentation(format!(
                "presentation queue full, observation {} dropped",
                o.index
            )),
            TrySendError::Closed(o) => Error::Presentation(format!(
                "presentation task closed, observation {} dropped",
                o.index
            )),
        })
    }
}

/// 描画タスクを起動
///
/// 端末への書き込みはブロッキングI/Oなので、ブロッキング用スレッドプールで実行する。
/// 送信側がすべて破棄されるとキューを空にして終了し、描画した件数を返す。
pub fn spawn_presenter<S>(mut receiver: mpsc::Receiver<Observation>, mut sink: S) -> JoinHandle<u64>
where
    S: ObservationSink + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut rendered = 0u64;
        while let Some(observation) = receiver.blocking_recv() {
            match sink.deliver(&observation) {
                Ok(()) => rendered += 1,
                Err(e) => warn!(index = observation.index, error = %e, "presentation failed"),
            }
        }
        if let Err(e) = sink.flush() {
            warn!(error = %e, "presentation flush failed");
        }
        debug!(rendered, "presenter stopped");
        rendered
    })
}
