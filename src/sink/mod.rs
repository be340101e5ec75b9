//! Sink Module
//!
//! 判定済み観測値の出力先（ログ・チャート）。
//!
//! シンクの失敗は `Error::Presentation` として返され、検知ループ側で
//! ログ出力されるだけで処理は継続する。

mod channel;
mod chart;
mod log_sink;

pub use channel::{spawn_presenter, ChannelSink};
pub use chart::{ChartSink, RollingChart, DEFAULT_CHART_POINTS};
pub use log_sink::LogSink;

use crate::error::Result;
use crate::observation::Observation;

/// 観測値シンク
pub trait ObservationSink {
    /// 観測値を1件出力
    fn deliver(&mut self, observation: &Observation) -> Result<()>;

    /// バッファ済みの出力をフラッシュ
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: ObservationSink + ?Sized> ObservationSink for Box<S> {
    fn deliver(&mut self, observation: &Observation) -> Result<()> {
        (**self).deliver(observation)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// 複数シンクへの同報
///
/// 全シンクへの出力を試みた上で、最初の失敗を返す。
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn ObservationSink + Send>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// シンクを追加
    pub fn with(mut self, sink: impl ObservationSink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ObservationSink for FanoutSink {
    fn deliver(&mut self, observation: &Observation) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.deliver(observation) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn flush(&mut self) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::observation::Label;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<u64>>>);

    impl ObservationSink for Recorder {
        fn deliver(&mut self, observation: &Observation) -> Result<()> {
            self.0.lock().unwrap().push(observation.index);
            Ok(())
        }
    }

    struct Failing;

    impl ObservationSink for Failing {
        fn deliver(&mut self, _observation: &Observation) -> Result<()> {
            Err(Error::Presentation("renderer offline".to_string()))
        }
    }

    #[test]
    fn test_fanout_delivers_to_all_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut fanout = FanoutSink::new()
            .with(Failing)
            .with(Recorder(seen.clone()));
        assert_eq!(fanout.len(), 2);

        let result = fanout.deliver(&Observation::new(3, 10.0, Label::Normal));
        assert!(matches!(result, Err(Error::Presentation(_))));
        // 失敗したシンクの後ろにも届く
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_empty_fanout_is_ok() {
        let mut fanout = FanoutSink::new();
        assert!(fanout.is_empty());
        assert!(fanout
            .deliver(&Observation::new(0, 1.0, Label::Normal))
            .is_ok());
    }
}
