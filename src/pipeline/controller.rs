//! Stream Controller
//!
//! 生成器・検知器・ウィンドウ・シンクを束ねる検知ループ。
//!
//! 1観測ごとに「生成 → 判定 → ウィンドウ追加 → （周期的に）再学習 → 出力」を
//! 逐次実行する。どのエラーも発生した境界で回復し、ループを止めない。

use super::schedule::RetrainSchedule;
use crate::config::StreamConfig;
use crate::detector::{IsolationForest, OutlierDetector};
use crate::observation::{Label, Observation};
use crate::sink::ObservationSink;
use crate::stream::TransactionGenerator;
use crate::window::ObservationWindow;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// コントローラーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// 学習に一度も成功していない
    Bootstrapping,
    /// 少なくとも一度学習済み
    Active,
}

/// ループ設定
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub window_capacity: usize,
    pub retrain_period: u64,
    /// 観測間の待機時間
    pub pacing: Duration,
    /// 指定時はこの件数で停止（未指定なら無限）
    pub max_observations: Option<u64>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            window_capacity: 100,
            retrain_period: 100,
            pacing: Duration::from_millis(500),
            max_observations: None,
        }
    }
}

impl From<&StreamConfig> for ControllerSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            window_capacity: config.window_capacity,
            retrain_period: config.retrain_period,
            pacing: Duration::from_millis(config.pacing_delay_ms),
            max_observations: config.max_observations,
        }
    }
}

/// 実行統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub observations: u64,
    pub anomalies: u64,
    pub prediction_failures: u64,
    pub retrains: u64,
    pub retrain_failures: u64,
    pub sink_failures: u64,
}

/// 検知ループコントローラー
///
/// ウィンドウと検知器を排他的に所有する。
pub struct StreamController<D: OutlierDetector, S: ObservationSink> {
    generator: TransactionGenerator,
    window: ObservationWindow,
    detector: D,
    schedule: RetrainSchedule,
    sink: S,
    state: ControllerState,
    next_index: u64,
    pacing: Duration,
    max_observations: Option<u64>,
    stats: RunStats,
}

impl<S: ObservationSink> StreamController<IsolationForest, S> {
    /// 設定から生成器とIsolation Forestを組み立てる
    pub fn from_config(config: &StreamConfig, sink: S) -> Self {
        let generator = match config.seed {
            Some(seed) => TransactionGenerator::with_seed(config.generator_settings(), seed),
            None => TransactionGenerator::new(config.generator_settings()),
        };
        // 生成器と検知器で乱数系列を分ける
        let detector = match config.seed {
            Some(seed) => IsolationForest::with_seed(config.forest_settings(), seed.wrapping_add(1)),
            None => IsolationForest::new(config.forest_settings()),
        };
        Self::new(generator, detector, sink, ControllerSettings::from(config))
    }
}

impl<D: OutlierDetector, S: ObservationSink> StreamController<D, S> {
    /// 新しいコントローラーを作成
    pub fn new(
        generator: TransactionGenerator,
        detector: D,
        sink: S,
        settings: ControllerSettings,
    ) -> Self {
        let state = if detector.is_fitted() {
            ControllerState::Active
        } else {
            ControllerState::Bootstrapping
        };
        Self {
            generator,
            window: ObservationWindow::new(settings.window_capacity),
            detector,
            schedule: RetrainSchedule::new(settings.retrain_period),
            sink,
            state,
            next_index: 0,
            pacing: settings.pacing,
            max_observations: settings.max_observations,
            stats: RunStats::default(),
        }
    }

    /// 履歴データで初期学習（ベストエフォート）
    ///
    /// 失敗しても `Bootstrapping` のまま続行する。
    pub fn bootstrap(&mut self, history: Option<&[f64]>) -> ControllerState {
        match history {
            Some(values) => match self.detector.fit(values) {
                Ok(()) => {
                    self.state = ControllerState::Active;
                    info!(samples = values.len(), "bootstrapped detector from history");
                }
                Err(e) => {
                    warn!(error = %e, "history bootstrap failed, staying in bootstrapping");
                }
            },
            None => info!("no historical data, starting in bootstrapping"),
        }
        self.state
    }

    /// 1観測分の処理（待機なし）
    pub fn step(&mut self) -> Observation {
        let index = self.next_index;
        let value = self.generator.next_value();

        let label = match self.detector.predict(value) {
            Ok(label) => label,
            Err(e) => {
                self.stats.prediction_failures += 1;
                warn!(index, error = %e, "prediction failed, labelling as normal");
                Label::Normal
            }
        };

        let observation = Observation::new(index, value, label);
        self.window.append(observation);

        if self.schedule.trigger(index) {
            self.retrain(index);
        }

        if let Err(e) = self.sink.deliver(&observation) {
            self.stats.sink_failures += 1;
            warn!(index, error = %e, "sink delivery failed");
        }

        self.stats.observations += 1;
        if label.is_anomaly() {
            self.stats.anomalies += 1;
        }
        self.next_index += 1;
        observation
    }

    /// 現在のウィンドウ内容で再学習
    fn retrain(&mut self, index: u64) {
        let batch = self.window.values_only();
        let next_retrain = self.schedule.next_trigger_after(index);
        match self.detector.fit(&batch) {
            Ok(()) => {
                self.stats.retrains += 1;
                self.state = ControllerState::Active;
                match self.detector.stats() {
                    Some(model) => info!(
                        index,
                        samples = batch.len(),
                        model_version = model.model_version,
                        threshold = model.threshold,
                        next_retrain,
                        "retrain succeeded"
                    ),
                    None => info!(index, samples = batch.len(), next_retrain, "retrain succeeded"),
                }
            }
            Err(e) => {
                self.stats.retrain_failures += 1;
                warn!(
                    index,
                    samples = batch.len(),
                    next_retrain,
                    error = %e,
                    "retrain failed, keeping previous model"
                );
            }
        }
    }

    /// ループを実行
    ///
    /// `shutdown` が完了するか `max_observations` に達するまで続ける。
    pub async fn run<F>(&mut self, shutdown: F) -> RunStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            window = self.window.capacity(),
            retrain_period = self.schedule.period(),
            pacing_ms = self.pacing.as_millis() as u64,
            max_regular_value = self.generator.settings().max_regular_value(),
            "detection loop started"
        );

        loop {
            if self
                .max_observations
                .is_some_and(|max| self.next_index >= max)
            {
                debug!(observations = self.next_index, "observation limit reached");
                break;
            }

            self.step();

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.pacing) => {}
            }
        }

        if let Err(e) = self.sink.flush() {
            warn!(error = %e, "sink flush failed");
        }
        info!(
            observations = self.stats.observations,
            anomalies = self.stats.anomalies,
            retrains = self.stats.retrains,
            "detection loop stopped"
        );
        self.stats.clone()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn schedule(&self) -> &RetrainSchedule {
        &self.schedule
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// コントローラーを分解してシンクを取り出す
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ForestSettings;
    use crate::error::{Error, Result};
    use crate::stream::{FixedMonth, GeneratorSettings};

    /// 送られた観測値を記録するシンク
    #[derive(Default)]
    struct Recording {
        seen: Vec<Observation>,
    }

    impl ObservationSink for Recording {
        fn deliver(&mut self, observation: &Observation) -> Result<()> {
            self.seen.push(*observation);
            Ok(())
        }
    }

    struct Broken;

    impl ObservationSink for Broken {
        fn deliver(&mut self, _observation: &Observation) -> Result<()> {
            Err(Error::Presentation("display detached".to_string()))
        }
    }

    /// fit呼び出しを記録する検知器
    #[derive(Default)]
    struct Spy {
        fits: Vec<usize>,
        fail: bool,
    }

    impl OutlierDetector for Spy {
        fn fit(&mut self, batch: &[f64]) -> Result<()> {
            self.fits.push(batch.len());
            if self.fail {
                Err(Error::Training("spy".to_string()))
            } else {
                Ok(())
            }
        }

        fn predict(&self, _value: f64) -> Result<Label> {
            Ok(Label::Normal)
        }

        fn is_fitted(&self) -> bool {
            !self.fail && !self.fits.is_empty()
        }
    }

    fn settings(window: usize, period: u64) -> ControllerSettings {
        ControllerSettings {
            window_capacity: window,
            retrain_period: period,
            pacing: Duration::ZERO,
            max_observations: None,
        }
    }

    fn generator(seed: u64) -> TransactionGenerator {
        TransactionGenerator::with_seed(GeneratorSettings::default(), seed).with_calendar(FixedMonth(1))
    }

    fn forest_controller() -> StreamController<IsolationForest, Recording> {
        StreamController::new(
            generator(11),
            IsolationForest::with_seed(ForestSettings::default(), 12),
            Recording::default(),
            settings(100, 100),
        )
    }

    #[test]
    fn test_retrain_triggers_only_on_period() {
        let mut controller =
            StreamController::new(generator(1), Spy::default(), Recording::default(), settings(10, 25));
        for _ in 0..101 {
            controller.step();
        }
        // i=0,25,50,75,100
        assert_eq!(controller.detector().fits, vec![1, 10, 10, 10, 10]);
        assert_eq!(controller.stats().retrains, 5);
    }

    #[test]
    fn test_window_length_property() {
        let mut controller =
            StreamController::new(generator(2), Spy::default(), Recording::default(), settings(100, 100));
        for i in 0..250u64 {
            controller.step();
            assert_eq!(controller.window().len(), ((i + 1) as usize).min(100));
        }
        let first = controller.window().iter().next().map(|o| o.index);
        assert_eq!(first, Some(150));
    }

    #[test]
    fn test_bootstrapping_without_history() {
        let mut controller = forest_controller();
        assert_eq!(controller.bootstrap(None), ControllerState::Bootstrapping);

        // i=0の学習は1件のみで失敗する
        let first = controller.step();
        assert_eq!(first.label, Label::Normal);
        assert_eq!(controller.state(), ControllerState::Bootstrapping);
        assert_eq!(controller.stats().retrain_failures, 1);

        for _ in 1..100 {
            let obs = controller.step();
            assert_eq!(obs.label, Label::Normal);
        }
        assert_eq!(controller.stats().prediction_failures, 100);
        assert_eq!(controller.state(), ControllerState::Bootstrapping);

        // i=100: 判定は学習前なので失敗、その直後に学習
        controller.step();
        assert_eq!(controller.stats().prediction_failures, 101);
        assert_eq!(controller.state(), ControllerState::Active);
        let model = controller.detector().stats().unwrap();
        assert_eq!(model.training_samples, 100);

        for _ in 0..50 {
            controller.step();
        }
        assert_eq!(controller.stats().prediction_failures, 101);
    }

    #[test]
    fn test_bootstrap_with_history_activates() {
        let mut controller = forest_controller();
        let history: Vec<f64> = (0..120).map(|i| (i as f64 * 37.0) % 1000.0).collect();
        assert_eq!(controller.bootstrap(Some(&history)), ControllerState::Active);

        controller.step();
        assert_eq!(controller.stats().prediction_failures, 0);
        // i=0の再学習失敗でモデルは維持される
        assert_eq!(controller.stats().retrain_failures, 1);
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.detector().stats().unwrap().training_samples, 120);
    }

    #[test]
    fn test_bootstrap_with_degenerate_history_stays_bootstrapping() {
        let mut controller = forest_controller();
        let state = controller.bootstrap(Some(&[5.0; 30]));
        assert_eq!(state, ControllerState::Bootstrapping);
    }

    #[test]
    fn test_failed_retrain_keeps_state() {
        let spy = Spy {
            fail: true,
            ..Spy::default()
        };
        let mut controller =
            StreamController::new(generator(3), spy, Recording::default(), settings(10, 5));
        for _ in 0..20 {
            controller.step();
        }
        assert_eq!(controller.state(), ControllerState::Bootstrapping);
        assert_eq!(controller.stats().retrain_failures, 4);
    }

    #[test]
    fn test_sink_receives_every_observation_in_order() {
        let mut controller = forest_controller();
        for _ in 0..30 {
            controller.step();
        }
        let sink = controller.into_sink();
        let indices: Vec<u64> = sink.seen.iter().map(|o| o.index).collect();
        assert_eq!(indices, (0..30).collect::<Vec<u64>>());
    }

    #[test]
    fn test_sink_failure_does_not_stop_loop() {
        let mut controller = StreamController::new(
            generator(4),
            IsolationForest::with_seed(ForestSettings::default(), 5),
            Broken,
            settings(100, 100),
        );
        for _ in 0..10 {
            controller.step();
        }
        assert_eq!(controller.stats().observations, 10);
        assert_eq!(controller.stats().sink_failures, 10);
    }

    #[tokio::test]
    async fn test_run_stops_at_observation_limit() {
        let mut config_settings = settings(100, 100);
        config_settings.max_observations = Some(250);
        let mut controller = StreamController::new(
            generator(6),
            IsolationForest::with_seed(ForestSettings::default(), 7),
            Recording::default(),
            config_settings,
        );

        let stats = controller.run(std::future::pending()).await;
        assert_eq!(stats.observations, 250);
        assert_eq!(stats.retrains, 2);
        assert_eq!(stats.retrain_failures, 1);
        assert_eq!(controller.state(), ControllerState::Active);
    }

    #[tokio::test]
    async fn test_run_waits_pacing_between_observations() {
        let mut paced = settings(100, 100);
        paced.pacing = Duration::from_millis(20);
        paced.max_observations = Some(5);
        let mut controller = StreamController::new(
            generator(8),
            IsolationForest::with_seed(ForestSettings::default(), 9),
            Recording::default(),
            paced,
        );

        let started = tokio::time::Instant::now();
        let stats = controller.run(std::future::pending()).await;
        assert_eq!(stats.observations, 5);
        assert!(
            started.elapsed() >= Duration::from_millis(80),
            "elapsed {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_shutdown_during_pacing_stops_after_current_observation() {
        let mut paced = settings(100, 100);
        paced.pacing = Duration::from_secs(5);
        let mut controller = StreamController::new(
            generator(10),
            IsolationForest::with_seed(ForestSettings::default(), 11),
            Recording::default(),
            paced,
        );

        let started = tokio::time::Instant::now();
        let stats = controller
            .run(tokio::time::sleep(Duration::from_millis(30)))
            .await;
        assert_eq!(stats.observations, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(controller.into_sink().seen.len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut controller = forest_controller();
        let stats = controller.run(async {}).await;
        assert_eq!(stats.observations, 1);
    }
}
