//! Transaction Generator
//!
//! 無限の取引額シーケンスを遅延生成するイテレータ

use super::season::{LocalCalendar, MonthSource, SeasonalProfile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// 生成器設定
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    /// 取引額のベース値
    pub base_value: f64,
    /// ベース値からの変動幅 `uniform(0, variation)`
    pub variation: f64,
    /// 極端な外れ値を注入する確率
    pub extreme_probability: f64,
    /// 外れ値の倍率範囲
    pub extreme_factor_range: (f64, f64),
    /// 季節乗数テーブル
    pub profile: SeasonalProfile,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_value: 0.0,
            variation: 1000.0,
            extreme_probability: 0.1,
            extreme_factor_range: (5.0, 10.0),
            profile: SeasonalProfile::default(),
        }
    }
}

impl GeneratorSettings {
    /// 外れ値注入なしで生成され得る最大値
    pub fn max_regular_value(&self) -> f64 {
        (self.base_value + self.variation) * self.profile.max_multiplier()
    }
}

/// 取引額ジェネレーター
///
/// 巻き戻しはできない。やり直す場合は新しいインスタンスを作る。
/// ペーシング（生成間隔）は呼び出し側の責務。
pub struct TransactionGenerator {
    settings: GeneratorSettings,
    rng: StdRng,
    calendar: Box<dyn MonthSource>,
    /// 生成済みの値の数
    emitted: u64,
    /// 外れ値を注入した回数
    extremes_injected: u64,
}

impl TransactionGenerator {
    /// エントロピーから初期化したジェネレーターを作成
    pub fn new(settings: GeneratorSettings) -> Self {
        Self::from_rng(settings, StdRng::from_entropy())
    }

    /// シード固定のジェネレーターを作成
    pub fn with_seed(settings: GeneratorSettings, seed: u64) -> Self {
        Self::from_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn from_rng(settings: GeneratorSettings, rng: StdRng) -> Self {
        Self {
            settings,
            rng,
            calendar: Box::new(LocalCalendar),
            emitted: 0,
            extremes_injected: 0,
        }
    }

    /// 月の取得元を差し替え
    pub fn with_calendar(mut self, calendar: impl MonthSource + 'static) -> Self {
        self.calendar = Box::new(calendar);
        self
    }

    /// 次の取引額を生成
    pub fn next_value(&mut self) -> f64 {
        let month = self.calendar.current_month();
        let multiplier = self.settings.profile.sample(month, &mut self.rng);
        let base = self.settings.base_value + self.rng.gen_range(0.0..=self.settings.variation);
        let mut value = base * multiplier;

        if self.rng.gen_bool(self.settings.extreme_probability) {
            let (lo, hi) = self.settings.extreme_factor_range;
            let factor = self.rng.gen_range(lo..=hi);
            value *= factor;
            self.extremes_injected += 1;
            trace!(value, factor, "extreme noise injected");
        }

        self.emitted += 1;
        value
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn extremes_injected(&self) -> u64 {
        self.extremes_injected
    }
}

impl Iterator for TransactionGenerator {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::FixedMonth;

    fn settings_with_probability(p: f64) -> GeneratorSettings {
        GeneratorSettings {
            extreme_probability: p,
            ..GeneratorSettings::default()
        }
    }

    #[test]
    fn test_values_are_non_negative() {
        let generator = TransactionGenerator::with_seed(GeneratorSettings::default(), 42);
        assert!(generator.take(2000).all(|v| v >= 0.0));
    }

    #[test]
    fn test_no_extremes_when_probability_zero() {
        let settings = settings_with_probability(0.0);
        let bound = settings.max_regular_value();
        assert_eq!(bound, 1500.0);

        let mut generator = TransactionGenerator::with_seed(settings, 1234);
        for _ in 0..1000 {
            let v = generator.next_value();
            assert!(v <= bound, "value {} exceeds {}", v, bound);
        }
        assert_eq!(generator.extremes_injected(), 0);
        assert_eq!(generator.emitted(), 1000);
    }

    #[test]
    fn test_every_value_extreme_when_probability_one() {
        let mut generator = TransactionGenerator::with_seed(settings_with_probability(1.0), 9);
        for _ in 0..100 {
            generator.next_value();
        }
        assert_eq!(generator.extremes_injected(), 100);
    }

    #[test]
    fn test_extreme_rate_roughly_matches_probability() {
        let mut generator = TransactionGenerator::with_seed(GeneratorSettings::default(), 2024);
        for _ in 0..10_000 {
            generator.next_value();
        }
        let rate = generator.extremes_injected() as f64 / 10_000.0;
        assert!(rate > 0.07 && rate < 0.13, "rate {}", rate);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let a: Vec<f64> = TransactionGenerator::with_seed(GeneratorSettings::default(), 5)
            .with_calendar(FixedMonth(6))
            .take(50)
            .collect();
        let b: Vec<f64> = TransactionGenerator::with_seed(GeneratorSettings::default(), 5)
            .with_calendar(FixedMonth(6))
            .take(50)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fixed_month_bounds() {
        // 春は乗数上限1.2
        let settings = settings_with_probability(0.0);
        let generator = TransactionGenerator::with_seed(settings, 77).with_calendar(FixedMonth(4));
        assert!(generator.take(500).all(|v| v <= 1200.0));
    }
}
