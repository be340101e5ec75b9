//! Seasonal Context
//!
//! 暦月から季節乗数を決定する

use chrono::Datelike;
use rand::Rng;

/// 季節
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// 12月〜2月
    Winter,
    /// 3月〜5月
    Spring,
    /// 6月〜8月
    Summer,
    /// 9月〜11月
    Autumn,
}

impl Season {
    /// 月（1-12）から季節を判定
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Autumn),
            _ => None,
        }
    }
}

/// 季節乗数テーブル
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalProfile {
    pub winter: (f64, f64),
    pub spring: (f64, f64),
    pub summer: (f64, f64),
    pub autumn: (f64, f64),
    /// 季節を判定できない場合の乗数
    pub fallback: f64,
}

impl Default for SeasonalProfile {
    fn default() -> Self {
        Self {
            winter: (1.2, 1.5), // 年末商戦
            spring: (0.8, 1.2),
            summer: (0.9, 1.3),
            autumn: (1.0, 1.4),
            fallback: 1.0,
        }
    }
}

impl SeasonalProfile {
    /// 季節ごとの乗数範囲
    pub fn range(&self, season: Season) -> (f64, f64) {
        match season {
            Season::Winter => self.winter,
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Autumn => self.autumn,
        }
    }

    /// 全季節を通じた乗数の上限
    pub fn max_multiplier(&self) -> f64 {
        [self.winter, self.spring, self.summer, self.autumn]
            .iter()
            .map(|(_, hi)| *hi)
            .fold(self.fallback, f64::max)
    }

    /// 指定月の乗数をサンプリング
    pub fn sample<R: Rng + ?Sized>(&self, month: u32, rng: &mut R) -> f64 {
        match Season::from_month(month) {
            Some(season) => {
                let (lo, hi) = self.range(season);
                rng.gen_range(lo..=hi)
            }
            None => self.fallback,
        }
    }
}

/// 現在月の取得元
pub trait MonthSource: Send {
    /// 現在月（1-12）
    fn current_month(&self) -> u32;
}

/// ローカル時刻のカレンダー
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCalendar;

impl MonthSource for LocalCalendar {
    fn current_month(&self) -> u32 {
        chrono::Local::now().month()
    }
}

/// 固定月（テスト・再現用）
#[derive(Debug, Clone, Copy)]
pub struct FixedMonth(pub u32);

impl MonthSource for FixedMonth {
    fn current_month(&self) -> u32 {
        self.0
    }
}
