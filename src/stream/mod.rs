//! Stream Module
//!
//! 季節変動と極端な外れ値を含む取引額ストリームの生成

mod generator;
mod season;

pub use generator::{GeneratorSettings, TransactionGenerator};
pub use season::{FixedMonth, LocalCalendar, MonthSource, Season, SeasonalProfile};
