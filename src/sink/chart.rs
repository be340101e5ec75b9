//! Rolling Chart
//!
//! 直近N点をラベル別に色分けしてターミナルに描画するライブチャート

use super::ObservationSink;
use crate::error::{Error, Result};
use crate::observation::{Label, Observation};
use crossterm::style::Stylize;
use crossterm::{cursor, queue, terminal};
use std::collections::VecDeque;
use std::io::Write;

/// チャートに表示する点数
pub const DEFAULT_CHART_POINTS: usize = 100;

const POINT: &str = "●";

/// ローリングチャートの状態
#[derive(Debug, Clone)]
pub struct RollingChart {
    points: VecDeque<Observation>,
    max_points: usize,
    /// 描画行数
    height: usize,
    /// ANSIカラーを使うか
    color: bool,
}

impl RollingChart {
    /// 新しいチャートを作成
    pub fn new(max_points: usize, height: usize) -> Self {
        let max_points = max_points.max(1);
        Self {
            points: VecDeque::with_capacity(max_points),
            max_points,
            height: height.max(2),
            color: true,
        }
    }

    /// カラー出力の有無
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// 点を追加（古い点から押し出す）
    pub fn push(&mut self, observation: Observation) {
        if self.points.len() >= self.max_points {
            self.points.pop_front();
        }
        self.points.push_back(observation);
    }

    pub fn points(&self) -> impl Iterator<Item = &Observation> {
        self.points.iter()
    }

    /// 表示中のx軸範囲
    ///
    /// 最新インデックスが `max_points` を超えるとウィンドウが右へずれる。
    pub fn x_range(&self) -> (u64, u64) {
        let span = self.max_points as u64 - 1;
        let latest = self.points.back().map(|o| o.index).unwrap_or(0);
        let start = latest.saturating_sub(span);
        (start, start + span)
    }

    /// y軸範囲（常に0を含む）
    pub fn y_range(&self) -> (f64, f64) {
        let hi = self.points.iter().map(|o| o.value).fold(0.0, f64::max);
        (0.0, hi)
    }

    /// 各値の描画行（0が最下段）
    fn row_of(&self, value: f64, hi: f64) -> usize {
        if hi <= 0.0 {
            return 0;
        }
        let scaled = (value / hi * (self.height - 1) as f64).round();
        (scaled.max(0.0) as usize).min(self.height - 1)
    }

    fn cell(&self, label: Label) -> String {
        match (self.color, label) {
            (false, Label::Normal) => "o".to_string(),
            (false, Label::Anomaly) => "X".to_string(),
            (true, Label::Normal) => POINT.blue().to_string(),
            (true, Label::Anomaly) => POINT.red().to_string(),
        }
    }

    /// チャートを描画
    pub fn render<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let (start, end) = self.x_range();
        let (_, hi) = self.y_range();
        let anomalies = self.points.iter().filter(|o| o.label.is_anomaly()).count();

        let mut grid: Vec<Vec<Option<Label>>> = vec![vec![None; self.max_points]; self.height];
        for point in &self.points {
            let Some(column) = point.index.checked_sub(start).map(|c| c as usize) else {
                continue;
            };
            if column < self.max_points {
                let row = self.row_of(point.value, hi);
                grid[row][column] = Some(point.label);
            }
        }

        writeln!(
            out,
            "Transactions [{} .. {}]  points={} anomalies={}",
            start,
            end,
            self.points.len(),
            anomalies
        )?;
        for (row, cells) in grid.iter().enumerate().rev() {
            let level = hi * row as f64 / (self.height - 1) as f64;
            write!(out, "{:>9.1} |", level)?;
            for cell in cells {
                match cell {
                    Some(label) => write!(out, "{}", self.cell(*label))?,
                    None => write!(out, " ")?,
                }
            }
            writeln!(out)?;
        }
        writeln!(out, "{:>9} +{}", "", "-".repeat(self.max_points))?;
        Ok(())
    }
}

impl Default for RollingChart {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_POINTS, 16)
    }
}

/// ターミナルにチャートを再描画するシンク
pub struct ChartSink<W: Write> {
    chart: RollingChart,
    out: W,
    /// 描画前に画面をクリアするか
    clear_screen: bool,
}

impl<W: Write> ChartSink<W> {
    /// 新しいチャートシンクを作成
    pub fn new(chart: RollingChart, out: W) -> Self {
        Self {
            chart,
            out,
            clear_screen: true,
        }
    }

    /// 画面クリアの有無
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    pub fn chart(&self) -> &RollingChart {
        &self.chart
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn redraw(&mut self) -> std::io::Result<()> {
        if self.clear_screen {
            queue!(
                self.out,
                cursor::MoveTo(0, 0),
                terminal::Clear(terminal::ClearType::All)
            )?;
        }
        self.chart.render(&mut self.out)?;
        self.out.flush()
    }
}

impl<W: Write> ObservationSink for ChartSink<W> {
    fn deliver(&mut self, observation: &Observation) -> Result<()> {
        self.chart.push(*observation);
        self.redraw()
            .map_err(|e| Error::Presentation(format!("chart redraw failed: {}", e)))
    }

    fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| Error::Presentation(format!("chart flush failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(index: u64, value: f64, label: Label) -> Observation {
        Observation::new(index, value, label)
    }

    #[test]
    fn test_chart_keeps_last_points() {
        let mut chart = RollingChart::new(100, 10);
        for i in 0..250 {
            chart.push(obs(i, i as f64, Label::Normal));
        }
        assert_eq!(chart.points().count(), 100);
        assert_eq!(chart.points().next().map(|o| o.index), Some(150));
    }

    #[test]
    fn test_x_range_shifts_after_capacity() {
        let mut chart = RollingChart::new(100, 10);
        chart.push(obs(0, 1.0, Label::Normal));
        assert_eq!(chart.x_range(), (0, 99));

        for i in 1..=99 {
            chart.push(obs(i, 1.0, Label::Normal));
        }
        assert_eq!(chart.x_range(), (0, 99));

        chart.push(obs(100, 1.0, Label::Normal));
        assert_eq!(chart.x_range(), (1, 100));

        for i in 101..=340 {
            chart.push(obs(i, 1.0, Label::Normal));
        }
        assert_eq!(chart.x_range(), (241, 340));
    }

    #[test]
    fn test_render_plain() {
        let mut chart = RollingChart::new(5, 3).with_color(false);
        chart.push(obs(0, 0.0, Label::Normal));
        chart.push(obs(1, 100.0, Label::Anomaly));

        let mut out = Vec::new();
        chart.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Transactions [0 .. 4]  points=2 anomalies=1"));
        let lines: Vec<&str> = text.lines().collect();
        // ヘッダー + 3行 + x軸
        assert_eq!(lines.len(), 5);
        assert!(lines[1].ends_with("| X   "));
        assert!(lines[3].ends_with("|o    "));
    }

    #[test]
    fn test_chart_sink_writes_frames() {
        let chart = RollingChart::new(10, 4).with_color(false);
        let mut sink = ChartSink::new(chart, Vec::new()).with_clear_screen(false);

        sink.deliver(&obs(0, 10.0, Label::Normal)).unwrap();
        sink.deliver(&obs(1, 90.0, Label::Anomaly)).unwrap();
        assert_eq!(sink.chart().points().count(), 2);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.matches("Transactions [").count(), 2);
    }
}
