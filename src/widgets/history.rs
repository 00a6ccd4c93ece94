use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Sparkline, Widget, WidgetRef},
};

use crate::slurm::TimeSeries;

use super::misc::render_notice;

/// Sparkline of cluster utilization over time, with a legend below
#[derive(Debug)]
pub struct UtilizationHistory<'a> {
    series: &'a TimeSeries,
}

impl<'a> UtilizationHistory<'a> {
    pub fn new(series: &'a TimeSeries) -> Self {
        Self { series }
    }

    fn legend(&self) -> Line<'a> {
        let samples = &self.series.samples;
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Line::default();
        };

        let peak = samples
            .iter()
            .map(|s| s.utilization)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut text = format!(
            "{} - {}  now {:.1}%  peak {:.1}%",
            first.timestamp.format("%H:%M"),
            last.timestamp.format("%H:%M"),
            last.utilization,
            peak,
        );

        if !self.series.skipped.is_empty() {
            text.push_str(&format!("  ({} windows missing)", self.series.skipped.len()));
        }

        Line::from(text).dim()
    }
}

impl WidgetRef for UtilizationHistory<'_> {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        if self.series.samples.is_empty() {
            render_notice(area, buf, "No utilization history");
            return;
        }

        let [chart, legend] = Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);

        // Most recent samples, if the area is too narrow to show all of them
        let skip = self.series.samples.len().saturating_sub(chart.width as usize);
        let data = self.series.samples[skip..]
            .iter()
            .map(|s| s.utilization.round().clamp(0.0, 100.0) as u64)
            .collect::<Vec<_>>();

        Sparkline::default()
            .data(&data)
            .max(100)
            .style(Style::default().fg(Color::Yellow))
            .render(chart, buf);

        self.legend().render(legend, buf);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};

    use super::*;
    use crate::slurm::{SkippedWindow, UsageError, UtilizationSample};

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        TimeSeries {
            samples: values
                .iter()
                .enumerate()
                .map(|(n, &utilization)| UtilizationSample {
                    timestamp: start + TimeDelta::minutes(30 * n as i64),
                    utilization,
                    allocated_hours: utilization,
                    total_hours: 100.0,
                    idle_hours: 100.0 - utilization,
                    down_hours: 0.0,
                })
                .collect(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_legend() {
        let mut series = series(&[20.0, 80.5, 40.2]);
        let legend = UtilizationHistory::new(&series).legend().to_string();
        assert_eq!(legend, "10:00 - 11:00  now 40.2%  peak 80.5%");

        series.skipped.push(SkippedWindow {
            end: series.samples[0].timestamp,
            reason: UsageError::NoData,
        });
        let legend = UtilizationHistory::new(&series).legend().to_string();
        assert!(legend.ends_with("(1 windows missing)"));
    }

    #[test]
    fn test_render() {
        let series = series(&[0.0, 50.0, 100.0]);
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        UtilizationHistory::new(&series).render_ref(area, &mut buf);

        // Full bars for 100%, nothing for 0%
        assert_eq!(buf[(2, 0)].symbol(), "█");
        assert_eq!(buf[(2, 1)].symbol(), "█");
        assert_eq!(buf[(0, 1)].symbol(), " ");
        assert!((0..10)
            .map(|x| buf[(x, 2)].symbol())
            .collect::<String>()
            .starts_with("10:00 - 11"));
    }

    #[test]
    fn test_render_empty() {
        let series = TimeSeries::default();
        let area = Rect::new(0, 0, 40, 5);
        let mut buf = Buffer::empty(area);
        UtilizationHistory::new(&series).render_ref(area, &mut buf);

        let text = buf.content.iter().map(|c| c.symbol()).collect::<String>();
        assert!(text.contains("No utilization history"));
    }
}
