use std::iter::Sum;

use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

const BARS: [&str; 8] = ["█", "▉", "▊", "▋", "▌", "▍", "▎", "▏"];

/// Allocation of a resource, rendered as a horizontal bar
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Utilization {
    /// Amount of resources allocated to jobs
    pub allocated: f64,
    /// Amount of resources unavailable for other reasons (node down, drained)
    pub unavailable: f64,
    /// Total amount of resources
    pub capacity: f64,
}

impl Utilization {
    pub fn available(&self) -> f64 {
        (self.capacity - (self.allocated + self.unavailable)).max(0.0)
    }

    /// Allocated resources as a percentage of capacity
    pub fn percent(&self) -> f64 {
        if self.capacity > 0.0 {
            self.allocated / self.capacity * 100.0
        } else {
            0.0
        }
    }

    pub fn to_line<'a>(&self, length: u16) -> Line<'a> {
        let mut spans = Vec::new();
        if length > 0 && self.capacity > 0.0 {
            // Total number of chars appended
            let mut chars = 0usize;

            // Inconsistent values are clamped rather than overflowing the bar
            let allocated = self.allocated.min(self.capacity);
            let available = (self.capacity - self.unavailable).max(allocated);

            // List of segments by their end-point and their colors
            let segments = [
                (allocated, Color::Yellow),
                // Unallocated resources
                (available, Color::DarkGray),
                // Unavailable resources
                (self.capacity, Color::Black),
            ];

            let mut last_end = 0.0;
            let mut last_color = Color::Yellow;

            for (end, color) in segments {
                let end = (end / self.capacity) * length as f64;
                if end <= last_end {
                    continue;
                }

                // Bars will typically partially overlap the trailing character
                let remainder = last_end - last_end.floor();
                let fraction = (remainder * 8.0) as isize - 1;

                if fraction > 0 {
                    spans.push(Span::styled(
                        BARS[fraction as usize],
                        style(last_color, color),
                    ));
                    last_end += 1.0 - remainder;
                    chars += 1;
                } else {
                    // Truncate the last segment, since the remainder too short to render
                    last_end -= remainder;
                }

                if end > last_end {
                    let whole = (end - last_end) as usize;
                    if whole > 0 {
                        spans.push(Span::styled(BARS[0].repeat(whole), style(color, color)));
                        chars += whole;
                    }

                    last_end = end;
                    last_color = color;
                }
            }

            let remainder = (length as usize).saturating_sub(chars);
            if remainder > 0 {
                spans.push(Span::styled(
                    BARS[0].repeat(remainder),
                    style(last_color, last_color),
                ));
            }
        }

        Line::from(spans)
    }
}

/// Implements the sum operator for Utilization objects
/// This is used for cluster-wide overviews
impl Sum for Utilization {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut result = Utilization::default();
        for it in iter {
            result.allocated += it.allocated;
            result.unavailable += it.unavailable;
            result.capacity += it.capacity;
        }
        result
    }
}

fn style(fg: Color, bg: Color) -> Style {
    Style::reset().fg(fg).bg(bg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width(line: &Line) -> usize {
        line.spans.iter().map(|s| s.content.chars().count()).sum()
    }

    #[test]
    fn test_percent() {
        let utilization = Utilization {
            allocated: 4.0,
            unavailable: 2.0,
            capacity: 16.0,
        };

        assert_eq!(utilization.percent(), 25.0);
        assert_eq!(utilization.available(), 10.0);
        assert_eq!(Utilization::default().percent(), 0.0);
    }

    #[test]
    fn test_to_line_fills_length() {
        for (allocated, unavailable) in [(0.0, 0.0), (3.0, 1.0), (7.0, 0.0), (8.0, 0.0), (1.0, 7.0)] {
            let utilization = Utilization {
                allocated,
                unavailable,
                capacity: 8.0,
            };

            for length in [1, 7, 10, 33] {
                assert_eq!(width(&utilization.to_line(length)), length as usize);
            }
        }

        assert!(Utilization::default().to_line(10).spans.is_empty());
    }

    #[test]
    fn test_sum() {
        let total: Utilization = [(1.0, 0.0, 4.0), (2.0, 2.0, 4.0)]
            .into_iter()
            .map(|(allocated, unavailable, capacity)| Utilization {
                allocated,
                unavailable,
                capacity,
            })
            .sum();

        assert_eq!(
            total,
            Utilization {
                allocated: 3.0,
                unavailable: 2.0,
                capacity: 8.0
            }
        );
    }
}
