//! Reporting utilities: series statistics and formatted terminal output.

pub mod format;

pub use format::*;

use chrono::Datelike;

use crate::domain::TimeSeries;

/// Summary statistics of the value column over the plotted window.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

pub fn series_stats(series: &TimeSeries) -> Option<SeriesStats> {
    if series.is_empty() {
        return None;
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for v in series.values() {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }

    let mut sorted: Vec<f64> = series.values().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    Some(SeriesStats {
        count: n,
        min,
        max,
        mean: sum / n as f64,
        median,
    })
}

/// First and last year of the plotted series, for the chart title.
pub fn year_range(series: &TimeSeries) -> Option<(i32, i32)> {
    let first = series.timestamps().min()?;
    let last = series.timestamps().max()?;
    Some((first.year(), last.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(1960, 1, 1).unwrap();
        TimeSeries {
            points: values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + chrono::Days::new(i as u64), v))
                .collect(),
        }
    }

    #[test]
    fn stats_over_odd_count() {
        let s = series(&[3.0, 1.0, 2.0]);
        let stats = series_stats(&s).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert_eq!(stats.median, 2.0);
    }

    #[test]
    fn median_averages_middle_pair_for_even_count() {
        let s = series(&[4.0, 1.0, 3.0, 2.0]);
        let stats = series_stats(&s).unwrap();
        assert!((stats.median - 2.5).abs() < 1e-12);
    }

    #[test]
    fn empty_series_has_no_stats() {
        assert!(series_stats(&TimeSeries { points: vec![] }).is_none());
        assert!(year_range(&TimeSeries { points: vec![] }).is_none());
    }

    #[test]
    fn year_range_spans_first_to_last() {
        let mut s = series(&[1.0]);
        s.points
            .push((NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(), 2.0));
        assert_eq!(year_range(&s), Some((1960, 2025)));
    }
}
