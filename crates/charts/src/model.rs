use chrono::NaiveDate;
use compute::{Statistics, TemporalAnalysis};
use formats::timeseries::TimeSeriesPoint;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A run of consecutive non-null observations, drawn as one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSegment {
    pub points: Vec<ChartPoint>,
}

/// Everything a chart surface needs to draw one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartModel {
    pub title: String,
    pub unit: String,
    pub region_id: String,
    pub region_name: String,
    pub indicator_id: String,
    pub segments: Vec<ChartSegment>,
    /// Over non-null values only.
    pub y_range: Option<(f64, f64)>,
    /// Covers nulls too, so gaps at either end stay visible on the axis.
    pub x_extent: Option<(NaiveDate, NaiveDate)>,
    pub gap_count: usize,
}

impl ChartModel {
    pub fn build(
        title: impl Into<String>,
        unit: impl Into<String>,
        region_id: impl Into<String>,
        region_name: impl Into<String>,
        indicator_id: impl Into<String>,
        points: &[TimeSeriesPoint],
    ) -> Self {
        let values: Vec<Option<f64>> = points.iter().map(|p| p.value).collect();
        let segments = TemporalAnalysis::present_runs(&values)
            .into_iter()
            .map(|run| ChartSegment {
                points: points[run]
                    .iter()
                    .filter_map(|p| {
                        p.value.map(|value| ChartPoint {
                            date: p.date,
                            value,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            title: title.into(),
            unit: unit.into(),
            region_id: region_id.into(),
            region_name: region_name.into(),
            indicator_id: indicator_id.into(),
            segments,
            y_range: Statistics::display_range(values.iter().flatten().copied()),
            x_extent: TemporalAnalysis::extent(points.iter().map(|p| p.date)),
            gap_count: values.iter().filter(|v| v.is_none()).count(),
        }
    }

    pub fn plotted_points(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    pub fn has_values(&self) -> bool {
        self.plotted_points() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::ChartModel;
    use chrono::NaiveDate;
    use formats::timeseries::TimeSeriesPoint;
    use pretty_assertions::assert_eq;

    fn point(y: i32, m: u32, value: Option<f64>) -> TimeSeriesPoint {
        TimeSeriesPoint {
            date: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            value,
        }
    }

    #[test]
    fn nulls_split_segments_and_are_never_zero() {
        let points = [
            point(2020, 1, Some(0.2)),
            point(2020, 2, Some(0.4)),
            point(2020, 3, None),
            point(2020, 4, Some(0.6)),
            point(2020, 5, None),
        ];
        let model = ChartModel::build("NDVI", "", "R12", "Region 12", "ndvi", &points);
        assert_eq!(model.segments.len(), 2);
        assert_eq!(model.segments[0].points.len(), 2);
        assert_eq!(model.segments[1].points[0].value, 0.6);
        assert_eq!(model.plotted_points(), 3);
        assert_eq!(model.gap_count, 2);
        assert!(
            model
                .segments
                .iter()
                .flat_map(|s| &s.points)
                .all(|p| p.value != 0.0)
        );
        assert_eq!(model.y_range, Some((0.2, 0.6)));
        assert_eq!(
            model.x_extent,
            Some((
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()
            ))
        );
    }

    #[test]
    fn all_null_series_has_no_values() {
        let model = ChartModel::build("t", "", "r", "r", "i", &[point(2020, 1, None)]);
        assert!(!model.has_values());
        assert_eq!(model.y_range, None);
        assert!(model.x_extent.is_some());
    }

    #[test]
    fn serializes_for_the_browser() {
        let model = ChartModel::build("t", "mm", "r", "r", "i", &[point(2021, 6, Some(1.5))]);
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["segments"][0]["points"][0]["date"], "2021-06-01");
        assert_eq!(json["unit"], "mm");
    }
}
