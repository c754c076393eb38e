use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation; `value: None` is a gap, not zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug)]
pub enum SeriesError {
    Json(String),
    InvalidDate { index: usize, value: String },
}

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesError::Json(msg) => write!(f, "time series JSON parse error: {msg}"),
            SeriesError::InvalidDate { index, value } => {
                write!(f, "invalid date {value:?} at index {index}")
            }
        }
    }
}

impl std::error::Error for SeriesError {}

#[derive(Deserialize)]
struct RawPoint {
    date: String,
    #[serde(default)]
    value: Option<f64>,
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM` (first of month) and ISO timestamps
/// whose date part is `YYYY-MM-DD`.
pub fn parse_series_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day_part = match s.find('T') {
        Some(pos) => &s[..pos],
        None => s,
    };
    if let Ok(d) = NaiveDate::parse_from_str(day_part, "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(&format!("{day_part}-01"), "%Y-%m-%d").ok()
}

/// Parses a JSON array of `{date, value}` records, sorted by date.
/// The sort is stable so duplicate dates keep file order.
pub fn parse_time_series(payload: &[u8]) -> Result<Vec<TimeSeriesPoint>, SeriesError> {
    let raw: Vec<RawPoint> =
        serde_json::from_slice(payload).map_err(|e| SeriesError::Json(e.to_string()))?;

    let mut points = Vec::with_capacity(raw.len());
    for (index, p) in raw.into_iter().enumerate() {
        let date = parse_series_date(&p.date).ok_or_else(|| SeriesError::InvalidDate {
            index,
            value: p.date.clone(),
        })?;
        points.push(TimeSeriesPoint {
            date,
            value: p.value.filter(|v| v.is_finite()),
        });
    }
    points.sort_by_key(|p| p.date);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::{SeriesError, TimeSeriesPoint, parse_series_date, parse_time_series};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn date_forms() {
        assert_eq!(parse_series_date("2021-03-15"), Some(d(2021, 3, 15)));
        assert_eq!(parse_series_date("2021-03"), Some(d(2021, 3, 1)));
        assert_eq!(parse_series_date("2021-03-15T00:00:00"), Some(d(2021, 3, 15)));
        assert_eq!(parse_series_date("March"), None);
        assert_eq!(parse_series_date("2021-13"), None);
    }

    #[test]
    fn parses_sorts_and_keeps_nulls() {
        let payload = br#"[
            {"date": "2021-01", "value": 0.4},
            {"date": "2020-01", "value": null},
            {"date": "2020-06-01"},
            {"date": "2020-03-01", "value": 0.3}
        ]"#;
        let points = parse_time_series(payload).unwrap();
        assert_eq!(
            points,
            vec![
                TimeSeriesPoint { date: d(2020, 1, 1), value: None },
                TimeSeriesPoint { date: d(2020, 3, 1), value: Some(0.3) },
                TimeSeriesPoint { date: d(2020, 6, 1), value: None },
                TimeSeriesPoint { date: d(2021, 1, 1), value: Some(0.4) },
            ]
        );
    }

    #[test]
    fn duplicate_dates_keep_file_order() {
        let payload = br#"[
            {"date": "2020-02", "value": 2},
            {"date": "2020-01", "value": 1},
            {"date": "2020-02", "value": 3}
        ]"#;
        let values: Vec<_> = parse_time_series(payload)
            .unwrap()
            .into_iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn malformed_payloads() {
        assert!(matches!(
            parse_time_series(b"{\"date\": 1}"),
            Err(SeriesError::Json(_))
        ));
        assert!(matches!(
            parse_time_series(br#"[{"date": "soon", "value": 1}]"#),
            Err(SeriesError::InvalidDate { index: 0, .. })
        ));
    }
}
