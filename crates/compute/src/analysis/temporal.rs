use chrono::NaiveDate;
use std::ops::Range;

pub struct TemporalAnalysis;

impl TemporalAnalysis {
    /// First and last date of an already sorted sequence.
    pub fn extent<I>(dates: I) -> Option<(NaiveDate, NaiveDate)>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut iter = dates.into_iter();
        let first = iter.next()?;
        let last = iter.last().unwrap_or(first);
        Some((first, last))
    }

    /// Index ranges of consecutive present values. Absent values are the
    /// breaks between runs and never appear in the output.
    pub fn present_runs<T>(values: &[Option<T>]) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;
        for (i, v) in values.iter().enumerate() {
            match (v.is_some(), start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    runs.push(s..i);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(s..values.len());
        }
        runs
    }
}
