use std::fmt;

/// Inclusive range of selectable years.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct YearRange {
    pub first: i32,
    pub last: i32,
}

impl YearRange {
    /// Years covered by the published aggregates.
    pub const SUPPORTED: YearRange = YearRange {
        first: 2020,
        last: 2024,
    };

    pub fn new(first: i32, last: i32) -> Self {
        YearRange {
            first: first.min(last),
            last: first.max(last),
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.first && year <= self.last
    }

    pub fn iter(self) -> impl Iterator<Item = i32> {
        self.first..=self.last
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for YearRange {
    fn default() -> Self {
        YearRange::SUPPORTED
    }
}

/// A year, optionally narrowed to a calendar month (1..=12).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: Option<u8>,
}

impl Period {
    pub fn year(year: i32) -> Self {
        Period { year, month: None }
    }

    pub fn month(year: i32, month: u8) -> Self {
        Period {
            year,
            month: Some(month),
        }
    }

    pub fn is_valid_month(month: u8) -> bool {
        (1..=12).contains(&month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{}-{:02}", self.year, m),
            None => write!(f, "{}", self.year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Period, YearRange};

    #[test]
    fn supported_range_is_2020_to_2024() {
        let r = YearRange::SUPPORTED;
        assert!(r.contains(2020));
        assert!(r.contains(2024));
        assert!(!r.contains(2019));
        assert!(!r.contains(2025));
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![2020, 2021, 2022, 2023, 2024]);
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn period_display_pads_month() {
        assert_eq!(Period::month(2023, 3).to_string(), "2023-03");
        assert_eq!(Period::year(2021).to_string(), "2021");
        assert!(!Period::is_valid_month(0));
        assert!(Period::is_valid_month(12));
        assert!(!Period::is_valid_month(13));
    }
}
