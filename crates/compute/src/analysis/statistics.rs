pub struct Statistics;

impl Statistics {
    /// Min and max over the finite values; NaN and infinities are skipped.
    pub fn min_max<I>(values: I) -> Option<(f64, f64)>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut out: Option<(f64, f64)> = None;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            out = Some(match out {
                None => (v, v),
                Some((min, max)) => (min.min(v), max.max(v)),
            });
        }
        out
    }

    /// Like `min_max`, but never returns an empty interval.
    pub fn display_range<I>(values: I) -> Option<(f64, f64)>
    where
        I: IntoIterator<Item = f64>,
    {
        let (min, max) = Self::min_max(values)?;
        if max > min {
            return Some((min, max));
        }
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        Some((min - pad, max + pad))
    }
}

#[cfg(test)]
mod tests {
    use super::Statistics;

    #[test]
    fn min_max_skips_nan() {
        let r = Statistics::min_max([f64::NAN, 3.0, -1.0, f64::INFINITY, 2.0]);
        assert_eq!(r, Some((-1.0, 3.0)));
        assert_eq!(Statistics::min_max([f64::NAN]), None);
    }

    #[test]
    fn display_range_widens_flat_series() {
        assert_eq!(Statistics::display_range([5.0, 5.0]), Some((4.5, 5.5)));
        assert_eq!(Statistics::display_range([0.0]), Some((-1.0, 1.0)));
        assert_eq!(Statistics::display_range([1.0, 2.0]), Some((1.0, 2.0)));
    }
}
