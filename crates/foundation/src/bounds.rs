use crate::geo::LatLng;

/// Geographic extent in degrees (EPSG:4326).
///
/// `west <= east` and `south <= north` for any bounds built through
/// [`GeoBounds::new`]; antimeridian-crossing extents are not represented.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Builds bounds from two opposite corners, normalising their order.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        GeoBounds {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }

    /// Smallest bounds enclosing every point, or `None` for an empty or
    /// non-finite input.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut out: Option<GeoBounds> = None;
        for p in points {
            if !p.is_finite() {
                continue;
            }
            out = Some(match out {
                None => GeoBounds::new(p.lng, p.lat, p.lng, p.lat),
                Some(b) => GeoBounds {
                    west: b.west.min(p.lng),
                    south: b.south.min(p.lat),
                    east: b.east.max(p.lng),
                    north: b.north.max(p.lat),
                },
            });
        }
        out
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: LatLng) -> bool {
        p.lng >= self.west && p.lng <= self.east && p.lat >= self.south && p.lat <= self.north
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn is_finite(&self) -> bool {
        self.west.is_finite() && self.south.is_finite() && self.east.is_finite() && self.north.is_finite()
    }

    /// `[[south, west], [north, east]]`, the corner order map libraries expect.
    pub fn to_corner_array(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::geo::LatLng;

    #[test]
    fn new_normalises_corner_order() {
        let b = GeoBounds::new(10.0, 5.0, -2.0, -1.0);
        assert_eq!(b, GeoBounds::new(-2.0, -1.0, 10.0, 5.0));
        assert_eq!(b.width(), 12.0);
        assert_eq!(b.height(), 6.0);
    }

    #[test]
    fn contains_is_inclusive() {
        let b = GeoBounds::new(0.0, 0.0, 1.0, 1.0);
        assert!(b.contains(LatLng::new(0.0, 0.0)));
        assert!(b.contains(LatLng::new(1.0, 1.0)));
        assert!(!b.contains(LatLng::new(1.0001, 0.5)));
    }

    #[test]
    fn enclosing_skips_non_finite_points() {
        let b = GeoBounds::enclosing([
            LatLng::new(1.0, 2.0),
            LatLng::new(f64::NAN, 9.0),
            LatLng::new(-3.0, 4.0),
        ])
        .unwrap();
        assert_eq!(b, GeoBounds::new(2.0, -3.0, 4.0, 1.0));
        assert!(GeoBounds::enclosing(Vec::new()).is_none());
    }
}
