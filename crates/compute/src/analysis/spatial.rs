use foundation::geo::LatLng;
use formats::boundaries::Polygon;

pub struct SpatialAnalysis;

impl SpatialAnalysis {
    /// Even-odd ray cast along +lng. The ring may be open or closed.
    pub fn point_in_ring(p: LatLng, ring: &[LatLng]) -> bool {
        let n = ring.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = ring[i];
            let b = ring[j];
            if (a.lat > p.lat) != (b.lat > p.lat) {
                let x = (b.lng - a.lng) * (p.lat - a.lat) / (b.lat - a.lat) + a.lng;
                if p.lng < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Inside the outer ring and outside every hole.
    pub fn point_in_polygon(p: LatLng, polygon: &Polygon) -> bool {
        let Some((outer, holes)) = polygon.rings.split_first() else {
            return false;
        };
        Self::point_in_ring(p, outer) && !holes.iter().any(|h| Self::point_in_ring(p, h))
    }
}

#[cfg(test)]
mod tests {
    use super::SpatialAnalysis;
    use foundation::geo::LatLng;
    use formats::boundaries::Polygon;

    fn square(w: f64, s: f64, e: f64, n: f64) -> Vec<LatLng> {
        vec![
            LatLng::from_lon_lat(w, s),
            LatLng::from_lon_lat(e, s),
            LatLng::from_lon_lat(e, n),
            LatLng::from_lon_lat(w, n),
        ]
    }

    #[test]
    fn ring_inside_outside() {
        let ring = square(0.0, 0.0, 10.0, 10.0);
        assert!(SpatialAnalysis::point_in_ring(LatLng::new(5.0, 5.0), &ring));
        assert!(!SpatialAnalysis::point_in_ring(LatLng::new(5.0, 11.0), &ring));
        assert!(!SpatialAnalysis::point_in_ring(LatLng::new(-1.0, 5.0), &ring));
    }

    #[test]
    fn concave_ring() {
        // U shape opening north.
        let ring = vec![
            LatLng::from_lon_lat(0.0, 0.0),
            LatLng::from_lon_lat(3.0, 0.0),
            LatLng::from_lon_lat(3.0, 3.0),
            LatLng::from_lon_lat(2.0, 3.0),
            LatLng::from_lon_lat(2.0, 1.0),
            LatLng::from_lon_lat(1.0, 1.0),
            LatLng::from_lon_lat(1.0, 3.0),
            LatLng::from_lon_lat(0.0, 3.0),
        ];
        assert!(SpatialAnalysis::point_in_ring(LatLng::new(2.5, 0.5), &ring));
        assert!(!SpatialAnalysis::point_in_ring(LatLng::new(2.0, 1.5), &ring));
    }

    #[test]
    fn holes_are_excluded() {
        let polygon = Polygon {
            rings: vec![square(0.0, 0.0, 10.0, 10.0), square(4.0, 4.0, 6.0, 6.0)],
        };
        assert!(SpatialAnalysis::point_in_polygon(LatLng::new(2.0, 2.0), &polygon));
        assert!(!SpatialAnalysis::point_in_polygon(LatLng::new(5.0, 5.0), &polygon));
        assert!(!SpatialAnalysis::point_in_polygon(
            LatLng::new(5.0, 5.0),
            &Polygon { rings: vec![] }
        ));
    }
}
