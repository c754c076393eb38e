use compute::SpatialAnalysis;
use formats::boundaries::{BoundaryCollection, BoundaryError, BoundaryFeature, BoundaryKeys};
use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use serde::Serialize;

use crate::layer::{Layer, LayerId};

/// An administrative region the user can click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Position in the boundary file.
    pub index: usize,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
struct IndexedFeature {
    feature: BoundaryFeature,
    bounds: Option<GeoBounds>,
}

/// Region outlines, loaded once.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    id: LayerId,
    features: Vec<IndexedFeature>,
    bounds: Option<GeoBounds>,
}

impl BoundaryLayer {
    pub fn new(id: LayerId, collection: BoundaryCollection) -> Self {
        let features: Vec<IndexedFeature> = collection
            .features
            .into_iter()
            .map(|feature| IndexedFeature {
                bounds: feature.bounds(),
                feature,
            })
            .collect();
        let bounds = features
            .iter()
            .filter_map(|f| f.bounds)
            .reduce(|a, b| {
                GeoBounds::new(
                    a.west.min(b.west),
                    a.south.min(b.south),
                    a.east.max(b.east),
                    a.north.max(b.north),
                )
            });
        Self {
            id,
            features,
            bounds,
        }
    }

    pub fn from_geojson(
        id: LayerId,
        payload: &str,
        keys: &BoundaryKeys,
    ) -> Result<Self, BoundaryError> {
        Ok(Self::new(id, BoundaryCollection::from_geojson_str(payload, keys)?))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Extent of every region, for fitting the initial view.
    pub fn bounds(&self) -> Option<GeoBounds> {
        self.bounds
    }

    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.features
            .iter()
            .enumerate()
            .map(|(index, f)| region(index, &f.feature))
    }

    pub fn find(&self, id: &str) -> Option<Region> {
        self.regions().find(|r| r.id == id)
    }

    /// The region containing `p`.
    ///
    /// Where regions overlap, the one declared last in the file wins, the
    /// same one a map draws on top.
    pub fn region_at(&self, p: LatLng) -> Option<Region> {
        if !p.is_finite() {
            return None;
        }
        self.features
            .iter()
            .enumerate()
            .rev()
            .find(|(_, f)| {
                f.bounds.is_some_and(|b| b.contains(p))
                    && f
                        .feature
                        .polygons
                        .iter()
                        .any(|poly| SpatialAnalysis::point_in_polygon(p, poly))
            })
            .map(|(index, f)| region(index, &f.feature))
    }
}

fn region(index: usize, feature: &BoundaryFeature) -> Region {
    Region {
        index,
        id: feature.id.clone(),
        name: feature.name.clone(),
    }
}

impl Layer for BoundaryLayer {
    fn id(&self) -> LayerId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::BoundaryLayer;
    use crate::layer::LayerId;
    use formats::boundaries::BoundaryKeys;
    use foundation::geo::LatLng;

    // R1 covers 0..10 with a hole at 4..6; R2 overlaps R1's east half.
    const ADM1: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"region_id":"R1","name":"West"},
         "geometry":{"type":"Polygon","coordinates":[
            [[0,0],[10,0],[10,10],[0,10],[0,0]],
            [[4,4],[6,4],[6,6],[4,6],[4,4]]
         ]}},
        {"type":"Feature","properties":{"region_id":"R2","name":"East"},
         "geometry":{"type":"MultiPolygon","coordinates":[
            [[[8,0],[14,0],[14,10],[8,10],[8,0]]],
            [[[20,20],[22,20],[22,22],[20,20]]]
         ]}}
    ]}"#;

    fn layer() -> BoundaryLayer {
        BoundaryLayer::from_geojson(LayerId(100), ADM1, &BoundaryKeys::default()).unwrap()
    }

    #[test]
    fn hit_miss_and_holes() {
        let l = layer();
        assert_eq!(l.region_at(LatLng::new(2.0, 2.0)).unwrap().id, "R1");
        assert_eq!(l.region_at(LatLng::new(21.0, 21.5)).unwrap().id, "R2");
        assert!(l.region_at(LatLng::new(5.0, 5.0)).is_none());
        assert!(l.region_at(LatLng::new(-3.0, 2.0)).is_none());
        assert!(l.region_at(LatLng::new(f64::NAN, 2.0)).is_none());
    }

    #[test]
    fn overlap_picks_last_feature() {
        let hit = layer().region_at(LatLng::new(5.0, 9.0)).unwrap();
        assert_eq!((hit.index, hit.id.as_str(), hit.name.as_str()), (1, "R2", "East"));
    }

    #[test]
    fn extent_and_lookup() {
        let l = layer();
        let b = l.bounds().unwrap();
        assert_eq!((b.west, b.south, b.east, b.north), (0.0, 0.0, 22.0, 22.0));
        assert_eq!(l.find("R1").unwrap().name, "West");
        assert_eq!(l.len(), 2);
    }
}
