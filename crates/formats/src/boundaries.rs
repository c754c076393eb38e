use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use serde_json::{Map, Value};

/// One polygon: the first ring is the outer boundary, the rest are holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Vec<LatLng>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub id: String,
    pub name: String,
    pub polygons: Vec<Polygon>,
}

/// Administrative boundaries in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryCollection {
    pub features: Vec<BoundaryFeature>,
}

/// Which feature properties carry the region id and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryKeys {
    pub id_property: String,
    pub name_property: String,
}

impl Default for BoundaryKeys {
    fn default() -> Self {
        Self {
            id_property: "region_id".to_string(),
            name_property: "name".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum BoundaryError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryError::Json(msg) => write!(f, "boundary JSON parse error: {msg}"),
            BoundaryError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            BoundaryError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for BoundaryError {}

impl Polygon {
    pub fn outer(&self) -> &[LatLng] {
        self.rings.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::enclosing(self.outer().iter().copied())
    }
}

impl BoundaryFeature {
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::enclosing(
            self.polygons
                .iter()
                .flat_map(|p| p.outer().iter().copied()),
        )
    }
}

impl BoundaryCollection {
    pub fn from_geojson_str(payload: &str, keys: &BoundaryKeys) -> Result<Self, BoundaryError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| BoundaryError::Json(e.to_string()))?;
        Self::from_geojson_value(&value, keys)
    }

    /// Reads Polygon and MultiPolygon features. Features with other geometry
    /// types, a null geometry or no usable id are skipped.
    pub fn from_geojson_value(value: &Value, keys: &BoundaryKeys) -> Result<Self, BoundaryError> {
        let obj = value
            .as_object()
            .ok_or(BoundaryError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(BoundaryError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(BoundaryError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(BoundaryError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        let mut skipped = 0usize;
        for (index, feat_val) in features_val.iter().enumerate() {
            let feat_obj = feat_val
                .as_object()
                .ok_or(BoundaryError::InvalidFeature {
                    index,
                    reason: "feature must be an object".to_string(),
                })?;

            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let Some(id) = property_string(&properties, &keys.id_property)
                .or_else(|| feat_obj.get("id").and_then(scalar_string))
            else {
                skipped += 1;
                continue;
            };
            let name = property_string(&properties, &keys.name_property).unwrap_or_else(|| id.clone());

            let polygons = match feat_obj.get("geometry") {
                None | Some(Value::Null) => {
                    skipped += 1;
                    continue;
                }
                Some(geometry) => parse_areal_geometry(geometry)
                    .map_err(|reason| BoundaryError::InvalidFeature { index, reason })?,
            };
            let Some(polygons) = polygons else {
                skipped += 1;
                continue;
            };

            features.push(BoundaryFeature { id, name, polygons });
        }

        if skipped > 0 {
            tracing::debug!(skipped, kept = features.len(), "skipped non-areal boundary features");
        }

        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property_string(props: &Map<String, Value>, key: &str) -> Option<String> {
    props.get(key).and_then(scalar_string)
}

/// `Ok(None)` for valid geometries that are not areas.
fn parse_areal_geometry(value: &Value) -> Result<Option<Vec<Polygon>>, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    match ty {
        "Polygon" | "MultiPolygon" => {}
        _ => return Ok(None),
    }

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Polygon" => Ok(Some(vec![parse_polygon(coords)?])),
        _ => Ok(Some(parse_multi_polygon(coords)?)),
    }
}

fn parse_point(coords: &Value) -> Result<LatLng, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0]
        .as_f64()
        .ok_or("lon must be a number".to_string())?;
    let lat = arr[1]
        .as_f64()
        .ok_or("lat must be a number".to_string())?;
    Ok(LatLng::from_lon_lat(lon, lat))
}

fn parse_ring(coords: &Value) -> Result<Vec<LatLng>, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array of positions".to_string())?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(parse_point(item)?);
    }
    // Closing duplicates are implied by the ring tests.
    if out.len() >= 2 && out.first() == out.last() {
        out.pop();
    }
    if out.len() < 3 {
        return Err("ring needs at least three distinct positions".to_string());
    }
    Ok(out)
}

fn parse_polygon(coords: &Value) -> Result<Polygon, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    if rings.is_empty() {
        return Err("Polygon has no rings".to_string());
    }
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        out.push(parse_ring(ring)?);
    }
    Ok(Polygon { rings: out })
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Polygon>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    let mut out = Vec::with_capacity(polys.len());
    for poly in polys {
        out.push(parse_polygon(poly)?);
    }
    Ok(out)
}
