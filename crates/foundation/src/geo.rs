/// A map position in degrees, latitude first like the map libraries report it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    /// Builds a position from GeoJSON axis order (`[lon, lat]`).
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        LatLng { lat, lng: lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}
