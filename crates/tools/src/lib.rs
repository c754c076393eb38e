//! Offline helpers for a data root: checking it against a catalog and
//! generating a small synthetic one.

use std::fs;
use std::path::Path;

use catalog::IndicatorCatalog;
use formats::boundaries::{BoundaryCollection, BoundaryKeys};
use formats::geotiff::{DecodedRaster, encode_geotiff};
use foundation::bounds::GeoBounds;
use serde::Serialize;
use serde_json::json;
use streaming::{DataSource, FsDataSource};

/// Result of checking every path the viewer can request.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AuditReport {
    pub checked: usize,
    pub missing: Vec<String>,
    /// Region ids found in the boundary file; empty when it is absent.
    pub regions: Vec<String>,
    pub errors: Vec<String>,
}

impl AuditReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.errors.is_empty()
    }

    fn check(&mut self, source: &FsDataSource, relative: &str) -> bool {
        self.checked += 1;
        let present = source.exists(relative);
        if !present {
            self.missing.push(relative.to_string());
        }
        present
    }
}

/// Walks every (indicator, period) raster, legend, boundary file and
/// per-region time series the catalog implies.
pub fn audit(catalog: &IndicatorCatalog, source: &FsDataSource, keys: &BoundaryKeys) -> AuditReport {
    let mut report = AuditReport::default();

    let boundaries = catalog.boundaries_path();
    if report.check(source, boundaries) {
        match source
            .fetch(boundaries)
            .map_err(|e| e.to_string())
            .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
            .and_then(|text| BoundaryCollection::from_geojson_str(&text, keys).map_err(|e| e.to_string()))
        {
            Ok(collection) => {
                report.regions = collection.features.into_iter().map(|f| f.id).collect();
            }
            Err(e) => report.errors.push(format!("{boundaries}: {e}")),
        }
    }

    for def in catalog.indicators() {
        report.check(source, &catalog.legend_path(def));
        for period in catalog.periods_for(def) {
            match catalog.raster_path(def, period) {
                Ok(path) => {
                    report.check(source, &path);
                }
                Err(e) => report.errors.push(e.to_string()),
            }
        }
        let regions = report.regions.clone();
        for region in &regions {
            match catalog.timeseries_path(region, &def.id) {
                Ok(path) => {
                    report.check(source, &path);
                }
                Err(e) => report.errors.push(e.to_string()),
            }
        }
    }
    report
}

const DEMO_BOUNDS: GeoBounds = GeoBounds {
    west: 34.0,
    south: -5.0,
    east: 42.0,
    north: 0.0,
};

const DEMO_REGIONS: [(&str, &str, [f64; 4]); 2] = [
    ("R12", "Highlands", [34.0, -5.0, 39.0, 0.0]),
    ("R3", "Coast", [39.0, -5.0, 42.0, 0.0]),
];

/// Summary of what `write_demo` produced.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DemoSummary {
    pub rasters: usize,
    pub series: usize,
}

/// Writes a synthetic data root for the catalog: two regions, a west to east
/// gradient raster per period and monthly series with a gap every fifth
/// year. Legend images are not generated.
pub fn write_demo(catalog: &IndicatorCatalog, out: &Path) -> Result<DemoSummary, String> {
    let mut summary = DemoSummary::default();

    let catalog_json =
        serde_json::to_string_pretty(&catalog.to_document()).map_err(|e| e.to_string())?;
    write_file(out, "catalog.json", catalog_json.as_bytes())?;
    write_file(out, catalog.boundaries_path(), demo_boundaries().as_bytes())?;

    for def in catalog.indicators() {
        let (lo, hi) = def.value_range.map(|[a, b]| (a, b)).unwrap_or((0.0, 100.0));
        for (n, period) in catalog.periods_for(def).into_iter().enumerate() {
            let path = catalog.raster_path(def, period).map_err(|e| e.to_string())?;
            let shift = (n % 5) as f64 * 0.05;
            let bytes = gradient_tiff(lo, hi, shift)?;
            write_file(out, &path, &bytes)?;
            summary.rasters += 1;
        }

        for (r, (region, _, _)) in DEMO_REGIONS.iter().enumerate() {
            let path = catalog
                .timeseries_path(region, &def.id)
                .map_err(|e| e.to_string())?;
            let series = demo_series(catalog, lo, hi, r);
            let text = serde_json::to_string_pretty(&series).map_err(|e| e.to_string())?;
            write_file(out, &path, text.as_bytes())?;
            summary.series += 1;
        }
    }
    Ok(summary)
}

fn write_file(root: &Path, relative: &str, bytes: &[u8]) -> Result<(), String> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("create {parent:?}: {e}"))?;
    }
    fs::write(&path, bytes).map_err(|e| format!("write {path:?}: {e}"))
}

fn gradient_tiff(lo: f64, hi: f64, shift: f64) -> Result<Vec<u8>, String> {
    let (width, height) = (32u32, 20u32);
    let mut values = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        for col in 0..width {
            // A NaN strip along the bottom row exercises the transparent path.
            if row == height - 1 && col % 4 == 0 {
                values.push(f32::NAN);
                continue;
            }
            let t = (col as f64 / (width - 1) as f64 * 0.8 + shift).min(1.0);
            values.push((lo + (hi - lo) * t) as f32);
        }
    }
    let raster =
        DecodedRaster::new(width, height, DEMO_BOUNDS, values).map_err(|e| e.to_string())?;
    encode_geotiff(&raster).map_err(|e| e.to_string())
}

fn demo_boundaries() -> String {
    let features: Vec<_> = DEMO_REGIONS
        .iter()
        .map(|(id, name, [w, s, e, n])| {
            json!({
                "type": "Feature",
                "properties": { "region_id": id, "name": name },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[w, s], [e, s], [e, n], [w, n], [w, s]]]
                }
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features }).to_string()
}

fn demo_series(catalog: &IndicatorCatalog, lo: f64, hi: f64, region: usize) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for (y, year) in catalog.years().iter().enumerate() {
        for month in 1..=12u32 {
            let value = if (y + region) % 5 == 3 && month > 6 {
                None
            } else {
                let phase = (month as f64 - 1.0) / 12.0 * std::f64::consts::TAU;
                let t = 0.5 + 0.4 * phase.sin() * if region == 0 { 1.0 } else { 0.6 };
                Some(((lo + (hi - lo) * t) * 100.0).round() / 100.0)
            };
            out.push(json!({ "date": format!("{year}-{month:02}"), "value": value }));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_root_passes_audit_apart_from_legends() {
        let catalog = IndicatorCatalog::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let summary = write_demo(&catalog, dir.path()).unwrap();
        assert!(summary.rasters > 0);
        assert_eq!(summary.series, catalog.indicators().count() * DEMO_REGIONS.len());

        let source = FsDataSource::new(dir.path());
        let report = audit(&catalog, &source, &BoundaryKeys::default());
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.regions, vec!["R12".to_string(), "R3".to_string()]);
        assert_eq!(report.missing.len(), catalog.indicators().count());
        assert!(report.missing.iter().all(|p| p.starts_with("legends/")));
    }

    #[test]
    fn empty_root_reports_everything_missing() {
        let catalog = IndicatorCatalog::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let report = audit(&catalog, &FsDataSource::new(dir.path()), &BoundaryKeys::default());
        assert!(!report.is_complete());
        assert!(report.regions.is_empty());
        assert_eq!(report.checked, report.missing.len());
        assert!(report.missing.contains(&"admin/adm1.geojson".to_string()));
    }

    #[test]
    fn demo_series_parse_with_gaps() {
        let catalog = IndicatorCatalog::builtin().unwrap();
        let series = demo_series(&catalog, 0.0, 1.0, 0);
        let text = serde_json::to_string(&series).unwrap();
        let points = formats::timeseries::parse_time_series(text.as_bytes()).unwrap();
        assert_eq!(points.len(), catalog.years().len() * 12);
        assert!(points.iter().any(|p| p.value.is_none()));
        assert!(points.iter().any(|p| p.value.is_some()));
    }
}
