//! Browser entry points for the indicator viewer.
//!
//! JavaScript drives the viewer through the exported functions below and
//! renders through the hooks on `window.atlasHost` (see `host.rs`). Hooks
//! must not call back into these exports synchronously.

use std::cell::RefCell;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use catalog::{IndicatorCatalog, Theme};
use charts::ChartSurface;
use foundation::geo::LatLng;
use gloo_net::http::Request;
use layers::MapView;
use layers::legend::LegendSurface;
use serde::Serialize;
use serde_json::json;
use streaming::FetchError;
use viewer::{Viewer, ViewerConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod host;
pub mod logging;

use host::{WebChart, WebLegend, WebMap};

type WebViewer = Viewer<WebMap, WebLegend, WebChart>;

// Guard against double initialization during hot reload.
static INITIALIZED: AtomicBool = AtomicBool::new(false);
// Set by `init` before boot is spawned; cleared again if boot fails.
static VIEWER_CLAIMED: AtomicBool = AtomicBool::new(false);

fn claim_viewer() -> bool {
    !VIEWER_CLAIMED.swap(true, Ordering::SeqCst)
}

fn release_viewer() {
    VIEWER_CLAIMED.store(false, Ordering::SeqCst);
}

thread_local! {
    static APP: RefCell<Option<WebViewer>> = RefCell::new(None);
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn with_viewer<T>(f: impl FnOnce(&mut WebViewer) -> T) -> Result<T, JsValue> {
    APP.with(|app| {
        let mut app = app
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("viewer is busy (re-entrant call from a host hook?)"))?;
        let viewer = app
            .as_mut()
            .ok_or_else(|| JsValue::from_str("viewer not initialised; call init() first"))?;
        Ok(f(viewer))
    })
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    let network = |e: gloo_net::Error| FetchError::Network {
        url: url.to_string(),
        reason: e.to_string(),
    };
    let resp = Request::get(url).send().await.map_err(network)?;
    if !resp.ok() {
        return Err(FetchError::from_status(url, resp.status()));
    }
    resp.binary().await.map_err(network)
}

/// Starts every fetch the viewer has queued. Each completion may queue more.
fn pump() {
    let Ok(fetches) = with_viewer(|v| v.take_fetches()) else {
        return;
    };
    for fetch in fetches {
        spawn_local(async move {
            let result = fetch_bytes(&fetch.url).await;
            if let Err(err) = with_viewer(|v| v.complete(fetch.kind, fetch.token, result)) {
                tracing::error!(error = ?err, url = %fetch.url, "could not deliver fetch result");
            }
            pump();
        });
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct ThemeEntry {
    id: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
struct IndicatorEntry<'a> {
    id: &'a str,
    label: String,
    unit: &'a str,
    monthly_only: bool,
    supports_months: bool,
}

fn theme_entries(catalog: &IndicatorCatalog) -> Vec<ThemeEntry> {
    catalog
        .themes()
        .into_iter()
        .map(|t| ThemeEntry {
            id: t.slug(),
            label: t.label(),
        })
        .collect()
}

fn indicator_entries(catalog: &IndicatorCatalog, theme: Theme) -> Vec<IndicatorEntry<'_>> {
    catalog
        .list_indicators(theme)
        .iter()
        .map(|d| IndicatorEntry {
            id: &d.id,
            label: d.label(),
            unit: &d.unit,
            monthly_only: d.is_monthly_only(),
            supports_months: d.supports_months(),
        })
        .collect()
}

fn ready_json<M, L, C>(v: &Viewer<M, L, C>) -> Result<String, serde_json::Error>
where
    M: MapView + 'static,
    L: LegendSurface + 'static,
    C: ChartSurface + 'static,
{
    let years = v.catalog().years();
    serde_json::to_string(&json!({
        "selection": v.selection(),
        "themes": theme_entries(v.catalog()),
        "indicators": indicator_entries(v.catalog(), v.selection().theme),
        "years": [years.first, years.last],
        "boundaries": v.boundaries_url(),
    }))
}

async fn boot(config: ViewerConfig) -> Result<(), String> {
    let catalog = match &config.catalog_url {
        Some(url) => {
            let bytes = fetch_bytes(url).await.map_err(|e| e.to_string())?;
            let text = String::from_utf8(bytes).map_err(|e| e.to_string())?;
            IndicatorCatalog::from_json_str(&text).map_err(|e| e.to_string())?
        }
        None => IndicatorCatalog::builtin().map_err(|e| e.to_string())?,
    };

    let mut viewer = Viewer::new(config, Arc::new(catalog), WebMap, WebLegend, WebChart)
        .map_err(|e| e.to_string())?;
    let ready = ready_json(&viewer).map_err(|e| e.to_string())?;
    let boundaries_url = viewer.boundaries_url();
    viewer.start();
    APP.with(|app| *app.borrow_mut() = Some(viewer));
    host::notify_ready(&ready);
    pump();

    let result = fetch_bytes(&boundaries_url).await;
    match with_viewer(|v| v.load_boundaries(result)) {
        Ok(Ok(count)) => tracing::info!(regions = count, "viewer ready"),
        Ok(Err(_)) => tracing::warn!("region boundaries unavailable; map clicks are disabled"),
        Err(err) => tracing::error!(error = ?err, "viewer disappeared during boot"),
    }
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    console_error_panic_hook::set_once();
    logging::init(tracing::Level::INFO).map_err(to_js)
}

/// Creates the viewer. `config_json` is an optional `ViewerConfig` document;
/// a non-empty `base_url` overrides its data base URL.
#[wasm_bindgen]
pub fn init(base_url: &str, config_json: Option<String>) -> Result<(), JsValue> {
    if !claim_viewer() {
        return Err(JsValue::from_str("viewer already initialised"));
    }
    let mut config = match config_json.map(|json| ViewerConfig::from_json_str(&json)) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            release_viewer();
            return Err(to_js(err));
        }
        None => ViewerConfig::default(),
    };
    if !base_url.trim().is_empty() {
        config.data_base_url = base_url.trim().to_string();
    }
    spawn_local(async move {
        if let Err(err) = boot(config).await {
            release_viewer();
            tracing::error!(%err, "viewer init failed");
        }
    });
    Ok(())
}

#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let level = logging::parse_level(level)
        .ok_or_else(|| JsValue::from_str("level must be one of error, warn, info, debug, trace"))?;
    logging::init(level).map_err(to_js)
}

#[wasm_bindgen]
pub fn list_themes() -> Result<String, JsValue> {
    with_viewer(|v| serde_json::to_string(&theme_entries(v.catalog())))?.map_err(to_js)
}

#[wasm_bindgen]
pub fn list_indicators(theme: &str) -> Result<String, JsValue> {
    let theme = Theme::from_str(theme).map_err(to_js)?;
    with_viewer(|v| serde_json::to_string(&indicator_entries(v.catalog(), theme)))?.map_err(to_js)
}

#[wasm_bindgen]
pub fn set_theme(theme: &str) -> Result<String, JsValue> {
    let theme = Theme::from_str(theme).map_err(to_js)?;
    let selection = with_viewer(|v| v.set_theme(theme))?.map_err(to_js)?;
    pump();
    serde_json::to_string(&selection).map_err(to_js)
}

#[wasm_bindgen]
pub fn set_indicator(id: &str) -> Result<String, JsValue> {
    let selection = with_viewer(|v| v.set_indicator(id))?.map_err(to_js)?;
    pump();
    serde_json::to_string(&selection).map_err(to_js)
}

#[wasm_bindgen]
pub fn set_year(year: i32) -> Result<String, JsValue> {
    let selection = with_viewer(|v| v.set_year(year))?.map_err(to_js)?;
    pump();
    serde_json::to_string(&selection).map_err(to_js)
}

#[wasm_bindgen]
pub fn set_month(month: Option<u8>) -> Result<String, JsValue> {
    let selection = with_viewer(|v| v.set_month(month))?.map_err(to_js)?;
    pump();
    serde_json::to_string(&selection).map_err(to_js)
}

/// Returns the clicked region as JSON, or `undefined` on a miss.
#[wasm_bindgen]
pub fn map_click(lat: f64, lng: f64) -> Result<Option<String>, JsValue> {
    let region = with_viewer(|v| v.map_click(LatLng::new(lat, lng)))?;
    pump();
    region
        .map(|r| serde_json::to_string(&r))
        .transpose()
        .map_err(to_js)
}

/// Raw overlay value under the pointer, for hover read-outs.
#[wasm_bindgen]
pub fn value_at(lat: f64, lng: f64) -> Result<Option<f32>, JsValue> {
    with_viewer(|v| v.value_at(LatLng::new(lat, lng)))
}

#[wasm_bindgen]
pub fn legend_failed(url: &str) -> Result<(), JsValue> {
    with_viewer(|v| v.legend_failed(url))
}

#[wasm_bindgen]
pub fn selection_json() -> Result<String, JsValue> {
    with_viewer(|v| serde_json::to_string(v.selection()))?.map_err(to_js)
}

/// The most recent viewer events, oldest first.
#[wasm_bindgen]
pub fn events_json(limit: usize) -> Result<String, JsValue> {
    with_viewer(|v| {
        let events: Vec<_> = v
            .events()
            .events()
            .map(|e| json!({ "seq": e.seq, "kind": e.kind, "message": e.message }))
            .collect();
        let skip = events.len().saturating_sub(limit);
        serde_json::to_string(&events[skip..])
    })?
    .map_err(to_js)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalog::{IndicatorCatalog, Theme};
    use charts::RecordingChart;
    use layers::RecordingMap;
    use layers::legend::RecordingLegend;
    use pretty_assertions::assert_eq;
    use viewer::{Viewer, ViewerConfig};

    use super::{claim_viewer, indicator_entries, ready_json, release_viewer, theme_entries};

    #[test]
    fn second_init_is_refused_until_boot_fails() {
        assert!(claim_viewer());
        assert!(!claim_viewer());
        release_viewer();
        assert!(claim_viewer());
        release_viewer();
    }

    #[test]
    fn menus_follow_catalog_order() {
        let catalog = IndicatorCatalog::builtin().unwrap();
        let themes: Vec<_> = theme_entries(&catalog).into_iter().map(|t| t.id).collect();
        assert_eq!(themes, vec!["agriculture", "climate", "water", "population"]);

        let water = indicator_entries(&catalog, Theme::Water);
        assert_eq!(water[0].id, "water_bodies");
        assert!(water[0].monthly_only);
    }

    #[test]
    fn ready_payload_describes_start_state() {
        let catalog = Arc::new(IndicatorCatalog::builtin().unwrap());
        let v = Viewer::new(
            ViewerConfig::default(),
            catalog,
            RecordingMap::default(),
            RecordingLegend::default(),
            RecordingChart::default(),
        )
        .unwrap();
        let ready: serde_json::Value = serde_json::from_str(&ready_json(&v).unwrap()).unwrap();
        assert_eq!(ready["selection"]["indicator_id"], "ndvi");
        assert_eq!(ready["years"], serde_json::json!([2020, 2024]));
        assert_eq!(ready["boundaries"], "data/admin/adm1.geojson");
        assert_eq!(ready["indicators"][0]["label"], "NDVI");
    }
}
