//! Bridges the viewer's surfaces to JavaScript hooks on `window.atlasHost`.
//!
//! Every hook is optional; a missing hook is a no-op so the page can wire up
//! only what it renders.

use charts::{ChartModel, ChartSurface};
use layers::legend::{LegendSurface, LegendView};
use layers::raster::RasterOverlay;
use layers::{LayerId, MapView};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = "
function __atlas_hook(name) {
    const host = (typeof window !== 'undefined') ? window.atlasHost : undefined;
    if (!host || typeof host[name] !== 'function') return null;
    return host[name].bind(host);
}

export function atlas_host_add_overlay(id, south, west, north, east, width, height, rgba, opacity) {
    const hook = __atlas_hook('addOverlay');
    if (!hook) return;
    // Copy out of wasm memory before it can move.
    hook({
        id,
        bounds: [[south, west], [north, east]],
        width,
        height,
        rgba: new Uint8ClampedArray(rgba),
        opacity,
    });
}

export function atlas_host_remove_overlay(id) {
    const hook = __atlas_hook('removeOverlay');
    if (hook) hook(id);
}

export function atlas_host_notice(message) {
    const hook = __atlas_hook('showNotice');
    if (hook) hook(message);
}

export function atlas_host_clear_notice() {
    const hook = __atlas_hook('clearNotice');
    if (hook) hook();
}

export function atlas_host_show_legend(json) {
    const hook = __atlas_hook('showLegend');
    if (hook) hook(JSON.parse(json));
}

export function atlas_host_hide_legend() {
    const hook = __atlas_hook('hideLegend');
    if (hook) hook();
}

export function atlas_host_draw_chart(json) {
    const hook = __atlas_hook('drawChart');
    if (hook) hook(JSON.parse(json));
}

export function atlas_host_chart_no_data(heading, message) {
    const hook = __atlas_hook('chartNoData');
    if (hook) hook(heading, message);
}

export function atlas_host_clear_chart() {
    const hook = __atlas_hook('clearChart');
    if (hook) hook();
}

export function atlas_host_ready(json) {
    const hook = __atlas_hook('ready');
    if (hook) hook(JSON.parse(json));
}
")]
extern "C" {
    #[allow(clippy::too_many_arguments)]
    fn atlas_host_add_overlay(
        id: f64,
        south: f64,
        west: f64,
        north: f64,
        east: f64,
        width: u32,
        height: u32,
        rgba: &[u8],
        opacity: f32,
    );
    fn atlas_host_remove_overlay(id: f64);
    fn atlas_host_notice(message: &str);
    fn atlas_host_clear_notice();
    fn atlas_host_show_legend(json: &str);
    fn atlas_host_hide_legend();
    fn atlas_host_draw_chart(json: &str);
    fn atlas_host_chart_no_data(heading: &str, message: &str);
    fn atlas_host_clear_chart();
    fn atlas_host_ready(json: &str);
}

/// Tells the page the viewer is running and what it starts with.
pub fn notify_ready(json: &str) {
    atlas_host_ready(json);
}

pub struct WebMap;

impl MapView for WebMap {
    fn add_overlay(&mut self, overlay: &RasterOverlay) {
        let b = overlay.bounds;
        atlas_host_add_overlay(
            overlay.id.0 as f64,
            b.south,
            b.west,
            b.north,
            b.east,
            overlay.width,
            overlay.height,
            &overlay.rgba,
            overlay.style.opacity,
        );
    }

    fn remove_overlay(&mut self, id: LayerId) {
        atlas_host_remove_overlay(id.0 as f64);
    }

    fn show_notice(&mut self, message: &str) {
        atlas_host_notice(message);
    }

    fn clear_notice(&mut self) {
        atlas_host_clear_notice();
    }
}

pub struct WebLegend;

impl LegendSurface for WebLegend {
    fn show_legend(&mut self, legend: &LegendView) {
        match serde_json::to_string(legend) {
            Ok(json) => atlas_host_show_legend(&json),
            Err(e) => tracing::warn!(error = %e, "legend serialization failed"),
        }
    }

    fn hide_legend(&mut self) {
        atlas_host_hide_legend();
    }
}

pub struct WebChart;

impl ChartSurface for WebChart {
    fn draw(&mut self, model: &ChartModel) {
        match serde_json::to_string(model) {
            Ok(json) => atlas_host_draw_chart(&json),
            Err(e) => tracing::warn!(error = %e, "chart serialization failed"),
        }
    }

    fn show_no_data(&mut self, heading: &str, message: &str) {
        atlas_host_chart_no_data(heading, message);
    }

    fn clear(&mut self) {
        atlas_host_clear_chart();
    }
}
