use std::sync::Arc;

use catalog::{IndicatorCatalog, IndicatorDefinition};
use compute::Statistics;
use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use foundation::time::Period;
use formats::geotiff::{DecodedRaster, decode_geotiff};
use scene::{Selection, SelectionObserver};
use streaming::{FetchError, LatestRequest, LoadError, RequestToken, join_url};

use crate::layer::{Layer, LayerId, MapView};
use crate::symbology::{ColorRamp, LayerStyle};

/// A colourised raster ready to be drawn over the map.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOverlay {
    pub id: LayerId,
    pub indicator_id: String,
    pub period: Period,
    pub source: String,
    pub bounds: GeoBounds,
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, northernmost row first.
    pub rgba: Vec<u8>,
    pub value_range: (f64, f64),
    pub style: LayerStyle,
    raster: DecodedRaster,
}

impl RasterOverlay {
    /// Raw value under a map position, `None` on nodata or outside.
    pub fn value_at(&self, p: LatLng) -> Option<f32> {
        self.raster.sample(p)
    }
}

impl Layer for RasterOverlay {
    fn id(&self) -> LayerId {
        self.id
    }
}

/// A fetch the shell should perform for the raster manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterRequest {
    pub token: RequestToken,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RasterOutcome {
    Applied(LayerId),
    Unavailable(LoadError),
    Stale,
}

#[derive(Debug, Clone)]
struct Requested {
    definition: IndicatorDefinition,
    period: Period,
    url: String,
}

/// Owns the single overlay shown for the current selection.
///
/// Selection changes publish a [`RasterRequest`]; the shell fetches it and
/// hands the bytes back through [`RasterLayerManager::complete`]. Only the
/// newest request can change the map.
pub struct RasterLayerManager<M: MapView> {
    catalog: Arc<IndicatorCatalog>,
    base_url: String,
    no_data_message: String,
    default_opacity: f32,
    map: M,
    gate: LatestRequest,
    pending: Option<RasterRequest>,
    requested: Option<Requested>,
    active: Option<RasterOverlay>,
    next_layer: u64,
}

impl<M: MapView> RasterLayerManager<M> {
    pub fn new(
        catalog: Arc<IndicatorCatalog>,
        base_url: impl Into<String>,
        no_data_message: impl Into<String>,
        default_opacity: f32,
        map: M,
    ) -> Self {
        Self {
            catalog,
            base_url: base_url.into(),
            no_data_message: no_data_message.into(),
            default_opacity: default_opacity.clamp(0.0, 1.0),
            map,
            gate: LatestRequest::new(),
            pending: None,
            requested: None,
            active: None,
            next_layer: 0,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn active(&self) -> Option<&RasterOverlay> {
        self.active.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.gate.is_pending()
    }

    /// The request the shell has not fetched yet. A newer selection
    /// replaces an untaken request.
    pub fn take_request(&mut self) -> Option<RasterRequest> {
        self.pending.take()
    }

    fn request(&mut self, selection: &Selection) {
        let def = match self
            .catalog
            .get_indicator(selection.theme, &selection.indicator_id)
        {
            Ok(def) => def.clone(),
            Err(e) => {
                tracing::error!(error = ?e, "selection does not resolve to an indicator");
                self.supersede();
                return;
            }
        };
        let period = selection.period();

        let path = match self.catalog.raster_path(&def, period) {
            Ok(path) => path,
            Err(e) => {
                // Nothing to fetch for this combination.
                tracing::debug!(indicator = %def.id, %period, error = ?e, "raster path unavailable");
                self.supersede();
                self.map.show_notice(&self.no_data_message);
                return;
            }
        };

        let token = self.gate.issue();
        let url = join_url(&self.base_url, &path);
        tracing::debug!(token = token.0, %url, "raster requested");
        self.pending = Some(RasterRequest {
            token,
            url: url.clone(),
        });
        self.requested = Some(Requested {
            definition: def,
            period,
            url,
        });
    }

    fn supersede(&mut self) {
        self.gate.invalidate();
        self.pending = None;
        self.requested = None;
    }

    /// Applies a fetch result for `token`.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<Vec<u8>, FetchError>,
    ) -> RasterOutcome {
        if !self.gate.settle(token) {
            tracing::debug!(token = token.0, "stale raster response dropped");
            return RasterOutcome::Stale;
        }
        let Some(requested) = self.requested.take() else {
            return RasterOutcome::Stale;
        };

        let overlay = result
            .map_err(LoadError::from)
            .and_then(|bytes| {
                decode_geotiff(&bytes).map_err(|e| LoadError::decode(requested.url.as_str(), e))
            })
            .map(|raster| self.build_overlay(&requested, raster));

        match overlay {
            Ok(overlay) => {
                let id = overlay.id;
                self.map.add_overlay(&overlay);
                if let Some(previous) = self.active.replace(overlay) {
                    self.map.remove_overlay(previous.id);
                }
                self.map.clear_notice();
                tracing::debug!(layer = id.0, url = %requested.url, "raster applied");
                RasterOutcome::Applied(id)
            }
            Err(err) => {
                err.log("raster");
                self.map.show_notice(&self.no_data_message);
                RasterOutcome::Unavailable(err)
            }
        }
    }

    fn build_overlay(&mut self, requested: &Requested, raster: DecodedRaster) -> RasterOverlay {
        let def = &requested.definition;
        let ramp = ColorRamp::from_spec(&def.color_ramp).unwrap_or_else(|e| {
            tracing::warn!(indicator = %def.id, error = %e, "falling back to default ramp");
            ColorRamp::default()
        });
        let value_range = def
            .value_range
            .map(|[lo, hi]| (lo, hi))
            .or_else(|| Statistics::min_max(raster.valid_values().map(f64::from)))
            .unwrap_or((0.0, 1.0));

        self.next_layer += 1;
        RasterOverlay {
            id: LayerId(self.next_layer),
            indicator_id: def.id.clone(),
            period: requested.period,
            source: requested.url.clone(),
            bounds: raster.bounds,
            width: raster.width,
            height: raster.height,
            rgba: ramp.colorize(&raster.values, value_range),
            value_range,
            style: LayerStyle::new(true, def.opacity.unwrap_or(self.default_opacity)),
            raster,
        }
    }

    /// Detaches the overlay and frees its buffers.
    pub fn clear(&mut self) {
        self.supersede();
        if let Some(previous) = self.active.take() {
            self.map.remove_overlay(previous.id);
        }
    }
}

impl<M: MapView> SelectionObserver for RasterLayerManager<M> {
    fn on_selection_changed(&mut self, selection: &Selection) {
        self.request(selection);
    }
}
