use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use catalog::IndicatorCatalog;
use charts::{ChartSurface, TimeSeriesPanel};
use formats::boundaries::BoundaryKeys;
use foundation::geo::LatLng;
use scene::{Selection, SelectionObserver};
use streaming::{FetchError, LoadError, join_url};

use crate::boundaries::{BoundaryLayer, Region};
use crate::layer::LayerId;

/// Turns map clicks into time series requests for the clicked region.
pub struct RegionInteractionHandler<C: ChartSurface> {
    catalog: Arc<IndicatorCatalog>,
    base_url: String,
    keys: BoundaryKeys,
    boundaries: Option<BoundaryLayer>,
    panel: Rc<RefCell<TimeSeriesPanel<C>>>,
    selection: Selection,
    active: Option<Region>,
}

impl<C: ChartSurface> RegionInteractionHandler<C> {
    pub fn new(
        catalog: Arc<IndicatorCatalog>,
        base_url: impl Into<String>,
        keys: BoundaryKeys,
        selection: Selection,
        panel: Rc<RefCell<TimeSeriesPanel<C>>>,
    ) -> Self {
        Self {
            catalog,
            base_url: base_url.into(),
            keys,
            boundaries: None,
            panel,
            selection,
            active: None,
        }
    }

    pub fn boundaries_url(&self) -> String {
        join_url(&self.base_url, self.catalog.boundaries_path())
    }

    /// Installs the boundary layer from the fetched GeoJSON. Returns the
    /// number of clickable regions.
    pub fn load_boundaries(
        &mut self,
        result: Result<Vec<u8>, FetchError>,
    ) -> Result<usize, LoadError> {
        let url = self.boundaries_url();
        let loaded = result.map_err(LoadError::from).and_then(|bytes| {
            let text = String::from_utf8(bytes).map_err(|e| LoadError::decode(url.as_str(), e))?;
            BoundaryLayer::from_geojson(LayerId(0), &text, &self.keys)
                .map_err(|e| LoadError::decode(url.as_str(), e))
        });
        match loaded {
            Ok(layer) => {
                let count = layer.len();
                tracing::debug!(%url, regions = count, "boundaries loaded");
                self.boundaries = Some(layer);
                Ok(count)
            }
            Err(err) => {
                err.log("boundaries");
                Err(err)
            }
        }
    }

    pub fn set_boundaries(&mut self, layer: BoundaryLayer) {
        self.boundaries = Some(layer);
    }

    pub fn boundaries(&self) -> Option<&BoundaryLayer> {
        self.boundaries.as_ref()
    }

    pub fn active_region(&self) -> Option<&Region> {
        self.active.as_ref()
    }

    /// Hit-tests the click; on a hit the panel is asked for that region's
    /// series. A miss leaves the panel as it was.
    pub fn on_map_click(&mut self, p: LatLng) -> Option<Region> {
        let Some(layer) = &self.boundaries else {
            tracing::debug!("map click before boundaries loaded");
            return None;
        };
        let region = layer.region_at(p)?;
        tracing::debug!(region = %region.id, lat = p.lat, lng = p.lng, "region clicked");
        self.active = Some(region.clone());
        self.request_series();
        Some(region)
    }

    fn request_series(&self) {
        let Some(region) = &self.active else {
            return;
        };
        match self
            .catalog
            .get_indicator(self.selection.theme, &self.selection.indicator_id)
        {
            Ok(def) => {
                self.panel
                    .borrow_mut()
                    .show_series(&region.id, &region.name, def);
            }
            Err(e) => {
                tracing::error!(error = ?e, "selection does not resolve to an indicator");
            }
        }
    }
}

impl<C: ChartSurface> SelectionObserver for RegionInteractionHandler<C> {
    fn on_selection_changed(&mut self, selection: &Selection) {
        let indicator_changed = selection.theme != self.selection.theme
            || selection.indicator_id != self.selection.indicator_id;
        self.selection = selection.clone();
        if indicator_changed && self.active.is_some() {
            self.request_series();
        }
    }
}
