//! Wires the selection state to the map, legend and chart components.
//!
//! The viewer never performs I/O itself. Components publish fetch requests,
//! the host (browser shell or a native [`DataSource`]) performs them and
//! reports back with the request token.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use catalog::{CatalogError, IndicatorCatalog, Theme};
use charts::{ChartSurface, SeriesOutcome, TimeSeriesPanel};
use foundation::geo::LatLng;
use layers::MapView;
use layers::boundaries::Region;
use layers::interaction::RegionInteractionHandler;
use layers::legend::{LegendRenderer, LegendSurface};
use layers::raster::{RasterLayerManager, RasterOutcome};
use runtime::EventBus;
use scene::{Selection, SelectionError, SelectionState};
use streaming::{DataSource, FetchError, LoadError, RequestToken};

pub mod config;

pub use config::*;

#[derive(Debug)]
pub enum ViewerError {
    Config(ConfigError),
    Catalog(CatalogError),
    Selection(SelectionError),
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerError::Config(e) => write!(f, "{e}"),
            ViewerError::Catalog(e) => write!(f, "catalog: {e}"),
            ViewerError::Selection(e) => write!(f, "selection: {e}"),
        }
    }
}

impl std::error::Error for ViewerError {}

impl From<ConfigError> for ViewerError {
    fn from(e: ConfigError) -> Self {
        ViewerError::Config(e)
    }
}

impl From<CatalogError> for ViewerError {
    fn from(e: CatalogError) -> Self {
        ViewerError::Catalog(e)
    }
}

impl From<SelectionError> for ViewerError {
    fn from(e: SelectionError) -> Self {
        ViewerError::Selection(e)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchKind {
    Raster,
    Series,
}

/// One outstanding fetch for the host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub kind: FetchKind,
    pub token: RequestToken,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Raster(RasterOutcome),
    Series(SeriesOutcome),
}

pub struct Viewer<M: MapView, L: LegendSurface, C: ChartSurface> {
    config: ViewerConfig,
    state: SelectionState,
    raster: Rc<RefCell<RasterLayerManager<M>>>,
    legend: Rc<RefCell<LegendRenderer<L>>>,
    regions: Rc<RefCell<RegionInteractionHandler<C>>>,
    panel: Rc<RefCell<TimeSeriesPanel<C>>>,
    events: EventBus,
}

impl<M, L, C> Viewer<M, L, C>
where
    M: MapView + 'static,
    L: LegendSurface + 'static,
    C: ChartSurface + 'static,
{
    pub fn new(
        config: ViewerConfig,
        catalog: Arc<IndicatorCatalog>,
        map: M,
        legend: L,
        chart: C,
    ) -> Result<Self, ViewerError> {
        config.validate()?;
        let mut state = match &config.initial_selection {
            Some(initial) => SelectionState::with_initial(catalog.clone(), initial.clone())?,
            None => SelectionState::new(catalog.clone())?,
        };
        let base = config.data_base_url.as_str();

        let raster = Rc::new(RefCell::new(RasterLayerManager::new(
            catalog.clone(),
            base,
            config.no_data_message.as_str(),
            config.overlay_opacity,
            map,
        )));
        let legend = Rc::new(RefCell::new(LegendRenderer::new(catalog.clone(), base, legend)));
        let panel = Rc::new(RefCell::new(TimeSeriesPanel::new(
            catalog.clone(),
            base,
            config.series_no_data_message.as_str(),
            chart,
        )));
        let regions = Rc::new(RefCell::new(RegionInteractionHandler::new(
            catalog,
            base,
            config.boundary_keys(),
            state.current().clone(),
            panel.clone(),
        )));

        state.subscribe(raster.clone());
        state.subscribe(legend.clone());
        state.subscribe(regions.clone());

        Ok(Self {
            config,
            state,
            raster,
            legend,
            regions,
            panel,
            events: EventBus::new(),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<IndicatorCatalog> {
        self.state.catalog()
    }

    pub fn selection(&self) -> &Selection {
        self.state.current()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn raster(&self) -> &Rc<RefCell<RasterLayerManager<M>>> {
        &self.raster
    }

    pub fn legend(&self) -> &Rc<RefCell<LegendRenderer<L>>> {
        &self.legend
    }

    pub fn panel(&self) -> &Rc<RefCell<TimeSeriesPanel<C>>> {
        &self.panel
    }

    /// Replays the initial selection so every component loads once.
    pub fn start(&mut self) {
        tracing::debug!(selection = ?self.state.current(), "viewer start");
        self.events.emit("selection", describe(self.state.current()));
        self.state.notify_current();
    }

    fn committed(&mut self, result: Result<Selection, SelectionError>) -> Result<Selection, ViewerError> {
        match result {
            Ok(selection) => {
                self.events.emit("selection", describe(&selection));
                Ok(selection)
            }
            Err(e) => {
                self.events.emit("selection.rejected", e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<Selection, ViewerError> {
        let result = self.state.set_theme(theme).cloned();
        self.committed(result)
    }

    pub fn set_indicator(&mut self, id: &str) -> Result<Selection, ViewerError> {
        let result = self.state.set_indicator(id).cloned();
        self.committed(result)
    }

    pub fn set_year(&mut self, year: i32) -> Result<Selection, ViewerError> {
        let result = self.state.set_year(year).cloned();
        self.committed(result)
    }

    pub fn set_month(&mut self, month: Option<u8>) -> Result<Selection, ViewerError> {
        let result = self.state.set_month(month).cloned();
        self.committed(result)
    }

    pub fn boundaries_url(&self) -> String {
        self.regions.borrow().boundaries_url()
    }

    pub fn load_boundaries(&mut self, result: Result<Vec<u8>, FetchError>) -> Result<usize, LoadError> {
        let loaded = self.regions.borrow_mut().load_boundaries(result);
        match &loaded {
            Ok(count) => self.events.emit("boundaries.loaded", format!("{count} regions")),
            Err(e) => self.events.emit("boundaries.failed", e.to_string()),
        };
        loaded
    }

    /// Hit-tests a click and, on a hit, starts loading that region's series.
    pub fn map_click(&mut self, p: LatLng) -> Option<Region> {
        let hit = self.regions.borrow_mut().on_map_click(p);
        if let Some(region) = &hit {
            self.events.emit("region.click", format!("{} ({})", region.name, region.id));
        }
        hit
    }

    pub fn active_region(&self) -> Option<Region> {
        self.regions.borrow().active_region().cloned()
    }

    /// Raw value of the current overlay under `p`.
    pub fn value_at(&self, p: LatLng) -> Option<f32> {
        self.raster.borrow().active().and_then(|o| o.value_at(p))
    }

    pub fn legend_failed(&mut self, url: &str) {
        self.legend.borrow_mut().on_image_error(url);
        self.events.emit("legend.failed", url);
    }

    /// Fetches the host has not started yet.
    pub fn take_fetches(&mut self) -> Vec<PendingFetch> {
        let mut out = Vec::new();
        if let Some(req) = self.raster.borrow_mut().take_request() {
            out.push(PendingFetch {
                kind: FetchKind::Raster,
                token: req.token,
                url: req.url,
            });
        }
        if let Some(req) = self.panel.borrow_mut().take_request() {
            out.push(PendingFetch {
                kind: FetchKind::Series,
                token: req.token,
                url: req.url,
            });
        }
        out
    }

    pub fn complete(
        &mut self,
        kind: FetchKind,
        token: RequestToken,
        result: Result<Vec<u8>, FetchError>,
    ) -> FetchOutcome {
        match kind {
            FetchKind::Raster => {
                let outcome = self.raster.borrow_mut().complete(token, result);
                match &outcome {
                    RasterOutcome::Applied(id) => {
                        self.events.emit("raster.applied", format!("layer {}", id.0));
                    }
                    RasterOutcome::Unavailable(e) => {
                        self.events.emit("raster.unavailable", e.to_string());
                    }
                    RasterOutcome::Stale => {
                        self.events.emit("raster.stale", format!("token {}", token.0));
                    }
                }
                FetchOutcome::Raster(outcome)
            }
            FetchKind::Series => {
                let outcome = self.panel.borrow_mut().complete(token, result);
                match &outcome {
                    SeriesOutcome::Drawn { plotted, gaps } => {
                        self.events
                            .emit("series.drawn", format!("{plotted} points, {gaps} gaps"));
                    }
                    SeriesOutcome::NoData(e) => {
                        self.events.emit("series.no_data", e.to_string());
                    }
                    SeriesOutcome::Stale => {
                        self.events.emit("series.stale", format!("token {}", token.0));
                    }
                }
                FetchOutcome::Series(outcome)
            }
        }
    }

    /// Performs every outstanding fetch against `source` until nothing is
    /// pending. Native hosts and tests use this in place of a browser.
    pub fn drive<S: DataSource + ?Sized>(&mut self, source: &S) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let fetches = self.take_fetches();
            if fetches.is_empty() {
                break;
            }
            for fetch in fetches {
                let relative = relative_path(&self.config.data_base_url, &fetch.url);
                let result = source.fetch(relative);
                outcomes.push(self.complete(fetch.kind, fetch.token, result));
            }
        }
        outcomes
    }

    /// Loads the boundary file from `source`.
    pub fn load_boundaries_from<S: DataSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<usize, LoadError> {
        let url = self.boundaries_url();
        let relative = relative_path(&self.config.data_base_url, &url).to_string();
        self.load_boundaries(source.fetch(&relative))
    }
}

fn describe(selection: &Selection) -> String {
    format!(
        "{}/{}/{}",
        selection.theme,
        selection.indicator_id,
        selection.period()
    )
}

/// Strips the configured base so the remainder can be handed to a
/// [`DataSource`] rooted at the data directory.
fn relative_path<'a>(base: &str, url: &'a str) -> &'a str {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return url;
    }
    url.strip_prefix(base)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::relative_path;

    #[test]
    fn relative_path_strips_base() {
        assert_eq!(relative_path("data", "data/admin/adm1.geojson"), "admin/adm1.geojson");
        assert_eq!(relative_path("https://x/y/", "https://x/y/a.tif"), "a.tif");
        assert_eq!(relative_path("", "a.tif"), "a.tif");
        assert_eq!(relative_path("data", "other/a.tif"), "other/a.tif");
    }
}
