use std::sync::Arc;

use catalog::{IndicatorCatalog, IndicatorDefinition};
use formats::timeseries::parse_time_series;
use streaming::{FetchError, LatestRequest, LoadError, RequestToken, join_url};

use crate::model::ChartModel;
use crate::surface::ChartSurface;

/// The region a series is shown for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesTarget {
    pub region_id: String,
    pub region_name: String,
    pub indicator_id: String,
}

/// A fetch the shell should perform on the panel's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub token: RequestToken,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesOutcome {
    Drawn { plotted: usize, gaps: usize },
    NoData(LoadError),
    Stale,
}

pub struct TimeSeriesPanel<C: ChartSurface> {
    catalog: Arc<IndicatorCatalog>,
    base_url: String,
    no_data_message: String,
    surface: C,
    gate: LatestRequest,
    pending: Option<SeriesRequest>,
    requested: Option<Requested>,
    current: Option<ChartModel>,
}

#[derive(Debug, Clone)]
struct Requested {
    target: SeriesTarget,
    title: String,
    unit: String,
    url: String,
}

impl<C: ChartSurface> TimeSeriesPanel<C> {
    pub fn new(
        catalog: Arc<IndicatorCatalog>,
        base_url: impl Into<String>,
        no_data_message: impl Into<String>,
        surface: C,
    ) -> Self {
        Self {
            catalog,
            base_url: base_url.into(),
            no_data_message: no_data_message.into(),
            surface,
            gate: LatestRequest::new(),
            pending: None,
            requested: None,
            current: None,
        }
    }

    pub fn surface(&self) -> &C {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut C {
        &mut self.surface
    }

    /// The chart currently on screen, if any.
    pub fn current(&self) -> Option<&ChartModel> {
        self.current.as_ref()
    }

    /// The latest region and indicator asked for.
    pub fn target(&self) -> Option<&SeriesTarget> {
        self.requested.as_ref().map(|r| &r.target)
    }

    pub fn is_loading(&self) -> bool {
        self.gate.is_pending()
    }

    /// Starts loading the series for a region. Supersedes any earlier
    /// request, fetched or not. Returns `None` when no path can be built,
    /// in which case the no-data state is already shown.
    pub fn show_series(
        &mut self,
        region_id: &str,
        region_name: &str,
        indicator: &IndicatorDefinition,
    ) -> Option<RequestToken> {
        let target = SeriesTarget {
            region_id: region_id.to_string(),
            region_name: region_name.to_string(),
            indicator_id: indicator.id.clone(),
        };
        let title = format!("{} | {}", indicator.display_name, region_name);

        let path = match self.catalog.timeseries_path(region_id, &indicator.id) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(region = region_id, indicator = %indicator.id, error = ?e, "cannot resolve time series path");
                self.gate.invalidate();
                self.pending = None;
                self.requested = None;
                self.current = None;
                self.surface.show_no_data(&title, &self.no_data_message);
                return None;
            }
        };

        let token = self.gate.issue();
        let url = join_url(&self.base_url, &path);
        tracing::debug!(token = token.0, %url, "time series requested");
        self.pending = Some(SeriesRequest {
            token,
            url: url.clone(),
        });
        self.requested = Some(Requested {
            target,
            title,
            unit: indicator.unit.clone(),
            url,
        });
        Some(token)
    }

    /// The request the shell has not fetched yet.
    pub fn take_request(&mut self) -> Option<SeriesRequest> {
        self.pending.take()
    }

    /// Applies a fetch result. Only the latest request can change the chart.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<Vec<u8>, FetchError>,
    ) -> SeriesOutcome {
        if !self.gate.settle(token) {
            tracing::debug!(token = token.0, "stale time series response dropped");
            return SeriesOutcome::Stale;
        }
        let Some(Requested {
            target,
            title,
            unit,
            url,
        }) = self.requested.clone()
        else {
            return SeriesOutcome::Stale;
        };

        let loaded = result
            .map_err(LoadError::from)
            .and_then(|bytes| parse_time_series(&bytes).map_err(|e| LoadError::decode(url.as_str(), e)))
            .map(|points| {
                ChartModel::build(
                    title.clone(),
                    unit,
                    target.region_id.clone(),
                    target.region_name.clone(),
                    target.indicator_id.clone(),
                    &points,
                )
            })
            .and_then(|model| {
                if model.has_values() {
                    Ok(model)
                } else {
                    Err(LoadError::unavailable(url.as_str(), "series has no values"))
                }
            });

        match loaded {
            Ok(model) => {
                let outcome = SeriesOutcome::Drawn {
                    plotted: model.plotted_points(),
                    gaps: model.gap_count,
                };
                self.surface.draw(&model);
                self.current = Some(model);
                outcome
            }
            Err(err) => {
                err.log("time series");
                self.current = None;
                self.surface.show_no_data(&title, &self.no_data_message);
                SeriesOutcome::NoData(err)
            }
        }
    }

    /// Drops the chart and forgets the active region.
    pub fn clear(&mut self) {
        self.gate.invalidate();
        self.pending = None;
        self.requested = None;
        self.current = None;
        self.surface.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalog::{IndicatorCatalog, Theme};
    use pretty_assertions::assert_eq;
    use streaming::FetchError;

    use super::{SeriesOutcome, TimeSeriesPanel};
    use crate::surface::{ChartCall, RecordingChart};

    const SERIES: &[u8] = br#"[
        {"date": "2020-01", "value": 0.31},
        {"date": "2020-02", "value": null},
        {"date": "2020-03", "value": 0.35}
    ]"#;

    fn panel() -> (Arc<IndicatorCatalog>, TimeSeriesPanel<RecordingChart>) {
        let catalog = Arc::new(IndicatorCatalog::builtin().unwrap());
        let panel = TimeSeriesPanel::new(
            catalog.clone(),
            "https://data.example/",
            "No data for this region",
            RecordingChart::default(),
        );
        (catalog, panel)
    }

    #[test]
    fn publishes_request_by_region_and_indicator() {
        let (catalog, mut panel) = panel();
        let ndvi = catalog.get_indicator(Theme::Agriculture, "ndvi").unwrap();
        let token = panel.show_series("R12", "Region 12", ndvi).unwrap();
        let req = panel.take_request().unwrap();
        assert_eq!(req.token, token);
        assert_eq!(req.url, "https://data.example/timeseries/ndvi/R12.json");
        assert!(panel.take_request().is_none());
        assert!(panel.is_loading());
    }

    #[test]
    fn draws_with_gaps() {
        let (catalog, mut panel) = panel();
        let ndvi = catalog.get_indicator(Theme::Agriculture, "ndvi").unwrap();
        let token = panel.show_series("R12", "Region 12", ndvi).unwrap();
        let req = panel.take_request().unwrap();
        assert_eq!(req.token, token);
        assert_eq!(req.url, "https://data.example/timeseries/ndvi/R12.json");
        let outcome = panel.complete(token, Ok(SERIES.to_vec()));
        assert_eq!(outcome, SeriesOutcome::Drawn { plotted: 2, gaps: 1 });
        let drawn = panel.surface().drawn().unwrap();
        assert_eq!(drawn.segments.len(), 2);
        assert_eq!(drawn.region_name, "Region 12");
        assert_eq!(drawn.title, "NDVI | Region 12");
    }

    #[test]
    fn late_response_for_older_region_is_dropped() {
        let (catalog, mut panel) = panel();
        let ndvi = catalog.get_indicator(Theme::Agriculture, "ndvi").unwrap();
        let first = panel.show_series("R1", "One", ndvi).unwrap();
        let second = panel.show_series("R2", "Two", ndvi).unwrap();

        assert!(matches!(
            panel.complete(second, Ok(SERIES.to_vec())),
            SeriesOutcome::Drawn { .. }
        ));
        assert_eq!(
            panel.complete(first, Ok(SERIES.to_vec())),
            SeriesOutcome::Stale
        );
        assert_eq!(panel.current().unwrap().region_id, "R2");
        assert_eq!(panel.surface().calls.len(), 1);
    }

    #[test]
    fn missing_or_malformed_shows_no_data() {
        let (catalog, mut panel) = panel();
        let ndvi = catalog.get_indicator(Theme::Agriculture, "ndvi").unwrap();

        let url = "https://data.example/timeseries/ndvi/R9.json";
        let t = panel.show_series("R9", "Nine", ndvi).unwrap();
        let outcome = panel.complete(t, Err(FetchError::NotFound { url: url.into() }));
        assert!(matches!(outcome, SeriesOutcome::NoData(ref e) if !e.is_decode_failure()));

        let t = panel.show_series("R9", "Nine", ndvi).unwrap();
        let outcome = panel.complete(t, Ok(b"<html>".to_vec()));
        assert!(matches!(outcome, SeriesOutcome::NoData(ref e) if e.is_decode_failure()));

        assert_eq!(
            panel.surface().last(),
            Some(&ChartCall::NoData {
                heading: "NDVI | Nine".into(),
                message: "No data for this region".into()
            })
        );
        assert!(panel.current().is_none());
    }

    #[test]
    fn unsafe_region_id_is_no_data_without_fetch() {
        let (catalog, mut panel) = panel();
        let ndvi = catalog.get_indicator(Theme::Agriculture, "ndvi").unwrap();
        assert!(panel.show_series("../etc", "Bad", ndvi).is_none());
        assert!(panel.take_request().is_none());
        assert!(matches!(panel.surface().last(), Some(ChartCall::NoData { .. })));
    }
}
