use std::sync::Arc;

use catalog::IndicatorCatalog;
use scene::{Selection, SelectionObserver};
use serde::Serialize;
use streaming::join_url;

/// What the legend box shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendView {
    pub url: String,
    pub title: String,
    pub unit: String,
}

pub trait LegendSurface {
    fn show_legend(&mut self, legend: &LegendView);
    fn hide_legend(&mut self);
}

/// Shows the colormap image for the selected indicator.
///
/// Never reports errors: anything that goes wrong just hides the legend.
pub struct LegendRenderer<S: LegendSurface> {
    catalog: Arc<IndicatorCatalog>,
    base_url: String,
    surface: S,
    shown: Option<LegendView>,
    failed: Option<String>,
}

impl<S: LegendSurface> LegendRenderer<S> {
    pub fn new(catalog: Arc<IndicatorCatalog>, base_url: impl Into<String>, surface: S) -> Self {
        Self {
            catalog,
            base_url: base_url.into(),
            surface,
            shown: None,
            failed: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn shown(&self) -> Option<&LegendView> {
        self.shown.as_ref()
    }

    fn resolve(&self, selection: &Selection) -> Option<LegendView> {
        let def = self
            .catalog
            .get_indicator(selection.theme, &selection.indicator_id)
            .ok()?;
        if def.colormap_file.trim().is_empty() {
            return None;
        }
        Some(LegendView {
            url: join_url(&self.base_url, &self.catalog.legend_path(def)),
            title: def.display_name.clone(),
            unit: def.unit.clone(),
        })
    }

    fn hide(&mut self) {
        if self.shown.take().is_some() {
            self.surface.hide_legend();
        }
    }

    /// The shell reports that the legend image could not be loaded.
    pub fn on_image_error(&mut self, url: &str) {
        if self.shown.as_ref().is_some_and(|l| l.url == url) {
            tracing::debug!(%url, "legend image failed to load");
            self.failed = Some(url.to_string());
            self.hide();
        }
    }
}

impl<S: LegendSurface> SelectionObserver for LegendRenderer<S> {
    fn on_selection_changed(&mut self, selection: &Selection) {
        let Some(view) = self.resolve(selection) else {
            tracing::debug!(indicator = %selection.indicator_id, "no legend for selection");
            self.hide();
            return;
        };
        if self.shown.as_ref() == Some(&view) {
            return;
        }
        if self.failed.as_deref() == Some(view.url.as_str()) {
            self.hide();
            return;
        }
        self.failed = None;
        self.surface.show_legend(&view);
        self.shown = Some(view);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegendCall {
    Show(LegendView),
    Hide,
}

#[derive(Debug, Default, Clone)]
pub struct RecordingLegend {
    pub calls: Vec<LegendCall>,
}

impl LegendSurface for RecordingLegend {
    fn show_legend(&mut self, legend: &LegendView) {
        self.calls.push(LegendCall::Show(legend.clone()));
    }

    fn hide_legend(&mut self) {
        self.calls.push(LegendCall::Hide);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalog::{IndicatorCatalog, Theme};
    use pretty_assertions::assert_eq;
    use scene::{Selection, SelectionObserver};

    use super::{LegendCall, LegendRenderer, LegendView, RecordingLegend};

    fn selection(theme: Theme, id: &str, year: i32) -> Selection {
        Selection {
            theme,
            indicator_id: id.into(),
            year,
            month: None,
        }
    }

    fn renderer() -> LegendRenderer<RecordingLegend> {
        let catalog = Arc::new(IndicatorCatalog::builtin().unwrap());
        LegendRenderer::new(catalog, "/data", RecordingLegend::default())
    }

    #[test]
    fn shows_once_per_url() {
        let mut r = renderer();
        r.on_selection_changed(&selection(Theme::Climate, "precipitation", 2022));
        r.on_selection_changed(&selection(Theme::Climate, "precipitation", 2023));
        assert_eq!(r.surface().calls.len(), 1);
        assert_eq!(
            r.shown().unwrap().url,
            format!("/data/legends/{}", "precipitation.png")
        );
    }

    #[test]
    fn image_error_hides_and_stays_hidden() {
        let mut r = renderer();
        r.on_selection_changed(&selection(Theme::Climate, "precipitation", 2022));
        let url = r.shown().unwrap().url.clone();
        r.on_image_error("/data/legends/other.png");
        assert!(r.shown().is_some());
        r.on_image_error(&url);
        assert!(r.shown().is_none());
        r.on_selection_changed(&selection(Theme::Climate, "precipitation", 2024));
        assert_eq!(
            r.surface().calls.last(),
            Some(&LegendCall::Hide)
        );
        assert_eq!(r.surface().calls.len(), 2);
    }

    #[test]
    fn unknown_indicator_hides_silently() {
        let mut r = renderer();
        r.on_selection_changed(&selection(Theme::Climate, "temperature", 2022));
        r.on_selection_changed(&selection(Theme::Climate, "nope", 2022));
        assert!(r.shown().is_none());
        assert_eq!(r.surface().calls.last(), Some(&LegendCall::Hide));
        // Switching back shows again.
        r.on_selection_changed(&selection(Theme::Climate, "temperature", 2022));
        assert!(matches!(
            r.surface().calls.last(),
            Some(LegendCall::Show(LegendView { title, .. })) if title == "Land surface temperature"
        ));
    }
}
