use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use catalog::{IndicatorCatalog, Theme};
use foundation::time::{Period, YearRange};
use serde::{Deserialize, Serialize};

/// The user's current (theme, indicator, year, month) choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub theme: Theme,
    pub indicator_id: String,
    pub year: i32,
    #[serde(default)]
    pub month: Option<u8>,
}

impl Selection {
    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The indicator does not belong to the theme (or the theme is empty).
    InvalidSelection {
        theme: Theme,
        indicator: Option<String>,
    },
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::InvalidSelection {
                theme,
                indicator: Some(id),
            } => write!(f, "indicator {id:?} is not part of theme {theme}"),
            SelectionError::InvalidSelection {
                theme,
                indicator: None,
            } => write!(f, "theme {theme} has no indicators"),
            SelectionError::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} {value} outside {min}..={max}"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Receives every committed selection, synchronously and in registration order.
///
/// Observers must not mutate the `SelectionState` that notifies them.
pub trait SelectionObserver {
    fn on_selection_changed(&mut self, selection: &Selection);
}

/// Single writer for the active [`Selection`].
///
/// Each setter validates first; on success it commits and notifies every
/// observer before returning, on failure nothing changes and nobody is notified.
pub struct SelectionState {
    catalog: Arc<IndicatorCatalog>,
    current: Selection,
    observers: Vec<Rc<RefCell<dyn SelectionObserver>>>,
}

impl std::fmt::Debug for SelectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionState")
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SelectionState {
    /// Starts on the first theme's first indicator and the latest year.
    pub fn new(catalog: Arc<IndicatorCatalog>) -> Result<Self, SelectionError> {
        let theme = catalog
            .themes()
            .first()
            .copied()
            .unwrap_or(Theme::Agriculture);
        let first = catalog
            .first_indicator(theme)
            .map_err(|_| SelectionError::InvalidSelection {
                theme,
                indicator: None,
            })?;
        let initial = Selection {
            theme,
            indicator_id: first.id.clone(),
            year: catalog.years().last,
            month: None,
        };
        Ok(Self {
            catalog,
            current: initial,
            observers: Vec::new(),
        })
    }

    pub fn with_initial(
        catalog: Arc<IndicatorCatalog>,
        initial: Selection,
    ) -> Result<Self, SelectionError> {
        validate(&catalog, &initial)?;
        Ok(Self {
            catalog,
            current: initial,
            observers: Vec::new(),
        })
    }

    pub fn current(&self) -> &Selection {
        &self.current
    }

    pub fn catalog(&self) -> &Arc<IndicatorCatalog> {
        &self.catalog
    }

    pub fn subscribe(&mut self, observer: Rc<RefCell<dyn SelectionObserver>>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Replays the current selection to every observer (initial render).
    pub fn notify_current(&self) {
        for observer in &self.observers {
            observer.borrow_mut().on_selection_changed(&self.current);
        }
    }

    /// Switches theme and resets the indicator to the theme's first one.
    pub fn set_theme(&mut self, theme: Theme) -> Result<&Selection, SelectionError> {
        let first = self
            .catalog
            .first_indicator(theme)
            .map_err(|_| SelectionError::InvalidSelection {
                theme,
                indicator: None,
            })
            .inspect_err(log_rejected)?;
        let next = Selection {
            theme,
            indicator_id: first.id.clone(),
            ..self.current.clone()
        };
        Ok(self.commit(next))
    }

    pub fn set_indicator(&mut self, id: &str) -> Result<&Selection, SelectionError> {
        let theme = self.current.theme;
        self.catalog
            .get_indicator(theme, id)
            .map_err(|_| SelectionError::InvalidSelection {
                theme,
                indicator: Some(id.to_string()),
            })
            .inspect_err(log_rejected)?;
        let next = Selection {
            indicator_id: id.to_string(),
            ..self.current.clone()
        };
        Ok(self.commit(next))
    }

    pub fn set_year(&mut self, year: i32) -> Result<&Selection, SelectionError> {
        check_year(self.catalog.years(), year).inspect_err(log_rejected)?;
        let next = Selection {
            year,
            ..self.current.clone()
        };
        Ok(self.commit(next))
    }

    pub fn set_month(&mut self, month: Option<u8>) -> Result<&Selection, SelectionError> {
        check_month(month).inspect_err(log_rejected)?;
        let next = Selection {
            month,
            ..self.current.clone()
        };
        Ok(self.commit(next))
    }

    /// Replaces the whole selection at once (e.g. restoring a shared link),
    /// notifying observers a single time.
    pub fn apply(&mut self, next: Selection) -> Result<&Selection, SelectionError> {
        validate(&self.catalog, &next).inspect_err(log_rejected)?;
        Ok(self.commit(next))
    }

    fn commit(&mut self, next: Selection) -> &Selection {
        tracing::debug!(
            theme = %next.theme,
            indicator = %next.indicator_id,
            period = %next.period(),
            "selection changed"
        );
        self.current = next;
        self.notify_current();
        &self.current
    }
}

fn validate(catalog: &IndicatorCatalog, s: &Selection) -> Result<(), SelectionError> {
    catalog
        .get_indicator(s.theme, &s.indicator_id)
        .map_err(|_| SelectionError::InvalidSelection {
            theme: s.theme,
            indicator: Some(s.indicator_id.clone()),
        })?;
    check_year(catalog.years(), s.year)?;
    check_month(s.month)
}

fn check_year(years: YearRange, year: i32) -> Result<(), SelectionError> {
    if years.contains(year) {
        Ok(())
    } else {
        Err(SelectionError::OutOfRange {
            field: "year",
            value: year as i64,
            min: years.first as i64,
            max: years.last as i64,
        })
    }
}

fn check_month(month: Option<u8>) -> Result<(), SelectionError> {
    match month {
        Some(m) if !Period::is_valid_month(m) => Err(SelectionError::OutOfRange {
            field: "month",
            value: m as i64,
            min: 1,
            max: 12,
        }),
        _ => Ok(()),
    }
}

fn log_rejected(err: &SelectionError) {
    // These only happen when the UI offers something the catalog does not have.
    tracing::error!(%err, "selection rejected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<Selection>,
    }

    impl SelectionObserver for Recorder {
        fn on_selection_changed(&mut self, selection: &Selection) {
            self.seen.push(selection.clone());
        }
    }

    fn state() -> (SelectionState, Rc<RefCell<Recorder>>) {
        let catalog = Arc::new(IndicatorCatalog::builtin().expect("builtin catalog"));
        let mut s = SelectionState::new(catalog).expect("initial selection");
        let rec = Rc::new(RefCell::new(Recorder::default()));
        s.subscribe(rec.clone());
        (s, rec)
    }

    #[test]
    fn starts_on_first_indicator_and_latest_year() {
        let (s, rec) = state();
        assert_eq!(
            s.current(),
            &Selection {
                theme: Theme::Agriculture,
                indicator_id: "ndvi".to_string(),
                year: 2024,
                month: None,
            }
        );
        assert!(rec.borrow().seen.is_empty());
    }

    #[test]
    fn set_theme_resets_indicator_and_notifies() {
        let (mut s, rec) = state();
        s.set_year(2022).unwrap();
        s.set_theme(Theme::Climate).unwrap();
        let seen = &rec.borrow().seen;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].theme, Theme::Climate);
        assert_eq!(seen[1].indicator_id, "precipitation");
        assert_eq!(seen[1].year, 2022);
    }

    #[test]
    fn foreign_indicator_is_invalid_selection() {
        let (mut s, rec) = state();
        let catalog = s.catalog().clone();
        for theme in catalog.themes() {
            s.set_theme(theme).unwrap();
            for other in catalog.themes().into_iter().filter(|t| *t != theme) {
                for def in catalog.list_indicators(other) {
                    let before = s.current().clone();
                    let err = s.set_indicator(&def.id).unwrap_err();
                    assert_eq!(
                        err,
                        SelectionError::InvalidSelection {
                            theme,
                            indicator: Some(def.id.clone())
                        }
                    );
                    assert_eq!(s.current(), &before);
                }
            }
        }
        // Only the successful set_theme calls notified.
        assert_eq!(rec.borrow().seen.len(), catalog.themes().len());
    }

    #[test]
    fn years_outside_range_are_rejected() {
        let (mut s, rec) = state();
        for year in [i32::MIN, -1, 0, 1999, 2019, 2025, 2100, i32::MAX] {
            assert!(matches!(
                s.set_year(year),
                Err(SelectionError::OutOfRange { field: "year", .. })
            ));
        }
        for year in 2020..=2024 {
            assert_eq!(s.set_year(year).unwrap().year, year);
        }
        assert_eq!(rec.borrow().seen.len(), 5);
    }

    #[test]
    fn month_must_be_calendar_month() {
        let (mut s, _rec) = state();
        assert!(s.set_month(Some(0)).is_err());
        assert!(s.set_month(Some(13)).is_err());
        assert_eq!(s.set_month(Some(12)).unwrap().month, Some(12));
        assert_eq!(s.set_month(None).unwrap().month, None);
    }

    #[test]
    fn observers_notified_in_registration_order() {
        struct Tagged(&'static str, Rc<RefCell<Vec<&'static str>>>);
        impl SelectionObserver for Tagged {
            fn on_selection_changed(&mut self, _selection: &Selection) {
                self.1.borrow_mut().push(self.0);
            }
        }

        let catalog = Arc::new(IndicatorCatalog::builtin().unwrap());
        let mut s = SelectionState::new(catalog).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        s.subscribe(Rc::new(RefCell::new(Tagged("raster", log.clone()))));
        s.subscribe(Rc::new(RefCell::new(Tagged("legend", log.clone()))));
        s.set_year(2021).unwrap();
        assert_eq!(*log.borrow(), vec!["raster", "legend"]);
    }

    #[test]
    fn apply_validates_whole_selection() {
        let (mut s, rec) = state();
        let bad = Selection {
            theme: Theme::Water,
            indicator_id: "ndvi".to_string(),
            year: 2021,
            month: None,
        };
        assert!(s.apply(bad).is_err());
        let good = Selection {
            theme: Theme::Water,
            indicator_id: "water_bodies".to_string(),
            year: 2023,
            month: Some(6),
        };
        assert_eq!(s.apply(good.clone()).unwrap(), &good);
        assert_eq!(rec.borrow().seen, vec![good]);
    }

    #[test]
    fn selection_serializes_for_the_shell() {
        let s = Selection {
            theme: Theme::Climate,
            indicator_id: "precipitation".to_string(),
            year: 2022,
            month: None,
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"theme": "climate", "indicator_id": "precipitation", "year": 2022, "month": null})
        );
    }
}
