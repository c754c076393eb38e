use std::collections::BTreeMap;

use foundation::time::{Period, YearRange};
use serde::{Deserialize, Serialize};

pub mod indicator;
pub mod layout;
pub mod pattern;
pub mod theme;

pub use indicator::*;
pub use layout::*;
pub use pattern::*;
pub use theme::*;

const BUILTIN_CATALOG: &str = include_str!("builtin.json");

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    NotFound { theme: Theme, id: String },
    UnknownIndicator(String),
    EmptyTheme(Theme),
    DuplicateIndicator(String),
    InvalidId(String),
    InvalidRegionId(String),
    InvalidPattern { indicator: String, reason: String },
    Invalid { indicator: String, reason: String },
    MissingMonth { indicator: String },
    InvalidYears { first: i32, last: i32 },
    Parse(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound { theme, id } => {
                write!(f, "indicator {id:?} not found in theme {theme}")
            }
            CatalogError::UnknownIndicator(id) => write!(f, "unknown indicator {id:?}"),
            CatalogError::EmptyTheme(theme) => write!(f, "theme {theme} has no indicators"),
            CatalogError::DuplicateIndicator(id) => write!(f, "duplicate indicator id {id:?}"),
            CatalogError::InvalidId(id) => write!(f, "indicator id {id:?} is not path-safe"),
            CatalogError::InvalidRegionId(id) => write!(f, "region id {id:?} is not path-safe"),
            CatalogError::InvalidPattern { indicator, reason } => {
                write!(f, "invalid pattern for {indicator:?}: {reason}")
            }
            CatalogError::Invalid { indicator, reason } => {
                write!(f, "invalid styling for {indicator:?}: {reason}")
            }
            CatalogError::MissingMonth { indicator } => {
                write!(f, "indicator {indicator:?} is published per month; select a month")
            }
            CatalogError::InvalidYears { first, last } => {
                write!(f, "invalid year range {first}..={last}")
            }
            CatalogError::Parse(msg) => write!(f, "catalog parse error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

fn validate_styling(def: &IndicatorDefinition) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::Invalid {
        indicator: def.id.clone(),
        reason,
    };
    if let Some([lo, hi]) = def.value_range {
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(invalid(format!(
                "value_range [{lo}, {hi}] must be finite and increasing"
            )));
        }
    }
    if let Some(opacity) = def.opacity {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(invalid(format!("opacity {opacity} is outside 0..=1")));
        }
    }
    Ok(())
}

/// Serialized form of a catalog (`catalog.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Inclusive `[first, last]`; defaults to 2020..=2024.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<[i32; 2]>,
    #[serde(default)]
    pub layout: DataLayout,
    pub indicators: Vec<IndicatorDefinition>,
}

/// Read-only registry of indicators, grouped by theme in declaration order.
///
/// Every relative path the viewer fetches is produced here, so file-naming
/// conventions are validated once, at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorCatalog {
    years: YearRange,
    layout: DataLayout,
    by_theme: BTreeMap<Theme, Vec<IndicatorDefinition>>,
}

impl IndicatorCatalog {
    /// The catalog the site ships with.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_json::from_str(payload).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: CatalogDocument) -> Result<Self, CatalogError> {
        let years = match doc.years {
            None => YearRange::SUPPORTED,
            Some([first, last]) if first <= last => YearRange::new(first, last),
            Some([first, last]) => return Err(CatalogError::InvalidYears { first, last }),
        };

        validate_layout(&doc.layout)?;

        let mut by_theme: BTreeMap<Theme, Vec<IndicatorDefinition>> = BTreeMap::new();
        let mut seen: Vec<String> = Vec::with_capacity(doc.indicators.len());
        for def in doc.indicators {
            if !is_path_safe_id(&def.id) {
                return Err(CatalogError::InvalidId(def.id));
            }
            if seen.iter().any(|s| s == &def.id) {
                return Err(CatalogError::DuplicateIndicator(def.id));
            }
            validate_raster_pattern(&def)?;
            if def.colormap_file.trim().is_empty() || def.colormap_file.contains("..") {
                return Err(CatalogError::InvalidPattern {
                    indicator: def.id,
                    reason: "colormap_file must be a plain relative file name".to_string(),
                });
            }
            validate_styling(&def)?;
            seen.push(def.id.clone());
            by_theme.entry(def.theme).or_default().push(def);
        }

        tracing::debug!(
            indicators = seen.len(),
            themes = by_theme.len(),
            "indicator catalog loaded"
        );

        Ok(Self {
            years,
            layout: doc.layout,
            by_theme,
        })
    }

    /// The document this catalog would be loaded from, for publishing it
    /// as `catalog.json`.
    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            years: Some([self.years.first, self.years.last]),
            layout: self.layout.clone(),
            indicators: self.indicators().cloned().collect(),
        }
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Themes with at least one indicator, in menu order.
    pub fn themes(&self) -> Vec<Theme> {
        self.by_theme.keys().copied().collect()
    }

    pub fn list_indicators(&self, theme: Theme) -> &[IndicatorDefinition] {
        self.by_theme.get(&theme).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_indicator(&self, theme: Theme, id: &str) -> Result<&IndicatorDefinition, CatalogError> {
        self.list_indicators(theme)
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::NotFound {
                theme,
                id: id.to_string(),
            })
    }

    /// Looks an indicator up by id alone; ids are unique across themes.
    pub fn find_indicator(&self, id: &str) -> Result<&IndicatorDefinition, CatalogError> {
        self.by_theme
            .values()
            .flatten()
            .find(|d| d.id == id)
            .ok_or_else(|| CatalogError::UnknownIndicator(id.to_string()))
    }

    pub fn first_indicator(&self, theme: Theme) -> Result<&IndicatorDefinition, CatalogError> {
        self.list_indicators(theme)
            .first()
            .ok_or(CatalogError::EmptyTheme(theme))
    }

    pub fn indicators(&self) -> impl Iterator<Item = &IndicatorDefinition> {
        self.by_theme.values().flatten()
    }

    /// Relative raster path for an indicator and period.
    pub fn raster_path(
        &self,
        def: &IndicatorDefinition,
        period: Period,
    ) -> Result<String, CatalogError> {
        let values = PatternValues {
            indicator: Some(&def.id),
            year: Some(period.year),
            month: period.month,
            region: None,
        };
        def.file_pattern
            .render(&values)
            .map_err(|missing| match missing {
                Placeholder::Month => CatalogError::MissingMonth {
                    indicator: def.id.clone(),
                },
                other => CatalogError::InvalidPattern {
                    indicator: def.id.clone(),
                    reason: format!("no value for {other}"),
                },
            })
    }

    /// Relative path of the JSON time series for one region and indicator.
    pub fn timeseries_path(&self, region_id: &str, indicator_id: &str) -> Result<String, CatalogError> {
        if !is_path_safe_id(region_id) {
            return Err(CatalogError::InvalidRegionId(region_id.to_string()));
        }
        let def = self.find_indicator(indicator_id)?;
        let values = PatternValues {
            indicator: Some(&def.id),
            year: None,
            month: None,
            region: Some(region_id),
        };
        self.layout
            .timeseries
            .render(&values)
            .map_err(|missing| CatalogError::InvalidPattern {
                indicator: def.id.clone(),
                reason: format!("time series pattern needs {missing}"),
            })
    }

    pub fn legend_path(&self, def: &IndicatorDefinition) -> String {
        join_relative(&self.layout.legend_dir, &def.colormap_file)
    }

    pub fn boundaries_path(&self) -> &str {
        &self.layout.boundaries
    }

    /// Every (indicator, period) the selection UI can produce, honouring
    /// monthly-only and yearly-only patterns.
    pub fn periods_for(&self, def: &IndicatorDefinition) -> Vec<Period> {
        let mut out = Vec::new();
        for year in self.years.iter() {
            if !def.is_monthly_only() {
                out.push(Period::year(year));
            }
            if def.supports_months() {
                out.extend((1..=12).map(|m| Period::month(year, m)));
            }
        }
        out
    }
}

fn validate_layout(layout: &DataLayout) -> Result<(), CatalogError> {
    let pattern = &layout.timeseries;
    for field in pattern.placeholders() {
        if !matches!(field, Placeholder::Indicator | Placeholder::Region) {
            return Err(CatalogError::InvalidPattern {
                indicator: "<timeseries>".to_string(),
                reason: format!("{field} is not available for time series paths"),
            });
        }
    }
    if !pattern.requires(Placeholder::Region) || !pattern.requires(Placeholder::Indicator) {
        return Err(CatalogError::InvalidPattern {
            indicator: "<timeseries>".to_string(),
            reason: "time series paths need {indicator} and {region}".to_string(),
        });
    }
    if layout.boundaries.trim().is_empty() {
        return Err(CatalogError::InvalidPattern {
            indicator: "<boundaries>".to_string(),
            reason: "boundary path is empty".to_string(),
        });
    }
    Ok(())
}

fn validate_raster_pattern(def: &IndicatorDefinition) -> Result<(), CatalogError> {
    let pattern = &def.file_pattern;
    if pattern.mentions(Placeholder::Region) {
        return Err(CatalogError::InvalidPattern {
            indicator: def.id.clone(),
            reason: "raster patterns cannot use {region}".to_string(),
        });
    }
    if !pattern.requires(Placeholder::Year) {
        return Err(CatalogError::InvalidPattern {
            indicator: def.id.clone(),
            reason: "raster patterns need {year}".to_string(),
        });
    }
    Ok(())
}

fn join_relative(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let file = file.trim_start_matches('/');
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}
