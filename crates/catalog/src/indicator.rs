use serde::{Deserialize, Serialize};

use crate::pattern::FilePattern;
use crate::theme::Theme;

/// How an overlay's values map to colours.
///
/// Either a preset name (`"viridis"`) or explicit `#rrggbb` stops, low to high.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorRampSpec {
    Named(String),
    Stops(Vec<String>),
}

impl Default for ColorRampSpec {
    fn default() -> Self {
        ColorRampSpec::Named("viridis".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    pub theme: Theme,
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub unit: String,
    pub file_pattern: FilePattern,
    pub colormap_file: String,
    #[serde(default)]
    pub color_ramp: ColorRampSpec,
    /// Fixed colour scale domain. When absent the overlay stretches over the
    /// raster's own finite min/max.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

impl IndicatorDefinition {
    /// `true` when rasters exist only per month (the pattern needs `{month}`).
    pub fn is_monthly_only(&self) -> bool {
        self.file_pattern
            .requires(crate::pattern::Placeholder::Month)
    }

    /// `true` when the pattern can use a month at all.
    pub fn supports_months(&self) -> bool {
        self.file_pattern
            .mentions(crate::pattern::Placeholder::Month)
    }

    /// Label for menus and chart titles, with the unit when there is one.
    pub fn label(&self) -> String {
        if self.unit.trim().is_empty() {
            self.display_name.clone()
        } else {
            format!("{} ({})", self.display_name, self.unit)
        }
    }
}

/// `true` for ids that are safe to splice into a relative path.
pub(crate) fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !id.contains("..")
}

#[cfg(test)]
mod tests {
    use super::{ColorRampSpec, is_path_safe_id};

    #[test]
    fn ramp_spec_accepts_name_or_stops() {
        let named: ColorRampSpec = serde_json::from_str("\"blues\"").unwrap();
        assert_eq!(named, ColorRampSpec::Named("blues".into()));
        let stops: ColorRampSpec = serde_json::from_str("[\"#000000\", \"#ffffff\"]").unwrap();
        assert_eq!(
            stops,
            ColorRampSpec::Stops(vec!["#000000".into(), "#ffffff".into()])
        );
    }

    #[test]
    fn path_safe_ids() {
        assert!(is_path_safe_id("R12"));
        assert!(is_path_safe_id("soil_moisture"));
        assert!(is_path_safe_id("KE-01"));
        assert!(!is_path_safe_id(""));
        assert!(!is_path_safe_id(".."));
        assert!(!is_path_safe_id("a/b"));
        assert!(!is_path_safe_id("a..b"));
        assert!(!is_path_safe_id("a b"));
    }
}
