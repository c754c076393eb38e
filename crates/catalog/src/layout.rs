use serde::{Deserialize, Serialize};

use crate::pattern::FilePattern;

/// Where the non-raster files live relative to the data root.
///
/// Raster paths are per indicator (`IndicatorDefinition::file_pattern`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLayout {
    #[serde(default = "default_timeseries")]
    pub timeseries: FilePattern,
    #[serde(default = "default_legend_dir")]
    pub legend_dir: String,
    #[serde(default = "default_boundaries")]
    pub boundaries: String,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            timeseries: default_timeseries(),
            legend_dir: default_legend_dir(),
            boundaries: default_boundaries(),
        }
    }
}

pub const DEFAULT_TIMESERIES_PATTERN: &str = "timeseries/{indicator}/{region}.json";

fn default_timeseries() -> FilePattern {
    // The literal is covered by `default_layout_is_valid`.
    match FilePattern::parse(DEFAULT_TIMESERIES_PATTERN) {
        Ok(p) => p,
        Err(e) => unreachable!("{e}"),
    }
}

fn default_legend_dir() -> String {
    "legends".to_string()
}

fn default_boundaries() -> String {
    "admin/adm1.geojson".to_string()
}

#[cfg(test)]
mod tests {
    use super::DataLayout;
    use crate::pattern::Placeholder;

    #[test]
    fn default_layout_is_valid() {
        let layout = DataLayout::default();
        assert_eq!(
            layout.timeseries.required(),
            vec![Placeholder::Indicator, Placeholder::Region]
        );
        assert_eq!(layout.legend_dir, "legends");
        assert_eq!(layout.boundaries, "admin/adm1.geojson");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let layout: DataLayout = serde_json::from_str(r#"{"legend_dir": "img/legends"}"#).unwrap();
        assert_eq!(layout.legend_dir, "img/legends");
        assert_eq!(layout.boundaries, "admin/adm1.geojson");
    }
}
