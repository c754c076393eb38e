use formats::boundaries::BoundaryKeys;
use scene::Selection;
use serde::{Deserialize, Serialize};

/// Runtime settings for one viewer instance. Every field has a default, so
/// `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Prefix for every data path the catalog produces.
    pub data_base_url: String,
    /// Catalog document to load instead of the built-in one.
    pub catalog_url: Option<String>,
    pub boundary_id_property: String,
    pub boundary_name_property: String,
    /// Selection to start from; the catalog's first indicator otherwise.
    pub initial_selection: Option<Selection>,
    pub overlay_opacity: f32,
    pub no_data_message: String,
    pub series_no_data_message: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let keys = BoundaryKeys::default();
        Self {
            data_base_url: "data".to_string(),
            catalog_url: None,
            boundary_id_property: keys.id_property,
            boundary_name_property: keys.name_property,
            initial_selection: None,
            overlay_opacity: 0.75,
            no_data_message: "No data for this period".to_string(),
            series_no_data_message: "No time series for this region".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ViewerConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(payload).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.overlay_opacity) {
            return Err(ConfigError::Invalid(format!(
                "overlay_opacity {} outside 0..=1",
                self.overlay_opacity
            )));
        }
        if self.boundary_id_property.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "boundary_id_property is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn boundary_keys(&self) -> BoundaryKeys {
        BoundaryKeys {
            id_property: self.boundary_id_property.clone(),
            name_property: self.boundary_name_property.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ViewerConfig};
    use catalog::Theme;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(ViewerConfig::from_json_str("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = ViewerConfig::from_json_str(
            r#"{
                "data_base_url": "https://cdn.example/atlas",
                "boundary_id_property": "shapeID",
                "initial_selection": {"theme": "water", "indicator_id": "water_bodies", "year": 2023, "month": 6}
            }"#,
        )
        .unwrap();
        assert_eq!(config.data_base_url, "https://cdn.example/atlas");
        assert_eq!(config.boundary_keys().id_property, "shapeID");
        assert_eq!(config.boundary_keys().name_property, "name");
        let initial = config.initial_selection.unwrap();
        assert_eq!((initial.theme, initial.month), (Theme::Water, Some(6)));
    }

    #[test]
    fn rejects_bad_opacity() {
        assert!(matches!(
            ViewerConfig::from_json_str(r#"{"overlay_opacity": 3.0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json_str("[]"),
            Err(ConfigError::Parse(_))
        ));
    }
}
