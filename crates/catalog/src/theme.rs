use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grouping category for indicators, in menu order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Agriculture,
    Climate,
    Water,
    Population,
}

impl Theme {
    pub const ALL: [Theme; 4] = [
        Theme::Agriculture,
        Theme::Climate,
        Theme::Water,
        Theme::Population,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Theme::Agriculture => "agriculture",
            Theme::Climate => "climate",
            Theme::Water => "water",
            Theme::Population => "population",
        }
    }

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Theme::Agriculture => "Agriculture",
            Theme::Climate => "Climate",
            Theme::Water => "Water",
            Theme::Population => "Population",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown theme: {}", self.0)
    }
}

impl std::error::Error for UnknownTheme {}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Theme::ALL
            .into_iter()
            .find(|t| t.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Theme;

    #[test]
    fn parses_slugs_case_insensitively() {
        assert_eq!("climate".parse::<Theme>().unwrap(), Theme::Climate);
        assert_eq!(" Water ".parse::<Theme>().unwrap(), Theme::Water);
        assert!("weather".parse::<Theme>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_slugs() {
        let json = serde_json::to_string(&Theme::Population).unwrap();
        assert_eq!(json, "\"population\"");
        let back: Theme = serde_json::from_str("\"agriculture\"").unwrap();
        assert_eq!(back, Theme::Agriculture);
    }
}
