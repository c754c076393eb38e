use catalog::ColorRampSpec;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub visible: bool,
    pub opacity: f32,
}

impl LayerStyle {
    pub const fn new(visible: bool, opacity: f32) -> Self {
        Self { visible, opacity }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbologyError {
    UnknownPreset(String),
    InvalidColor(String),
    TooFewStops(usize),
}

impl std::fmt::Display for SymbologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbologyError::UnknownPreset(name) => write!(f, "unknown colour ramp: {name}"),
            SymbologyError::InvalidColor(c) => write!(f, "invalid colour: {c}"),
            SymbologyError::TooFewStops(n) => write!(f, "a ramp needs at least 2 stops, got {n}"),
        }
    }
}

impl std::error::Error for SymbologyError {}

const PRESETS: &[(&str, &[&str])] = &[
    ("viridis", &["#440154", "#3b528b", "#21918c", "#5ec962", "#fde725"]),
    ("blues", &["#f7fbff", "#c6dbef", "#6baed6", "#2171b5", "#08306b"]),
    ("greens", &["#f7fcf5", "#c7e9c0", "#74c476", "#238b45", "#00441b"]),
    ("ndvi", &["#8c510a", "#d8b365", "#f6e8c3", "#91cf60", "#1a9850"]),
    ("heat", &["#ffffb2", "#fecc5c", "#fd8d3c", "#f03b20", "#bd0026"]),
];

/// Pixel colour for nodata.
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Evenly spaced colour stops, low to high.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRamp {
    stops: Vec<[u8; 3]>,
}

impl ColorRamp {
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(name, _)| *name)
    }

    pub fn preset(name: &str) -> Result<Self, SymbologyError> {
        let (_, stops) = PRESETS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SymbologyError::UnknownPreset(name.to_string()))?;
        Self::from_hex_stops(stops.iter().copied())
    }

    pub fn from_hex_stops<'a, I>(stops: I) -> Result<Self, SymbologyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let stops = stops
            .into_iter()
            .map(parse_hex)
            .collect::<Result<Vec<_>, _>>()?;
        if stops.len() < 2 {
            return Err(SymbologyError::TooFewStops(stops.len()));
        }
        Ok(Self { stops })
    }

    pub fn from_spec(spec: &ColorRampSpec) -> Result<Self, SymbologyError> {
        match spec {
            ColorRampSpec::Named(name) => Self::preset(name),
            ColorRampSpec::Stops(stops) => Self::from_hex_stops(stops.iter().map(String::as_str)),
        }
    }

    pub fn stops(&self) -> &[[u8; 3]] {
        &self.stops
    }

    /// Linear interpolation between neighbouring stops; `t` is clamped to [0, 1].
    pub fn color_at(&self, t: f64) -> [u8; 4] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let last = self.stops.len() - 1;
        let pos = t * last as f64;
        let i = (pos.floor() as usize).min(last - 1);
        let f = pos - i as f64;
        let (a, b) = (self.stops[i], self.stops[i + 1]);
        let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
        [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]), 255]
    }

    /// Maps `value` over `[min, max]`; non-finite values are transparent.
    pub fn color_for(&self, value: f64, (min, max): (f64, f64)) -> [u8; 4] {
        if !value.is_finite() {
            return TRANSPARENT;
        }
        let span = max - min;
        let t = if span > 0.0 { (value - min) / span } else { 0.5 };
        self.color_at(t)
    }

    /// RGBA bytes, four per value.
    pub fn colorize(&self, values: &[f32], range: (f64, f64)) -> Vec<u8> {
        let mut out = Vec::with_capacity(values.len() * 4);
        for &v in values {
            out.extend_from_slice(&self.color_for(v as f64, range));
        }
        out
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        let (_, stops) = PRESETS[0];
        Self {
            stops: stops.iter().filter_map(|s| parse_hex(s).ok()).collect(),
        }
    }
}

fn parse_hex(s: &str) -> Result<[u8; 3], SymbologyError> {
    let bad = || SymbologyError::InvalidColor(s.to_string());
    let hex = s.trim().strip_prefix('#').ok_or_else(bad)?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(bad()),
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| bad());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::{ColorRamp, SymbologyError, TRANSPARENT};
    use catalog::ColorRampSpec;

    #[test]
    fn endpoints_and_midpoint() {
        let ramp = ColorRamp::from_hex_stops(["#000000", "#ffffff"]).unwrap();
        assert_eq!(ramp.color_at(0.0), [0, 0, 0, 255]);
        assert_eq!(ramp.color_at(1.0), [255, 255, 255, 255]);
        assert_eq!(ramp.color_at(0.5), [128, 128, 128, 255]);
        assert_eq!(ramp.color_at(7.0), [255, 255, 255, 255]);
    }

    #[test]
    fn nan_is_transparent() {
        let ramp = ColorRamp::default();
        let rgba = ramp.colorize(&[f32::NAN, 0.0], (0.0, 1.0));
        assert_eq!(&rgba[..4], &TRANSPARENT);
        assert_eq!(rgba[7], 255);
    }

    #[test]
    fn presets_and_specs() {
        for name in ColorRamp::preset_names() {
            assert!(ColorRamp::preset(name).is_ok(), "{name}");
        }
        assert_eq!(
            ColorRamp::preset("rainbow"),
            Err(SymbologyError::UnknownPreset("rainbow".into()))
        );
        let spec = ColorRampSpec::Stops(vec!["#f00".into(), "#0000ff".into()]);
        let ramp = ColorRamp::from_spec(&spec).unwrap();
        assert_eq!(ramp.stops(), &[[255u8, 0, 0], [0, 0, 255]]);
        assert!(matches!(
            ColorRamp::from_hex_stops(["#fff"]),
            Err(SymbologyError::TooFewStops(1))
        ));
        assert!(matches!(
            ColorRamp::from_hex_stops(["red", "#fff"]),
            Err(SymbologyError::InvalidColor(_))
        ));
    }

    #[test]
    fn flat_range_uses_midpoint() {
        let ramp = ColorRamp::from_hex_stops(["#000000", "#ffffff"]).unwrap();
        assert_eq!(ramp.color_for(3.0, (3.0, 3.0)), [128, 128, 128, 255]);
    }
}
