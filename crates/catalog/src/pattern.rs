use std::fmt;

use serde::{Deserialize, Serialize};

/// A named substitution inside a [`FilePattern`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    Indicator,
    Year,
    Month,
    Region,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "indicator" => Some(Placeholder::Indicator),
            "year" => Some(Placeholder::Year),
            "month" => Some(Placeholder::Month),
            "region" => Some(Placeholder::Region),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Indicator => "indicator",
            Placeholder::Year => "year",
            Placeholder::Month => "month",
            Placeholder::Region => "region",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(Placeholder),
    /// Emitted only when every field inside it has a value.
    Optional(Vec<Part>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSyntaxError {
    pub pattern: String,
    pub reason: String,
}

impl fmt::Display for PatternSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid file pattern {:?}: {}", self.pattern, self.reason)
    }
}

impl std::error::Error for PatternSyntaxError {}

/// Values available when rendering a pattern.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternValues<'a> {
    pub indicator: Option<&'a str>,
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub region: Option<&'a str>,
}

impl PatternValues<'_> {
    fn has(&self, field: Placeholder) -> bool {
        match field {
            Placeholder::Indicator => self.indicator.is_some(),
            Placeholder::Year => self.year.is_some(),
            Placeholder::Month => self.month.is_some(),
            Placeholder::Region => self.region.is_some(),
        }
    }
}

/// Relative file path template, e.g. `aggregates/{indicator}/{year}[_{month}].tif`.
///
/// Syntax:
/// - `{name}` substitutes `indicator`, `year`, `month` (zero-padded) or `region`.
/// - `[...]` is an optional segment, rendered only when all of its fields are set.
///   Optional segments do not nest and must contain at least one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePattern {
    raw: String,
    parts: Vec<Part>,
}

impl FilePattern {
    pub fn parse(raw: impl Into<String>) -> Result<Self, PatternSyntaxError> {
        let raw = raw.into();
        let parts = parse_parts(&raw).map_err(|reason| PatternSyntaxError {
            pattern: raw.clone(),
            reason,
        })?;
        Ok(Self { raw, parts })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Every field referenced by the pattern, in first-use order.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        let mut out = Vec::new();
        collect_fields(&self.parts, &mut out);
        out
    }

    /// Fields outside optional segments.
    pub fn required(&self) -> Vec<Placeholder> {
        let mut out = Vec::new();
        for part in &self.parts {
            if let Part::Field(f) = part
                && !out.contains(f)
            {
                out.push(*f);
            }
        }
        out
    }

    pub fn requires(&self, field: Placeholder) -> bool {
        self.required().contains(&field)
    }

    pub fn mentions(&self, field: Placeholder) -> bool {
        self.placeholders().contains(&field)
    }

    /// Renders the pattern, or returns the first required field without a value.
    pub fn render(&self, values: &PatternValues<'_>) -> Result<String, Placeholder> {
        let mut out = String::with_capacity(self.raw.len() + 8);
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Field(f) => push_field(&mut out, *f, values).ok_or(*f)?,
                Part::Optional(inner) => {
                    let complete = inner.iter().all(|p| match p {
                        Part::Field(f) => values.has(*f),
                        _ => true,
                    });
                    if !complete {
                        continue;
                    }
                    for p in inner {
                        match p {
                            Part::Literal(s) => out.push_str(s),
                            Part::Field(f) => push_field(&mut out, *f, values).ok_or(*f)?,
                            Part::Optional(_) => {}
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

impl TryFrom<String> for FilePattern {
    type Error = PatternSyntaxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FilePattern::parse(value)
    }
}

impl From<FilePattern> for String {
    fn from(value: FilePattern) -> Self {
        value.raw
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn push_field(out: &mut String, field: Placeholder, values: &PatternValues<'_>) -> Option<()> {
    match field {
        Placeholder::Indicator => out.push_str(values.indicator?),
        Placeholder::Year => out.push_str(&values.year?.to_string()),
        Placeholder::Month => out.push_str(&format!("{:02}", values.month?)),
        Placeholder::Region => out.push_str(values.region?),
    }
    Some(())
}

fn collect_fields(parts: &[Part], out: &mut Vec<Placeholder>) {
    for part in parts {
        match part {
            Part::Literal(_) => {}
            Part::Field(f) => {
                if !out.contains(f) {
                    out.push(*f);
                }
            }
            Part::Optional(inner) => collect_fields(inner, out),
        }
    }
}

fn flush_literal(literal: &mut String, target: &mut Vec<Part>) {
    if !literal.is_empty() {
        target.push(Part::Literal(std::mem::take(literal)));
    }
}

fn parse_parts(raw: &str) -> Result<Vec<Part>, String> {
    if raw.trim().is_empty() {
        return Err("pattern is empty".to_string());
    }

    let mut top: Vec<Part> = Vec::new();
    let mut optional: Option<Vec<Part>> = None;
    let mut literal = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch @ ('{' | '[' | ']')) => {
                            return Err(format!("unexpected '{ch}' inside placeholder"));
                        }
                        Some(ch) => name.push(ch),
                        None => return Err("unterminated placeholder".to_string()),
                    }
                }
                let field = Placeholder::from_name(name.trim())
                    .ok_or_else(|| format!("unknown placeholder {{{name}}}"))?;
                let target = optional.as_mut().unwrap_or(&mut top);
                flush_literal(&mut literal, target);
                target.push(Part::Field(field));
            }
            '}' => return Err("unmatched '}'".to_string()),
            '[' => {
                if optional.is_some() {
                    return Err("optional segments cannot nest".to_string());
                }
                flush_literal(&mut literal, &mut top);
                optional = Some(Vec::new());
            }
            ']' => {
                let Some(mut parts) = optional.take() else {
                    return Err("unmatched ']'".to_string());
                };
                flush_literal(&mut literal, &mut parts);
                if !parts.iter().any(|p| matches!(p, Part::Field(_))) {
                    return Err("optional segment has no placeholder".to_string());
                }
                top.push(Part::Optional(parts));
            }
            other => literal.push(other),
        }
    }

    if optional.is_some() {
        return Err("unterminated optional segment".to_string());
    }
    flush_literal(&mut literal, &mut top);
    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::{FilePattern, PatternValues, Placeholder};

    fn values(year: i32, month: Option<u8>) -> PatternValues<'static> {
        PatternValues {
            indicator: Some("ndvi"),
            year: Some(year),
            month,
            region: None,
        }
    }

    #[test]
    fn optional_month_segment() {
        let p = FilePattern::parse("aggregates/{indicator}/{year}[_{month}].tif").unwrap();
        assert_eq!(p.render(&values(2022, None)).unwrap(), "aggregates/ndvi/2022.tif");
        assert_eq!(
            p.render(&values(2022, Some(3))).unwrap(),
            "aggregates/ndvi/2022_03.tif"
        );
        assert_eq!(p.required(), vec![Placeholder::Indicator, Placeholder::Year]);
        assert!(p.mentions(Placeholder::Month));
        assert!(!p.requires(Placeholder::Month));
    }

    #[test]
    fn required_month_reports_missing_field() {
        let p = FilePattern::parse("water_bodies/wb_{year}_{month}.tif").unwrap();
        assert_eq!(p.render(&values(2023, None)), Err(Placeholder::Month));
        assert_eq!(
            p.render(&values(2023, Some(11))).unwrap(),
            "water_bodies/wb_2023_11.tif"
        );
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in [
            "",
            "   ",
            "a/{year",
            "a/{decade}.tif",
            "a/year}.tif",
            "a/[{year}",
            "a/{year}].tif",
            "a/[[{month}]].tif",
            "a/[_v2].tif",
            "a/{ye[ar}.tif",
        ] {
            assert!(FilePattern::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn serde_round_trips_through_string() {
        let p: FilePattern = serde_json::from_str("\"ghsl/ghsl_{year}.tif\"").unwrap();
        assert_eq!(p.as_str(), "ghsl/ghsl_{year}.tif");
        assert!(serde_json::from_str::<FilePattern>("\"ghsl/{nope}.tif\"").is_err());
    }
}
