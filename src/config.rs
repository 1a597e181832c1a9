use crate::error::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Run settings loaded once at startup from a YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Parent folder id on the storage backend; the run folder is created under it.
    pub gd_folder_id: String,

    /// First day of the query window.
    pub start_date: NaiveDate,

    /// Last day of the query window, or the literal `yesterday`.
    pub end_date: EndDate,

    /// Search terms, fetched in this order.
    pub keywords: Vec<String>,

    /// Base name for the merged output file.
    pub project_name: Option<String>,

    /// One merged CSV, or one CSV per keyword.
    #[serde(default)]
    pub output_mode: OutputMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDate {
    Date(NaiveDate),
    Yesterday,
}

impl EndDate {
    /// Resolve against wall-clock `today`, so `yesterday` tracks run time
    /// rather than config-authoring time.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            EndDate::Date(d) => *d,
            EndDate::Yesterday => today - Duration::days(1),
        }
    }
}

impl<'de> Deserialize<'de> for EndDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EndDateVisitor;

        impl Visitor<'_> for EndDateVisitor {
            type Value = EndDate;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a YYYY-MM-DD date or the literal \"yesterday\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<EndDate, E> {
                if v == "yesterday" {
                    return Ok(EndDate::Yesterday);
                }
                NaiveDate::parse_from_str(v, "%Y-%m-%d")
                    .map(EndDate::Date)
                    .map_err(|_| E::custom(format!("invalid end_date: {v}")))
            }
        }

        deserializer.deserialize_str(EndDateVisitor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    Merged,
    PerKeyword,
}

impl Settings {
    /// Load and validate settings from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() {
            return Err(Error::Config("keywords must not be empty".into()));
        }
        if self.output_mode == OutputMode::Merged && self.project_name.is_none() {
            return Err(Error::Config(
                "project_name is required for merged output".into(),
            ));
        }
        Ok(())
    }

    /// Provider timeframe string for the resolved window.
    pub fn timeframe(&self, today: NaiveDate) -> String {
        format!("{} {}", self.start_date, self.end_date.resolve(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_YAML: &str = "\
gd_folder_id: folder-123
start_date: 2023-01-01
end_date: yesterday
keywords:
  - rust
  - cargo
project_name: trends
";

    #[test]
    fn parses_full_settings() {
        let s: Settings = serde_yaml::from_str(BASE_YAML).unwrap();
        assert_eq!(s.gd_folder_id, "folder-123");
        assert_eq!(s.start_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(s.end_date, EndDate::Yesterday);
        assert_eq!(s.keywords, vec!["rust", "cargo"]);
        assert_eq!(s.output_mode, OutputMode::Merged);
    }

    #[test]
    fn yesterday_resolves_against_run_day() {
        let s: Settings = serde_yaml::from_str(BASE_YAML).unwrap();
        let today = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        assert_eq!(
            s.end_date.resolve(today),
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()
        );
        assert_eq!(s.timeframe(today), "2023-01-01 2023-01-31");
    }

    #[test]
    fn explicit_end_date() {
        let yaml = BASE_YAML.replace("yesterday", "2023-06-30");
        let s: Settings = serde_yaml::from_str(&yaml).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            s.end_date.resolve(today),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()
        );
    }

    #[test]
    fn per_keyword_mode_without_project_name() {
        let yaml = BASE_YAML.replace("project_name: trends", "output_mode: per_keyword");
        let s: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(s.output_mode, OutputMode::PerKeyword);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn merged_mode_requires_project_name() {
        let yaml = BASE_YAML.replace("project_name: trends\n", "");
        let s: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(s.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_keywords_rejected() {
        let yaml = BASE_YAML.replace("keywords:\n  - rust\n  - cargo\n", "keywords: []\n");
        let s: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(s.validate(), Err(Error::Config(_))));
    }
}
