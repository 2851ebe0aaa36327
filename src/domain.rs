use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Fda,
    Cpsc,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Fda, Source::Cpsc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Fda => "FDA",
            Source::Cpsc => "CPSC",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = RecallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fda" => Ok(Source::Fda),
            "cpsc" => Ok(Source::Cpsc),
            _ => Err(RecallError::InvalidSource(value.to_string())),
        }
    }
}

/// Which upstream sources a request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceScope {
    #[default]
    Both,
    Only(Source),
}

impl SourceScope {
    /// An absent or blank value selects both sources.
    pub fn parse(value: Option<&str>) -> Result<Self, RecallError> {
        match value.map(str::trim) {
            None | Some("") => Ok(SourceScope::Both),
            Some(raw) => Ok(SourceScope::Only(raw.parse()?)),
        }
    }

    /// Sources in merge order, FDA first.
    pub fn sources(&self) -> Vec<Source> {
        match self {
            SourceScope::Both => Source::ALL.to_vec(),
            SourceScope::Only(source) => vec![*source],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Limit(usize);

impl Limit {
    pub fn new(value: usize) -> Result<Self, RecallError> {
        if value == 0 {
            return Err(RecallError::InvalidLimit(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parses a caller-supplied limit. Missing values take `default`, values
    /// above `max` are clamped, and anything that is not a positive integer
    /// is rejected.
    pub fn parse(raw: Option<&str>, default: usize, max: usize) -> Result<Self, RecallError> {
        let value = match raw.map(str::trim) {
            None | Some("") => default,
            Some(text) => {
                let parsed = match text.parse::<i64>() {
                    Ok(parsed) => parsed,
                    Err(err) if *err.kind() == IntErrorKind::PosOverflow => i64::MAX,
                    Err(_) => return Err(RecallError::InvalidLimit(text.to_string())),
                };
                if parsed <= 0 {
                    return Err(RecallError::InvalidLimit(text.to_string()));
                }
                usize::try_from(parsed).unwrap_or(usize::MAX)
            }
        };
        Self::new(value.min(max))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-blank free-text search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SearchQuery {
    type Err = RecallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RecallError::EmptyQuery);
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Canonical fields a free-text search is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchFields {
    /// Product description, reason and company.
    #[default]
    Standard,
    /// The standard fields plus classification.
    WithClassification,
}

/// Canonical recall record shared by every upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recall {
    pub id: String,
    pub recall_number: String,
    pub product_description: String,
    pub reason_for_recall: String,
    pub company: String,
    pub date: String,
    pub classification: String,
    pub status: String,
    pub distribution_pattern: String,
    pub product_quantity: String,
    pub source: Source,
}

impl Recall {
    /// Case-insensitive substring match against product, reason and company.
    /// `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        [
            &self.product_description,
            &self.reason_for_recall,
            &self.company,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }

    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str, fields: SearchFields) -> bool {
        self.matches_text(needle)
            || (fields == SearchFields::WithClassification
                && self.classification.to_lowercase().contains(needle))
    }

    pub fn has_classification(&self, classification: &str) -> bool {
        self.classification.to_lowercase() == classification.trim().to_lowercase()
    }
}
