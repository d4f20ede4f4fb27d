use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::GeneError;

/// A gene name read from the input list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    /// Trims the raw token; blank tokens produce `None`.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneId(String);

impl GeneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GeneId {
    type Err = GeneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(GeneError::InvalidGeneId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Organism qualifier given as `genus_species`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species(String);

impl Species {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The qualifier as NCBI spells an organism name: `homo_sapiens` -> `homo sapiens`.
    pub fn organism(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Species {
    type Err = GeneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().replace(' ', "_");
        if !normalized.contains('_') {
            return Err(GeneError::InvalidSpecies(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// What the runner does when a request fails outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPolicy {
    #[default]
    FailFast,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputNaming {
    #[default]
    FailIfExists,
    AutoIncrement,
}

impl fmt::Display for OutputNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputNaming::FailIfExists => write!(f, "fail-if-exists"),
            OutputNaming::AutoIncrement => write!(f, "auto-increment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// Whole line is the key.
    Lines,
    /// First tab-separated column is the key.
    FirstColumn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSummary {
    pub key: QueryKey,
    pub gene_id: GeneId,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationCount {
    pub key: QueryKey,
    pub count: u64,
    pub dictionary_warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn query_key_trims_and_rejects_blank() {
        assert_eq!(QueryKey::new("  TP53 \r").unwrap().as_str(), "TP53");
        assert!(QueryKey::new(" \t ").is_none());
    }

    #[test]
    fn species_accepts_space_separated() {
        let species: Species = "Mus musculus".parse().unwrap();
        assert_eq!(species.as_str(), "Mus_musculus");
        assert_eq!(species.organism(), "Mus musculus");
    }

    #[test]
    fn species_requires_separator() {
        let err = "human".parse::<Species>().unwrap_err();
        assert_matches!(err, GeneError::InvalidSpecies(_));
    }

    #[test]
    fn gene_id_must_be_numeric() {
        assert_eq!("7157".parse::<GeneId>().unwrap().as_str(), "7157");
        assert_matches!("".parse::<GeneId>(), Err(GeneError::InvalidGeneId(_)));
        assert_matches!("abc".parse::<GeneId>(), Err(GeneError::InvalidGeneId(_)));
    }
}
