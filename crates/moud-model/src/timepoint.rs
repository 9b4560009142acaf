//! Study timepoints.
//!
//! The cohort is observed at treatment initiation and at four follow-ups.
//! The set is closed: every snapshot file, metric series, and join key is
//! indexed by one of these five values, in chronological order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timepoint {
    #[serde(rename = "baseline")]
    Baseline,
    #[serde(rename = "3_month")]
    Month3,
    #[serde(rename = "6_month")]
    Month6,
    #[serde(rename = "12_month")]
    Month12,
    #[serde(rename = "18_month")]
    Month18,
}

impl Timepoint {
    /// Chronological order. Forward-fill and trend series depend on this.
    pub const ALL: [Timepoint; 5] = [
        Timepoint::Baseline,
        Timepoint::Month3,
        Timepoint::Month6,
        Timepoint::Month12,
        Timepoint::Month18,
    ];

    /// Canonical key used in the published artifact.
    pub fn key(&self) -> &'static str {
        match self {
            Timepoint::Baseline => "baseline",
            Timepoint::Month3 => "3_month",
            Timepoint::Month6 => "6_month",
            Timepoint::Month12 => "12_month",
            Timepoint::Month18 => "18_month",
        }
    }

    /// Human-readable label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Timepoint::Baseline => "Baseline",
            Timepoint::Month3 => "3 Months",
            Timepoint::Month6 => "6 Months",
            Timepoint::Month12 => "12 Months",
            Timepoint::Month18 => "18 Months",
        }
    }

    /// Fixed export filename for this timepoint's snapshot.
    pub fn source_filename(&self) -> &'static str {
        match self {
            Timepoint::Baseline => "Patient-Baseline-Data.csv",
            Timepoint::Month3 => "Patient-3-month-Data.csv",
            Timepoint::Month6 => "Patient-6-month-Data.csv",
            Timepoint::Month12 => "Patient-12-month-Data.csv",
            Timepoint::Month18 => "Patient-18-month-Data.csv",
        }
    }

    pub fn months_from_baseline(&self) -> u32 {
        match self {
            Timepoint::Baseline => 0,
            Timepoint::Month3 => 3,
            Timepoint::Month6 => 6,
            Timepoint::Month12 => 12,
            Timepoint::Month18 => 18,
        }
    }

    /// Length in months of the observation interval ending at this
    /// timepoint. Baseline uses the instrument's 90-day lookback window.
    pub fn months_at_risk(&self) -> u32 {
        match self {
            Timepoint::Baseline | Timepoint::Month3 | Timepoint::Month6 => 3,
            Timepoint::Month12 | Timepoint::Month18 => 6,
        }
    }

    /// The immediately preceding timepoint, if any.
    pub fn prior(&self) -> Option<Timepoint> {
        match self {
            Timepoint::Baseline => None,
            Timepoint::Month3 => Some(Timepoint::Baseline),
            Timepoint::Month6 => Some(Timepoint::Month3),
            Timepoint::Month12 => Some(Timepoint::Month6),
            Timepoint::Month18 => Some(Timepoint::Month12),
        }
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Timepoint {
    type Err = ModelError;

    /// Parse a timepoint key or label (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "baseline" => Ok(Timepoint::Baseline),
            "3_month" | "3 months" | "3m" => Ok(Timepoint::Month3),
            "6_month" | "6 months" | "6m" => Ok(Timepoint::Month6),
            "12_month" | "12 months" | "12m" => Ok(Timepoint::Month12),
            "18_month" | "18 months" | "18m" => Ok(Timepoint::Month18),
            _ => Err(ModelError::UnknownTimepoint(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chronological_order() {
        for window in Timepoint::ALL.windows(2) {
            assert!(window[0] < window[1]);
            assert!(window[0].months_from_baseline() < window[1].months_from_baseline());
        }
    }

    #[test]
    fn prior_walks_back_to_baseline() {
        let mut current = Timepoint::Month18;
        let mut hops = 0;
        while let Some(prior) = current.prior() {
            current = prior;
            hops += 1;
        }
        assert_eq!(current, Timepoint::Baseline);
        assert_eq!(hops, 4);
    }

    #[test]
    fn parses_keys_and_labels() {
        assert_eq!("baseline".parse::<Timepoint>().unwrap(), Timepoint::Baseline);
        assert_eq!("3_month".parse::<Timepoint>().unwrap(), Timepoint::Month3);
        assert_eq!("18 Months".parse::<Timepoint>().unwrap(), Timepoint::Month18);
        assert!("24_month".parse::<Timepoint>().is_err());
    }

    #[test]
    fn serializes_as_key() {
        let json = serde_json::to_string(&Timepoint::Month12).unwrap();
        assert_eq!(json, "\"12_month\"");
    }
}
