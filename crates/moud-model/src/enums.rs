//! Type-safe enumerations for cohort variables.
//!
//! `VariableClass` is the dispatch key for the missing-data policy table:
//! every column resolves to exactly one class, and each class has exactly
//! one imputation rule. `Medication` enumerates the three MOUD medications
//! and the indicator column each is derived from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a snapshot column.
///
/// Classification is total: a column that matches no recognition rule is
/// `Unclassified` rather than an error, since unknown auxiliary fields must
/// not abort processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableClass {
    /// Join keys and bookkeeping fields. Examples: CID, pufsite_ID,
    /// responded.
    Identifier,

    /// Patient characteristics, time-invariant once resolved. Examples:
    /// sex, agecat, raceth, educat, employed.
    Demographic,

    /// Current-medication indicators. Examples: currentbup, currentmmt,
    /// currentntx.
    Treatment,

    /// Healthcare utilization counts. Examples: edvisit, hospstay, pcp90.
    Utilization,

    /// Substance-use and overdose outcomes. Examples: opuse30, opabst90,
    /// opoverdose.
    Outcome,

    /// Anything the recognition rules do not cover. Passed through
    /// untouched.
    Unclassified,
}

impl VariableClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableClass::Identifier => "identifier",
            VariableClass::Demographic => "demographic",
            VariableClass::Treatment => "treatment",
            VariableClass::Utilization => "utilization",
            VariableClass::Outcome => "outcome",
            VariableClass::Unclassified => "unclassified",
        }
    }

    /// True when the resolver may write a value into a missing field of
    /// this class.
    pub fn is_imputable(&self) -> bool {
        matches!(
            self,
            VariableClass::Demographic | VariableClass::Treatment | VariableClass::Utilization
        )
    }
}

impl fmt::Display for VariableClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identifier" => Ok(VariableClass::Identifier),
            "demographic" => Ok(VariableClass::Demographic),
            "treatment" => Ok(VariableClass::Treatment),
            "utilization" => Ok(VariableClass::Utilization),
            "outcome" => Ok(VariableClass::Outcome),
            "unclassified" => Ok(VariableClass::Unclassified),
            _ => Err(format!("unknown variable class: {s}")),
        }
    }
}

/// Medication for opioid use disorder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Medication {
    #[serde(rename = "buprenorphine")]
    Buprenorphine,
    #[serde(rename = "methadone")]
    Methadone,
    #[serde(rename = "naltrexone")]
    Naltrexone,
}

impl Medication {
    pub const ALL: [Medication; 3] = [
        Medication::Buprenorphine,
        Medication::Methadone,
        Medication::Naltrexone,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Medication::Buprenorphine => "buprenorphine",
            Medication::Methadone => "methadone",
            Medication::Naltrexone => "naltrexone",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Medication::Buprenorphine => "Buprenorphine",
            Medication::Methadone => "Methadone",
            Medication::Naltrexone => "Naltrexone",
        }
    }

    /// The current-medication indicator column in the snapshot exports.
    pub fn indicator_column(&self) -> &'static str {
        match self {
            Medication::Buprenorphine => "currentbup",
            Medication::Methadone => "currentmmt",
            Medication::Naltrexone => "currentntx",
        }
    }
}

impl fmt::Display for Medication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Medication {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buprenorphine" | "bup" => Ok(Medication::Buprenorphine),
            "methadone" | "mmt" => Ok(Medication::Methadone),
            "naltrexone" | "ntx" => Ok(Medication::Naltrexone),
            _ => Err(format!("unknown medication: {s}")),
        }
    }
}
