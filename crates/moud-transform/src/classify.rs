//! Column classification by name pattern.
//!
//! The exact column names are a fixed, versioned contract with the
//! snapshot exports; the rules below recognize them by prefix and
//! substring so that variant spellings across waves still classify.
//! Classification is deterministic and total: rules are checked in a
//! fixed order and the first match wins, and anything unmatched falls
//! into [`VariableClass::Unclassified`] rather than raising.

use std::collections::BTreeMap;

use tracing::debug;

use moud_model::VariableClass;

/// Demographic columns carried by the exports, matched exactly.
const DEMOGRAPHIC_FIELDS: [&str; 8] = [
    "sex",
    "agecat",
    "raceth",
    "educat",
    "education",
    "employed",
    "insurance",
    "mentalillness",
];

/// Medication stems appearing in treatment indicator columns.
const MEDICATION_STEMS: [&str; 3] = ["bup", "mmt", "ntx"];

/// Classify a single column name.
pub fn classify_column(name: &str) -> VariableClass {
    let lower = name.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return VariableClass::Unclassified;
    }

    if DEMOGRAPHIC_FIELDS.contains(&lower.as_str()) {
        return VariableClass::Demographic;
    }

    if lower == "cid" || lower == "responded" || lower.ends_with("_id") || lower.contains("site")
    {
        return VariableClass::Identifier;
    }

    // currentbup / currentmmt / currentntx and bare medication columns.
    if MEDICATION_STEMS.iter().any(|stem| lower.contains(stem)) {
        return VariableClass::Treatment;
    }

    if lower.starts_with("edvisit") || lower.starts_with("hosp") || lower.starts_with("pcp") {
        return VariableClass::Utilization;
    }

    // opuse30, fnuse30, hruse30, opabst90, opoverdose, suoverdose,
    // diversionuse90.
    if lower.contains("use30")
        || lower.contains("use90")
        || lower.contains("abst")
        || lower.contains("overdose")
        || lower.starts_with("diversion")
    {
        return VariableClass::Outcome;
    }

    VariableClass::Unclassified
}

/// Classification of every column seen in a run.
#[derive(Debug, Clone, Default)]
pub struct ColumnClassification {
    by_column: BTreeMap<String, VariableClass>,
}

impl ColumnClassification {
    /// The class of a column; columns never seen read as unclassified.
    pub fn class_of(&self, column: &str) -> VariableClass {
        self.by_column
            .get(column)
            .copied()
            .unwrap_or(VariableClass::Unclassified)
    }

    /// Columns of one class, in stable (sorted) order.
    pub fn columns_in(&self, class: VariableClass) -> impl Iterator<Item = &str> {
        self.by_column
            .iter()
            .filter(move |(_, candidate)| **candidate == class)
            .map(|(column, _)| column.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_column.is_empty()
    }
}

/// Classify a set of header columns.
///
/// Unrecognized columns are a classification gap: logged, kept as
/// unclassified, and never fatal.
pub fn classify_columns<I, S>(columns: I) -> ColumnClassification
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut by_column = BTreeMap::new();
    for column in columns {
        let column = column.as_ref();
        let class = classify_column(column);
        if class == VariableClass::Unclassified {
            debug!(column, "classification gap, column left unclassified");
        }
        by_column.entry(column.to_string()).or_insert(class);
    }
    ColumnClassification { by_column }
}
