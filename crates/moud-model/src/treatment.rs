//! Set-valued treatment status.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Medication;

/// The medications a patient is on at one timepoint.
///
/// Empty means "off MOUD" at that timepoint, which is distinct from
/// missing/unknown: a patient with no record at a timepoint has no status
/// at all, while a present patient with no indicators set has this, empty.
/// Co-occurring medications are valid and preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentStatus(BTreeSet<Medication>);

impl TreatmentStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, medication: Medication) {
        self.0.insert(medication);
    }

    pub fn contains(&self, medication: Medication) -> bool {
        self.0.contains(&medication)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn medications(&self) -> impl Iterator<Item = Medication> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Medication> for TreatmentStatus {
    fn from_iter<I: IntoIterator<Item = Medication>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
