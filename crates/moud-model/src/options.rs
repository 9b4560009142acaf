//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// How unmapped demographic codes enter percentage denominators.
///
/// The source material is ambiguous here, so it is a policy knob rather
/// than an assumption. `Retain` keeps unmapped codes as an explicit
/// category inside the denominator; `Exclude` reports them separately and
/// leaves them out of the denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    #[default]
    Retain,
    Exclude,
}

/// Options threaded through a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Name of the patient-identifier column in the exports.
    pub id_column: String,
    pub unmapped_policy: UnmappedPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            id_column: "CID".to_string(),
            unmapped_policy: UnmappedPolicy::default(),
        }
    }
}

impl PipelineOptions {
    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    #[must_use]
    pub fn with_unmapped_policy(mut self, policy: UnmappedPolicy) -> Self {
        self.unmapped_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = PipelineOptions::default();
        assert_eq!(options.id_column, "CID");
        assert_eq!(options.unmapped_policy, UnmappedPolicy::Retain);
    }

    #[test]
    fn builder_overrides() {
        let options = PipelineOptions::default()
            .with_id_column("subject_id")
            .with_unmapped_policy(UnmappedPolicy::Exclude);
        assert_eq!(options.id_column, "subject_id");
        assert_eq!(options.unmapped_policy, UnmappedPolicy::Exclude);
    }
}
