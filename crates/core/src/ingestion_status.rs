//! Ingestion job status machine.
//!
//! Status IDs match the `ingestion_job_statuses` seed data (1-based SMALLINT).

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Lifecycle status of an ingestion job.
///
/// `Uploaded -> Validating -> Processing -> Completed | Failed`. Any
/// non-terminal status may move to `Failed`. There is no retry transition.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded = 1,
    Validating = 2,
    Processing = 3,
    Completed = 4,
    Failed = 5,
}

impl JobStatus {
    pub const ALL: &'static [JobStatus] = &[
        Self::Uploaded,
        Self::Validating,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn from_id(id: StatusId) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Validating => "validating",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Statuses reachable in one step from `self`.
    pub fn valid_transitions(self) -> &'static [JobStatus] {
        match self {
            Self::Uploaded => &[Self::Validating, Self::Failed],
            Self::Validating => &[Self::Processing, Self::Failed],
            Self::Processing => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }

    pub fn can_transition_to(self, to: JobStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Valid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn forward_path_is_valid() {
        assert!(JobStatus::Uploaded.can_transition_to(JobStatus::Validating));
        assert!(JobStatus::Validating.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn every_non_terminal_status_can_fail() {
        for status in [JobStatus::Uploaded, JobStatus::Validating, JobStatus::Processing] {
            assert!(status.can_transition_to(JobStatus::Failed), "{status}");
        }
    }

    // -----------------------------------------------------------------------
    // Invalid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn terminal_statuses_have_no_exits() {
        for to in JobStatus::ALL {
            assert!(!JobStatus::Completed.can_transition_to(*to));
            assert!(!JobStatus::Failed.can_transition_to(*to));
        }
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn no_skipping_or_going_backwards() {
        assert!(!JobStatus::Uploaded.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Uploaded.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Validating));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Uploaded));
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    #[test]
    fn ids_match_seed_data() {
        assert_eq!(JobStatus::Uploaded.id(), 1);
        assert_eq!(JobStatus::Failed.id(), 5);
        for status in JobStatus::ALL {
            assert_eq!(JobStatus::from_id(status.id()), Some(*status));
            assert_eq!(JobStatus::from_str(status.as_str()), Some(*status));
        }
        assert_eq!(JobStatus::from_id(0), None);
    }
}
