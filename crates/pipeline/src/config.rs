//! Pipeline tuning knobs.

use std::time::Duration;

/// Default timeout applied to every collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of a job one store transaction covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitScope {
    /// Every record of the job commits together or not at all.
    #[default]
    Job,
    /// Each record commits on its own; records committed before a failure stay.
    Record,
}

impl CommitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Record => "record",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "job" => Some(Self::Job),
            "record" => Some(Self::Record),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings shared by every job a pipeline runs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub call_timeout: Duration,
    pub commit_scope: CommitScope,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            commit_scope: CommitScope::default(),
        }
    }
}
