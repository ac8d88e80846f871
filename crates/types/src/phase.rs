//! Build phase records
//!
//! The executor records a strict linear sequence of phase records per
//! request. On failure the sequence is truncated at the failing phase, so a
//! result alone is enough to reconstruct which phase failed and how long
//! each prior phase took.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wheelwright_errors::ErrorCode;

/// One named stage of the build pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildPhase {
    Resolve,
    Analyze,
    Provision,
    Execute,
    Validate,
    Publish,
}

impl BuildPhase {
    /// All phases in pipeline order
    pub const ORDER: [Self; 6] = [
        Self::Resolve,
        Self::Analyze,
        Self::Provision,
        Self::Execute,
        Self::Validate,
        Self::Publish,
    ];
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Analyze => "analyze",
            Self::Provision => "provision",
            Self::Execute => "execute",
            Self::Validate => "validate",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Success,
    Failed { code: ErrorCode },
}

/// Timing and outcome of one phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: BuildPhase,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: PhaseOutcome,
}

impl PhaseRecord {
    /// Wall-clock duration of this phase
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished - self.started
    }
}

/// Recorder for the linear phase sequence of one request.
///
/// Phases never overlap and never run backwards; the recorder keeps at most
/// one phase open at a time.
#[derive(Debug, Default)]
pub struct PhaseLog {
    records: Vec<PhaseRecord>,
    open: Option<(BuildPhase, DateTime<Utc>)>,
}

impl PhaseLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the next phase. Any previously open phase must have been closed.
    pub fn begin(&mut self, phase: BuildPhase) {
        debug_assert!(self.open.is_none(), "phase {phase} opened while another is open");
        self.open = Some((phase, Utc::now()));
    }

    /// Close the open phase as successful.
    pub fn complete(&mut self) {
        self.close(PhaseOutcome::Success);
    }

    /// Close the open phase as failed; the sequence is truncated here.
    pub fn fail(&mut self, code: ErrorCode) {
        self.close(PhaseOutcome::Failed { code });
    }

    fn close(&mut self, outcome: PhaseOutcome) {
        if let Some((phase, started)) = self.open.take() {
            self.records.push(PhaseRecord {
                phase,
                started,
                finished: Utc::now(),
                outcome,
            });
        }
    }

    /// Recorded phases so far, in pipeline order
    #[must_use]
    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    /// Consume the log, yielding the recorded sequence
    #[must_use]
    pub fn into_records(mut self) -> Vec<PhaseRecord> {
        // An open phase at teardown means the pipeline aborted mid-phase;
        // close it so the failure stays visible in the sequence.
        if self.open.is_some() {
            self.close(PhaseOutcome::Failed {
                code: ErrorCode::IsolationFailed,
            });
        }
        self.records
    }

    /// The failing phase, if any phase has failed
    #[must_use]
    pub fn failed_phase(&self) -> Option<(BuildPhase, ErrorCode)> {
        self.records.iter().find_map(|r| match r.outcome {
            PhaseOutcome::Failed { code } => Some((r.phase, code)),
            PhaseOutcome::Success => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_linear_sequence() {
        let mut log = PhaseLog::new();
        log.begin(BuildPhase::Resolve);
        log.complete();
        log.begin(BuildPhase::Analyze);
        log.fail(ErrorCode::AnalyzeFailed);

        let records = log.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phase, BuildPhase::Resolve);
        assert_eq!(records[0].outcome, PhaseOutcome::Success);
        assert_eq!(
            records[1].outcome,
            PhaseOutcome::Failed {
                code: ErrorCode::AnalyzeFailed
            }
        );
    }

    #[test]
    fn failed_phase_is_identifiable() {
        let mut log = PhaseLog::new();
        log.begin(BuildPhase::Resolve);
        log.complete();
        log.begin(BuildPhase::Execute);
        log.fail(ErrorCode::BuildTimeout);

        assert_eq!(
            log.failed_phase(),
            Some((BuildPhase::Execute, ErrorCode::BuildTimeout))
        );
    }

    #[test]
    fn timestamps_are_ordered() {
        let mut log = PhaseLog::new();
        log.begin(BuildPhase::Resolve);
        log.complete();
        let records = log.into_records();
        assert!(records[0].finished >= records[0].started);
    }
}
