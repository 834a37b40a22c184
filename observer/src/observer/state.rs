//! View model of one observed submission, and the transitions applied to it
//! after every poll cycle.

use crate::client::{
    model::{Submission, SubmissionId, TestCaseResult},
    ApiErr,
};
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No poll cycle has completed yet
    Loading,
    /// The submission is still being judged and polling continues
    Polling,
    /// The submission reached a terminal status; results are final
    Finished,
    /// The backend reports that the submission does not exist
    NotFound,
    /// Polling ran longer than the configured maximum wait
    GaveUp,
    /// The observer was torn down before the submission finished
    Stopped,
}

impl Phase {
    /// Whether no further poll will ever happen in this phase.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Loading | Phase::Polling)
    }
}

/// Everything a view needs to draw one observed submission.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: SubmissionId,
    pub phase: Phase,
    pub submission: Option<Submission>,
    pub results: Arc<Vec<TestCaseResult>>,
    /// Indices of result rows that appeared in the latest growing poll.
    pub highlighted: BTreeSet<usize>,
    /// User-visible message of the last failed poll, cleared by the next
    /// successful one.
    pub error: Option<String>,
    /// Number of poll cycles completed, failed ones included.
    pub polls: u64,
}

impl Snapshot {
    pub fn new(id: SubmissionId) -> Snapshot {
        Snapshot {
            id,
            phase: Phase::Loading,
            submission: None,
            results: Arc::new(Vec::new()),
            highlighted: BTreeSet::new(),
            error: None,
            polls: 0,
        }
    }

    pub fn is_highlighted(&self, idx: usize) -> bool {
        self.highlighted.contains(&idx)
    }
}

pub struct ObserverState {
    snapshot: Snapshot,
    previous_length: usize,
    highlight: Duration,
    highlight_until: Option<Instant>,
}

impl ObserverState {
    pub fn new(id: SubmissionId, highlight: Duration) -> ObserverState {
        ObserverState {
            snapshot: Snapshot::new(id),
            previous_length: 0,
            highlight,
            highlight_until: None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn highlight_deadline(&self) -> Option<Instant> {
        self.highlight_until
    }

    /// Apply the data of one successful poll cycle. Returns whether polling
    /// should continue.
    pub fn apply_poll(
        &mut self,
        submission: Submission,
        results: Vec<TestCaseResult>,
        now: Instant,
    ) -> bool {
        let len = results.len();
        if len > self.previous_length {
            tracing::debug!("{} new result(s)", len - self.previous_length);
            self.snapshot.highlighted = (self.previous_length..len).collect();
            self.highlight_until = Some(now + self.highlight);
        } else if len < self.previous_length {
            tracing::warn!(
                "Result list shrank from {} to {} entries",
                self.previous_length,
                len
            );
        }
        self.previous_length = len;

        let keep_polling = !submission.status.is_terminal();
        if !keep_polling {
            tracing::info!(status = %submission.status, "Submission finished");
        }

        self.snapshot.results = Arc::new(results);
        self.snapshot.submission = Some(submission);
        self.snapshot.error = None;
        self.snapshot.polls += 1;
        self.snapshot.phase = if keep_polling {
            Phase::Polling
        } else {
            Phase::Finished
        };
        keep_polling
    }

    /// Record a failed poll cycle. Data from earlier polls is kept. Returns
    /// whether polling should continue.
    pub fn apply_error(&mut self, err: &ApiErr) -> bool {
        self.snapshot.polls += 1;
        self.snapshot.error = Some(err.user_message());
        if err.is_not_found() {
            self.snapshot.phase = Phase::NotFound;
            return false;
        }
        if self.snapshot.phase == Phase::Loading {
            self.snapshot.phase = Phase::Polling;
        }
        true
    }

    pub fn give_up(&mut self, waited: Duration) {
        tracing::warn!(
            "Submission {} still not finished after {}s, stopped polling",
            self.snapshot.id,
            waited.as_secs()
        );
        self.snapshot.phase = Phase::GaveUp;
        self.snapshot.error = Some(format!(
            "Still judging after {}s; the judge may be stuck. Check back later.",
            waited.as_secs()
        ));
    }

    /// Drop the highlight once its deadline passed. Returns whether the
    /// snapshot changed.
    pub fn expire_highlight(&mut self, now: Instant) -> bool {
        match self.highlight_until {
            Some(until) if now >= until => {
                self.highlight_until = None;
                self.snapshot.highlighted.clear();
                true
            }
            _ => false,
        }
    }
}
