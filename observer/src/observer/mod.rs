//! Observing a submission while the judge works through its test cases.
//!
//! One observer owns one task. The task polls submission metadata and the
//! result list together, applies both to an [`ObserverState`] in a single
//! step, and publishes a [`Snapshot`] after every change. Polling stops once
//! the submission is terminal; the task lingers only until the last
//! highlight expires.

mod state;

pub use self::state::*;
use crate::{
    client::{
        config::PollConfig,
        model::{Submission, SubmissionId, TestCaseResult},
        ApiErr, JudgeApi,
    },
    prelude::*,
};
use derive_builder::Builder;
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::info_span;
use tracing_futures::Instrument;

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ObserveOptions {
    /// Delay between the start of two poll cycles.
    #[builder(default = "Duration::from_millis(500)")]
    pub interval: Duration,
    /// How long newly appended rows stay highlighted.
    #[builder(default = "Duration::from_millis(2000)")]
    pub highlight: Duration,
    /// Stop polling a submission that is still not terminal after this long.
    #[builder(default = "Some(Duration::from_secs(30 * 60))")]
    pub max_wait: Option<Duration>,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        ObserveOptions::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for ObserveOptions {
    fn from(cfg: &PollConfig) -> Self {
        ObserveOptions {
            interval: cfg.interval(),
            highlight: cfg.highlight(),
            max_wait: cfg.max_wait(),
        }
    }
}

/// The publishing end of the snapshot channel. Taking it out of the slot
/// guarantees no snapshot is published afterwards.
type SnapshotSlot = Arc<Mutex<Option<watch::Sender<Snapshot>>>>;

fn publish(slot: &SnapshotSlot, snapshot: &Snapshot) -> bool {
    let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_ref() {
        Some(send) => {
            send.send_replace(snapshot.clone());
            true
        }
        None => false,
    }
}

pub struct SubmissionObserver {
    id: SubmissionId,
    snapshots: watch::Receiver<Snapshot>,
    slot: SnapshotSlot,
    cancel: CancellationToken,
}

impl SubmissionObserver {
    /// Start observing `id`. The first poll cycle is issued immediately;
    /// this function itself never waits on the network.
    pub fn start_observing(
        api: Arc<dyn JudgeApi>,
        id: SubmissionId,
        opts: ObserveOptions,
    ) -> SubmissionObserver {
        let (send, snapshots) = watch::channel(Snapshot::new(id.clone()));
        let slot = Arc::new(Mutex::new(Some(send)));
        let cancel = CancellationToken::new();

        tokio::spawn(
            observe(
                api,
                id.clone(),
                opts,
                slot.clone(),
                cancel.clone(),
            )
            .instrument(info_span!("observe", submission = %id)),
        );

        SubmissionObserver {
            id,
            snapshots,
            slot,
            cancel,
        }
    }

    pub fn id(&self) -> &SubmissionId {
        &self.id
    }

    /// A receiver of snapshots. The channel closes once the observer will
    /// never publish again.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop polling and drop every pending timer. Safe to call any number of
    /// times; nothing is published after the first call returns.
    pub fn stop_observing(&self) {
        self.cancel.cancel();
        let send = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(send) = send {
            tracing::debug!(submission = %self.id, "Observer torn down");
            send.send_if_modified(|s| {
                if s.phase.is_terminal() {
                    false
                } else {
                    s.phase = Phase::Stopped;
                    true
                }
            });
        }
    }
}

impl Drop for SubmissionObserver {
    fn drop(&mut self) {
        self.stop_observing();
    }
}

async fn poll_once(
    api: &dyn JudgeApi,
    id: &SubmissionId,
) -> Result<(Submission, Vec<TestCaseResult>), ApiErr> {
    futures::try_join!(api.fetch_submission(id), api.fetch_results(id))
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}

async fn observe(
    api: Arc<dyn JudgeApi>,
    id: SubmissionId,
    opts: ObserveOptions,
    slot: SnapshotSlot,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut state = ObserverState::new(id.clone(), opts.highlight);

    // The first tick completes immediately, which is the initial fetch.
    let mut ticker = tokio::time::interval(opts.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polling = true;
    tracing::info!("Start observing");

    loop {
        let highlight_deadline = state.highlight_deadline();
        if !polling && highlight_deadline.is_none() {
            break;
        }

        let changed = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = sleep_until_some(highlight_deadline) => {
                state.expire_highlight(Instant::now())
            }

            _ = ticker.tick(), if polling => {
                if state.snapshot().polls > 0 {
                    if let Some(max_wait) = opts.max_wait {
                        let waited = started.elapsed();
                        if waited >= max_wait {
                            state.give_up(waited);
                            polling = false;
                            if !publish(&slot, state.snapshot()) {
                                break;
                            }
                            continue;
                        }
                    }
                }

                tracing::trace!("Polling");
                let res = match poll_once(&*api, &id).with_cancel(cancel.cancelled()).await {
                    Some(res) => res,
                    None => break,
                };
                polling = match res {
                    Ok((submission, results)) => {
                        state.apply_poll(submission, results, Instant::now())
                    }
                    Err(e) => {
                        tracing::warn!("Poll failed: {}", e);
                        state.apply_error(&e)
                    }
                };
                true
            }
        };

        if changed && !publish(&slot, state.snapshot()) {
            break;
        }
    }

    // Closes the channel unless teardown already did
    slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    tracing::info!(phase = ?state.snapshot().phase, "Stop observing");
}

#[cfg(test)]
mod tests;
