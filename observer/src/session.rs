//! Session state shared between views, with an explicit change channel.
//!
//! Whoever changes the session publishes a [`SessionEvent`]; every subscriber
//! reacts by re-fetching whatever depends on who is logged in.

use crate::{client::JudgeApi, prelude::*};
use arc_swap::ArcSwapOption;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing_futures::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
}

pub struct SessionStore {
    current: ArcSwapOption<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(initial: Option<String>) -> SessionStore {
        let (events, _) = broadcast::channel(16);
        SessionStore {
            current: ArcSwapOption::new(initial.map(Arc::new)),
            events,
        }
    }

    pub fn current(&self) -> Option<Arc<String>> {
        self.current.load_full()
    }

    /// Replace the current session. Subscribers are notified only if the
    /// value actually changed; returns whether it did.
    pub fn replace(&self, session: Option<String>) -> bool {
        let new = session.map(Arc::new);
        let old = self.current.swap(new.clone());
        if old.as_deref() == new.as_deref() {
            return false;
        }
        let event = if new.is_some() {
            SessionEvent::LoggedIn
        } else {
            SessionEvent::LoggedOut
        };
        tracing::debug!("Session changed: {:?}", event);
        // No subscribers is fine
        let _ = self.events.send(event);
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// The set of problems solved by the current session, kept up to date by
/// re-fetching on every session change.
pub struct SolvedSet {
    solved: watch::Receiver<Arc<HashSet<i64>>>,
    cancel: CancellationToken,
}

impl SolvedSet {
    pub fn follow(api: Arc<dyn JudgeApi>, store: &SessionStore) -> SolvedSet {
        let (send, solved) = watch::channel(Arc::new(HashSet::new()));
        let cancel = CancellationToken::new();
        let mut events = store.subscribe();

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                loop {
                    let fetched = match api.solved_problems().await {
                        Ok(ids) => ids.into_iter().collect(),
                        Err(e) => {
                            tracing::debug!("Failed to load solved problems: {}", e);
                            HashSet::new()
                        }
                    };
                    if send.send(Arc::new(fetched)).is_err() {
                        break;
                    }
                    match events.recv().with_cancel(cancel.cancelled()).await {
                        None => break,
                        Some(Ok(ev)) => tracing::debug!("Re-fetching solved problems after {:?}", ev),
                        Some(Err(broadcast::error::RecvError::Lagged(n))) => {
                            tracing::debug!("Skipped {} session events", n)
                        }
                        Some(Err(broadcast::error::RecvError::Closed)) => break,
                    }
                }
            }
            .instrument(tracing::debug_span!("solved_set"))
        });

        SolvedSet { solved, cancel }
    }

    pub fn current(&self) -> Arc<HashSet<i64>> {
        self.solved.borrow().clone()
    }

    /// Wait until the set is refreshed.
    pub async fn changed(&mut self) -> bool {
        self.solved.changed().await.is_ok()
    }
}

impl Drop for SolvedSet {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
