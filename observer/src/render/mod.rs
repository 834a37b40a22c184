//! Rendering of test case payloads.
//!
//! Short payloads are laid out inline. Large ones first publish
//! [`PayloadState::Loading`], then are laid out on the blocking pool after a
//! short settle delay, so whoever displays the state always gets to show the
//! loading indicator before the expensive work starts.

mod clipboard;
mod diff;

pub use self::{clipboard::*, diff::*};
use crate::{client::config::RenderConfig, prelude::*};
use std::{
    fmt::Write,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing_futures::Instrument;

/// Shown in place of a payload that is absent or empty.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub text: String,
    pub lines: usize,
}

impl RenderedText {
    pub fn placeholder() -> RenderedText {
        RenderedText {
            text: PLACEHOLDER.to_owned(),
            lines: 1,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.text == PLACEHOLDER && self.lines == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadState {
    Idle,
    Loading,
    Rendered(Arc<RenderedText>),
}

/// Lay out `text` for display: tabs are expanded to `tab_width` columns,
/// other control characters are shown in caret notation and every line
/// gets a right-aligned line number.
pub fn render_text(text: &str, tab_width: usize) -> RenderedText {
    let tab_width = tab_width.max(1);
    let lines: Vec<&str> = text
        .strip_suffix('\n')
        .unwrap_or(text)
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let gutter = lines.len().to_string().len();

    let mut out = String::with_capacity(text.len() + lines.len() * (gutter + 4));
    for (idx, line) in lines.iter().enumerate() {
        let _ = write!(out, "{:>width$} | ", idx + 1, width = gutter);
        let mut col = 0;
        for ch in line.chars() {
            match ch {
                '\t' => {
                    let pad = tab_width - col % tab_width;
                    out.extend(std::iter::repeat(' ').take(pad));
                    col += pad;
                }
                c if c.is_control() && (c as u32) < 0x80 => {
                    out.push('^');
                    out.push(((c as u8) ^ 0x40) as char);
                    col += 2;
                }
                c => {
                    out.push(c);
                    col += 1;
                }
            }
        }
        out.push('\n');
    }

    RenderedText {
        text: out,
        lines: lines.len(),
    }
}

fn same_blob(a: &Option<Arc<str>>, b: &Option<Arc<str>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// The publishing side shared by the renderers: a state channel, and the
/// generation of the content it currently stands for.
struct Slot {
    generation: Arc<AtomicU64>,
    send: Arc<watch::Sender<PayloadState>>,
    recv: watch::Receiver<PayloadState>,
    pending: Option<CancellationToken>,
}

impl Slot {
    fn new() -> Slot {
        let (send, recv) = watch::channel(PayloadState::Idle);
        Slot {
            generation: Arc::new(AtomicU64::new(0)),
            send: Arc::new(send),
            recv,
            pending: None,
        }
    }

    fn state(&self) -> PayloadState {
        self.recv.borrow().clone()
    }

    /// Abandon whatever is pending and return the generation of the next
    /// content.
    fn next(&mut self) -> u64 {
        if let Some(cancel) = self.pending.take() {
            cancel.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn show(&mut self, rendered: RenderedText) {
        self.send
            .send_replace(PayloadState::Rendered(Arc::new(rendered)));
    }

    /// Publish [`PayloadState::Loading`] now and `layout`'s result after the
    /// settle delay, unless newer content arrives first.
    fn show_later<F>(&mut self, generation: u64, delay: Duration, layout: F)
    where
        F: FnOnce() -> RenderedText + Send + 'static,
    {
        self.send.send_replace(PayloadState::Loading);
        let cancel = CancellationToken::new();
        self.pending = Some(cancel.clone());
        tokio::spawn(
            render_later(
                layout,
                delay,
                generation,
                self.generation.clone(),
                self.send.clone(),
                cancel,
            )
            .instrument(tracing::debug_span!("render", generation)),
        );
    }

    async fn rendered(&self) -> Option<Arc<RenderedText>> {
        let mut recv = self.recv.clone();
        loop {
            if let PayloadState::Rendered(r) = &*recv.borrow_and_update() {
                return Some(r.clone());
            }
            recv.changed().await.ok()?;
        }
    }

    fn teardown(&mut self) {
        self.next();
        self.send.send_replace(PayloadState::Idle);
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(cancel) = self.pending.take() {
            cancel.cancel();
        }
    }
}

/// Renders one payload slot, e.g. the expected output of the expanded case.
pub struct PayloadRenderer {
    cfg: RenderConfig,
    blob: Option<Arc<str>>,
    /// Whether the current blob is at or above the defer threshold
    large: bool,
    slot: Slot,
}

impl PayloadRenderer {
    pub fn new(cfg: RenderConfig) -> PayloadRenderer {
        PayloadRenderer {
            cfg,
            blob: None,
            large: false,
            slot: Slot::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PayloadState> {
        self.slot.recv.clone()
    }

    pub fn state(&self) -> PayloadState {
        self.slot.state()
    }

    /// The full, original blob. Copying always uses this, never the
    /// rendered text.
    pub fn blob(&self) -> Option<&Arc<str>> {
        self.blob.as_ref()
    }

    fn is_large(&self, blob: &str) -> bool {
        blob.len() >= self.cfg.defer_threshold
            && blob.chars().count() >= self.cfg.defer_threshold
    }

    /// Switch to a new blob. Setting the blob that is already shown does
    /// nothing. Previous content is never kept across a switch: the state
    /// is reset before this returns.
    pub fn set_blob(&mut self, blob: Option<Arc<str>>) {
        if same_blob(&self.blob, &blob) && self.state() != PayloadState::Idle {
            return;
        }
        let generation = self.slot.next();
        let was_large = self.large;
        self.blob = blob.clone();

        let blob = match blob.filter(|b| !b.is_empty()) {
            Some(b) => b,
            None => {
                self.large = false;
                self.slot.show(RenderedText::placeholder());
                return;
            }
        };

        // Leaving a large payload shows the loading state even if the next
        // one is short.
        self.large = self.is_large(&blob);
        if !(was_large || self.large) {
            self.slot.show(render_text(&blob, self.cfg.tab_width));
            return;
        }

        tracing::debug!(
            "Deferring layout of {} byte payload (generation {})",
            blob.len(),
            generation
        );
        let tab_width = self.cfg.tab_width;
        self.slot
            .show_later(generation, self.cfg.settle_delay(), move || {
                render_text(&blob, tab_width)
            });
    }

    /// Wait until the current blob is rendered.
    pub async fn rendered(&self) -> Option<Arc<RenderedText>> {
        self.slot.rendered().await
    }

    /// Drop any pending render and go back to idle.
    pub fn teardown(&mut self) {
        self.blob = None;
        self.large = false;
        self.slot.teardown();
    }
}

/// Actual and expected output of one test case.
pub type Outputs = (Arc<str>, Arc<str>);

fn same_outputs(a: &Option<Outputs>, b: &Option<Outputs>) -> bool {
    match (a, b) {
        (Some((a1, e1)), Some((a2, e2))) => Arc::ptr_eq(a1, a2) && Arc::ptr_eq(e1, e2),
        (None, None) => true,
        _ => false,
    }
}

/// Renders the diff of a test case's actual output against its expected
/// output. Small diffs are inline; diffs of large payloads or large
/// differing regions go through the same loading gate as large payloads.
pub struct DiffRenderer {
    cfg: RenderConfig,
    outputs: Option<Outputs>,
    large: bool,
    slot: Slot,
}

impl DiffRenderer {
    pub fn new(cfg: RenderConfig) -> DiffRenderer {
        DiffRenderer {
            cfg,
            outputs: None,
            large: false,
            slot: Slot::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PayloadState> {
        self.slot.recv.clone()
    }

    pub fn state(&self) -> PayloadState {
        self.slot.state()
    }

    pub fn outputs(&self) -> Option<&Outputs> {
        self.outputs.as_ref()
    }

    fn is_large(&self, actual: &str, expected: &str) -> bool {
        actual.len() >= self.cfg.defer_threshold
            || expected.len() >= self.cfg.defer_threshold
            || diff_cells(actual, expected) > INLINE_DIFF_CELLS
    }

    /// Switch to the outputs of another case. `None` shows the placeholder,
    /// as does a pair of outputs that do not differ.
    pub fn set_outputs(&mut self, outputs: Option<Outputs>) {
        if same_outputs(&self.outputs, &outputs) && self.state() != PayloadState::Idle {
            return;
        }
        let generation = self.slot.next();
        let was_large = self.large;
        self.outputs = outputs.clone();

        let (actual, expected) = match outputs {
            Some(outputs) => outputs,
            None => {
                self.large = false;
                self.slot.show(RenderedText::placeholder());
                return;
            }
        };

        self.large = self.is_large(&actual, &expected);
        if !(was_large || self.large) {
            self.slot.show(render_diff(&actual, &expected));
            return;
        }

        tracing::debug!(
            "Deferring diff of {} and {} byte outputs (generation {})",
            actual.len(),
            expected.len(),
            generation
        );
        self.slot
            .show_later(generation, self.cfg.settle_delay(), move || {
                render_diff(&actual, &expected)
            });
    }

    pub async fn rendered(&self) -> Option<Arc<RenderedText>> {
        self.slot.rendered().await
    }

    pub fn teardown(&mut self) {
        self.outputs = None;
        self.large = false;
        self.slot.teardown();
    }
}

async fn render_later<F>(
    layout: F,
    delay: Duration,
    generation: u64,
    latest: Arc<AtomicU64>,
    send: Arc<watch::Sender<PayloadState>>,
    cancel: CancellationToken,
) where
    F: FnOnce() -> RenderedText + Send + 'static,
{
    if tokio::time::sleep(delay)
        .with_cancel(cancel.cancelled())
        .await
        .is_none()
    {
        return;
    }

    let task = tokio::task::spawn_blocking(layout);
    let rendered = match task.with_cancel(cancel.cancelled()).await {
        Some(Ok(r)) => Arc::new(r),
        Some(Err(e)) => {
            tracing::warn!("Payload layout failed: {}", e);
            return;
        }
        None => return,
    };

    // Checked under the channel lock, so newer content always wins
    let published = send.send_if_modified(|state| {
        if latest.load(Ordering::SeqCst) != generation {
            return false;
        }
        *state = PayloadState::Rendered(rendered);
        true
    });
    if !published {
        tracing::debug!("Dropped stale render");
    }
}
