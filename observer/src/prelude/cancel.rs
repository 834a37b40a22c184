use futures::Future;
use std::{pin::Pin, task::Poll};

/// A future that resolves to `None` as soon as its cancellation future
/// completes, or to `Some(output)` if the inner future finishes first.
///
/// Cancellation is checked before the inner future on every poll, so a
/// future that is cancelled and ready at the same time yields `None`.
pub struct WithCancel<F, C> {
    fut: Pin<Box<F>>,
    cancel: Pin<Box<C>>,
}

impl<F, C> Future for WithCancel<F, C>
where
    F: Future,
    C: Future<Output = ()>,
{
    type Output = Option<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        if self.cancel.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }
        self.fut.as_mut().poll(cx).map(Some)
    }
}

pub trait FutureCancelExt: Future + Sized {
    /// Race this future against `cancel`, see [`WithCancel`].
    fn with_cancel<C>(self, cancel: C) -> WithCancel<Self, C>
    where
        C: Future<Output = ()>,
    {
        WithCancel {
            fut: Box::pin(self),
            cancel: Box::pin(cancel),
        }
    }
}

impl<F: Future> FutureCancelExt for F {}
