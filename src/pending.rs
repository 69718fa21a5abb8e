use crate::{Error, Message, Slot};
use crate::channel::{Channel, ReplyCallback};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use std::{future, pin, task};
use futures_channel::oneshot;

#[derive(Debug, PartialEq, Copy, Clone)]
enum CallState {
    Pending,
    Completed,
    Cancelled,
}

struct PendingInner {
    state: Mutex<(CallState, Option<Slot>)>,
}

/// A weak handle to an in-flight asynchronous method call.
///
/// The handle can be used to query whether the call is still pending, and to
/// cancel it. The reply handler of the call is invoked exactly once in total:
/// with the reply, with an error, with a timeout error - or never, if the
/// call is cancelled first. Cancelling after completion is a no-op.
#[derive(Clone)]
pub struct PendingAsyncCall {
    inner: Weak<PendingInner>,
}

impl PendingAsyncCall {
    /// Returns true if the call is still in flight, i e its handler has
    /// neither run nor been cancelled.
    pub fn is_pending(&self) -> bool {
        match self.inner.upgrade() {
            Some(c) => c.state.lock().unwrap().0 == CallState::Pending,
            None => false,
        }
    }

    /// Cancels the call.
    ///
    /// After cancel returns, the reply handler is guaranteed not to run.
    /// Cancelling a call that has already completed or been cancelled does
    /// nothing.
    pub fn cancel(&self) {
        if let Some(c) = self.inner.upgrade() {
            let slot = {
                let mut g = c.state.lock().unwrap();
                if g.0 != CallState::Pending { return };
                g.0 = CallState::Cancelled;
                g.1.take()
            };
            // Dropping the slot unregisters the reply callback from the
            // connection, outside our own lock.
            drop(slot);
        }
    }
}

// Sends msg and wires the exactly-once guarantee around the user callback.
pub (crate) fn send_pending_call<C, F>(channel: &C, msg: Message, timeout: Duration, f: F)
    -> Result<PendingAsyncCall, Error>
where C: Channel + ?Sized, F: FnOnce(Result<Message, Error>) + Send + 'static {
    let inner = Arc::new(PendingInner { state: Mutex::new((CallState::Pending, None)) });
    let handle = PendingAsyncCall { inner: Arc::downgrade(&inner) };

    // The connection owns this closure (and with it the strong reference)
    // until the reply arrives or the slot is released.
    let inner2 = inner.clone();
    let wrapper: ReplyCallback = Box::new(move |r| {
        let run = {
            let mut g = inner2.state.lock().unwrap();
            if g.0 != CallState::Pending { false } else {
                g.0 = CallState::Completed;
                // The registration was consumed by this very delivery.
                if let Some(s) = g.1.take() { s.defuse() };
                true
            }
        };
        if run { f(r) }
    });

    let slot = channel.send_with_reply(msg, wrapper, timeout)?;
    inner.state.lock().unwrap().1 = Some(slot);
    Ok(handle)
}

/// Future method reply, used while waiting for an asynchronous method call
/// to resolve.
///
/// Resolves to `Ok(value)` on a successful reply, or to `Err` carrying the
/// remote error, a timeout, or a deserialization failure.
pub struct MethodReply<T> {
    recv: oneshot::Receiver<Result<T, Error>>,
    call: Option<PendingAsyncCall>,
}

impl<T> MethodReply<T> {
    pub (crate) fn new(recv: oneshot::Receiver<Result<T, Error>>, call: Option<PendingAsyncCall>) -> Self {
        MethodReply { recv, call }
    }

    /// The in-flight call behind this future, for cancellation.
    pub fn pending_call(&self) -> Option<&PendingAsyncCall> { self.call.as_ref() }
}

impl<T> future::Future for MethodReply<T> {
    type Output = Result<T, Error>;
    fn poll(mut self: pin::Pin<&mut Self>, ctx: &mut task::Context) -> task::Poll<Self::Output> {
        pin::Pin::new(&mut self.recv).poll(ctx).map(|r| {
            r.unwrap_or_else(|_| Err(Error::disconnected("Reply channel closed before completion")))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dangling_handle_is_not_pending() {
        let inner = Arc::new(PendingInner { state: Mutex::new((CallState::Pending, None)) });
        let handle = PendingAsyncCall { inner: Arc::downgrade(&inner) };
        assert!(handle.is_pending());
        drop(inner);
        assert!(!handle.is_pending());
        handle.cancel(); // no-op
    }
}
