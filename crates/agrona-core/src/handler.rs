//! Collaborator traits consumed by the agent runtime, queues, and broadcast receivers.
//!
//! Implemented here (rather than left as bare trait bounds scattered through
//! `agent`/`queue`/`broadcast`) because nothing else in this workspace supplies
//! them, but they carry no logging, I/O, or registry behavior of their own —
//! callers provide the concrete policy.

use std::sync::atomic::{AtomicI64, Ordering};

/// Receives non-fatal errors from an [`crate::agent::AgentRunner`] or
/// [`crate::agent::AgentInvoker`].
///
/// Implementors decide what to do with the error (print it, count it, forward
/// it); the runtime only guarantees it is called once per caught error and
/// that `do_work` is never re-entered while the call is in progress.
pub trait ErrorHandler: Send + Sync {
    /// Called with a non-terminal error caught around `doWork`/`onStart`/`onClose`.
    fn on_error(&self, error: &(dyn std::error::Error + 'static));
}

/// An [`ErrorHandler`] that does nothing; the default for runners/invokers that
/// do not care to observe errors beyond the error counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpErrorHandler;

impl ErrorHandler for NoOpErrorHandler {
    fn on_error(&self, _error: &(dyn std::error::Error + 'static)) {}
}

/// A monotonically incrementing counter, optionally handed to an `AgentRunner`
/// to track the number of errors observed.
///
/// This is intentionally minimal: just a shared atomic, not a full
/// status-counter registry.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicI64,
}

impl AtomicCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: AtomicI64::new(0),
        }
    }

    /// Increments the counter by one, returning the previous value.
    pub fn increment(&self) -> i64 {
        self.value.fetch_add(1, Ordering::AcqRel)
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }
}

/// Handles one decoded message pulled from a broadcast receiver's controlled
/// read loop (see `broadcast::Receiver::receive_handled`).
///
/// `type_id` is the caller-defined message discriminant, `offset`/`length`
/// locate the payload within `buffer`.
pub trait MessageHandler<'a> {
    /// Process one message. The payload is `buffer[offset..offset + length]`.
    fn on_message(&mut self, type_id: i32, buffer: &'a [u8], offset: usize, length: usize);
}

/// The action a [`ControlledMessageHandler`] requests after handling one message,
/// controlling how far a controlled read loop advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlledAction {
    /// Stop reading immediately; this message is not considered consumed.
    Abort,
    /// Stop reading after this message; this message is considered consumed.
    Break,
    /// Consume this message and continue to the next.
    Continue,
    /// Consume this message, but do not advance the read position past it
    /// (useful for peeking without losing a message on the next call).
    Commit,
}

/// Like [`MessageHandler`], but the handler controls whether the read loop
/// continues, stops, or rewinds (see `broadcast::Receiver::receive_controlled`).
pub trait ControlledMessageHandler<'a> {
    /// Process one message and report how the caller's read loop should proceed.
    fn on_message(
        &mut self,
        type_id: i32,
        buffer: &'a [u8],
        offset: usize,
        length: usize,
    ) -> ControlledAction;
}

impl<F> ErrorHandler for F
where
    F: Fn(&(dyn std::error::Error + 'static)) + Send + Sync,
{
    fn on_error(&self, error: &(dyn std::error::Error + 'static)) {
        self(error);
    }
}
