// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Per-call progress reporting and cancellation.
//!
//! Every decode owns a [`Progress`]: a step counter, an optional bounded
//! channel to the front-end, and a [`CancelToken`]. Nothing here is
//! process-global, so concurrent decodes never see each other's state.
//!
//! Events are sent with `try_send`: when the consumer falls behind, events
//! are dropped rather than stalling extraction. Every event is also emitted
//! through `tracing`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use super::error::StegoError;

/// Default channel depth for [`Progress::channel`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// One human-readable progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub step: u32,
    pub total: u32,
    pub message: String,
}

/// Shared flag used to request cancellation of a running call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Honoured at the next stage boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress state for one call.
#[derive(Debug, Default)]
pub struct Progress {
    sender: Option<SyncSender<ProgressEvent>>,
    cancel: CancelToken,
    step: u32,
    total: u32,
    dropped: u64,
}

impl Progress {
    /// Silent progress: tracing only, no channel, never cancelled externally.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Progress with a bounded channel; returns the receiving half.
    pub fn channel(capacity: usize) -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (Self { sender: Some(tx), ..Self::default() }, rx)
    }

    /// Attach a cancellation token shared with the caller.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Reset the step counter and set the total step count.
    pub fn init(&mut self, total: u32) {
        self.step = 0;
        self.total = total;
    }

    /// Advance by one step and report `message`.
    ///
    /// Step is capped at total so a front-end never sees values like "7/5".
    pub fn advance(&mut self, message: impl Into<String>) {
        if self.total == 0 || self.step < self.total {
            self.step += 1;
        }
        self.emit(message.into());
    }

    /// Report a line without advancing the step counter.
    pub fn log(&mut self, message: impl Into<String>) {
        self.emit(message.into());
    }

    /// Mark progress as complete (step = total) and report `message`.
    pub fn finish(&mut self, message: impl Into<String>) {
        self.step = self.total;
        self.emit(message.into());
    }

    /// Read the current (step, total) progress.
    pub fn get(&self) -> (u32, u32) {
        (self.step, self.total)
    }

    /// Number of events dropped because the consumer was slow.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Check for cancellation and return an error if requested.
    ///
    /// Called at stage boundaries in the pipeline, including right before
    /// the recovered file is committed.
    pub fn check_cancelled(&self) -> Result<(), StegoError> {
        if self.cancel.is_cancelled() {
            Err(StegoError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit(&mut self, message: String) {
        tracing::info!(step = self.step, total = self.total, "{message}");
        let Some(tx) = &self.sender else { return };
        let event = ProgressEvent { step: self.step, total: self.total, message };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.dropped += 1,
            // Receiver gone: the front-end stopped listening, keep decoding.
            Err(TrySendError::Disconnected(_)) => self.sender = None,
        }
    }
}
