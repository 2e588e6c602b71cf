// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::warn;

/// State of a one-shot asynchronous operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsyncState {
    /// The operation has not reached a terminal state yet.
    NotFinished,
    /// The operation finished successfully.
    Ok,
    /// The operation failed, an error message may be available.
    Error,
}

#[derive(Debug)]
struct Inner<T> {
    state: AsyncState,
    error_message: Option<String>,
    value: Option<T>,
}

/// A shared one-shot result cell.
///
/// An `AsyncResult` is handed out by an asynchronous operation and is
/// completed exactly once by the worker executing it. The owner observes
/// completion either by awaiting [`wait_for_finished`](Self::wait_for_finished)
/// or through the watch subscription returned by [`done`](Self::done),
/// which delivers the terminal state on the owner's own task.
///
/// `AsyncResult<()>` is the value-less form; `AsyncResult<T>` carries a
/// result value that is readable only once the terminal state is
/// [`AsyncState::Ok`].
///
/// Completing an already completed cell is a usage error: it is logged
/// and ignored.
#[derive(Debug)]
pub struct AsyncResult<T = ()> {
    inner: Arc<Mutex<Inner<T>>>,
    done_tx: Arc<watch::Sender<AsyncState>>,
    done_rx: watch::Receiver<AsyncState>,
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        AsyncResult {
            inner: self.inner.clone(),
            done_tx: self.done_tx.clone(),
            done_rx: self.done_rx.clone(),
        }
    }
}

impl<T> Default for AsyncResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AsyncResult<T> {
    /// Creates a result cell in the [`AsyncState::NotFinished`] state.
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(AsyncState::NotFinished);
        AsyncResult {
            inner: Arc::new(Mutex::new(Inner {
                state: AsyncState::NotFinished,
                error_message: None,
                value: None,
            })),
            done_tx: Arc::new(done_tx),
            done_rx,
        }
    }

    /// The current state of the operation. Safe to call from any task.
    pub fn result(&self) -> AsyncState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// The error message of a failed operation, if one was provided.
    pub fn error_message(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .error_message
            .clone()
    }

    /// Completes the cell with the given terminal state.
    ///
    /// Completing twice or "completing" with
    /// [`AsyncState::NotFinished`] is a usage error that is logged and
    /// ignored.
    pub fn set_result(&self, state: AsyncState, error_message: Option<String>) {
        if state == AsyncState::NotFinished {
            warn!("set_result called with the non-terminal state NotFinished, ignored");
            return;
        }
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.state != AsyncState::NotFinished {
                warn!("set_result called on an already finished result, ignored");
                return;
            }
            inner.state = state;
            inner.error_message = error_message;
        }
        self.done_tx.send_replace(state);
    }

    /// Completes the cell as [`AsyncState::Ok`] carrying `value`.
    pub fn set_result_value(&self, value: T) {
        {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.state != AsyncState::NotFinished {
                warn!("set_result_value called on an already finished result, ignored");
                return;
            }
            inner.state = AsyncState::Ok;
            inner.value = Some(value);
        }
        self.done_tx.send_replace(AsyncState::Ok);
    }

    /// Subscribes to the completion of this result.
    ///
    /// The returned watch receiver observes the terminal state once it is
    /// set, also when the subscription happens after completion.
    pub fn done(&self) -> watch::Receiver<AsyncState> {
        self.done_rx.clone()
    }

    /// Waits until the operation reaches a terminal state and returns it.
    pub async fn wait_for_finished(&self) -> AsyncState {
        let mut done = self.done();
        loop {
            let state = *done.borrow_and_update();
            if state != AsyncState::NotFinished {
                return state;
            }
            if done.changed().await.is_err() {
                // all setters gone, the cell can never finish
                return *done.borrow();
            }
        }
    }
}

impl<T: Clone> AsyncResult<T> {
    /// The value of a successful operation.
    ///
    /// `None` unless the terminal state is [`AsyncState::Ok`].
    pub fn value(&self) -> Option<T> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state == AsyncState::Ok {
            inner.value.clone()
        } else {
            None
        }
    }
}
