//! Cancellation handles for spawned timer and feed tasks.

use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Tears down one long-running unit: cancels its token and aborts its task.
///
/// Disposing is idempotent, and dropping a `Disposer` disposes it.
#[derive(Debug)]
pub struct Disposer {
    token: CancellationToken,
    task: Option<AbortHandle>,
    disposed: bool,
}

impl Disposer {
    /// Wrap a spawned task and the token it observes.
    pub fn new(token: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self {
            token,
            task: Some(handle.abort_handle()),
            disposed: false,
        }
    }

    /// A disposer that only cancels a token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            task: None,
            disposed: false,
        }
    }

    /// Cancel and abort the task. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Check if this has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// A group of disposers torn down together, in registration order.
#[derive(Debug, Default)]
pub struct CompositeDisposer {
    children: Vec<Disposer>,
    disposed: bool,
}

impl CompositeDisposer {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a child. A child added after disposal is disposed at once.
    pub fn add(&mut self, mut child: Disposer) {
        if self.disposed {
            child.dispose();
        }
        self.children.push(child);
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for child in &mut self.children {
            child.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Get the number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Drop for CompositeDisposer {
    fn drop(&mut self) {
        self.dispose();
    }
}
