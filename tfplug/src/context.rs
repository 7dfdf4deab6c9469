//! Context implementation for deadlines and cancellation
//!
//! A Context is threaded through every resource operation and through the
//! acceptance-test driver. Child contexts observe their parent's
//! cancellation, so cancelling a test case stops every in-flight operation.

use crate::error::{Result, TfplugError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries a cancellation signal and an optional deadline
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    timeout: Option<Duration>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                timeout: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a child context that is cancelled when `timeout` elapses or
    /// when this context is cancelled, whichever happens first. The child
    /// never outlives its parent's deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent) = self.inner.deadline {
            deadline = deadline.min(parent);
        }
        self.child(Some(deadline), Some(timeout))
    }

    /// Derive a child context that only observes the parent's cancellation
    pub fn child_context(&self) -> Self {
        self.child(self.inner.deadline, self.inner.timeout)
    }

    fn child(&self, deadline: Option<Instant>, timeout: Option<Duration>) -> Self {
        let (done_tx, done_rx) = watch::channel(*self.inner.done.borrow());

        let mut parent_done = self.inner.done.clone();
        let child_tx = done_tx.clone();
        tokio::spawn(async move {
            let parent_cancelled = async {
                loop {
                    if *parent_done.borrow_and_update() {
                        return;
                    }
                    if parent_done.changed().await.is_err() {
                        // Parent dropped without cancelling; only the deadline remains
                        std::future::pending::<()>().await;
                    }
                }
            };
            let expired = async {
                match deadline {
                    Some(deadline) => time::sleep_until(deadline.into()).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = parent_cancelled => {}
                _ = expired => {}
                _ = child_tx.closed() => return,
            }
            let _ = child_tx.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline,
                timeout,
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, None when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns a channel that flips to true when work done on behalf of
    /// this context should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        let mut done = self.done();
        loop {
            if *done.borrow_and_update() {
                return;
            }
            if done.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Ok while the context is live; the matching error once it is done
    pub fn err_if_done(&self) -> Result<()> {
        if !self.is_cancelled() {
            return Ok(());
        }
        match (self.inner.deadline, self.inner.timeout) {
            (Some(deadline), Some(timeout)) if Instant::now() >= deadline => {
                Err(TfplugError::DeadlineExceeded(timeout))
            }
            _ => Err(TfplugError::Cancelled),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
        assert!(matches!(
            ctx.err_if_done(),
            Err(TfplugError::DeadlineExceeded(_))
        ));
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());
        assert!(ctx.err_if_done().is_ok());

        ctx.cancel();

        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.err_if_done(), Err(TfplugError::Cancelled)));
    }

    #[tokio::test]
    async fn child_observes_parent_cancellation() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("child should be cancelled with its parent");
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn child_deadline_never_exceeds_parent() {
        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(3600));

        assert!(child.remaining().unwrap() <= Duration::from_secs(1));
        assert!(Context::new().remaining().is_none());
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_live() {
        let parent = Context::new();
        let child = parent.child_context();

        child.cancel();
        sleep(Duration::from_millis(10)).await;

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
