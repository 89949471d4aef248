//! One-shot completion signals for asynchronous phases
//!
//! TEARDOWN (and COMPLETE, conceptually) produce a [`PendingCompletion`]:
//! a future that resolves exactly once, after all required sub-signals
//! resolve, in any settlement order. It never hangs on failure; a drained
//! hook error rides along as the resolved value.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use crate::core::errors::{LifecycleError, Result};

/// A future-like handle signaling aggregate completion of an asynchronous
/// phase across a subtree.
pub struct PendingCompletion {
    inner: BoxFuture<'static, Result<()>>,
}

impl PendingCompletion {
    /// An already-settled signal.
    pub fn resolved() -> Self {
        Self {
            inner: async { Ok(()) }.boxed(),
        }
    }

    /// A signal that settles immediately, carrying a failure.
    pub fn failed(error: LifecycleError) -> Self {
        Self {
            inner: async move { Err(error) }.boxed(),
        }
    }

    /// Wrap an arbitrary future as a completion signal.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    /// Combine N sub-signals into one.
    ///
    /// Resolves only after every constituent resolves, with no ordering
    /// guarantee on settlement. The first failure (in constituent order) is
    /// carried through; it never prevents resolution.
    pub fn aggregate(parts: Vec<PendingCompletion>) -> Self {
        Self {
            inner: async move {
                let results = join_all(parts.into_iter().map(|p| p.inner)).await;
                let mut first = None;
                for result in results {
                    if let Err(error) = result {
                        first.get_or_insert(error);
                    }
                }
                match first {
                    Some(error) => Err(error),
                    None => Ok(()),
                }
            }
            .boxed(),
        }
    }
}

// The boxed future is opaque, so no derive.
impl fmt::Debug for PendingCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCompletion").finish_non_exhaustive()
    }
}

impl Future for PendingCompletion {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.as_mut().poll(cx)
    }
}
