//! Load-once memoization cell
//!
//! [`LoadOnce`] wraps an asynchronous, fallible loader so that every consumer
//! shares a single result. The first caller of
//! [`LoadOnce::ensure_loaded`] runs the loader; concurrent callers wait on the
//! same in-flight load instead of starting their own. A failed load leaves the
//! cell empty and the next call tries again.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::Result;

/// Observable state of a [`LoadOnce`] cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No load has been attempted (or the last attempt failed)
    NotStarted,
    /// A loader is currently running
    InFlight,
    /// The value is available
    Resolved,
}

/// Shared, lazily-initialized value produced by an async loader
///
/// # Examples
///
/// ```
/// use persona_chat::cache::{LoadOnce, LoadState};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let cell: LoadOnce<u32> = LoadOnce::new();
/// assert_eq!(cell.state(), LoadState::NotStarted);
///
/// let value = cell.ensure_loaded(|| async { Ok(7) }).await?;
/// assert_eq!(*value, 7);
/// assert_eq!(cell.state(), LoadState::Resolved);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LoadOnce<T> {
    cell: OnceCell<Arc<T>>,
    loading: AtomicBool,
}

impl<T> Default for LoadOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LoadOnce<T> {
    /// Creates an empty cell
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
            loading: AtomicBool::new(false),
        }
    }

    /// Returns the value, running `loader` only if no value is cached yet
    ///
    /// # Errors
    ///
    /// Returns the loader's error. The cell stays unresolved in that case.
    pub async fn ensure_loaded<F, Fut>(&self, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let value = self
            .cell
            .get_or_try_init(|| async {
                let _loading = LoadingFlag::raise(&self.loading);
                loader().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(value))
    }

    /// Returns the cached value without loading
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    /// Current state of the cell
    pub fn state(&self) -> LoadState {
        if self.cell.initialized() {
            LoadState::Resolved
        } else if self.loading.load(Ordering::SeqCst) {
            LoadState::InFlight
        } else {
            LoadState::NotStarted
        }
    }
}

/// Marks a load as in flight until dropped, including when the loading
/// future is cancelled
struct LoadingFlag<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
