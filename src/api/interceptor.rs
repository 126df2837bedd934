//! Session invalidation on 401
//!
//! One [`SessionGuard`] belongs to one [`ApiClient`](super::ApiClient). It holds
//! the busy flag and the queue of requests waiting for an invalidation to
//! finish. Every session gets an epoch number; a request remembers the epoch
//! it was dispatched in, so a late 401 for an already discarded session does
//! not clear storage a second time. Signing in or out starts a new epoch
//! through [`SessionGuard::begin_session`].

use super::ApiError;
use crate::storage::TokenStorage;
use std::sync::Mutex;
use tokio::sync::oneshot;

type Listener = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct GuardState {
    invalidating: bool,
    epoch: u64,
    pending: Vec<oneshot::Sender<()>>,
}

/// What [`SessionGuard::ready`] hands back to a request about to go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub epoch: u64,
    /// The request was held while its session was being invalidated.
    pub after_invalidation: bool,
}

#[derive(Default)]
pub struct SessionGuard {
    state: Mutex<GuardState>,
    listeners: Mutex<Vec<Listener>>,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.lock_state().epoch
    }

    pub fn is_invalidating(&self) -> bool {
        self.lock_state().invalidating
    }

    /// Register a callback run once per invalidation, after storage is cleared.
    pub fn on_invalidated<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(listener));
    }

    /// Wait out a running invalidation, then return the epoch the caller is
    /// dispatching in.
    pub async fn ready(&self) -> Dispatch {
        let waiter = {
            let mut state = self.lock_state();
            if !state.invalidating {
                return Dispatch {
                    epoch: state.epoch,
                    after_invalidation: false,
                };
            }
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            rx
        };

        log::debug!("Request queued behind session invalidation");
        let _ = waiter.await;
        Dispatch {
            epoch: self.epoch(),
            after_invalidation: true,
        }
    }

    /// Start a new session epoch, after any running invalidation has
    /// finished. A 401 for a request dispatched before this call no longer
    /// clears storage.
    pub async fn begin_session(&self) -> u64 {
        loop {
            let waiter = {
                let mut state = self.lock_state();
                if !state.invalidating {
                    state.epoch += 1;
                    return state.epoch;
                }
                let (tx, rx) = oneshot::channel();
                state.pending.push(tx);
                rx
            };
            let _ = waiter.await;
        }
    }

    /// Handle a 401 for a request dispatched in `epoch` with a token attached.
    ///
    /// Always resolves to [`ApiError::AuthExpired`]. Only the first caller for
    /// a given epoch clears storage; callers arriving while that runs are
    /// queued and released together when it ends.
    pub async fn invalidate(&self, epoch: u64, storage: &TokenStorage) -> ApiError {
        let waiter = {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                log::debug!("401 for an already invalidated session (epoch {})", epoch);
                return ApiError::AuthExpired;
            }
            if state.invalidating {
                let (tx, rx) = oneshot::channel();
                state.pending.push(tx);
                Some(rx)
            } else {
                state.invalidating = true;
                None
            }
        };

        if let Some(rx) = waiter {
            let _ = rx.await;
            return ApiError::AuthExpired;
        }

        log::warn!("Server rejected the session token, signing out");
        if let Err(e) = storage.blocking(|storage| storage.clear()).await {
            log::error!("Error clearing stored session: {}", e);
        }

        for listener in self.listeners.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            listener();
        }

        let pending = {
            let mut state = self.lock_state();
            state.epoch += 1;
            state.invalidating = false;
            std::mem::take(&mut state.pending)
        };
        if !pending.is_empty() {
            log::info!("Releasing {} request(s) queued during invalidation", pending.len());
        }
        for tx in pending {
            let _ = tx.send(());
        }

        ApiError::AuthExpired
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
