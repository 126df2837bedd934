//! In-process fixtures for client tests: a counting store and mock servers.

use crate::storage::{KeyValueStore, MemoryStore, StorageError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// Memory store that counts removals and can stall them to widen race windows.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    removals: AtomicUsize,
    delay: Duration,
}

impl CountingStore {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.remove(keys)
    }
}

/// Store whose reads always fail.
pub struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::KeyringError("locked".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::KeyringError("locked".to_string()))
    }

    fn remove(&self, _keys: &[&str]) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Serve `router` on an ephemeral port, returning the API base URL.
pub async fn spawn(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api", addr)
}

/// A server that reads each request and hangs up without answering.
/// Returns the base URL and the number of connections accepted.
pub async fn spawn_hangup() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });
    (format!("http://{}/api", addr), accepted)
}
